//! Embed a version string for `dotfiles version`.
use std::process::Command;

fn main() {
    // An explicit DOTFILES_VERSION (release builds) wins over git describe.
    if let Ok(version) = std::env::var("DOTFILES_VERSION") {
        println!("cargo:rustc-env=DOTFILES_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let described = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !described.is_empty() {
            println!("cargo:rustc-env=DOTFILES_VERSION={described}");
        }
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=DOTFILES_VERSION");
}
