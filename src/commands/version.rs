//! Command: print version information.
use crate::state::STATE_VERSION;

/// Print the binary version and the state schema version it writes.
#[allow(clippy::print_stdout)]
pub fn run() {
    let version = option_env!("DOTFILES_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    println!("dotfiles {version} (state schema {STATE_VERSION})");
}
