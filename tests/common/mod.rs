// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed sandbox (home, dotfiles source and
// state directories), an in-memory package manager, and engine builders so
// each integration test can set up an isolated environment without
// repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use dotfiles_engine::adapters::{PackageManager, Registry, TapSupport};
use dotfiles_engine::config::Config;
use dotfiles_engine::dotfiles::DotfilesManager;
use dotfiles_engine::engine::Engine;
use dotfiles_engine::logging::Logger;
use dotfiles_engine::mode::ExecutionMode;
use dotfiles_engine::state::StateManager;

/// An isolated home, source and state layout backed by a
/// [`tempfile::TempDir`].
///
/// ```text
/// <root>/home    home directory; every link target lives here
/// <root>/src     dotfiles source directory
/// <root>/state   state directory
/// ```
pub struct Sandbox {
    /// Keeps the directory alive for the test's duration.
    pub root: tempfile::TempDir,
    /// Canonical home directory.
    pub home: PathBuf,
    /// Canonical source directory.
    pub src: PathBuf,
    /// State directory.
    pub state: PathBuf,
}

impl Sandbox {
    /// Create the three directories.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        let base = dunce::canonicalize(root.path()).expect("canonicalize temp dir");
        let home = base.join("home");
        let src = base.join("src");
        std::fs::create_dir_all(&home).expect("create home");
        std::fs::create_dir_all(&src).expect("create src");
        Self {
            root,
            state: base.join("state"),
            home,
            src,
        }
    }

    /// Canonical path of the temp root, outside home.
    pub fn base(&self) -> PathBuf {
        self.home.parent().expect("home has a parent").to_path_buf()
    }

    /// Write `content` to `<src>/<rel>`, creating parents.
    pub fn write_source(&self, rel: &str, content: &str) -> PathBuf {
        write(&self.src.join(rel), content)
    }

    /// Write `content` to `<home>/<rel>`, creating parents.
    pub fn write_home(&self, rel: &str, content: &str) -> PathBuf {
        write(&self.home.join(rel), content)
    }

    /// Parse `body` as config TOML after substituting `{src}` and `{home}`.
    ///
    /// A `[dotfiles]` table pointing at the sandbox source directory is
    /// appended unless `body` declares its own.
    pub fn config(&self, body: &str) -> Config {
        let mut text = body
            .replace("{src}", &toml_path(&self.src))
            .replace("{home}", &toml_path(&self.home));
        if !text.contains("[dotfiles]") {
            text.push_str(&format!(
                "\n[dotfiles]\nsource_dir = \"{}\"\n",
                toml_path(&self.src)
            ));
        }
        Config::from_toml_str(&text).expect("parse config")
    }

    /// Engine writing to the real sandbox home.
    pub fn engine(&self, registry: Registry) -> Engine {
        self.engine_with_mode(registry, ExecutionMode::Real, &self.state)
    }

    /// Engine with an explicit mode and state directory.
    pub fn engine_with_mode(&self, registry: Registry, mode: ExecutionMode, state: &Path) -> Engine {
        Engine::new(
            registry,
            StateManager::new(state).expect("open state dir"),
            DotfilesManager::new(&self.home, mode),
            Arc::new(Logger::new("integration-test")),
        )
    }
}

fn write(path: &Path, content: &str) -> PathBuf {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(path, content).expect("write file");
    path.to_path_buf()
}

fn toml_path(path: &Path) -> String {
    path.display().to_string().replace('\\', "\\\\")
}

#[derive(Default)]
struct FakeInner {
    installed: BTreeSet<String>,
    taps: BTreeSet<String>,
    casks: BTreeSet<String>,
    calls: Vec<String>,
    fail_install: bool,
}

/// In-memory package manager registered as `fake`.
///
/// Clones share the same state, so a test keeps one handle and boxes
/// another into the [`Registry`].
#[derive(Clone, Default)]
pub struct FakePackageManager {
    inner: Rc<RefCell<FakeInner>>,
}

impl FakePackageManager {
    /// A manager with `names` already installed.
    pub fn with_installed(names: &[&str]) -> Self {
        let fake = Self::default();
        fake.inner
            .borrow_mut()
            .installed
            .extend(names.iter().map(ToString::to_string));
        fake
    }

    /// Make every later `install` call fail.
    pub fn fail_installs(&self) {
        self.inner.borrow_mut().fail_install = true;
    }

    /// Mutating calls made so far, e.g. `install ripgrep`.
    pub fn calls(&self) -> Vec<String> {
        self.inner.borrow().calls.clone()
    }

    /// Whether `name` is currently installed.
    pub fn has(&self, name: &str) -> bool {
        self.inner.borrow().installed.contains(name)
    }

    /// Whether the tap was added.
    pub fn has_tap(&self, name: &str) -> bool {
        self.inner.borrow().taps.contains(name)
    }

    /// Whether the cask was installed.
    pub fn has_cask(&self, name: &str) -> bool {
        self.inner.borrow().casks.contains(name)
    }

    /// A registry holding a handle to this manager.
    pub fn registry(&self) -> Registry {
        Registry::new().with_package_manager(Box::new(self.clone()))
    }

    fn log(&self, call: String) {
        self.inner.borrow_mut().calls.push(call);
    }
}

impl PackageManager for FakePackageManager {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn install(&self, names: &[String]) -> anyhow::Result<()> {
        self.log(format!("install {}", names.join(" ")));
        if self.inner.borrow().fail_install {
            anyhow::bail!("install {} failed", names.join(" "));
        }
        self.inner
            .borrow_mut()
            .installed
            .extend(names.iter().cloned());
        Ok(())
    }

    fn uninstall(&self, names: &[String]) -> anyhow::Result<()> {
        self.log(format!("uninstall {}", names.join(" ")));
        let mut inner = self.inner.borrow_mut();
        for name in names {
            inner.installed.remove(name);
        }
        Ok(())
    }

    fn update(&self, names: &[String]) -> anyhow::Result<()> {
        self.log(format!("update {}", names.join(" ")));
        Ok(())
    }

    fn is_installed(&self, name: &str) -> anyhow::Result<bool> {
        Ok(self.has(name))
    }

    fn list_installed(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.inner.borrow().installed.iter().cloned().collect())
    }

    fn as_tap_support(&self) -> Option<&dyn TapSupport> {
        Some(self)
    }
}

impl TapSupport for FakePackageManager {
    fn tap(&self, name: &str) -> anyhow::Result<()> {
        self.log(format!("tap {name}"));
        self.inner.borrow_mut().taps.insert(name.to_string());
        Ok(())
    }

    fn is_tapped(&self, name: &str) -> anyhow::Result<bool> {
        Ok(self.has_tap(name))
    }

    fn install_casks(&self, names: &[String]) -> anyhow::Result<()> {
        self.log(format!("install --cask {}", names.join(" ")));
        self.inner.borrow_mut().casks.extend(names.iter().cloned());
        Ok(())
    }

    fn is_cask_installed(&self, name: &str) -> anyhow::Result<bool> {
        Ok(self.has_cask(name))
    }
}
