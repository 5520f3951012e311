//! Collaborators the engine delegates to: package managers and program handlers.
//!
//! Adapters are looked up by name in a [`Registry`] that is built once and
//! injected into the [`Engine`](crate::engine::Engine).  Optional abilities
//! beyond the base [`PackageManager`] interface are exposed through
//! capability queries such as [`PackageManager::as_tap_support`].
mod git;
mod homebrew;
mod managed;
mod shell;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

pub use git::GitHandler;
pub use homebrew::Homebrew;
pub use shell::ShellHandler;

use crate::exec::Executor;
use crate::mode::ExecutionMode;
use crate::state::ProgramOptions;

/// A package manager the engine can install and query packages through.
///
/// [`PackageManager::is_installed`] and [`PackageManager::list_installed`]
/// must be read-only; they are called from `diff`.
pub trait PackageManager {
    /// Registry name, e.g. `homebrew`.
    fn name(&self) -> &'static str;

    /// Install `names`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying tool fails.
    fn install(&self, names: &[String]) -> Result<()>;

    /// Uninstall `names`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying tool fails.
    fn uninstall(&self, names: &[String]) -> Result<()>;

    /// Upgrade `names`, or everything when `names` is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying tool fails.
    fn update(&self, names: &[String]) -> Result<()>;

    /// Whether `name` is installed.
    ///
    /// # Errors
    ///
    /// Returns an error if the installed set cannot be queried.
    fn is_installed(&self, name: &str) -> Result<bool>;

    /// Every installed package name.
    ///
    /// # Errors
    ///
    /// Returns an error if the installed set cannot be queried.
    fn list_installed(&self) -> Result<Vec<String>>;

    /// Tap and cask operations, when this manager supports them.
    fn as_tap_support(&self) -> Option<&dyn TapSupport> {
        None
    }
}

/// Extra operations for managers with third-party repositories and casks.
pub trait TapSupport {
    /// Add the `user/repo` tap.
    ///
    /// # Errors
    ///
    /// Returns an error if the tap cannot be added.
    fn tap(&self, name: &str) -> Result<()>;

    /// Whether the `user/repo` tap is present.
    ///
    /// # Errors
    ///
    /// Returns an error if the tap list cannot be queried.
    fn is_tapped(&self, name: &str) -> Result<bool>;

    /// Install GUI applications distributed as casks.
    ///
    /// # Errors
    ///
    /// Returns an error if any cask fails to install.
    fn install_casks(&self, names: &[String]) -> Result<()>;

    /// Whether the cask `name` is installed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cask list cannot be queried.
    fn is_cask_installed(&self, name: &str) -> Result<bool>;
}

/// Whether a program's configuration needs to be (re)written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramAction {
    /// The rendered configuration already matches.
    NoChange,
    /// The handler would write new configuration.
    Configure,
}

/// Result of [`ProgramHandler::diff_configuration`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgramDiff {
    /// What `configure` would do.
    pub action: ProgramAction,
    /// Short explanation for reports.
    pub details: String,
}

impl ProgramDiff {
    /// Nothing to do.
    #[must_use]
    pub fn no_change(details: impl Into<String>) -> Self {
        Self {
            action: ProgramAction::NoChange,
            details: details.into(),
        }
    }

    /// `configure` would write.
    #[must_use]
    pub fn configure(details: impl Into<String>) -> Self {
        Self {
            action: ProgramAction::Configure,
            details: details.into(),
        }
    }

    /// Whether `configure` would write anything.
    #[must_use]
    pub const fn is_change(&self) -> bool {
        matches!(self.action, ProgramAction::Configure)
    }
}

/// Generates configuration for one program from an options map.
#[cfg_attr(test, mockall::automock)]
pub trait ProgramHandler {
    /// Registry name, e.g. `git`.
    fn name(&self) -> &'static str;

    /// Write the program's configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the options are unusable or the write fails.
    fn configure(&self, options: &ProgramOptions) -> Result<()>;

    /// Describe what [`ProgramHandler::configure`] would change.  Read-only.
    ///
    /// # Errors
    ///
    /// Returns an error if the options are unusable or the current
    /// configuration cannot be read.
    fn diff_configuration(&self, options: &ProgramOptions) -> Result<ProgramDiff>;
}

/// Name-keyed package managers and program handlers.
#[derive(Default)]
pub struct Registry {
    package_managers: BTreeMap<&'static str, Box<dyn PackageManager>>,
    programs: BTreeMap<&'static str, Box<dyn ProgramHandler>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("package_managers", &self.package_managers.keys())
            .field("programs", &self.programs.keys())
            .finish()
    }
}

impl Registry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in adapters: `homebrew`, `git` and `shell`.
    #[must_use]
    pub fn with_defaults(executor: Arc<dyn Executor>, mode: &ExecutionMode, home: &Path) -> Self {
        Self::new()
            .with_package_manager(Box::new(Homebrew::new(executor, mode.clone())))
            .with_program(Box::new(GitHandler::new(home, mode.clone())))
            .with_program(Box::new(ShellHandler::new(home, mode.clone())))
    }

    /// Register `manager` under its own name, replacing any previous one.
    #[must_use]
    pub fn with_package_manager(mut self, manager: Box<dyn PackageManager>) -> Self {
        self.package_managers.insert(manager.name(), manager);
        self
    }

    /// Register `handler` under its own name, replacing any previous one.
    #[must_use]
    pub fn with_program(mut self, handler: Box<dyn ProgramHandler>) -> Self {
        self.programs.insert(handler.name(), handler);
        self
    }

    /// Look up a package manager.
    #[must_use]
    pub fn package_manager(&self, name: &str) -> Option<&dyn PackageManager> {
        self.package_managers.get(name).map(AsRef::as_ref)
    }

    /// Look up a program handler.
    #[must_use]
    pub fn program(&self, name: &str) -> Option<&dyn ProgramHandler> {
        self.programs.get(name).map(AsRef::as_ref)
    }

    /// Registered package manager names, sorted.
    pub fn package_manager_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.package_managers.keys().copied()
    }

    /// Registered program names, sorted.
    pub fn program_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.programs.keys().copied()
    }
}
