//! Homebrew package manager adapter.
use std::sync::Arc;

use anyhow::{Result, bail};

use super::{PackageManager, TapSupport};
use crate::exec::{ExecResult, Executor};
use crate::logging::SIMULATED_TARGET;
use crate::mode::ExecutionMode;

const BREW: &str = "brew";

/// Drives `brew` for formulae, casks and taps.
///
/// In [`ExecutionMode::Simulated`] mutating commands are logged instead of
/// run; queries still run when `brew` is available and report "not
/// installed" otherwise.
#[derive(Debug, Clone)]
pub struct Homebrew {
    executor: Arc<dyn Executor>,
    mode: ExecutionMode,
}

impl Homebrew {
    /// Adapter running commands through `executor`.
    #[must_use]
    pub fn new(executor: Arc<dyn Executor>, mode: ExecutionMode) -> Self {
        Self { executor, mode }
    }

    /// Run a mutating `brew` command, or log it in simulated mode.
    fn mutate(&self, args: &[&str]) -> Result<()> {
        if self.mode.is_simulated() {
            tracing::info!(target: SIMULATED_TARGET, "{BREW} {}", args.join(" "));
            return Ok(());
        }
        self.require_brew()?;
        self.executor.run(BREW, args)?;
        Ok(())
    }

    /// Run a read-only `brew` command; `None` when brew is absent in
    /// simulated mode.
    fn query(&self, args: &[&str]) -> Result<Option<ExecResult>> {
        if self.mode.is_simulated() && !self.executor.which(BREW) {
            return Ok(None);
        }
        self.require_brew()?;
        Ok(Some(self.executor.run_unchecked(BREW, args)?))
    }

    fn require_brew(&self) -> Result<()> {
        if !self.executor.which(BREW) {
            bail!("{BREW} not found on PATH");
        }
        Ok(())
    }

    /// Names from `brew list` style output: first token of each line.
    fn listed(&self, args: &[&str]) -> Result<Vec<String>> {
        let Some(result) = self.query(args)? else {
            return Ok(Vec::new());
        };
        if !result.success {
            bail!("{BREW} {} failed: {}", args.join(" "), result.stderr.trim());
        }
        Ok(result
            .stdout
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .map(str::to_string)
            .collect())
    }

    fn with_names<'a>(prefix: &[&'a str], names: &'a [String]) -> Vec<&'a str> {
        let mut args = prefix.to_vec();
        args.extend(names.iter().map(String::as_str));
        args
    }
}

impl PackageManager for Homebrew {
    fn name(&self) -> &'static str {
        "homebrew"
    }

    fn install(&self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        self.mutate(&Self::with_names(&["install"], names))
    }

    fn uninstall(&self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        self.mutate(&Self::with_names(&["uninstall"], names))
    }

    fn update(&self, names: &[String]) -> Result<()> {
        self.mutate(&["update"])?;
        self.mutate(&Self::with_names(&["upgrade"], names))
    }

    fn is_installed(&self, name: &str) -> Result<bool> {
        // `brew list --versions <name>` exits non-zero when absent.
        Ok(self
            .query(&["list", "--formula", "--versions", name])?
            .is_some_and(|r| r.success && !r.stdout.trim().is_empty()))
    }

    fn list_installed(&self) -> Result<Vec<String>> {
        self.listed(&["list", "--formula", "--versions"])
    }

    fn as_tap_support(&self) -> Option<&dyn TapSupport> {
        Some(self)
    }
}

impl TapSupport for Homebrew {
    fn tap(&self, name: &str) -> Result<()> {
        self.mutate(&["tap", name])
    }

    fn is_tapped(&self, name: &str) -> Result<bool> {
        let wanted = name.to_ascii_lowercase();
        Ok(self
            .listed(&["tap"])?
            .iter()
            .any(|t| t.to_ascii_lowercase() == wanted))
    }

    fn install_casks(&self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        self.mutate(&Self::with_names(&["install", "--cask"], names))
    }

    fn is_cask_installed(&self, name: &str) -> Result<bool> {
        Ok(self
            .query(&["list", "--cask", "--versions", name])?
            .is_some_and(|r| r.success && !r.stdout.trim().is_empty()))
    }
}
