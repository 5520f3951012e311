//! Results returned by [`Engine::apply`](super::Engine::apply) and
//! [`Engine::diff`](super::Engine::diff).
use std::fmt::{self, Write as _};
use std::path::PathBuf;

use serde::Serialize;

use crate::adapters::ProgramDiff;
use crate::dotfiles::LinkDiff;

/// Where an apply run got to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Checking the configuration; nothing has been written.
    Validating,
    /// The rollback checkpoint exists.
    Checkpointed,
    /// Installing, tapping and uninstalling packages.
    Packages,
    /// Running program handlers.
    Programs,
    /// Placing dotfiles.
    Dotfiles,
    /// State saved; the run succeeded.
    Committed,
    /// A phase failed and recorded state was restored.
    RolledBack,
}

impl Phase {
    /// Lowercase name used in logs and summaries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Checkpointed => "checkpointed",
            Self::Packages => "packages",
            Self::Programs => "programs",
            Self::Dotfiles => "dotfiles",
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One mutation performed during apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    /// Phase that made the change.
    pub phase: Phase,
    /// Package, program or link name.
    pub name: String,
    /// What was done.
    pub detail: String,
}

/// Outcome of [`Engine::apply`](super::Engine::apply).
///
/// A failed run is still `Ok(report)`: the error and the rollback outcome
/// are carried here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Whether every phase completed and state was saved.
    pub success: bool,
    /// Checkpoint created for this run.
    pub checkpoint: String,
    /// Last phase reached: `Committed`, `RolledBack`, or the failing phase
    /// when rollback itself failed.
    pub phase: Phase,
    /// Phase in which the error occurred.
    pub failed_phase: Option<Phase>,
    /// Mutations performed, in order (including those whose recorded
    /// state was rolled back).
    pub changes: Vec<Change>,
    /// The error that aborted the run.
    pub error: Option<String>,
    /// Why restoring the checkpoint failed, if it did.
    pub rollback_error: Option<String>,
}

impl ApplyReport {
    pub(super) const fn new(checkpoint: String) -> Self {
        Self {
            success: false,
            checkpoint,
            phase: Phase::Checkpointed,
            failed_phase: None,
            changes: Vec::new(),
            error: None,
            rollback_error: None,
        }
    }

    pub(super) fn record(&mut self, phase: Phase, name: &str, detail: impl Into<String>) {
        self.changes.push(Change {
            phase,
            name: name.to_string(),
            detail: detail.into(),
        });
    }

    /// Number of changes made in `phase`.
    #[must_use]
    pub fn changes_in(&self, phase: Phase) -> usize {
        self.changes.iter().filter(|c| c.phase == phase).count()
    }
}

/// What a package manager would do for one package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageAction {
    /// Add a tap.
    Tap,
    /// Install a package.
    Install,
    /// Install a cask.
    InstallCask,
    /// Remove a package.
    Uninstall,
}

impl fmt::Display for PackageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tap => "tap",
            Self::Install => "install",
            Self::InstallCask => "install cask",
            Self::Uninstall => "uninstall",
        })
    }
}

/// Pending package operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageChange {
    /// Registry name of the manager.
    pub manager: String,
    /// Package, cask or tap name.
    pub name: String,
    /// Operation.
    pub action: PackageAction,
}

/// Pending program configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgramChange {
    /// Registry name of the handler.
    pub name: String,
    /// Handler's own description.
    pub diff: ProgramDiff,
}

/// Pending dotfile reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DotfileChange {
    /// Link name.
    pub name: String,
    /// Effective target path.
    pub target: PathBuf,
    /// Classification.
    pub diff: LinkDiff,
}

/// Everything `apply` would change.  Empty when the system matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    /// Package operations.
    pub packages: Vec<PackageChange>,
    /// Program configurations.
    pub programs: Vec<ProgramChange>,
    /// Dotfile placements.
    pub dotfiles: Vec<DotfileChange>,
}

impl DiffReport {
    /// Whether nothing would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending_count() == 0
    }

    /// Total number of pending operations.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.packages.len() + self.programs.len() + self.dotfiles.len()
    }

    /// Plain-text rendering, one line per pending operation.
    #[must_use]
    pub fn render(&self) -> String {
        if self.is_empty() {
            return "No changes.\n".to_string();
        }
        let mut out = String::new();
        if !self.packages.is_empty() {
            out.push_str("packages:\n");
            for p in &self.packages {
                writeln!(out, "  {}: {} {}", p.manager, p.action, p.name).unwrap_or(());
            }
        }
        if !self.programs.is_empty() {
            out.push_str("programs:\n");
            for p in &self.programs {
                writeln!(out, "  {}: {}", p.name, p.diff.details).unwrap_or(());
            }
        }
        if !self.dotfiles.is_empty() {
            out.push_str("dotfiles:\n");
            for d in &self.dotfiles {
                writeln!(
                    out,
                    "  {}: {} {} ({})",
                    d.name,
                    d.diff.action,
                    d.target.display(),
                    d.diff.reason
                )
                .unwrap_or(());
            }
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dotfiles::DiffAction;

    #[test]
    fn empty_report_renders_no_changes() {
        let report = DiffReport::default();
        assert!(report.is_empty());
        assert_eq!(report.render(), "No changes.\n");
    }

    #[test]
    fn render_lists_every_category() {
        let report = DiffReport {
            packages: vec![
                PackageChange {
                    manager: "homebrew".to_string(),
                    name: "homebrew/cask-fonts".to_string(),
                    action: PackageAction::Tap,
                },
                PackageChange {
                    manager: "homebrew".to_string(),
                    name: "ripgrep".to_string(),
                    action: PackageAction::Install,
                },
            ],
            programs: vec![ProgramChange {
                name: "git".to_string(),
                diff: ProgramDiff::configure("/home/ada/.config/git/config does not exist"),
            }],
            dotfiles: vec![DotfileChange {
                name: "nvim".to_string(),
                target: PathBuf::from("/home/ada/.config/nvim"),
                diff: LinkDiff {
                    action: DiffAction::Create,
                    reason: "target does not exist",
                },
            }],
        };

        assert_eq!(report.pending_count(), 4);
        insta::assert_snapshot!(report.render(), @r"
        packages:
          homebrew: tap homebrew/cask-fonts
          homebrew: install ripgrep
        programs:
          git: /home/ada/.config/git/config does not exist
        dotfiles:
          nvim: create /home/ada/.config/nvim (target does not exist)
        ");
    }

    #[test]
    fn phase_names() {
        assert_eq!(Phase::RolledBack.to_string(), "rolled_back");
        assert_eq!(Phase::Dotfiles.as_str(), "dotfiles");
    }

    #[test]
    fn apply_report_serializes() {
        let mut report = ApplyReport::new("20240101_000000".to_string());
        report.record(Phase::Packages, "jq", "installed");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["phase"], "checkpointed");
        assert_eq!(json["changes"][0]["phase"], "packages");
        assert_eq!(report.changes_in(Phase::Packages), 1);
    }
}
