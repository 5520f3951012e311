//! Phase outcomes and the [`Log`] trait the engine writes through.
use std::fmt;

/// Target for section headers.
pub const STAGE_TARGET: &str = "dotfiles::stage";
/// Target for actions skipped because the engine is simulating.
pub const SIMULATED_TARGET: &str = "dotfiles::simulated";
/// Target for summary lines.
pub const OUTCOME_TARGET: &str = "dotfiles::outcome";

/// How an apply phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseStatus {
    /// At least one change was made.
    Changed,
    /// Everything already matched.
    Unchanged,
    /// Changes were computed but only logged.
    Simulated,
    /// The phase returned an error.
    Failed,
}

impl PhaseStatus {
    /// Stable lowercase name, also used as the `status` event field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
            Self::Simulated => "simulated",
            Self::Failed => "failed",
        }
    }

    /// Inverse of [`as_str`](Self::as_str).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        [
            Self::Changed,
            Self::Unchanged,
            Self::Simulated,
            Self::Failed,
        ]
        .into_iter()
        .find(|status| status.as_str() == s)
    }

    /// Single-character marker for summary lines.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Changed => '+',
            Self::Unchanged => '=',
            Self::Simulated => '~',
            Self::Failed => '!',
        }
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one phase did, kept until the summary is printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseOutcome {
    /// Phase name, e.g. `packages`.
    pub phase: String,
    /// How it ended.
    pub status: PhaseStatus,
    /// Number of recorded changes.
    pub changes: usize,
    /// Error text when `status` is [`PhaseStatus::Failed`].
    pub error: Option<String>,
}

impl PhaseOutcome {
    /// Outcome of a phase that returned normally.
    #[must_use]
    pub fn finished(phase: &str, changes: usize, simulated: bool) -> Self {
        let status = match (changes, simulated) {
            (0, _) => PhaseStatus::Unchanged,
            (_, true) => PhaseStatus::Simulated,
            (_, false) => PhaseStatus::Changed,
        };
        Self {
            phase: phase.to_string(),
            status,
            changes,
            error: None,
        }
    }

    /// Outcome of a phase that returned `error`.
    #[must_use]
    pub fn failed(phase: &str, error: &str) -> Self {
        Self {
            phase: phase.to_string(),
            status: PhaseStatus::Failed,
            changes: 0,
            error: Some(error.to_string()),
        }
    }

    /// One summary line, without colour.
    #[must_use]
    pub fn describe(&self) -> String {
        let detail = match (self.status, &self.error) {
            (PhaseStatus::Failed, Some(error)) => format!("failed: {error}"),
            (PhaseStatus::Failed, None) => "failed".to_string(),
            (PhaseStatus::Unchanged, _) => "up to date".to_string(),
            (PhaseStatus::Simulated, _) => format!("{} change(s) simulated", self.changes),
            (PhaseStatus::Changed, _) => format!("{} change(s)", self.changes),
        };
        format!("{} {:<9} {detail}", self.status.glyph(), self.phase)
    }
}

/// Sink for engine and command output.
///
/// The engine holds an `Arc<dyn Log>`; the binary passes a
/// [`Logger`](super::Logger).
pub trait Log: Send + Sync + fmt::Debug {
    /// Section header.
    fn stage(&self, msg: &str);
    /// Normal progress.
    fn info(&self, msg: &str);
    /// Detail shown with `--verbose` and always written to the log file.
    fn debug(&self, msg: &str);
    /// Something went wrong but the run continues.
    fn warn(&self, msg: &str);
    /// The run is failing.
    fn error(&self, msg: &str);
    /// Remember how a phase ended.
    fn record_outcome(&self, outcome: PhaseOutcome);
}
