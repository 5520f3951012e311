//! The [`Log`] implementation used by the binary.
use std::sync::Mutex;

use super::types::{Log, OUTCOME_TARGET, PhaseOutcome, PhaseStatus, STAGE_TARGET};

/// Emits [`tracing`] events and keeps phase outcomes for the summary.
///
/// Where the events end up is decided by
/// [`init_subscriber`](super::init_subscriber); without a subscriber they
/// are dropped.
#[derive(Debug)]
pub struct Logger {
    command: String,
    outcomes: Mutex<Vec<PhaseOutcome>>,
}

impl Logger {
    /// Logger for the subcommand `command`.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            outcomes: Mutex::new(Vec::new()),
        }
    }

    /// Subcommand this logger was created for.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Outcomes recorded so far, in phase order.
    #[must_use]
    pub fn outcomes(&self) -> Vec<PhaseOutcome> {
        self.outcomes
            .lock()
            .map_or_else(|_| Vec::new(), |guard| guard.clone())
    }

    /// Whether any recorded phase failed.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.outcomes()
            .iter()
            .any(|o| o.status == PhaseStatus::Failed)
    }

    /// Emit one summary event per recorded phase.
    pub fn summarize(&self) {
        let outcomes = self.outcomes();
        if outcomes.is_empty() {
            return;
        }
        self.stage("Summary");
        for outcome in &outcomes {
            tracing::info!(
                target: OUTCOME_TARGET,
                status = outcome.status.as_str(),
                "{}",
                outcome.describe()
            );
        }
    }
}

impl Log for Logger {
    fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    fn record_outcome(&self, outcome: PhaseOutcome) {
        tracing::debug!(
            phase = %outcome.phase,
            status = outcome.status.as_str(),
            changes = outcome.changes,
            "phase finished"
        );
        if let Ok(mut guard) = self.outcomes.lock() {
            guard.push(outcome);
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let log = Logger::new("apply");
        assert_eq!(log.command(), "apply");
        assert!(log.outcomes().is_empty());
        assert!(!log.failed());
    }

    #[test]
    fn outcomes_keep_order_and_flag_failure() {
        let log = Logger::new("apply");
        let sink: &dyn Log = &log;
        sink.record_outcome(PhaseOutcome::finished("packages", 2, false));
        sink.record_outcome(PhaseOutcome::failed("programs", "git missing"));

        let outcomes = log.outcomes();
        assert_eq!(outcomes[0].phase, "packages");
        assert_eq!(outcomes[1].error.as_deref(), Some("git missing"));
        assert!(log.failed());
        log.summarize();
    }
}
