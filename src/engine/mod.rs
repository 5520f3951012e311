//! Orchestration of apply, diff and rollback.
//!
//! An apply run is a transaction over recorded state:
//!
//! ```text
//! validate ─► checkpoint ─► packages ─► programs ─► dotfiles ─► save
//!                 ▲                                               │
//!                 └──────────── rollback_to(checkpoint) ◄── error ┘
//! ```
//!
//! Rollback restores `state.json` only.  Packages installed, files written
//! and links placed before the failure stay on disk.
mod diff;
mod phases;
mod report;

pub use report::{
    ApplyReport, Change, DiffReport, DotfileChange, PackageAction, PackageChange, Phase,
    ProgramChange,
};

use std::sync::Arc;

use crate::adapters::Registry;
use crate::config::Config;
use crate::dotfiles::{DotfilesManager, Link};
use crate::error::{EngineError, Result};
use crate::logging::{Log, PhaseOutcome};
use crate::state::{State, StateManager, StateSummary};

/// Applies a [`Config`] through the registered adapters.
#[derive(Debug)]
pub struct Engine {
    registry: Registry,
    state: StateManager,
    dotfiles: DotfilesManager,
    log: Arc<dyn Log>,
}

impl Engine {
    /// Assemble an engine from its collaborators.
    #[must_use]
    pub fn new(
        registry: Registry,
        state: StateManager,
        dotfiles: DotfilesManager,
        log: Arc<dyn Log>,
    ) -> Self {
        Self {
            registry,
            state,
            dotfiles,
            log,
        }
    }

    /// Registered adapters.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The state manager.
    #[must_use]
    pub const fn state_manager(&self) -> &StateManager {
        &self.state
    }

    /// Current recorded state.
    #[must_use]
    pub const fn state(&self) -> &State {
        self.state.state()
    }

    /// The dotfiles manager.
    #[must_use]
    pub const fn dotfiles(&self) -> &DotfilesManager {
        &self.dotfiles
    }

    /// Bring the system in line with `config`.
    ///
    /// A failure after the checkpoint is taken does not return `Err`: the
    /// recorded state is rolled back and the report carries the error.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] if the config is invalid (no
    /// checkpoint is created), or an error if the checkpoint cannot be
    /// written.
    pub fn apply(&mut self, config: &Config) -> Result<ApplyReport> {
        let links = self.validate(config)?;
        self.transaction(config.keep_checkpoints(), |engine, report| {
            engine.run_phases(config, &links, report)
        })
    }

    /// Remove every link declared in `config` and forget it.
    ///
    /// Packages and program configuration are left alone.  Runs under a
    /// checkpoint like [`Engine::apply`].
    ///
    /// # Errors
    ///
    /// Same as [`Engine::apply`].
    pub fn unlink(&mut self, config: &Config) -> Result<ApplyReport> {
        let links = self.validate(config)?;
        self.transaction(config.keep_checkpoints(), |engine, report| {
            report.phase = Phase::Dotfiles;
            engine.log.stage("Removing dotfiles");
            phases::unlink(
                &engine.dotfiles,
                engine.state.state_mut(),
                &links,
                report,
                engine.log.as_ref(),
            )?;
            engine.finish_phase(report, Phase::Dotfiles);
            Ok(())
        })
    }

    /// Everything [`Engine::apply`] would change, without changing it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for an invalid config, or the
    /// first adapter or filesystem error hit while inspecting.
    pub fn diff(&self, config: &Config) -> Result<DiffReport> {
        let links = self.validate(config)?;
        let mut report = DiffReport::default();
        diff::packages(&self.registry, config, &mut report)?;
        diff::programs(&self.registry, config, &mut report)?;
        diff::dotfiles(&self.dotfiles, &links, &mut report)?;
        Ok(report)
    }

    /// Restore recorded state from checkpoint `id`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for an unknown id.
    pub fn rollback(&mut self, id: &str) -> Result<()> {
        self.log.stage(&format!("Rolling back to {id}"));
        self.state.rollback_to(id)
    }

    /// Checkpoint ids, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint directory cannot be read.
    pub fn list_checkpoints(&self) -> Result<Vec<String>> {
        self.state.list_checkpoints()
    }

    /// Keep the `keep` newest checkpoints, returning the deleted ids.
    ///
    /// # Errors
    ///
    /// Returns an error if a checkpoint cannot be deleted.
    pub fn cleanup_checkpoints(&self, keep: usize) -> Result<Vec<String>> {
        self.state.cleanup_checkpoints(keep)
    }

    /// Counts and timestamps of the recorded state.
    #[must_use]
    pub fn state_summary(&self) -> StateSummary {
        self.state.state_summary()
    }

    fn validate(&self, config: &Config) -> Result<Vec<Link>> {
        self.log.stage("Validating configuration");
        config.validate(&self.registry)?;
        config.links(self.dotfiles.home())
    }

    /// Run `body` between a checkpoint and a save, rolling back on error.
    fn transaction<F>(&mut self, keep: usize, body: F) -> Result<ApplyReport>
    where
        F: FnOnce(&mut Self, &mut ApplyReport) -> Result<()>,
    {
        let checkpoint = self.state.create_checkpoint()?;
        self.log.debug(&format!("created checkpoint {checkpoint}"));
        let mut report = ApplyReport::new(checkpoint);

        match body(self, &mut report).and_then(|()| self.state.save_state()) {
            Ok(()) => {
                report.phase = Phase::Committed;
                report.success = true;
            }
            Err(err) => self.recover(&mut report, &err),
        }

        self.prune(keep);
        Ok(report)
    }

    fn run_phases(
        &mut self,
        config: &Config,
        links: &[Link],
        report: &mut ApplyReport,
    ) -> Result<()> {
        report.phase = Phase::Packages;
        self.log.stage("Packages");
        phases::packages(
            &self.registry,
            self.state.state_mut(),
            config,
            report,
            self.log.as_ref(),
        )?;
        self.finish_phase(report, Phase::Packages);

        report.phase = Phase::Programs;
        self.log.stage("Programs");
        phases::programs(
            &self.registry,
            self.state.state_mut(),
            config,
            report,
            self.log.as_ref(),
        )?;
        self.finish_phase(report, Phase::Programs);

        report.phase = Phase::Dotfiles;
        self.log.stage("Dotfiles");
        phases::dotfiles(
            &self.dotfiles,
            self.state.state_mut(),
            links,
            report,
            self.log.as_ref(),
        )?;
        self.finish_phase(report, Phase::Dotfiles);

        Ok(())
    }

    fn finish_phase(&self, report: &ApplyReport, phase: Phase) {
        self.log.record_outcome(PhaseOutcome::finished(
            phase.as_str(),
            report.changes_in(phase),
            self.dotfiles.mode().is_simulated(),
        ));
    }

    fn recover(&mut self, report: &mut ApplyReport, err: &EngineError) {
        let failed = report.phase;
        self.log.error(&format!("{failed} failed: {err}"));
        self.log
            .record_outcome(PhaseOutcome::failed(failed.as_str(), &err.to_string()));
        report.failed_phase = Some(failed);
        report.error = Some(err.to_string());

        let checkpoint = report.checkpoint.clone();
        match self.state.rollback_to(&checkpoint) {
            Ok(()) => {
                report.phase = Phase::RolledBack;
                self.log
                    .warn(&format!("recorded state rolled back to checkpoint {checkpoint}"));
            }
            Err(rollback_err) => {
                self.log
                    .error(&format!("rollback to {checkpoint} failed: {rollback_err}"));
                report.rollback_error = Some(rollback_err.to_string());
            }
        }
    }

    fn prune(&self, keep: usize) {
        match self.state.cleanup_checkpoints(keep) {
            Ok(deleted) if !deleted.is_empty() => {
                self.log
                    .debug(&format!("pruned {} old checkpoint(s)", deleted.len()));
            }
            Ok(_) => {}
            Err(e) => self.log.warn(&format!("checkpoint cleanup failed: {e}")),
        }
    }
}
