//! Cleanup command implementation.
use std::sync::Arc;

use anyhow::Result;

use crate::cli::{CleanupOpts, GlobalOpts};
use crate::logging::{Log as _, Logger};
use crate::mode::ExecutionMode;

/// Delete all but the newest `--keep` checkpoints.
///
/// # Errors
///
/// Returns an error if setup fails or a checkpoint cannot be deleted.
pub fn run(global: &GlobalOpts, opts: &CleanupOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;
    let engine = setup.engine(ExecutionMode::Real, log)?;
    log.stage("Cleaning up checkpoints");
    let deleted = engine.cleanup_checkpoints(opts.keep)?;
    for id in &deleted {
        log.debug(&format!("deleted checkpoint {id}"));
    }
    log.info(&format!(
        "deleted {} checkpoint(s), kept at most {}",
        deleted.len(),
        opts.keep
    ));
    Ok(())
}
