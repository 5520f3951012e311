//! Rollback command implementation.
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::cli::{GlobalOpts, RollbackOpts};
use crate::logging::{Log as _, Logger};
use crate::mode::ExecutionMode;

/// Restore recorded state from a checkpoint, the newest by default.
///
/// Files, links and packages are not touched.
///
/// # Errors
///
/// Returns an error if there is no such checkpoint or the state cannot be
/// saved.
pub fn run(global: &GlobalOpts, opts: &RollbackOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;
    let mut engine = setup.engine(ExecutionMode::Real, log)?;
    let id = match &opts.id {
        Some(id) => id.clone(),
        None => engine
            .list_checkpoints()?
            .into_iter()
            .next()
            .context("no checkpoints to roll back to")?,
    };
    engine.rollback(&id)?;
    log.info(&format!("recorded state restored from {id}"));
    log.warn("files, links and packages on disk were not changed");
    Ok(())
}
