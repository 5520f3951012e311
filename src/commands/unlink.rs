//! Unlink command implementation.
use std::sync::Arc;

use anyhow::Result;

use crate::cli::{ApplyOpts, GlobalOpts};
use crate::logging::Logger;

/// Run the unlink command.
///
/// # Errors
///
/// Returns an error if setup fails, the configuration is invalid, or a
/// link cannot be removed.
pub fn run(global: &GlobalOpts, opts: &ApplyOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;
    let mode = super::execution_mode(opts.simulate.as_deref())?;
    let mut engine = setup.engine(mode, log)?;
    let report = engine.unlink(&setup.config)?;
    super::finish(&report, log)
}
