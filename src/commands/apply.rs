//! Apply command implementation.
use std::sync::Arc;

use anyhow::Result;

use crate::cli::{ApplyOpts, GlobalOpts};
use crate::logging::{Log as _, Logger};
use crate::mode::ExecutionMode;

/// Run the apply command.
///
/// # Errors
///
/// Returns an error if setup fails, the configuration is invalid, or a
/// phase fails (after the recorded state has been rolled back).
pub fn run(global: &GlobalOpts, opts: &ApplyOpts, log: &Arc<Logger>) -> Result<()> {
    let version = option_env!("DOTFILES_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    log.info(&format!("dotfiles {version}"));

    let setup = super::CommandSetup::init(global, log)?;
    let mode = super::execution_mode(opts.simulate.as_deref())?;
    if let ExecutionMode::Simulated { root } = &mode {
        log.info(&format!("simulating into {}", root.display()));
    }

    let mut engine = setup.engine(mode, log)?;
    let report = match engine.apply(&setup.config) {
        Ok(report) => report,
        Err(e) if !e.triggers_rollback() => {
            log.error("configuration rejected; nothing was changed");
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };
    super::finish(&report, log)
}
