//! Diff command implementation.
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;

use crate::cli::{DiffOpts, GlobalOpts};
use crate::logging::{Log as _, Logger};

/// Run the diff command, printing pending changes to stdout.
///
/// Returns exit code 1 when `--exit-code` is set and changes are pending.
///
/// # Errors
///
/// Returns an error if setup fails, the configuration is invalid, or an
/// adapter cannot be queried.
#[allow(clippy::print_stdout)]
pub fn run(global: &GlobalOpts, opts: &DiffOpts, log: &Arc<Logger>) -> Result<ExitCode> {
    let setup = super::CommandSetup::init(global, log)?;
    let mode = super::execution_mode(opts.simulate.as_deref())?;
    let engine = setup.engine(mode, log)?;

    log.stage("Computing diff");
    let report = engine.diff(&setup.config)?;
    print!("{}", report.render());

    if opts.exit_code && !report.is_empty() {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}
