//! Checkpoints command implementation.
use std::sync::Arc;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::logging::Logger;
use crate::mode::ExecutionMode;

/// List checkpoint ids newest first, with what each one recorded.
///
/// # Errors
///
/// Returns an error if setup fails or a checkpoint cannot be read.
#[allow(clippy::print_stdout)]
pub fn run(global: &GlobalOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;
    let engine = setup.engine(ExecutionMode::Real, log)?;
    let ids = engine.list_checkpoints()?;
    if ids.is_empty() {
        println!("no checkpoints in {}", engine.state_manager().state_dir().display());
        return Ok(());
    }
    for id in &ids {
        let summary = engine.state_manager().load_checkpoint(id)?.summary();
        let packages: usize = summary.packages.values().sum();
        println!(
            "{id}  {packages} package(s), {} program(s), {} dotfile(s)",
            summary.programs, summary.dotfiles
        );
    }
    Ok(())
}
