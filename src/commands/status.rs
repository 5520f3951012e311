//! Status command implementation.
use std::sync::Arc;

use anyhow::Result;

use crate::cli::{GlobalOpts, StatusOpts};
use crate::logging::Logger;
use crate::mode::ExecutionMode;
use crate::state::StateSummary;

/// Print a summary of the recorded state.
///
/// # Errors
///
/// Returns an error if setup fails or the state cannot be read.
#[allow(clippy::print_stdout)]
pub fn run(global: &GlobalOpts, opts: &StatusOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;
    let engine = setup.engine(ExecutionMode::Real, log)?;
    let summary = engine.state_summary();

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", render(&summary));
    }
    Ok(())
}

fn render(summary: &StateSummary) -> String {
    let last_updated = summary
        .last_updated
        .map_or_else(|| "never".to_string(), |t| t.to_rfc3339());
    let mut out = format!(
        "state version {}\ncreated:      {}\nlast updated: {last_updated}\n",
        summary.version,
        summary.created_at.to_rfc3339(),
    );
    if summary.packages.is_empty() {
        out.push_str("packages:     none\n");
    }
    for (manager, count) in &summary.packages {
        out.push_str(&format!("packages:     {count} via {manager}\n"));
    }
    out.push_str(&format!("programs:     {}\n", summary.programs));
    out.push_str(&format!("dotfiles:     {}\n", summary.dotfiles));
    out
}
