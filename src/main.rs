//! `dotfiles` binary: parses arguments and dispatches to a command.
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use dotfiles_engine::cli::{Cli, Command};
use dotfiles_engine::commands;
use dotfiles_engine::logging::{self, Logger};

fn main() -> Result<ExitCode> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();

    match &args.command {
        Command::Completions(opts) => {
            commands::completions::run(opts);
            return Ok(ExitCode::SUCCESS);
        }
        Command::Version => {
            commands::version::run();
            return Ok(ExitCode::SUCCESS);
        }
        _ => {}
    }

    let name = args.command_name();
    logging::init_subscriber(args.verbose, name);
    let log = Arc::new(Logger::new(name));

    match &args.command {
        Command::Apply(opts) => commands::apply::run(&args.global, opts, &log)?,
        Command::Diff(opts) => return commands::diff::run(&args.global, opts, &log),
        Command::Unlink(opts) => commands::unlink::run(&args.global, opts, &log)?,
        Command::Status(opts) => commands::status::run(&args.global, opts, &log)?,
        Command::Checkpoints => commands::checkpoints::run(&args.global, &log)?,
        Command::Cleanup(opts) => commands::cleanup::run(&args.global, opts, &log)?,
        Command::Rollback(opts) => commands::rollback::run(&args.global, opts, &log)?,
        Command::Completions(_) | Command::Version => {}
    }
    Ok(ExitCode::SUCCESS)
}
