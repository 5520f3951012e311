//! Command-line interface definition.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::state::manager::DEFAULT_KEEP_CHECKPOINTS;

/// Top-level CLI entry point for the dotfiles engine.
#[derive(Parser, Debug)]
#[command(
    name = "dotfiles",
    about = "Declarative dotfiles, packages and program configuration",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

impl Cli {
    /// Short name of the subcommand, used for the log file name.
    #[must_use]
    pub const fn command_name(&self) -> &'static str {
        match self.command {
            Command::Apply(_) => "apply",
            Command::Diff(_) => "diff",
            Command::Unlink(_) => "unlink",
            Command::Status(_) => "status",
            Command::Checkpoints => "checkpoints",
            Command::Cleanup(_) => "cleanup",
            Command::Rollback(_) => "rollback",
            Command::Completions(_) => "completions",
            Command::Version => "version",
        }
    }
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Config file (default: $XDG_CONFIG_HOME/dotfiles/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// State directory (default: $XDG_STATE_HOME/dotfiles)
    #[arg(long, global = true, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Home directory every dotfile target must live under
    #[arg(long, global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install packages, configure programs and place dotfiles
    Apply(ApplyOpts),
    /// Show what apply would change
    Diff(DiffOpts),
    /// Remove placed dotfiles
    Unlink(ApplyOpts),
    /// Summarise recorded state
    Status(StatusOpts),
    /// List checkpoints, newest first
    Checkpoints,
    /// Delete old checkpoints
    Cleanup(CleanupOpts),
    /// Restore recorded state from a checkpoint
    Rollback(RollbackOpts),
    /// Print shell completions
    Completions(CompletionsOpts),
    /// Print version information
    Version,
}

/// Options for the `apply` and `unlink` subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct ApplyOpts {
    /// Write into DIR instead of the home directory and only log package commands
    #[arg(long, value_name = "DIR")]
    pub simulate: Option<PathBuf>,
}

/// Options for the `diff` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct DiffOpts {
    /// Compare against a directory previously used with `apply --simulate`
    #[arg(long, value_name = "DIR")]
    pub simulate: Option<PathBuf>,

    /// Exit with status 1 when there are pending changes
    #[arg(long)]
    pub exit_code: bool,
}

/// Options for the `status` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct StatusOpts {
    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Options for the `cleanup` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct CleanupOpts {
    /// Number of checkpoints to keep
    #[arg(long, default_value_t = DEFAULT_KEEP_CHECKPOINTS)]
    pub keep: usize,
}

/// Options for the `rollback` subcommand.
#[derive(Parser, Debug, Clone, Default)]
pub struct RollbackOpts {
    /// Checkpoint id (default: the newest)
    pub id: Option<String>,
}

/// Options for the `completions` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct CompletionsOpts {
    /// Target shell
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
