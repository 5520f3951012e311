//! Declarative dotfiles engine.
//!
//! Describe packages, program configuration and dotfile placements in one
//! TOML file; the engine applies that description with a checkpoint taken
//! first, and restores the recorded state from the checkpoint if any phase
//! fails.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: parse and validate the TOML configuration
//! - **[`dotfiles`]**: link and copy placement with backups
//! - **[`state`]**: recorded state and its checkpoints
//! - **[`adapters`]**: package managers and program handlers, by name
//! - **[`engine`]**: apply, diff and rollback orchestration
//! - **[`commands`]**: top-level subcommand wiring for the `dotfiles` binary
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod adapters;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dotfiles;
pub mod engine;
pub mod error;
pub mod exec;
pub mod logging;
pub mod mode;
pub mod paths;
pub mod state;
