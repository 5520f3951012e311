//! Domain-specific error types for the dotfiles engine.
//!
//! The engine seams ([`Engine`](crate::engine::Engine),
//! [`StateManager`](crate::state::StateManager),
//! [`DotfilesManager`](crate::dotfiles::DotfilesManager)) return
//! [`EngineError`] so that callers can branch on the failure category.
//! Collaborators (package managers, program handlers) return
//! [`anyhow::Error`] and are wrapped into [`EngineError::Adapter`] at the
//! engine boundary.  CLI commands convert everything to `anyhow` via `?`.
//!
//! # Error kinds
//!
//! ```text
//! EngineError
//! ├── Validation     — malformed configuration, raised before any mutation
//! ├── Configuration  — link precondition violated (missing source, outside home)
//! ├── NotFound       — unknown checkpoint id
//! ├── Io             — filesystem failure at a path
//! ├── Serialization  — state or checkpoint JSON could not be read/written
//! └── Adapter        — a package manager or program handler failed
//! ```
use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the engine.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

/// Top-level error type for the dotfiles engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The configuration is malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A link or copy precondition was violated.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A named entity (e.g. a checkpoint) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A filesystem operation failed.
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        /// Path the operation was acting on.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// State or checkpoint JSON could not be encoded or decoded.
    #[error("Serialization error at {}: {source}", .path.display())]
    Serialization {
        /// File being read or written.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// A package-manager adapter or program handler failed.
    #[error("{name} failed: {reason}")]
    Adapter {
        /// Registry name of the adapter or handler.
        name: String,
        /// Rendered error chain from the collaborator.
        reason: String,
    },
}

impl EngineError {
    /// Build an [`EngineError::Io`] for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a collaborator failure, keeping the full `anyhow` context chain.
    #[must_use]
    pub fn adapter(name: &str, err: &anyhow::Error) -> Self {
        Self::Adapter {
            name: name.to_string(),
            reason: format!("{err:#}"),
        }
    }

    /// Whether this error, raised mid-apply, should roll back to the checkpoint.
    ///
    /// Validation errors are raised before a checkpoint exists.
    #[must_use]
    pub const fn triggers_rollback(&self) -> bool {
        !matches!(self, Self::Validation(_))
    }
}
