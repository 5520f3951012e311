//! Dotfile placement: validation, backups, symlinks and copies.
//!
//! [`DotfilesManager`] is the only component that writes into the home
//! directory on behalf of a [`Link`].  Every write goes through
//! [`ExecutionMode::rebase`], so a simulated run lands in a scratch root
//! with the same home-relative layout.
pub mod backup;
pub mod fs;
pub mod link;

use std::path::{Path, PathBuf};

use chrono::Utc;

pub use link::{DiffAction, Link, LinkAction, LinkDiff, LinkMetadata};

use crate::error::{EngineError, Result};
use crate::mode::ExecutionMode;
use crate::paths;

/// Executes link, copy and unlink operations for [`Link`] values.
#[derive(Debug, Clone)]
pub struct DotfilesManager {
    home: PathBuf,
    mode: ExecutionMode,
}

impl DotfilesManager {
    /// Create a manager for `home` writing according to `mode`.
    #[must_use]
    pub fn new(home: impl Into<PathBuf>, mode: ExecutionMode) -> Self {
        Self {
            home: home.into(),
            mode,
        }
    }

    /// Home directory every target must live under.
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Execution mode fixed at construction.
    #[must_use]
    pub const fn mode(&self) -> &ExecutionMode {
        &self.mode
    }

    /// Where writes for `link` actually land.
    #[must_use]
    pub fn effective_target(&self, link: &Link) -> PathBuf {
        self.mode.rebase(link.to(), &self.home)
    }

    /// Check the preconditions for applying `link`.
    ///
    /// The containment check runs against the declared target, before any
    /// rebasing, so simulated runs reject the same links real runs would.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] if the source does not exist
    /// or the target is not inside the home directory.
    pub fn validate(&self, link: &Link) -> Result<()> {
        if !fs::entry_exists(link.from()) {
            return Err(EngineError::Configuration(format!(
                "source for '{}' does not exist: {}",
                link.name(),
                link.from().display()
            )));
        }
        self.check_containment(link)?;
        if link.action() == LinkAction::Link
            && link::diff_paths(LinkAction::Link, link.from(), link.to())
                .is_ok_and(|d| d.action == DiffAction::NoChange)
        {
            tracing::warn!(
                "{} already links to {}",
                link.to().display(),
                link.from().display()
            );
        }
        Ok(())
    }

    /// Reject `link` unless its declared target is strictly inside home.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] naming the link.
    pub fn check_containment(&self, link: &Link) -> Result<()> {
        if self.is_inside_home(link.to()) {
            return Ok(());
        }
        Err(EngineError::Configuration(format!(
            "target for '{}' is outside the home directory: {}",
            link.name(),
            link.to().display()
        )))
    }

    /// Place `link` at its target, backing up whatever was there.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or any filesystem step fails.
    pub fn apply(&self, link: &Link) -> Result<LinkMetadata> {
        self.validate(link)?;
        let target = self.effective_target(link);

        fs::ensure_parent_dir(&target)?;
        backup::backup_existing_target(&target)?;

        let checksum = match link.action() {
            LinkAction::Link => {
                fs::create_symlink(link.from(), &target)?;
                None
            }
            LinkAction::Copy => {
                fs::copy_recursive(link.from(), &target)?;
                Some(fs::content_digest(&target)?)
            }
        };
        tracing::debug!(
            "{} {} -> {}",
            link.action(),
            target.display(),
            link.from().display()
        );

        Ok(self.metadata(link, target, checksum))
    }

    /// Remove the placement of `link`, backing up real content first.
    ///
    /// Returns `None` when nothing exists at the target, including when
    /// the target was never placed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] for a target outside home,
    /// or an error if the target cannot be backed up or removed.
    pub fn remove(&self, link: &Link) -> Result<Option<LinkMetadata>> {
        self.check_containment(link)?;
        let target = self.effective_target(link);
        if !fs::entry_exists(&target) {
            return Ok(None);
        }
        // A symlink is deleted outright; anything else is moved aside, which
        // also takes it out of the target path.
        backup::backup_existing_target(&target)?;
        tracing::debug!("removed {}", target.display());
        Ok(Some(self.metadata(link, target, None)))
    }

    /// Reconciliation needed for `link` at its effective target.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] for a target outside home,
    /// or an error if the target cannot be inspected.
    pub fn diff(&self, link: &Link) -> Result<LinkDiff> {
        self.check_containment(link)?;
        link::diff_paths(link.action(), link.from(), &self.effective_target(link))
    }

    /// See [`backup::backup_existing_target`].
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be removed or renamed.
    pub fn backup_existing_target(&self, path: &Path) -> Result<Option<PathBuf>> {
        backup::backup_existing_target(path)
    }

    fn metadata(&self, link: &Link, target: PathBuf, checksum: Option<String>) -> LinkMetadata {
        LinkMetadata {
            name: link.name().to_string(),
            source: link.from().to_path_buf(),
            target,
            kind: link.action(),
            timestamp: Utc::now(),
            checksum,
        }
    }

    fn is_inside_home(&self, to: &Path) -> bool {
        paths::is_inside(&self.home, to)
    }
}
