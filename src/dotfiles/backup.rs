//! Backups taken before any destructive overwrite of a target.
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::fs;
use crate::error::{EngineError, Result};

/// Timestamp format of the `.backup_<ts>` suffix (second granularity).
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// `<target>.backup_<timestamp>` for a backup taken at `at`.
#[must_use]
pub fn backup_path(target: &Path, at: DateTime<Utc>) -> PathBuf {
    let mut name = target
        .file_name()
        .map_or_else(OsString::new, ToOwned::to_owned);
    name.push(format!(".backup_{}", at.format(BACKUP_TIMESTAMP_FORMAT)));
    target.with_file_name(name)
}

/// Clear `target` ahead of a write, preserving real content.
///
/// A symlink carries nothing worth keeping and is simply removed.  A real
/// file or directory is moved to [`backup_path`].  Two backups of the same
/// target within one second share a name and the later one wins.
///
/// Returns the backup location, or `None` when nothing was moved.
///
/// # Errors
///
/// Returns an error if the entry cannot be removed or renamed.
pub fn backup_existing_target(target: &Path) -> Result<Option<PathBuf>> {
    if !fs::entry_exists(target) {
        return Ok(None);
    }
    if fs::is_symlink(target) {
        fs::remove_entry(target)?;
        tracing::debug!("removed existing symlink {}", target.display());
        return Ok(None);
    }

    let backup = backup_path(target, Utc::now());
    // Same-second collision: the newer backup replaces the older one.
    fs::remove_entry(&backup)?;
    std::fs::rename(target, &backup).map_err(|e| EngineError::io(target, e))?;
    tracing::info!("backed up {} to {}", target.display(), backup.display());
    Ok(Some(backup))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    #[test]
    fn backup_path_appends_timestamp_suffix() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            backup_path(Path::new("/home/ada/.zshrc"), at),
            PathBuf::from("/home/ada/.zshrc.backup_20240309_140507")
        );
    }

    #[test]
    fn missing_target_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            backup_existing_target(&dir.path().join("absent")).unwrap(),
            None
        );
    }

    #[test]
    fn regular_file_is_moved_aside() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("gitconfig");
        std::fs::write(&target, "old").unwrap();

        let backup = backup_existing_target(&target).unwrap().unwrap();

        assert!(!target.exists());
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "old");
        assert!(
            backup
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("gitconfig.backup_")
        );
    }

    #[test]
    fn directory_is_moved_aside_whole() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nvim");
        std::fs::create_dir_all(target.join("lua")).unwrap();
        std::fs::write(target.join("lua").join("a.lua"), "a").unwrap();

        let backup = backup_existing_target(&target).unwrap().unwrap();

        assert!(!target.exists());
        assert_eq!(
            std::fs::read_to_string(backup.join("lua").join("a.lua")).unwrap(),
            "a"
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlink_is_removed_without_backup() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        let target = dir.path().join("target");
        std::fs::write(&source, "keep").unwrap();
        std::os::unix::fs::symlink(&source, &target).unwrap();

        assert_eq!(backup_existing_target(&target).unwrap(), None);
        assert!(!fs::entry_exists(&target));
        assert_eq!(std::fs::read_to_string(&source).unwrap(), "keep");
    }
}
