//! Filesystem primitives used by the dotfiles manager.
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{EngineError, Result};

/// Ensure the parent directory of `path` exists.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
    }
    Ok(())
}

/// Whether anything, including a dangling symlink, exists at `path`.
#[must_use]
pub fn entry_exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Whether `path` is a symlink (dangling or not).
#[must_use]
pub fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata()
        .is_ok_and(|m| m.file_type().is_symlink())
}

/// Copy `src` to `dst`, recursing into directories.
///
/// Symlinks inside the source tree are followed, so their content is
/// materialised rather than the link itself.
///
/// # Errors
///
/// Returns an error if any entry cannot be read or written.
pub fn copy_recursive(src: &Path, dst: &Path) -> Result<()> {
    if !src.is_dir() {
        std::fs::copy(src, dst).map_err(|e| EngineError::io(dst, e))?;
        return Ok(());
    }
    std::fs::create_dir_all(dst).map_err(|e| EngineError::io(dst, e))?;
    for entry in std::fs::read_dir(src).map_err(|e| EngineError::io(src, e))? {
        let entry = entry.map_err(|e| EngineError::io(src, e))?;
        copy_recursive(&entry.path(), &dst.join(entry.file_name()))?;
    }
    Ok(())
}

/// Remove whatever is at `path`: a symlink node, a file, or a directory tree.
///
/// Symlinks are never followed.  Does nothing if `path` does not exist.
///
/// # Errors
///
/// Returns an error if the entry exists but cannot be removed.
pub fn remove_entry(path: &Path) -> Result<()> {
    let Ok(meta) = std::fs::symlink_metadata(path) else {
        return Ok(());
    };
    let removed = if meta.file_type().is_symlink() {
        remove_symlink_node(path)
    } else if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    removed.map_err(|e| EngineError::io(path, e))
}

/// Remove a symlink node without touching what it points at.
///
/// Windows directory symlinks must go through `remove_dir`.
fn remove_symlink_node(path: &Path) -> io::Result<()> {
    #[cfg(windows)]
    {
        if path.is_dir() {
            return std::fs::remove_dir(path);
        }
    }
    std::fs::remove_file(path)
}

/// Create a symlink at `link` pointing to `target`.
///
/// # Errors
///
/// Returns an error if the link cannot be created.
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    #[cfg(unix)]
    let created = std::os::unix::fs::symlink(target, link);

    #[cfg(windows)]
    let created = if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    };

    created.map_err(|e| EngineError::io(link, e))
}

/// Lowercase hex SHA-256 over a file, or over a directory tree's relative
/// paths and file contents in sorted order.
///
/// # Errors
///
/// Returns an error if any entry cannot be read.
pub fn content_digest(path: &Path) -> Result<String> {
    use std::fmt::Write as _;

    let mut hasher = Sha256::new();
    hash_tree(&mut hasher, path, Path::new("")).map_err(|e| EngineError::io(path, e))?;
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for b in &digest {
        write!(hex, "{b:02x}").unwrap_or(());
    }
    Ok(hex)
}

fn hash_tree(hasher: &mut Sha256, path: &Path, relative: &Path) -> io::Result<()> {
    if path.is_dir() {
        let mut entries = std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect::<io::Result<Vec<_>>>()?;
        entries.sort();
        for name in entries {
            hash_tree(hasher, &path.join(&name), &relative.join(&name))?;
        }
    } else {
        hasher.update(relative.to_string_lossy().as_bytes());
        hasher.update(b"\0");
        hasher.update(std::fs::read(path)?);
    }
    Ok(())
}
