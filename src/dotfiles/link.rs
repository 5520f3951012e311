//! Link declarations and the side-effect-free reconciliation diff.
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::paths;

/// How a dotfile is placed at its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkAction {
    /// Symlink the target to the source.
    #[default]
    Link,
    /// Copy the source (recursively for directories) to the target.
    Copy,
}

impl fmt::Display for LinkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link => write!(f, "link"),
            Self::Copy => write!(f, "copy"),
        }
    }
}

/// A single desired dotfile placement with fully expanded paths.
///
/// Construct with [`Link::new`]; the value is immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    name: String,
    action: LinkAction,
    from: PathBuf,
    to: PathBuf,
}

impl Link {
    /// Build a link, expanding `~` and relative segments.
    ///
    /// `from` defaults to `<source_dir>/<name>`; a relative `from` resolves
    /// against `source_dir` and a relative `to` against `home`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] if `name` or `to` is empty.
    pub fn new(
        name: &str,
        action: LinkAction,
        from: Option<&str>,
        to: &str,
        source_dir: &Path,
        home: &Path,
    ) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(EngineError::Validation("link name is empty".to_string()));
        }
        if to.trim().is_empty() {
            return Err(EngineError::Validation(format!(
                "link '{name}' has an empty target"
            )));
        }
        let from = paths::expand(from.unwrap_or(name), source_dir, home);
        let to = paths::expand(to, home, home);
        Ok(Self {
            name: name.to_string(),
            action,
            from,
            to,
        })
    }

    /// Declared name, used as the key in recorded state.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Desired placement action.
    #[must_use]
    pub const fn action(&self) -> LinkAction {
        self.action
    }

    /// Absolute source path.
    #[must_use]
    pub fn from(&self) -> &Path {
        &self.from
    }

    /// Absolute target path.
    #[must_use]
    pub fn to(&self) -> &Path {
        &self.to
    }

    /// Classify the reconciliation needed at [`Link::to`].
    ///
    /// # Errors
    ///
    /// Returns an error if the target or source cannot be read.
    pub fn diff(&self) -> Result<LinkDiff> {
        diff_paths(self.action, &self.from, &self.to)
    }
}

/// Outcome of an applied link, persisted into state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkMetadata {
    /// Link name.
    pub name: String,
    /// Source path.
    pub source: PathBuf,
    /// Target path as written (rebased in simulated mode).
    pub target: PathBuf,
    /// Placement action.
    #[serde(rename = "type")]
    pub kind: LinkAction,
    /// When the link was applied.
    pub timestamp: DateTime<Utc>,
    /// SHA-256 of the copied content; absent for symlinks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// Reconciliation action for one link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffAction {
    /// Nothing exists at the target yet.
    Create,
    /// The target already matches.
    NoChange,
    /// A copied target exists with different content.
    Update,
    /// The target exists but is the wrong kind of entry.
    Replace,
}

impl fmt::Display for DiffAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::NoChange => write!(f, "no_change"),
            Self::Update => write!(f, "update"),
            Self::Replace => write!(f, "replace"),
        }
    }
}

/// Action plus a short human-readable reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinkDiff {
    /// What reconciliation would do.
    pub action: DiffAction,
    /// Why.
    pub reason: &'static str,
}

impl LinkDiff {
    const fn new(action: DiffAction, reason: &'static str) -> Self {
        Self { action, reason }
    }

    /// Whether applying would touch the filesystem.
    #[must_use]
    pub const fn is_change(&self) -> bool {
        !matches!(self.action, DiffAction::NoChange)
    }
}

/// Classify how `to` must change to become a `action` placement of `from`.
///
/// Never mutates the filesystem.
///
/// # Errors
///
/// Returns an error if the symlink at `to` cannot be read or file contents
/// cannot be compared.
pub fn diff_paths(action: LinkAction, from: &Path, to: &Path) -> Result<LinkDiff> {
    let Ok(meta) = std::fs::symlink_metadata(to) else {
        return Ok(LinkDiff::new(DiffAction::Create, "target does not exist"));
    };

    if meta.file_type().is_symlink() {
        if action == LinkAction::Link {
            let existing = std::fs::read_link(to).map_err(|e| EngineError::io(to, e))?;
            if symlink_resolves_to(to, &existing, from) {
                return Ok(LinkDiff::new(DiffAction::NoChange, "already correct"));
            }
        }
        return Ok(LinkDiff::new(DiffAction::Replace, "type mismatch"));
    }

    if action == LinkAction::Copy {
        let same = contents_match(from, to).map_err(|e| EngineError::io(to, e))?;
        return Ok(if same {
            LinkDiff::new(DiffAction::NoChange, "content matches")
        } else {
            LinkDiff::new(DiffAction::Update, "content differs")
        });
    }

    Ok(LinkDiff::new(DiffAction::Replace, "type mismatch"))
}

/// Whether the symlink at `link` (whose raw target is `existing`) points at `source`.
fn symlink_resolves_to(link: &Path, existing: &Path, source: &Path) -> bool {
    let resolved = if existing.is_absolute() {
        paths::normalize(existing)
    } else {
        let parent = link.parent().unwrap_or_else(|| Path::new("/"));
        paths::normalize(&parent.join(existing))
    };
    if paths_equal(&resolved, source) {
        return true;
    }
    match (dunce::canonicalize(&resolved), dunce::canonicalize(source)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Compare two paths, normalising the `\\?\` prefix Windows adds to
/// extended-length paths returned by `read_link`.
fn paths_equal(a: &Path, b: &Path) -> bool {
    let strip = |p: &Path| -> PathBuf {
        let s = p.to_string_lossy();
        s.strip_prefix(r"\\?\")
            .map_or_else(|| p.to_path_buf(), PathBuf::from)
    };
    strip(a) == strip(b)
}

/// Byte-for-byte comparison of two files or two directory trees.
///
/// Directories match when they hold the same entry names, each pair of
/// entries is the same kind, and files have identical bytes.
fn contents_match(a: &Path, b: &Path) -> io::Result<bool> {
    let (meta_a, meta_b) = match (std::fs::metadata(a), std::fs::metadata(b)) {
        (Ok(x), Ok(y)) => (x, y),
        (Err(e), _) | (_, Err(e)) if e.kind() != io::ErrorKind::NotFound => return Err(e),
        _ => return Ok(false),
    };

    if meta_a.is_dir() != meta_b.is_dir() {
        return Ok(false);
    }

    if meta_a.is_dir() {
        let names_a = sorted_entries(a)?;
        let names_b = sorted_entries(b)?;
        if names_a != names_b {
            return Ok(false);
        }
        for name in &names_a {
            if !contents_match(&a.join(name), &b.join(name))? {
                return Ok(false);
            }
        }
        return Ok(true);
    }

    if meta_a.len() != meta_b.len() {
        return Ok(false);
    }
    Ok(std::fs::read(a)? == std::fs::read(b)?)
}

fn sorted_entries(dir: &Path) -> io::Result<Vec<std::ffi::OsString>> {
    let mut names = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name()))
        .collect::<io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}
