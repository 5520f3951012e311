//! Path expansion and the per-user default locations.
use std::path::{Component, Path, PathBuf};

use anyhow::Result;

/// Resolve the user's home directory from the environment.
///
/// # Errors
///
/// Returns an error if neither `HOME` nor (on Windows) `USERPROFILE` is set.
pub fn home_dir() -> Result<PathBuf> {
    let home = if cfg!(target_os = "windows") {
        std::env::var("USERPROFILE")
            .or_else(|_| std::env::var("HOME"))
            .map_err(|_| {
                anyhow::anyhow!("neither USERPROFILE nor HOME environment variable is set")
            })?
    } else {
        std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable is not set"))?
    };
    Ok(normalize(Path::new(&home)))
}

/// `$XDG_STATE_HOME/dotfiles`, falling back to `~/.local/state/dotfiles`.
#[must_use]
pub fn default_state_dir(home: &Path) -> PathBuf {
    xdg_dir("XDG_STATE_HOME", home, ".local/state").join("dotfiles")
}

/// `$XDG_CONFIG_HOME/dotfiles/config.toml`, falling back to
/// `~/.config/dotfiles/config.toml`.
#[must_use]
pub fn default_config_path(home: &Path) -> PathBuf {
    xdg_dir("XDG_CONFIG_HOME", home, ".config")
        .join("dotfiles")
        .join("config.toml")
}

fn xdg_dir(var: &str, home: &Path, fallback: &str) -> PathBuf {
    std::env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .map_or_else(|| home.join(fallback), PathBuf::from)
}

/// Expand `raw` into an absolute, lexically normalised path.
///
/// `~` and `~/…` resolve against `home`; other relative paths resolve
/// against `base`.  `.` and `..` segments are collapsed without touching
/// the filesystem.
///
/// # Examples
///
/// ```
/// use dotfiles_engine::paths::expand;
/// use std::path::{Path, PathBuf};
///
/// let home = Path::new("/home/ada");
/// assert_eq!(expand("~/.config/../.zshrc", home, home), PathBuf::from("/home/ada/.zshrc"));
/// assert_eq!(expand("nvim", Path::new("/src"), home), PathBuf::from("/src/nvim"));
/// ```
#[must_use]
pub fn expand(raw: &str, base: &Path, home: &Path) -> PathBuf {
    let expanded = if raw == "~" {
        home.to_path_buf()
    } else if let Some(rest) = raw.strip_prefix("~/") {
        home.join(rest)
    } else if Path::new(raw).is_absolute() {
        PathBuf::from(raw)
    } else {
        base.join(raw)
    };
    normalize(&expanded)
}

/// Collapse `.` and `..` segments lexically.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Whether `path` is strictly below `home`.
///
/// Checked lexically, then against the canonical form of the nearest
/// existing ancestor inside `home`, so a symlinked directory under home
/// cannot point the path elsewhere.
#[must_use]
pub fn is_inside(home: &Path, path: &Path) -> bool {
    if path == home || !path.starts_with(home) {
        return false;
    }
    let Some(ancestor) = path.parent().and_then(|p| {
        p.ancestors()
            .take_while(|a| a.starts_with(home))
            .find(|a| a.exists())
    }) else {
        return true;
    };
    let canonical_home = dunce::canonicalize(home).unwrap_or_else(|_| home.to_path_buf());
    dunce::canonicalize(ancestor).map_or(true, |c| c.starts_with(&canonical_home))
}
