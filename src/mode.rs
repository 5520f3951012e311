//! Where side effects land: the real filesystem or a scratch root.
use std::path::{Component, Path, PathBuf};

/// Execution mode passed to the dotfiles manager and adapters at construction.
///
/// In [`ExecutionMode::Simulated`] every write that would land under the
/// home directory is redirected into `root`, keeping the home-relative
/// layout, and package managers log instead of running commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Perform writes against the real filesystem.
    #[default]
    Real,
    /// Redirect writes into a scratch directory.
    Simulated {
        /// Scratch directory receiving all writes.
        root: PathBuf,
    },
}

impl ExecutionMode {
    /// Returns `true` for [`ExecutionMode::Simulated`].
    #[must_use]
    pub const fn is_simulated(&self) -> bool {
        matches!(self, Self::Simulated { .. })
    }

    /// Map `path` to the location a write should actually touch.
    ///
    /// Paths under `home` keep their home-relative suffix; any other
    /// absolute path is re-rooted with its prefix and root stripped.
    #[must_use]
    pub fn rebase(&self, path: &Path, home: &Path) -> PathBuf {
        match self {
            Self::Real => path.to_path_buf(),
            Self::Simulated { root } => {
                let relative = path.strip_prefix(home).unwrap_or(path);
                let tail: PathBuf = relative
                    .components()
                    .filter(|c| matches!(c, Component::Normal(_)))
                    .collect();
                root.join(tail)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_mode_leaves_paths_alone() {
        let mode = ExecutionMode::Real;
        let p = Path::new("/home/ada/.zshrc");
        assert_eq!(mode.rebase(p, Path::new("/home/ada")), p);
        assert!(!mode.is_simulated());
    }

    #[test]
    fn simulated_mode_keeps_home_relative_layout() {
        let mode = ExecutionMode::Simulated {
            root: PathBuf::from("/tmp/scratch"),
        };
        assert_eq!(
            mode.rebase(Path::new("/home/ada/.config/nvim"), Path::new("/home/ada")),
            PathBuf::from("/tmp/scratch/.config/nvim")
        );
        assert!(mode.is_simulated());
    }

    #[test]
    fn simulated_mode_reroots_paths_outside_home() {
        let mode = ExecutionMode::Simulated {
            root: PathBuf::from("/tmp/scratch"),
        };
        assert_eq!(
            mode.rebase(Path::new("/etc/hosts"), Path::new("/home/ada")),
            PathBuf::from("/tmp/scratch/etc/hosts")
        );
    }
}
