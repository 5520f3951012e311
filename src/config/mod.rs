//! Desired-state configuration loaded from TOML.
//!
//! ```toml
//! keep_checkpoints = 10
//!
//! [package_managers.homebrew]
//! taps = ["homebrew/cask-fonts"]
//! install = ["ripgrep"]
//!
//! [programs.git]
//! user_name = "Ada"
//!
//! [dotfiles]
//! source_dir = "~/dotfiles"
//!
//! [[dotfiles.links]]
//! name = "nvim"
//! to = "~/.config/nvim"
//! ```
pub mod toml_loader;
pub mod validation;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::adapters::Registry;
use crate::dotfiles::{Link, LinkAction};
use crate::error::{EngineError, Result};
use crate::paths;
use crate::state::ProgramOptions;
use crate::state::manager::DEFAULT_KEEP_CHECKPOINTS;

/// Source directory used when `[dotfiles] source_dir` is omitted.
pub const DEFAULT_SOURCE_DIR: &str = "~/.dotfiles";

/// Packages requested from one package manager.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageManagerConfig {
    /// Third-party repositories (`user/repo`); requires tap support.
    #[serde(default)]
    pub taps: Vec<String>,
    /// Packages to install.
    #[serde(default)]
    pub install: Vec<String>,
    /// Casks to install; requires tap support.
    #[serde(default)]
    pub casks: Vec<String>,
    /// Packages to remove.
    #[serde(default)]
    pub uninstall: Vec<String>,
}

/// One declared dotfile placement, before path expansion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkDecl {
    /// Unique name; also the default source file under `source_dir`.
    pub name: String,
    /// Target path; `~` expands to the home directory.
    pub to: String,
    /// Placement action.
    #[serde(default)]
    pub action: LinkAction,
    /// Source path; relative paths resolve against `source_dir`.
    #[serde(default)]
    pub from: Option<String>,
}

/// The `[dotfiles]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DotfilesConfig {
    /// Directory holding dotfile sources.
    #[serde(default)]
    pub source_dir: Option<String>,
    /// Ordered placements.
    #[serde(default)]
    pub links: Vec<LinkDecl>,
}

/// Complete desired state.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Override for the state directory.
    #[serde(default)]
    pub state_dir: Option<String>,
    /// Checkpoints retained after each apply.
    #[serde(default)]
    pub keep_checkpoints: Option<usize>,
    /// Per-manager package lists, keyed by registry name.
    #[serde(default)]
    pub package_managers: BTreeMap<String, PackageManagerConfig>,
    /// Per-program options, keyed by registry name.
    #[serde(default)]
    pub programs: BTreeMap<String, ProgramOptions>,
    /// Dotfile placements.
    #[serde(default)]
    pub dotfiles: DotfilesConfig,
}

impl Config {
    /// Load a config file; a missing file yields the empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    /// for this schema.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        toml_loader::load_config(path)
    }

    /// Parse config text.
    ///
    /// # Errors
    ///
    /// Returns an error if `text` is not valid TOML for this schema.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml_loader::parse(text)
    }

    /// Check the whole config against the adapters in `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] listing every problem found.
    pub fn validate(&self, registry: &Registry) -> Result<()> {
        let issues = validation::validate_all(self, registry);
        if issues.is_empty() {
            return Ok(());
        }
        let rendered: Vec<String> = issues.iter().map(ToString::to_string).collect();
        Err(EngineError::Validation(rendered.join("; ")))
    }

    /// Source directory with `~` expanded.
    #[must_use]
    pub fn source_dir(&self, home: &Path) -> PathBuf {
        let raw = self
            .dotfiles
            .source_dir
            .as_deref()
            .unwrap_or(DEFAULT_SOURCE_DIR);
        paths::expand(raw, home, home)
    }

    /// Expanded state directory override, if any.
    #[must_use]
    pub fn state_dir(&self, home: &Path) -> Option<PathBuf> {
        self.state_dir
            .as_deref()
            .map(|raw| paths::expand(raw, home, home))
    }

    /// Checkpoint retention, defaulting to [`DEFAULT_KEEP_CHECKPOINTS`].
    #[must_use]
    pub fn keep_checkpoints(&self) -> usize {
        self.keep_checkpoints.unwrap_or(DEFAULT_KEEP_CHECKPOINTS)
    }

    /// Build the declared links in order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for an empty name or target.
    pub fn links(&self, home: &Path) -> Result<Vec<Link>> {
        let source_dir = self.source_dir(home);
        self.dotfiles
            .links
            .iter()
            .map(|decl| {
                Link::new(
                    &decl.name,
                    decl.action,
                    decl.from.as_deref(),
                    &decl.to,
                    &source_dir,
                    home,
                )
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
keep_checkpoints = 3

[package_managers.homebrew]
taps = ["homebrew/cask-fonts"]
install = ["ripgrep", "neovim"]
casks = ["wezterm"]
uninstall = ["vim"]

[programs.git]
user_name = "Ada"
aliases = { st = "status" }

[dotfiles]
source_dir = "~/dotfiles"

[[dotfiles.links]]
name = "nvim"
to = "~/.config/nvim"

[[dotfiles.links]]
name = "gitconfig"
to = "~/.gitconfig"
action = "copy"
from = "git/config"
"#;

    #[test]
    fn parses_full_example() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.keep_checkpoints(), 3);
        assert_eq!(
            config.package_managers["homebrew"].install,
            ["ripgrep", "neovim"]
        );
        assert_eq!(config.programs["git"]["user_name"], "Ada");
        assert_eq!(config.dotfiles.links[1].action, LinkAction::Copy);
    }

    #[test]
    fn links_expand_against_source_and_home() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        let links = config.links(Path::new("/home/ada")).unwrap();
        assert_eq!(links[0].from(), Path::new("/home/ada/dotfiles/nvim"));
        assert_eq!(links[0].to(), Path::new("/home/ada/.config/nvim"));
        assert_eq!(links[1].from(), Path::new("/home/ada/dotfiles/git/config"));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.keep_checkpoints(), DEFAULT_KEEP_CHECKPOINTS);
        assert_eq!(
            config.source_dir(Path::new("/home/ada")),
            PathBuf::from("/home/ada/.dotfiles")
        );
        assert!(config.state_dir(Path::new("/home/ada")).is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_toml_str("colour = \"blue\"").is_err());
        assert!(Config::from_toml_str("[package_managers.homebrew]\ninstal = []").is_err());
    }

    #[test]
    fn unknown_action_is_rejected() {
        let text = "[[dotfiles.links]]\nname = \"a\"\nto = \"~/a\"\naction = \"hardlink\"\n";
        assert!(Config::from_toml_str(text).is_err());
    }
}
