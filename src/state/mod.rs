//! Persistent record of what the engine has installed, configured and linked.
//!
//! The same JSON schema is used for `state.json` and for every checkpoint:
//!
//! ```text
//! {
//!   "version": "1.0",
//!   "created_at": "...",
//!   "last_updated": "..." | null,
//!   "package_managers": { "<manager>": ["<package>", ...] },
//!   "programs": { "<program>": { "last_configured": "...", "configuration": {...} } },
//!   "dotfiles": { "<name>": { "name", "source", "target", "type", "timestamp", "last_updated" } }
//! }
//! ```
pub mod checkpoint;
pub mod manager;

use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use checkpoint::CheckpointStore;
pub use manager::StateManager;

use crate::dotfiles::LinkMetadata;
use crate::error::{EngineError, Result};

/// Schema version written into new state files.
pub const STATE_VERSION: &str = "1.0";

/// Free-form options handed to a program handler.
pub type ProgramOptions = BTreeMap<String, serde_json::Value>;

/// Recorded configuration of one program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramRecord {
    /// When the handler last ran.
    pub last_configured: DateTime<Utc>,
    /// Options the handler was given.
    pub configuration: ProgramOptions,
}

/// Recorded placement of one dotfile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DotfileRecord {
    /// Outcome of the apply.
    #[serde(flatten)]
    pub link: LinkMetadata,
    /// When this record was last written.
    pub last_updated: DateTime<Utc>,
}

/// Everything the engine has done, as last committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Schema version.
    #[serde(default = "default_version", deserialize_with = "non_empty_version")]
    pub version: String,
    /// When this state was first created.
    pub created_at: DateTime<Utc>,
    /// When anything was last recorded.
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    /// Installed packages per manager, in install order.
    #[serde(default)]
    pub package_managers: BTreeMap<String, Vec<String>>,
    /// Configured programs.
    #[serde(default)]
    pub programs: BTreeMap<String, ProgramRecord>,
    /// Placed dotfiles.
    #[serde(default)]
    pub dotfiles: BTreeMap<String, DotfileRecord>,
}

fn default_version() -> String {
    STATE_VERSION.to_string()
}

/// A blank `version` reads as [`STATE_VERSION`].
fn non_empty_version<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let version = String::deserialize(deserializer)?;
    if version.trim().is_empty() {
        return Ok(default_version());
    }
    Ok(version)
}

impl Default for State {
    fn default() -> Self {
        Self {
            version: default_version(),
            created_at: Utc::now(),
            last_updated: None,
            package_managers: BTreeMap::new(),
            programs: BTreeMap::new(),
            dotfiles: BTreeMap::new(),
        }
    }
}

/// Counts and timestamps shown by `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSummary {
    /// Schema version.
    pub version: String,
    /// When the state was created.
    pub created_at: DateTime<Utc>,
    /// When anything was last recorded.
    pub last_updated: Option<DateTime<Utc>>,
    /// Package count per manager.
    pub packages: BTreeMap<String, usize>,
    /// Number of configured programs.
    pub programs: usize,
    /// Number of placed dotfiles.
    pub dotfiles: usize,
}

impl State {
    /// Record `names` as installed by `manager`, skipping duplicates.
    ///
    /// Returns the names that were newly added.
    pub fn add_packages(&mut self, manager: &str, names: &[String]) -> Vec<String> {
        let list = self.package_managers.entry(manager.to_string()).or_default();
        let mut added = Vec::new();
        for name in names {
            if !list.contains(name) {
                list.push(name.clone());
                added.push(name.clone());
            }
        }
        if list.is_empty() {
            self.package_managers.remove(manager);
        }
        if !added.is_empty() {
            self.touch();
        }
        added
    }

    /// Forget `names` for `manager`; drops the manager once empty.
    ///
    /// Returns the names that were actually removed.
    pub fn remove_packages(&mut self, manager: &str, names: &[String]) -> Vec<String> {
        let Some(list) = self.package_managers.get_mut(manager) else {
            return Vec::new();
        };
        let mut removed = Vec::new();
        list.retain(|p| {
            let drop = names.contains(p);
            if drop {
                removed.push(p.clone());
            }
            !drop
        });
        if list.is_empty() {
            self.package_managers.remove(manager);
        }
        if !removed.is_empty() {
            self.touch();
        }
        removed
    }

    /// Record that `name` was configured with `configuration`.
    pub fn record_program(&mut self, name: &str, configuration: ProgramOptions) {
        let now = Utc::now();
        self.programs.insert(
            name.to_string(),
            ProgramRecord {
                last_configured: now,
                configuration,
            },
        );
        self.last_updated = Some(now);
    }

    /// Record the outcome of applying a link.
    pub fn record_dotfile(&mut self, metadata: LinkMetadata) {
        let now = Utc::now();
        self.dotfiles.insert(
            metadata.name.clone(),
            DotfileRecord {
                link: metadata,
                last_updated: now,
            },
        );
        self.last_updated = Some(now);
    }

    /// Forget a placed dotfile.
    pub fn remove_dotfile(&mut self, name: &str) -> Option<DotfileRecord> {
        let removed = self.dotfiles.remove(name);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    /// Whether `manager` is recorded as having installed `package`.
    #[must_use]
    pub fn has_package(&self, manager: &str, package: &str) -> bool {
        self.package_managers
            .get(manager)
            .is_some_and(|list| list.iter().any(|p| p == package))
    }

    /// Counts and timestamps for display.
    #[must_use]
    pub fn summary(&self) -> StateSummary {
        StateSummary {
            version: self.version.clone(),
            created_at: self.created_at,
            last_updated: self.last_updated,
            packages: self
                .package_managers
                .iter()
                .map(|(name, list)| (name.clone(), list.len()))
                .collect(),
            programs: self.programs.len(),
            dotfiles: self.dotfiles.len(),
        }
    }

    fn touch(&mut self) {
        self.last_updated = Some(Utc::now());
    }
}

/// Serialize `value` as pretty JSON to `path` through a temp file and rename.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value).map_err(|source| EngineError::Serialization {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
    }
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    {
        let mut file = std::fs::File::create(&tmp).map_err(|e| EngineError::io(&tmp, e))?;
        file.write_all(&json)
            .and_then(|()| file.write_all(b"\n"))
            .and_then(|()| file.sync_all())
            .map_err(|e| EngineError::io(&tmp, e))?;
    }
    std::fs::rename(&tmp, path).map_err(|e| EngineError::io(path, e))
}

/// Read and decode a JSON file.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path).map_err(|e| EngineError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|source| EngineError::Serialization {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dotfiles::LinkAction;
    use std::path::PathBuf;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    fn metadata(name: &str) -> LinkMetadata {
        LinkMetadata {
            name: name.to_string(),
            source: PathBuf::from("/src").join(name),
            target: PathBuf::from("/home/ada").join(name),
            kind: LinkAction::Link,
            timestamp: Utc::now(),
            checksum: None,
        }
    }

    #[test]
    fn default_state_is_empty_and_versioned() {
        let state = State::default();
        assert_eq!(state.version, STATE_VERSION);
        assert!(state.last_updated.is_none());
        assert!(state.package_managers.is_empty());
    }

    #[test]
    fn blank_version_reads_as_current() {
        let state: State = serde_json::from_str(
            r#"{"version": "  ", "created_at": "2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(state.version, STATE_VERSION);

        let state: State =
            serde_json::from_str(r#"{"version": "0.9", "created_at": "2024-01-01T00:00:00Z"}"#)
                .unwrap();
        assert_eq!(state.version, "0.9");
    }

    #[test]
    fn add_packages_dedupes_and_preserves_order() {
        let mut state = State::default();
        state.add_packages("homebrew", &names(&["ripgrep", "fd"]));
        let added = state.add_packages("homebrew", &names(&["fd", "bat", "bat"]));
        assert_eq!(added, names(&["bat"]));
        assert_eq!(
            state.package_managers["homebrew"],
            names(&["ripgrep", "fd", "bat"])
        );
        assert!(state.last_updated.is_some());
    }

    #[test]
    fn add_no_new_packages_leaves_timestamp() {
        let mut state = State::default();
        state.add_packages("homebrew", &[]);
        assert!(state.last_updated.is_none());
        assert!(state.package_managers.is_empty());
    }

    #[test]
    fn remove_packages_drops_empty_manager() {
        let mut state = State::default();
        state.add_packages("homebrew", &names(&["vim"]));
        let removed = state.remove_packages("homebrew", &names(&["vim", "emacs"]));
        assert_eq!(removed, names(&["vim"]));
        assert!(!state.package_managers.contains_key("homebrew"));
    }

    #[test]
    fn record_and_remove_dotfile() {
        let mut state = State::default();
        state.record_dotfile(metadata("zshrc"));
        assert!(state.dotfiles.contains_key("zshrc"));
        assert!(state.remove_dotfile("zshrc").is_some());
        assert!(state.remove_dotfile("zshrc").is_none());
    }

    #[test]
    fn summary_counts_entries() {
        let mut state = State::default();
        state.add_packages("homebrew", &names(&["a", "b"]));
        state.record_program("git", ProgramOptions::new());
        state.record_dotfile(metadata("zshrc"));
        let summary = state.summary();
        assert_eq!(summary.packages["homebrew"], 2);
        assert_eq!(summary.programs, 1);
        assert_eq!(summary.dotfiles, 1);
    }

    #[test]
    fn dotfile_record_serializes_flat_with_type_key() {
        let mut state = State::default();
        state.record_dotfile(metadata("zshrc"));
        let json = serde_json::to_value(&state).unwrap();
        let record = &json["dotfiles"]["zshrc"];
        assert_eq!(record["type"], "link");
        assert_eq!(record["name"], "zshrc");
        assert!(record.get("last_updated").is_some());
        assert!(record.get("checksum").is_none());
    }

    #[test]
    fn atomic_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let mut state = State::default();
        state.add_packages("homebrew", &names(&["jq"]));

        write_json_atomic(&path, &state).unwrap();
        let loaded: State = read_json(&path).unwrap();

        assert_eq!(loaded, state);
        assert!(!path.with_file_name("state.json.tmp").exists());
    }

    #[test]
    fn read_json_reports_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = read_json::<State>(&path).unwrap_err();
        assert!(matches!(err, EngineError::Serialization { .. }));
    }
}
