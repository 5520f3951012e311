//! Timestamped snapshots of [`State`] under `<state_dir>/checkpoints/`.
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::{State, read_json, write_json_atomic};
use crate::error::{EngineError, Result};

/// Checkpoint id format; lexicographic order is chronological order.
pub const CHECKPOINT_ID_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Checkpoint id for a snapshot taken at `at`.
#[must_use]
pub fn new_checkpoint_id(at: DateTime<Utc>) -> String {
    at.format(CHECKPOINT_ID_FORMAT).to_string()
}

/// Directory of `<id>.json` state snapshots.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Store rooted at `dir` (created lazily on first write).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the snapshots.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Snapshot `state` under an id derived from the current time.
    ///
    /// A second write within the same second reuses the id and replaces
    /// the earlier snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    pub fn write(&self, state: &State) -> Result<String> {
        let id = new_checkpoint_id(Utc::now());
        self.write_with_id(&id, state)?;
        Ok(id)
    }

    /// Snapshot `state` under an explicit id.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] for an id that is not a plain
    /// file stem, or an error if the snapshot cannot be written.
    pub fn write_with_id(&self, id: &str, state: &State) -> Result<()> {
        let path = self.path_for(id)?;
        write_json_atomic(&path, state)?;
        tracing::debug!("wrote checkpoint {id}");
        Ok(())
    }

    /// Load the snapshot `id`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] if no such checkpoint exists.
    pub fn read(&self, id: &str) -> Result<State> {
        let path = self.path_for(id)?;
        if !path.is_file() {
            return Err(EngineError::NotFound(format!("checkpoint '{id}'")));
        }
        read_json(&path)
    }

    /// Whether a snapshot `id` exists.
    #[must_use]
    pub fn exists(&self, id: &str) -> bool {
        self.path_for(id).is_ok_and(|p| p.is_file())
    }

    /// All checkpoint ids, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be read.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(EngineError::io(&self.dir, e)),
        };
        let mut ids = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| EngineError::io(&self.dir, e))?.path();
            if path.extension().is_some_and(|ext| ext == "json")
                && let Some(stem) = path.file_stem()
            {
                ids.push(stem.to_string_lossy().into_owned());
            }
        }
        ids.sort_unstable_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    /// Delete all but the `keep` newest snapshots.
    ///
    /// Returns the deleted ids, oldest last.
    ///
    /// # Errors
    ///
    /// Returns an error if a snapshot cannot be deleted.
    pub fn retain(&self, keep: usize) -> Result<Vec<String>> {
        let stale: Vec<String> = self.list()?.into_iter().skip(keep).collect();
        for id in &stale {
            let path = self.path_for(id)?;
            std::fs::remove_file(&path).map_err(|e| EngineError::io(&path, e))?;
            tracing::debug!("deleted checkpoint {id}");
        }
        Ok(stale)
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(EngineError::Validation(format!(
                "invalid checkpoint id '{id}'"
            )));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }
}
