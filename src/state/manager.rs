//! Owner of the in-memory [`State`] and its on-disk persistence.
use std::path::{Path, PathBuf};

use super::{CheckpointStore, State, StateSummary, read_json, write_json_atomic};
use crate::error::{EngineError, Result};

/// Checkpoints kept after an apply unless configured otherwise.
pub const DEFAULT_KEEP_CHECKPOINTS: usize = 10;

const STATE_FILE: &str = "state.json";
const CHECKPOINT_DIR: &str = "checkpoints";

/// Loads, mutates, saves and snapshots the engine [`State`].
///
/// Layout under `state_dir`:
///
/// ```text
/// state.json
/// checkpoints/<id>.json
/// ```
#[derive(Debug)]
pub struct StateManager {
    state_dir: PathBuf,
    state: State,
    checkpoints: CheckpointStore,
}

impl StateManager {
    /// Open `state_dir`, loading `state.json` when present.
    ///
    /// A corrupt `state.json` is logged and replaced by a default state in
    /// memory; the file itself is only overwritten on the next save.
    ///
    /// # Errors
    ///
    /// Returns an error if `state.json` exists but cannot be read.
    pub fn new(state_dir: impl Into<PathBuf>) -> Result<Self> {
        let state_dir = state_dir.into();
        let path = state_dir.join(STATE_FILE);
        let state = if path.exists() {
            match read_json::<State>(&path) {
                Ok(state) => state,
                Err(EngineError::Serialization { source, .. }) => {
                    tracing::warn!(
                        "ignoring corrupt state file {}: {source}",
                        path.display()
                    );
                    State::default()
                }
                Err(e) => return Err(e),
            }
        } else {
            State::default()
        };
        let checkpoints = CheckpointStore::new(state_dir.join(CHECKPOINT_DIR));
        Ok(Self {
            state_dir,
            state,
            checkpoints,
        })
    }

    /// Directory holding `state.json` and `checkpoints/`.
    #[must_use]
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Path of `state.json`.
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.state_dir.join(STATE_FILE)
    }

    /// Current in-memory state.
    #[must_use]
    pub const fn state(&self) -> &State {
        &self.state
    }

    /// Mutable in-memory state; persisted by [`StateManager::save_state`].
    pub const fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    /// Underlying checkpoint store.
    #[must_use]
    pub const fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    /// Snapshot the current state and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    pub fn create_checkpoint(&self) -> Result<String> {
        self.checkpoints.write(&self.state)
    }

    /// Replace the in-memory state with checkpoint `id` and save it.
    ///
    /// Only recorded state is restored; files, links and packages on disk
    /// are left as they are.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for an unknown id, or an error if
    /// the checkpoint cannot be read or the state cannot be saved.
    pub fn rollback_to(&mut self, id: &str) -> Result<()> {
        self.state = self.checkpoints.read(id)?;
        self.save_state()?;
        tracing::info!("rolled back state to checkpoint {id}");
        Ok(())
    }

    /// Persist the in-memory state to `state.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_state(&self) -> Result<()> {
        write_json_atomic(&self.state_path(), &self.state)
    }

    /// Checkpoint ids, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint directory cannot be read.
    pub fn list_checkpoints(&self) -> Result<Vec<String>> {
        self.checkpoints.list()
    }

    /// Load a checkpoint without making it current.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for an unknown id.
    pub fn load_checkpoint(&self, id: &str) -> Result<State> {
        self.checkpoints.read(id)
    }

    /// Keep the `keep` newest checkpoints and delete the rest.
    ///
    /// # Errors
    ///
    /// Returns an error if a checkpoint cannot be deleted.
    pub fn cleanup_checkpoints(&self, keep: usize) -> Result<Vec<String>> {
        self.checkpoints.retain(keep)
    }

    /// Summary of the current state.
    #[must_use]
    pub fn state_summary(&self) -> StateSummary {
        self.state.summary()
    }
}
