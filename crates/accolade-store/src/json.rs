// json.rs — JsonDirStore: directory-backed JSON persistence.
//
// Layout, one directory per achievable:
//
//   <root>/<achievable_id>/static.json
//   <root>/<achievable_id>/players/<player_hash>.json
//   <root>/<achievable_id>/completions/<player_hash>.json
//
// Player ids are host-defined strings with no filesystem guarantees, so
// file names are derived by hashing the id; the records inside carry the
// real id. The roster is not persisted: like MemoryStore, the host tells
// each instance who is currently present.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use accolade_core::{PlayerId, StateMap};

use crate::error::StoreError;
use crate::store::{CompletionRecord, StateStore};

/// A [`StateStore`] that keeps every state map and completion record as
/// an individual JSON file, easy to inspect and back up by hand.
pub struct JsonDirStore {
    root: PathBuf,
    roster: Mutex<Vec<PlayerId>>,
}

impl JsonDirStore {
    /// Create a store backed by the given directory, creating it if
    /// needed.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|source| StoreError::IoError {
            path: root.display().to_string(),
            source,
        })?;
        Ok(Self {
            root,
            roster: Mutex::new(Vec::new()),
        })
    }

    /// Add a player to the in-memory roster (no-op if already present).
    pub fn add_player(&self, player: impl Into<PlayerId>) {
        let player = player.into();
        let mut roster = self.roster();
        if !roster.contains(&player) {
            roster.push(player);
        }
    }

    /// Remove a player from the roster. Files on disk are untouched.
    pub fn remove_player(&self, player: &PlayerId) -> bool {
        let mut roster = self.roster();
        let before = roster.len();
        roster.retain(|p| p != player);
        roster.len() != before
    }

    fn roster(&self) -> MutexGuard<'_, Vec<PlayerId>> {
        self.roster.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn achievable_dir(&self, achievable: Uuid) -> PathBuf {
        self.root.join(achievable.to_string())
    }

    fn static_file(&self, achievable: Uuid) -> PathBuf {
        self.achievable_dir(achievable).join("static.json")
    }

    fn player_file(&self, achievable: Uuid, player: &PlayerId) -> PathBuf {
        self.achievable_dir(achievable)
            .join("players")
            .join(format!("{}.json", player_hash(player)))
    }

    fn completion_file(&self, achievable: Uuid, player: &PlayerId) -> PathBuf {
        self.achievable_dir(achievable)
            .join("completions")
            .join(format!("{}.json", player_hash(player)))
    }

    fn read_state(&self, path: &Path) -> Result<Option<StateMap>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(path).map_err(|source| StoreError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        let state: StateMap = serde_json::from_str(&json)?;
        Ok(Some(state))
    }

    fn write_json(&self, path: &Path, json: String) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::IoError {
                path: parent.display().to_string(),
                source,
            })?;
        }
        fs::write(path, json).map_err(|source| StoreError::IoError {
            path: path.display().to_string(),
            source,
        })
    }
}

/// SHA-256 of the player id, as the stable file name stem.
fn player_hash(player: &PlayerId) -> String {
    format!("{:x}", Sha256::digest(player.as_str().as_bytes()))
}

impl StateStore for JsonDirStore {
    fn is_completed(&self, achievable: Uuid, player: &PlayerId) -> Result<bool, StoreError> {
        Ok(self.completion_file(achievable, player).exists())
    }

    fn complete_achievable(&self, achievable: Uuid, player: &PlayerId) -> Result<(), StoreError> {
        let path = self.completion_file(achievable, player);
        // Idempotent: the original completion timestamp stands.
        if path.exists() {
            return Ok(());
        }
        let record = CompletionRecord::new(achievable, player.clone());
        let json = serde_json::to_string_pretty(&record)?;
        self.write_json(&path, json)
    }

    fn completions(&self, achievable: Uuid) -> Result<Vec<CompletionRecord>, StoreError> {
        let dir = self.achievable_dir(achievable).join("completions");
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        let entries = fs::read_dir(&dir).map_err(|source| StoreError::IoError {
            path: dir.display().to_string(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::IoError {
                path: dir.display().to_string(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let json = fs::read_to_string(&path).map_err(|source| StoreError::IoError {
                    path: path.display().to_string(),
                    source,
                })?;
                if let Ok(record) = serde_json::from_str::<CompletionRecord>(&json) {
                    records.push(record);
                }
            }
        }

        records.sort_by(|a, b| a.completed_at.cmp(&b.completed_at));
        Ok(records)
    }

    fn current_players(&self) -> Result<Vec<PlayerId>, StoreError> {
        Ok(self.roster().clone())
    }

    fn player_state(
        &self,
        achievable: Uuid,
        player: &PlayerId,
    ) -> Result<Option<StateMap>, StoreError> {
        self.read_state(&self.player_file(achievable, player))
    }

    fn set_player_state(
        &self,
        achievable: Uuid,
        player: &PlayerId,
        state: &StateMap,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(state)?;
        self.write_json(&self.player_file(achievable, player), json)
    }

    fn static_state(&self, achievable: Uuid) -> Result<Option<StateMap>, StoreError> {
        self.read_state(&self.static_file(achievable))
    }

    fn set_static_state(&self, achievable: Uuid, state: &StateMap) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(state)?;
        self.write_json(&self.static_file(achievable), json)
    }
}
