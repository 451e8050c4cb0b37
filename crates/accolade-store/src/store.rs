// store.rs — The StateStore boundary.
//
// The engine never touches persistence directly; everything flows through
// this trait. The store owns the completion flag: the engine only ever
// asks "is it set?" and "set it", and a set flag never comes back off
// through this interface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use accolade_core::{PlayerId, StateMap};

use crate::error::StoreError;

/// A completed (achievable, player) pair and when it was signaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub achievable_id: Uuid,
    pub player: PlayerId,
    pub completed_at: DateTime<Utc>,
}

impl CompletionRecord {
    pub fn new(achievable_id: Uuid, player: PlayerId) -> Self {
        Self {
            achievable_id,
            player,
            completed_at: Utc::now(),
        }
    }
}

/// Pluggable persistence for player state, shared state, completion
/// flags, and the player roster.
///
/// Implementations must keep the completion flag monotonic: once
/// `complete_achievable` succeeds for a pair, `is_completed` reports true
/// from then on, and repeated `complete_achievable` calls are accepted
/// without effect (the original completion timestamp stands).
pub trait StateStore: Send + Sync {
    /// Whether the player has completed the achievable.
    fn is_completed(&self, achievable: Uuid, player: &PlayerId) -> Result<bool, StoreError>;

    /// Set the completion flag. Idempotent: completing an
    /// already-completed pair is a no-op, not an error.
    fn complete_achievable(&self, achievable: Uuid, player: &PlayerId) -> Result<(), StoreError>;

    /// All completion records for an achievable.
    fn completions(&self, achievable: Uuid) -> Result<Vec<CompletionRecord>, StoreError>;

    /// The players the engine should process for unrestricted
    /// definitions (typically "currently online").
    fn current_players(&self) -> Result<Vec<PlayerId>, StoreError>;

    /// The persisted per-player state map, or `None` if the pair has
    /// never been persisted.
    fn player_state(
        &self,
        achievable: Uuid,
        player: &PlayerId,
    ) -> Result<Option<StateMap>, StoreError>;

    /// Overwrite the persisted per-player state map.
    fn set_player_state(
        &self,
        achievable: Uuid,
        player: &PlayerId,
        state: &StateMap,
    ) -> Result<(), StoreError>;

    /// The persisted shared state map, or `None` if never persisted.
    fn static_state(&self, achievable: Uuid) -> Result<Option<StateMap>, StoreError>;

    /// Overwrite the persisted shared state map.
    fn set_static_state(&self, achievable: Uuid, state: &StateMap) -> Result<(), StoreError>;

    /// Seed the per-player state with the declared initial map if the
    /// pair has no persisted state yet. Callable redundantly; existing
    /// state is never clobbered.
    fn initialize_player_state(
        &self,
        achievable: Uuid,
        player: &PlayerId,
        initial: &StateMap,
    ) -> Result<(), StoreError> {
        if self.player_state(achievable, player)?.is_none() {
            self.set_player_state(achievable, player, initial)?;
        }
        Ok(())
    }

    /// Seed the shared state with the declared initial map if nothing is
    /// persisted yet. Callable redundantly.
    fn initialize_static_state(
        &self,
        achievable: Uuid,
        initial: &StateMap,
    ) -> Result<(), StoreError> {
        if self.static_state(achievable)?.is_none() {
            self.set_static_state(achievable, initial)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_record_serialization_round_trip() {
        let record = CompletionRecord::new(Uuid::new_v4(), PlayerId::from("alice"));
        let json = serde_json::to_string(&record).unwrap();
        let restored: CompletionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, record);
        assert!(json.contains("\"completed_at\""));
    }
}
