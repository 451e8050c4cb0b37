// memory.rs — In-process store.
//
// The default backend for tests and for embedders that persist elsewhere
// (or not at all). Keeps an explicit roster: the host adds players as
// they arrive and removes them as they leave.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use accolade_core::{PlayerId, StateMap};

use crate::error::StoreError;
use crate::store::{CompletionRecord, StateStore};

/// An in-memory [`StateStore`] with a host-managed roster.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    roster: Vec<PlayerId>,
    player_states: HashMap<(Uuid, PlayerId), StateMap>,
    static_states: HashMap<Uuid, StateMap>,
    completed: HashSet<(Uuid, PlayerId)>,
    completions: Vec<CompletionRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a player to the roster (no-op if already present).
    pub fn add_player(&self, player: impl Into<PlayerId>) {
        let player = player.into();
        let mut inner = self.inner();
        if !inner.roster.contains(&player) {
            inner.roster.push(player);
        }
    }

    /// Remove a player from the roster. Their persisted state and
    /// completions stay; the roster only scopes dispatch.
    pub fn remove_player(&self, player: &PlayerId) -> bool {
        let mut inner = self.inner();
        let before = inner.roster.len();
        inner.roster.retain(|p| p != player);
        inner.roster.len() != before
    }

    // Lock poisoning recovery: every critical section is a single map or
    // list operation with no torn states.
    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StateStore for MemoryStore {
    fn is_completed(&self, achievable: Uuid, player: &PlayerId) -> Result<bool, StoreError> {
        Ok(self.inner().completed.contains(&(achievable, player.clone())))
    }

    fn complete_achievable(&self, achievable: Uuid, player: &PlayerId) -> Result<(), StoreError> {
        let mut inner = self.inner();
        if inner.completed.insert((achievable, player.clone())) {
            inner
                .completions
                .push(CompletionRecord::new(achievable, player.clone()));
        }
        Ok(())
    }

    fn completions(&self, achievable: Uuid) -> Result<Vec<CompletionRecord>, StoreError> {
        Ok(self
            .inner()
            .completions
            .iter()
            .filter(|r| r.achievable_id == achievable)
            .cloned()
            .collect())
    }

    fn current_players(&self) -> Result<Vec<PlayerId>, StoreError> {
        Ok(self.inner().roster.clone())
    }

    fn player_state(
        &self,
        achievable: Uuid,
        player: &PlayerId,
    ) -> Result<Option<StateMap>, StoreError> {
        Ok(self
            .inner()
            .player_states
            .get(&(achievable, player.clone()))
            .cloned())
    }

    fn set_player_state(
        &self,
        achievable: Uuid,
        player: &PlayerId,
        state: &StateMap,
    ) -> Result<(), StoreError> {
        self.inner()
            .player_states
            .insert((achievable, player.clone()), state.clone());
        Ok(())
    }

    fn static_state(&self, achievable: Uuid) -> Result<Option<StateMap>, StoreError> {
        Ok(self.inner().static_states.get(&achievable).cloned())
    }

    fn set_static_state(&self, achievable: Uuid, state: &StateMap) -> Result<(), StoreError> {
        self.inner().static_states.insert(achievable, state.clone());
        Ok(())
    }
}
