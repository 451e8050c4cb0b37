// states.rs — State view loading and persistence against the store.
//
// The engine's state lifecycle in one place: load a view (seeding the
// declared defaults on first contact), persist a view's live layer.
// Persistence failures are downgraded to warnings so the surrounding
// unit keeps its in-memory view and processing continues; the next
// successful persist catches the store up.

use std::sync::Arc;

use accolade_core::{AchievableDefinition, PlayerId, StateView};
use accolade_store::{StateStore, StoreError};

/// Loads and persists [`StateView`]s for one store.
pub struct StateAccess {
    store: Arc<dyn StateStore>,
}

impl StateAccess {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    /// The shared view for a definition. First contact seeds the store
    /// with the declared initial map, best-effort. A definition that
    /// declares no shared state writes nothing to the store.
    pub fn load_static(&self, def: &AchievableDefinition) -> Result<StateView, StoreError> {
        match self.store.static_state(def.id())? {
            Some(live) => Ok(StateView::seeded(live, def.static_defaults())),
            None => {
                let initial = def.initial_static_state();
                if !initial.is_empty() {
                    if let Err(e) = self.store.initialize_static_state(def.id(), &initial) {
                        tracing::warn!(
                            "failed to seed shared state for achievable {}: {}",
                            def.id(),
                            e
                        );
                    }
                }
                Ok(StateView::fresh(def.static_defaults()))
            }
        }
    }

    /// A player's view for a definition, seeding on first contact.
    pub fn load_player(
        &self,
        def: &AchievableDefinition,
        player: &PlayerId,
    ) -> Result<StateView, StoreError> {
        match self.store.player_state(def.id(), player)? {
            Some(live) => Ok(StateView::seeded(live, def.player_defaults())),
            None => {
                let initial = def.initial_player_state();
                if !initial.is_empty() {
                    if let Err(e) = self
                        .store
                        .initialize_player_state(def.id(), player, &initial)
                    {
                        tracing::warn!(
                            "failed to seed player state for achievable {} player {}: {}",
                            def.id(),
                            player,
                            e
                        );
                    }
                }
                Ok(StateView::fresh(def.player_defaults()))
            }
        }
    }

    /// A player's view without touching the store on first contact.
    /// Observational reads (progress) must not author store entries.
    pub fn peek_player(
        &self,
        def: &AchievableDefinition,
        player: &PlayerId,
    ) -> Result<StateView, StoreError> {
        match self.store.player_state(def.id(), player)? {
            Some(live) => Ok(StateView::seeded(live, def.player_defaults())),
            None => Ok(StateView::fresh(def.player_defaults())),
        }
    }

    /// Persist the shared view's live layer. Failure is logged and the
    /// view stays dirty for the next attempt.
    pub fn persist_static(&self, def: &AchievableDefinition, view: &mut StateView) {
        match self.store.set_static_state(def.id(), view.as_map()) {
            Ok(()) => view.mark_clean(),
            Err(e) => tracing::warn!(
                "failed to persist shared state for achievable {}: {}",
                def.id(),
                e
            ),
        }
    }

    /// Persist a player view's live layer. Failure is logged and the
    /// view stays dirty for the next attempt.
    pub fn persist_player(
        &self,
        def: &AchievableDefinition,
        player: &PlayerId,
        view: &mut StateView,
    ) {
        match self.store.set_player_state(def.id(), player, view.as_map()) {
            Ok(()) => view.mark_clean(),
            Err(e) => tracing::warn!(
                "failed to persist player state for achievable {} player {}: {}",
                def.id(),
                player,
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use accolade_core::{AchievableBuilder, Predicate, StateMap};
    use accolade_store::MemoryStore;

    fn counting_def() -> AchievableDefinition {
        AchievableBuilder::new()
            .player_state_entry("count", json!(0))
            .static_state_entry("global", json!(0))
            .on_player_trigger("ping", "bump")
            .satisfied_when(Predicate::check("done"))
            .build()
            .unwrap()
    }

    #[test]
    fn first_contact_seeds_the_store() {
        let store = Arc::new(MemoryStore::new());
        let access = StateAccess::new(store.clone());
        let def = counting_def();
        let alice = PlayerId::from("alice");

        let view = access.load_player(&def, &alice).unwrap();
        assert_eq!(view.as_map().get("count"), Some(&json!(0)));

        // The declared initial map landed in the store.
        let persisted = store.player_state(def.id(), &alice).unwrap().unwrap();
        assert_eq!(persisted.get("count"), Some(&json!(0)));
    }

    #[test]
    fn existing_state_loads_seeded() {
        let store = Arc::new(MemoryStore::new());
        let access = StateAccess::new(store.clone());
        let def = counting_def();
        let alice = PlayerId::from("alice");

        let mut persisted = StateMap::new();
        persisted.insert("count".to_string(), json!(7));
        store.set_player_state(def.id(), &alice, &persisted).unwrap();

        let mut view = access.load_player(&def, &alice).unwrap();
        assert_eq!(view.get_or_default("count"), Some(&json!(7)));
        assert!(!view.is_dirty());
    }

    #[test]
    fn peek_never_authors_store_entries() {
        let store = Arc::new(MemoryStore::new());
        let access = StateAccess::new(store.clone());
        let def = counting_def();
        let alice = PlayerId::from("alice");

        let mut view = access.peek_player(&def, &alice).unwrap();
        assert_eq!(view.get_or_default("count"), Some(&json!(0)));
        assert!(store.player_state(def.id(), &alice).unwrap().is_none());
    }

    #[test]
    fn persist_round_trips_and_marks_clean() {
        let store = Arc::new(MemoryStore::new());
        let access = StateAccess::new(store.clone());
        let def = counting_def();

        let mut view = access.load_static(&def).unwrap();
        view.set("global", json!(3));
        assert!(view.is_dirty());

        access.persist_static(&def, &mut view);
        assert!(!view.is_dirty());

        let persisted = store.static_state(def.id()).unwrap().unwrap();
        assert_eq!(persisted.get("global"), Some(&json!(3)));
    }
}
