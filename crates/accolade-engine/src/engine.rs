// engine.rs — Trigger dispatch.
//
// The dispatcher routes each trigger to the definitions that bind
// handlers for its type, then runs two phases per definition:
//
//   1. Static phase: the definition's static handlers, in order, against
//      the shared view. The shared map is persisted after each handler.
//   2. Player phase: for every applicable player (skipping players a
//      scoped trigger doesn't target, and players who already completed),
//      the player handlers in order, then disqualification (hard reset
//      to declared initial state), then satisfaction (completion signal).
//
// Fault isolation mirrors the notification-dispatch rule: a failing
// handler or a failing player is logged and absorbed, siblings still
// run. Only failures with no unit to contain them (roster reads, unknown
// ids) surface to the caller.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use accolade_core::{
    AchievableDefinition, BindingContext, Evaluator, PlayerId, Progress, StateView, Trigger,
    TriggerType,
};
use accolade_store::StateStore;

use crate::backfill::{BackfillCoordinator, BackfillOutcome, BackfillSupplier, NoBackfillData};
use crate::error::EngineError;
use crate::states::StateAccess;

/// What one dispatch did, for host-side observability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchSummary {
    /// Definitions that bind handlers for the trigger's type.
    pub definitions_matched: usize,
    /// Player units that ran to the end of their phase.
    pub players_processed: usize,
    /// Completions newly signaled by this dispatch.
    pub completions: usize,
    /// Failures logged and absorbed at a unit boundary.
    pub failures: usize,
}

/// The dispatch engine: a registry of definitions plus the collaborators
/// they run against.
///
/// All collaborators are injected at construction; the dispatcher holds
/// no ambient or process-global state.
pub struct TriggerDispatcher {
    store: Arc<dyn StateStore>,
    evaluator: Arc<dyn Evaluator>,
    states: StateAccess,
    coordinator: BackfillCoordinator,
    definitions: HashMap<Uuid, Arc<AchievableDefinition>>,
    by_trigger: HashMap<TriggerType, Vec<Arc<AchievableDefinition>>>,
}

impl TriggerDispatcher {
    /// Create a dispatcher with no registered definitions and no
    /// backfill source.
    pub fn new(store: Arc<dyn StateStore>, evaluator: Arc<dyn Evaluator>) -> Self {
        Self {
            states: StateAccess::new(store.clone()),
            coordinator: BackfillCoordinator::new(
                store.clone(),
                evaluator.clone(),
                Arc::new(NoBackfillData),
            ),
            store,
            evaluator,
            definitions: HashMap::new(),
            by_trigger: HashMap::new(),
        }
    }

    /// Attach a backfill payload source.
    pub fn with_backfill(mut self, supplier: Arc<dyn BackfillSupplier>) -> Self {
        self.coordinator =
            BackfillCoordinator::new(self.store.clone(), self.evaluator.clone(), supplier);
        self
    }

    /// Register a definition. Re-registering the same UUID replaces the
    /// previous version; its stored state and completions carry over
    /// since identity is the UUID.
    pub fn register(&mut self, def: Arc<AchievableDefinition>) {
        let id = def.id();
        if self.definitions.contains_key(&id) {
            self.remove_from_index(id);
        }
        for trigger_type in def.trigger_types() {
            self.by_trigger
                .entry(trigger_type)
                .or_default()
                .push(def.clone());
        }
        self.definitions.insert(id, def);
    }

    /// Remove a definition. Returns whether it was registered.
    pub fn deregister(&mut self, achievable: Uuid) -> bool {
        if self.definitions.remove(&achievable).is_some() {
            self.remove_from_index(achievable);
            true
        } else {
            false
        }
    }

    /// Look up a registered definition.
    pub fn definition(&self, achievable: Uuid) -> Option<&Arc<AchievableDefinition>> {
        self.definitions.get(&achievable)
    }

    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    /// Dispatch one trigger to every interested definition, in
    /// registration order. A trigger type nothing listens to is a silent
    /// no-op.
    pub fn dispatch(&self, trigger: &Trigger) -> Result<DispatchSummary, EngineError> {
        let mut summary = DispatchSummary::default();
        let defs = match self.by_trigger.get(trigger.trigger_type()) {
            Some(defs) => defs,
            None => return Ok(summary),
        };

        // Computed once; every handler in this dispatch sees the same
        // payload value.
        let payload = trigger.payload();

        for def in defs {
            summary.definitions_matched += 1;
            self.dispatch_to(def, trigger, payload.as_ref(), &mut summary)?;
        }
        Ok(summary)
    }

    /// Run backfill for one (achievable, player) pair.
    pub fn backfill(
        &self,
        achievable: Uuid,
        player: &PlayerId,
    ) -> Result<BackfillOutcome, EngineError> {
        let def = self
            .definitions
            .get(&achievable)
            .ok_or(EngineError::UnknownDefinition(achievable))?;
        self.coordinator.backfill(def, player)
    }

    /// Evaluate a definition's progress handler for one player. `None`
    /// when the definition declares no progress handler.
    ///
    /// Read-only: the handler sees the player's current view, and the
    /// view is discarded afterward without persisting.
    pub fn progress(
        &self,
        achievable: Uuid,
        player: &PlayerId,
    ) -> Result<Option<Progress>, EngineError> {
        let def = self
            .definitions
            .get(&achievable)
            .ok_or(EngineError::UnknownDefinition(achievable))?;
        let handler = match def.progress_handler() {
            Some(handler) => handler,
            None => return Ok(None),
        };

        let mut state = self.states.peek_player(def, player)?;
        let mut ctx = BindingContext::progress_scope(player, &mut state).with_achievable(def.id());
        let value = self.evaluator.invoke(handler, &mut ctx)?;
        Ok(Some(Progress::from_handler_result(handler, value)?))
    }

    /// Both phases for one definition. Returns `Err` only for failures
    /// with no unit boundary (roster reads).
    fn dispatch_to(
        &self,
        def: &Arc<AchievableDefinition>,
        trigger: &Trigger,
        payload: Option<&Value>,
        summary: &mut DispatchSummary,
    ) -> Result<(), EngineError> {
        let trigger_type = trigger.trigger_type();

        // The shared view backs both phases: static handlers mutate it,
        // player handlers and predicates read (and may mutate) it.
        let mut shared = match self.states.load_static(def) {
            Ok(view) => view,
            Err(e) => {
                tracing::warn!(
                    "failed to load shared state for achievable {} on trigger {}, skipping: {}",
                    def.id(),
                    trigger_type,
                    e
                );
                summary.failures += 1;
                return Ok(());
            }
        };

        // Static phase.
        for handler in def.static_handlers_for(trigger_type) {
            let mut ctx =
                BindingContext::static_scope(&mut shared, payload).with_achievable(def.id());
            match self.evaluator.invoke(handler, &mut ctx) {
                Ok(_) => self.states.persist_static(def, &mut shared),
                Err(e) => {
                    tracing::warn!(
                        "static handler {} failed for achievable {} on trigger {}: {}",
                        handler,
                        def.id(),
                        trigger_type,
                        e
                    );
                    summary.failures += 1;
                }
            }
        }

        // Player phase. Runs whenever the definition is interested in
        // this trigger type at all: a static-only match still needs
        // per-player satisfaction checks, since static handlers may have
        // just pushed the shared state across a threshold.
        for player in self.applicable_players(def)? {
            if trigger.target_player().is_some_and(|target| target != &player) {
                continue;
            }
            match self.process_player(def, trigger_type, payload, &player, &mut shared) {
                Ok(completed) => {
                    summary.players_processed += 1;
                    if completed {
                        summary.completions += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "player {} failed for achievable {} on trigger {}: {}",
                        player,
                        def.id(),
                        trigger_type,
                        e
                    );
                    summary.failures += 1;
                }
            }
        }

        Ok(())
    }

    /// One player's unit: handlers, disqualification, satisfaction.
    /// Returns whether a completion was newly signaled.
    fn process_player(
        &self,
        def: &Arc<AchievableDefinition>,
        trigger_type: &TriggerType,
        payload: Option<&Value>,
        player: &PlayerId,
        shared: &mut StateView,
    ) -> Result<bool, EngineError> {
        // Completed is terminal: no player-state mutation, no further
        // checks. Static-phase effects above still applied.
        if self.store.is_completed(def.id(), player)? {
            return Ok(false);
        }

        let mut state = self.states.load_player(def, player)?;

        for handler in def.player_handlers_for(trigger_type) {
            let mut ctx = BindingContext::player_scope(player, &mut state, shared, payload)
                .with_achievable(def.id());
            self.evaluator.invoke(handler, &mut ctx)?;
            self.states.persist_player(def, player, &mut state);
            // Player handlers may write shared state too; persist only
            // when this handler actually dirtied it.
            if shared.is_dirty() {
                self.states.persist_static(def, shared);
            }
        }

        if let Some(disqualified) = def.disqualified() {
            let mut ctx = BindingContext::player_scope(player, &mut state, shared, payload)
                .with_achievable(def.id());
            if disqualified.evaluate(self.evaluator.as_ref(), &mut ctx)? {
                // Hard reset to the declared initial state. The reset is
                // visible to the satisfaction check below.
                state.reset(def.initial_player_state());
                self.states.persist_player(def, player, &mut state);
            }
        }

        let mut ctx = BindingContext::player_scope(player, &mut state, shared, payload)
            .with_achievable(def.id());
        if def.satisfied().evaluate(self.evaluator.as_ref(), &mut ctx)? {
            self.store.complete_achievable(def.id(), player)?;
            return Ok(true);
        }

        Ok(false)
    }

    /// The players the player phase covers: the definition's override if
    /// set, otherwise the store roster.
    fn applicable_players(
        &self,
        def: &AchievableDefinition,
    ) -> Result<Vec<PlayerId>, EngineError> {
        match def.applicable_players() {
            Some(players) => Ok(players),
            None => Ok(self.store.current_players()?),
        }
    }

    fn remove_from_index(&mut self, achievable: Uuid) {
        self.by_trigger.retain(|_, defs| {
            defs.retain(|d| d.id() != achievable);
            !defs.is_empty()
        });
    }
}
