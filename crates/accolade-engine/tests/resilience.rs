// resilience.rs — Integration test for fault isolation during dispatch.
//
// A failing handler or a failing store write must never take healthy
// work down with it. The flow:
//
//   1. A definition whose handler always fails shares a trigger type
//      with a healthy counting definition; the healthy one advances and
//      completes while every failure is absorbed and counted
//   2. State persistence starts failing mid-dispatch; handlers keep
//      working against the in-memory view, and a satisfaction reached
//      there still signals completion
//   3. The completion write itself fails; that player's unit is counted
//      failed, and once the store heals the next trigger re-signals
//      the completion
//
// VERIFY:
//   - Summary failure counts match the absorbed failures
//   - No failure leaks out of dispatch as an Err
//   - Completion state self-heals after store recovery

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use accolade_core::{
    AchievableBuilder, BindingContext, EvalError, NativeEvaluator, PlayerId, Predicate,
    SimpleEvent, StateMap, Trigger,
};
use accolade_engine::TriggerDispatcher;
use accolade_store::{CompletionRecord, MemoryStore, StateStore, StoreError};

/// A store whose write paths can be switched off, backed by a real
/// in-memory store.
struct FlakyStore {
    inner: MemoryStore,
    reject_state_writes: AtomicBool,
    reject_completions: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            reject_state_writes: AtomicBool::new(false),
            reject_completions: AtomicBool::new(false),
        }
    }

    fn reject_state_writes(&self, reject: bool) {
        self.reject_state_writes.store(reject, Ordering::SeqCst);
    }

    fn reject_completions(&self, reject: bool) {
        self.reject_completions.store(reject, Ordering::SeqCst);
    }
}

impl StateStore for FlakyStore {
    fn is_completed(&self, achievable: Uuid, player: &PlayerId) -> Result<bool, StoreError> {
        self.inner.is_completed(achievable, player)
    }

    fn complete_achievable(&self, achievable: Uuid, player: &PlayerId) -> Result<(), StoreError> {
        if self.reject_completions.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("completion writes disabled".into()));
        }
        self.inner.complete_achievable(achievable, player)
    }

    fn completions(&self, achievable: Uuid) -> Result<Vec<CompletionRecord>, StoreError> {
        self.inner.completions(achievable)
    }

    fn current_players(&self) -> Result<Vec<PlayerId>, StoreError> {
        self.inner.current_players()
    }

    fn player_state(
        &self,
        achievable: Uuid,
        player: &PlayerId,
    ) -> Result<Option<StateMap>, StoreError> {
        self.inner.player_state(achievable, player)
    }

    fn set_player_state(
        &self,
        achievable: Uuid,
        player: &PlayerId,
        state: &StateMap,
    ) -> Result<(), StoreError> {
        if self.reject_state_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("state writes disabled".into()));
        }
        self.inner.set_player_state(achievable, player, state)
    }

    fn static_state(&self, achievable: Uuid) -> Result<Option<StateMap>, StoreError> {
        self.inner.static_state(achievable)
    }

    fn set_static_state(&self, achievable: Uuid, state: &StateMap) -> Result<(), StoreError> {
        if self.reject_state_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("state writes disabled".into()));
        }
        self.inner.set_static_state(achievable, state)
    }
}

#[test]
fn dispatch_survives_handler_and_store_failures() {
    // =========================================================
    // SETUP: flaky store, one broken and two healthy definitions
    // =========================================================

    let store = Arc::new(FlakyStore::new());
    store.inner.add_player("dave");
    store.inner.add_player("erin");
    let dave = "dave".into();
    let erin = "erin".into();

    let mut evaluator = NativeEvaluator::new();
    evaluator.register("explode", |_: &mut BindingContext<'_>| {
        Err(EvalError::HandlerFailed {
            handler: "explode".into(),
            message: "scripted failure".into(),
        })
    });
    evaluator.register("never_done", |_: &mut BindingContext<'_>| Ok(json!(false)));
    evaluator.register("count_step", |ctx: &mut BindingContext<'_>| {
        let state = ctx.state().expect("player scope");
        let steps = state
            .get_or_default("steps")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        state.set("steps", json!(steps + 1));
        Ok(Value::Null)
    });
    evaluator.register("two_steps", |ctx: &mut BindingContext<'_>| {
        let state = ctx.state().expect("player scope");
        let steps = state
            .get_or_default("steps")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(json!(steps >= 2))
    });
    evaluator.register("count_item", |ctx: &mut BindingContext<'_>| {
        let state = ctx.state().expect("player scope");
        let items = state
            .get_or_default("items")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        state.set("items", json!(items + 1));
        Ok(Value::Null)
    });
    evaluator.register("one_item", |ctx: &mut BindingContext<'_>| {
        let state = ctx.state().expect("player scope");
        let items = state
            .get_or_default("items")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(json!(items >= 1))
    });
    evaluator.register("two_items", |ctx: &mut BindingContext<'_>| {
        let state = ctx.state().expect("player scope");
        let items = state
            .get_or_default("items")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(json!(items >= 2))
    });

    let mut dispatcher = TriggerDispatcher::new(store.clone(), Arc::new(evaluator));

    let cursed = Arc::new(
        AchievableBuilder::new()
            .on_player_trigger("quest_step", "explode")
            .satisfied_when(Predicate::check("never_done"))
            .build()
            .unwrap(),
    );
    dispatcher.register(cursed);

    let steady = Arc::new(
        AchievableBuilder::new()
            .player_state_entry("steps", json!(0))
            .on_player_trigger("quest_step", "count_step")
            .satisfied_when(Predicate::check("two_steps"))
            .build()
            .unwrap(),
    );
    let steady_id = steady.id();
    dispatcher.register(steady);

    // =========================================================
    // STEP 1: A broken sibling cannot stall healthy definitions
    // =========================================================

    let summary = dispatcher.dispatch(&Trigger::of_type("quest_step")).unwrap();
    assert_eq!(summary.definitions_matched, 2);
    // Both players failed inside the cursed definition.
    assert_eq!(summary.failures, 2);
    // Both players ran to the end of the steady definition.
    assert_eq!(summary.players_processed, 2);
    assert_eq!(summary.completions, 0);

    let dave_state = store.player_state(steady_id, &dave).unwrap().unwrap();
    assert_eq!(dave_state.get("steps"), Some(&json!(1)));

    // =========================================================
    // STEP 2: Repeat failure, healthy completion
    // =========================================================

    let summary = dispatcher.dispatch(&Trigger::of_type("quest_step")).unwrap();
    assert_eq!(summary.failures, 2);
    assert_eq!(summary.completions, 2);
    assert!(store.is_completed(steady_id, &dave).unwrap());
    assert!(store.is_completed(steady_id, &erin).unwrap());

    // =========================================================
    // STEP 3: Persistence fails; the in-memory view still completes
    // =========================================================

    let collector = Arc::new(
        AchievableBuilder::new()
            .player_state_entry("items", json!(0))
            .on_player_trigger("item_found", "count_item")
            .satisfied_when(Predicate::check("two_items"))
            .build()
            .unwrap(),
    );
    let collector_id = collector.id();
    dispatcher.register(collector);

    // First find persists normally.
    dispatcher
        .dispatch(&SimpleEvent::for_player("item_found", "dave").into_trigger())
        .unwrap();
    let dave_items = store.player_state(collector_id, &dave).unwrap().unwrap();
    assert_eq!(dave_items.get("items"), Some(&json!(1)));

    // Then the store starts rejecting state writes. The handler still
    // runs, the satisfaction check sees the unpersisted second item,
    // and completion goes through.
    store.reject_state_writes(true);
    let summary = dispatcher
        .dispatch(&SimpleEvent::for_player("item_found", "dave").into_trigger())
        .unwrap();
    assert_eq!(summary.completions, 1);
    assert_eq!(summary.failures, 0, "persist failures are absorbed");
    assert!(store.is_completed(collector_id, &dave).unwrap());

    // The stored state is stale; the completion flag is what matters.
    let dave_items = store.player_state(collector_id, &dave).unwrap().unwrap();
    assert_eq!(dave_items.get("items"), Some(&json!(1)));
    store.reject_state_writes(false);

    // =========================================================
    // STEP 4: A failed completion write self-heals on later triggers
    // =========================================================

    let first_find = Arc::new(
        AchievableBuilder::new()
            .player_state_entry("items", json!(0))
            .on_player_trigger("relic_found", "count_item")
            .satisfied_when(Predicate::check("one_item"))
            .build()
            .unwrap(),
    );
    let first_find_id = first_find.id();
    dispatcher.register(first_find);

    store.reject_completions(true);
    let summary = dispatcher
        .dispatch(&SimpleEvent::for_player("relic_found", "erin").into_trigger())
        .unwrap();
    assert_eq!(summary.completions, 0);
    assert_eq!(summary.failures, 1, "the completion write failed");
    assert!(!store.is_completed(first_find_id, &erin).unwrap());

    // State survived even though the signal did not.
    let erin_items = store.player_state(first_find_id, &erin).unwrap().unwrap();
    assert_eq!(erin_items.get("items"), Some(&json!(1)));

    // Store heals; the next trigger re-evaluates and signals.
    store.reject_completions(false);
    let summary = dispatcher
        .dispatch(&SimpleEvent::for_player("relic_found", "erin").into_trigger())
        .unwrap();
    assert_eq!(summary.completions, 1);
    assert!(store.is_completed(first_find_id, &erin).unwrap());

    // =========================================================
    // SUCCESS: Failures stay contained
    // =========================================================
    //
    // We demonstrated:
    // - A definition that always fails never blocks its siblings
    // - Handler failures are logged and counted, never propagated
    // - State-write outages degrade to in-memory operation within a
    //   dispatch, and completions still land
    // - A lost completion signal is recovered by the next trigger once
    //   the store is healthy again
}
