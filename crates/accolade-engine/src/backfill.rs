// backfill.rs — Importing externally-accrued progress.
//
// Some achievables credit history a player earned before the engine was
// watching (a legacy stats table, an import from another system). The
// coordinator fetches that payload from a supplier, runs the
// definition's backfill handler over the player's current state, and
// re-checks satisfaction. The whole operation is re-runnable: a second
// call finds the flag already set and signals nothing new.

use std::sync::Arc;

use serde_json::Value;

use accolade_core::{AchievableDefinition, BindingContext, Evaluator, PlayerId};
use accolade_store::StateStore;

use crate::error::EngineError;
use crate::states::StateAccess;

/// Source of the process-wide backfill payload.
///
/// Injected at construction; implementations typically read an export
/// file or call a legacy service. Payload shape is a contract between
/// the supplier and the backfill handlers, not the engine.
pub trait BackfillSupplier: Send + Sync {
    fn fetch(&self) -> Result<Value, EngineError>;
}

/// A supplier for hosts with nothing to import: always `null`.
pub struct NoBackfillData;

impl BackfillSupplier for NoBackfillData {
    fn fetch(&self) -> Result<Value, EngineError> {
        Ok(Value::Null)
    }
}

/// What a backfill call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillOutcome {
    /// Whether the backfill handler ran (false when the definition
    /// declares none).
    pub applied: bool,
    /// Whether this call newly signaled completion.
    pub completed: bool,
}

/// Runs backfill for (definition, player) pairs.
pub struct BackfillCoordinator {
    states: StateAccess,
    store: Arc<dyn StateStore>,
    evaluator: Arc<dyn Evaluator>,
    supplier: Arc<dyn BackfillSupplier>,
}

impl BackfillCoordinator {
    pub fn new(
        store: Arc<dyn StateStore>,
        evaluator: Arc<dyn Evaluator>,
        supplier: Arc<dyn BackfillSupplier>,
    ) -> Self {
        Self {
            states: StateAccess::new(store.clone()),
            store,
            evaluator,
            supplier,
        }
    }

    /// Run the definition's backfill handler for one player, persist the
    /// result, and signal completion if the imported state satisfies the
    /// definition.
    ///
    /// A definition without a backfill handler is a no-op and the
    /// supplier is never consulted. An already-completed player still
    /// gets the handler's state import, but no second completion signal.
    pub fn backfill(
        &self,
        def: &AchievableDefinition,
        player: &PlayerId,
    ) -> Result<BackfillOutcome, EngineError> {
        let handler = match def.backfill_handler() {
            Some(handler) => handler,
            None => {
                tracing::debug!(
                    "achievable {} declares no backfill handler, skipping",
                    def.id()
                );
                return Ok(BackfillOutcome {
                    applied: false,
                    completed: false,
                });
            }
        };

        let payload = self.supplier.fetch()?;
        let mut state = self.states.load_player(def, player)?;

        let mut ctx =
            BindingContext::backfill_scope(player, &mut state, &payload).with_achievable(def.id());
        self.evaluator.invoke(handler, &mut ctx)?;
        self.states.persist_player(def, player, &mut state);

        if self.store.is_completed(def.id(), player)? {
            return Ok(BackfillOutcome {
                applied: true,
                completed: false,
            });
        }

        let mut shared = self.states.load_static(def)?;
        let mut ctx = BindingContext::player_scope(player, &mut state, &mut shared, None)
            .with_achievable(def.id());
        let completed = def.satisfied().evaluate(self.evaluator.as_ref(), &mut ctx)?;
        if completed {
            self.store.complete_achievable(def.id(), player)?;
        }

        Ok(BackfillOutcome {
            applied: true,
            completed,
        })
    }
}
