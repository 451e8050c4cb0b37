// error.rs — Error types for the dispatch engine.
//
// Only failures with no containing fault-isolation unit surface here.
// Handler and persistence failures inside a dispatch are logged and
// absorbed at their unit boundary instead (see engine.rs).

use thiserror::Error;
use uuid::Uuid;

use accolade_core::EvalError;
use accolade_store::StoreError;

/// Errors returned to engine callers.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The referenced achievable is not registered.
    #[error("unknown achievable: {0}")]
    UnknownDefinition(Uuid),

    /// The backfill payload source could not produce data.
    #[error("backfill data unavailable: {0}")]
    BackfillUnavailable(String),

    /// A handler invocation failed in a directly-requested evaluation
    /// (backfill, progress), where there is no sibling to isolate.
    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvalError),

    /// The store failed outside any fault-isolation unit (e.g. reading
    /// the roster).
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
