// progress.rs — Progress reporting for partially-complete achievables.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EvalError;
use crate::evaluator::{value_kind, HandlerRef};

/// A snapshot of how far a player is toward satisfying an achievable.
///
/// Produced by a definition's optional progress handler, which must
/// return an object of this shape (`current`, `target`, `label`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    /// Progress accrued so far.
    pub current: f64,
    /// The value at which the achievable completes.
    pub target: f64,
    /// Display text for the host UI (e.g. "3/10 pings").
    pub label: String,
}

impl Progress {
    /// Parse a progress handler's result, attributing shape errors to the
    /// handler that produced them.
    pub fn from_handler_result(handler: &HandlerRef, value: Value) -> Result<Self, EvalError> {
        let kind = value_kind(&value);
        serde_json::from_value(value).map_err(|_| EvalError::UnexpectedResult {
            handler: handler.clone(),
            expected: "a progress object (current, target, label)",
            got: kind,
        })
    }

    /// Completion fraction in `[0.0, 1.0]`, saturating past the target.
    pub fn fraction(&self) -> f64 {
        if self.target <= 0.0 {
            return 1.0;
        }
        (self.current / self.target).clamp(0.0, 1.0)
    }
}
