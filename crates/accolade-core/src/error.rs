// error.rs — Error types for the core model.

use thiserror::Error;

use crate::evaluator::HandlerRef;

/// Errors raised while invoking handler code through an [`Evaluator`].
///
/// [`Evaluator`]: crate::evaluator::Evaluator
#[derive(Debug, Error)]
pub enum EvalError {
    /// The evaluator has no handler registered under this reference.
    #[error("no handler registered for '{0}'")]
    UnknownHandler(HandlerRef),

    /// The handler ran and reported a failure.
    #[error("handler '{handler}' failed: {message}")]
    HandlerFailed {
        handler: HandlerRef,
        message: String,
    },

    /// The handler completed but returned a value of the wrong shape
    /// (e.g. a predicate that did not produce a boolean).
    #[error("handler '{handler}' returned {got} where {expected} was expected")]
    UnexpectedResult {
        handler: HandlerRef,
        expected: &'static str,
        got: &'static str,
    },
}

/// Errors raised while building an [`AchievableDefinition`] from its builder.
///
/// [`AchievableDefinition`]: crate::definition::AchievableDefinition
#[derive(Debug, Error)]
pub enum BuildError {
    /// The builder declared no satisfied predicate. An empty conjunction
    /// would be vacuously true and complete every player on first contact,
    /// so construction refuses it.
    #[error("achievable requires at least one satisfied predicate")]
    MissingSatisfiedPredicate,

    /// Failed to serialize/deserialize the builder form.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
