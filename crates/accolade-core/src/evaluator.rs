// evaluator.rs — The handler invocation seam.
//
// Definitions never hold handler code, only opaque references into an
// Evaluator supplied at engine construction. Each invocation receives a
// fresh BindingContext naming exactly what that invocation may see:
// nothing ambient, nothing process-global.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::EvalError;
use crate::player::PlayerId;
use crate::state::StateView;

/// An opaque reference to a handler known to some [`Evaluator`].
///
/// References are plain strings on the wire (`#[serde(transparent)]`),
/// which is what lets definitions round-trip through JSON without
/// dragging code along.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerRef(String);

impl HandlerRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for HandlerRef {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for HandlerRef {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Everything one handler invocation is allowed to observe and mutate.
///
/// A fresh context is built per invocation; the engine decides which
/// bindings each scope carries. Static-phase handlers see only the shared
/// view, player-phase handlers see the player's view plus the shared
/// view, backfill handlers see the player's view plus the fetched
/// payload.
pub struct BindingContext<'a> {
    player: Option<&'a PlayerId>,
    state: Option<&'a mut StateView>,
    shared: Option<&'a mut StateView>,
    event: Option<&'a Value>,
    backfill: Option<&'a Value>,
    achievable: Option<Uuid>,
}

impl<'a> BindingContext<'a> {
    /// Static-phase scope: the shared view and the triggering payload.
    pub fn static_scope(shared: &'a mut StateView, event: Option<&'a Value>) -> Self {
        Self {
            player: None,
            state: None,
            shared: Some(shared),
            event,
            backfill: None,
            achievable: None,
        }
    }

    /// Player-phase scope: the player, their view, the shared view, and
    /// the triggering payload.
    pub fn player_scope(
        player: &'a PlayerId,
        state: &'a mut StateView,
        shared: &'a mut StateView,
        event: Option<&'a Value>,
    ) -> Self {
        Self {
            player: Some(player),
            state: Some(state),
            shared: Some(shared),
            event,
            backfill: None,
            achievable: None,
        }
    }

    /// Backfill scope: the player, their view, and the fetched payload.
    pub fn backfill_scope(
        player: &'a PlayerId,
        state: &'a mut StateView,
        backfill: &'a Value,
    ) -> Self {
        Self {
            player: Some(player),
            state: Some(state),
            shared: None,
            event: None,
            backfill: Some(backfill),
            achievable: None,
        }
    }

    /// Progress scope: the player and a read-only pass over their view.
    pub fn progress_scope(player: &'a PlayerId, state: &'a mut StateView) -> Self {
        Self {
            player: Some(player),
            state: Some(state),
            shared: None,
            event: None,
            backfill: None,
            achievable: None,
        }
    }

    /// Attach the achievable this invocation runs on behalf of.
    pub fn with_achievable(mut self, achievable: Uuid) -> Self {
        self.achievable = Some(achievable);
        self
    }

    /// The player this invocation is scoped to, if any.
    pub fn player(&self) -> Option<&PlayerId> {
        self.player
    }

    /// The player-scoped state view, when the scope carries one.
    pub fn state(&mut self) -> Option<&mut StateView> {
        self.state.as_deref_mut()
    }

    /// The shared (static) state view, when the scope carries one.
    pub fn shared(&mut self) -> Option<&mut StateView> {
        self.shared.as_deref_mut()
    }

    /// The triggering occurrence's payload, when the scope carries one.
    pub fn event(&self) -> Option<&Value> {
        self.event
    }

    /// The fetched backfill payload, in backfill scope only.
    pub fn backfill_data(&self) -> Option<&Value> {
        self.backfill
    }

    /// The achievable this invocation runs on behalf of.
    pub fn achievable(&self) -> Option<Uuid> {
        self.achievable
    }
}

impl fmt::Debug for BindingContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingContext")
            .field("player", &self.player)
            .field("has_state", &self.state.is_some())
            .field("has_shared", &self.shared.is_some())
            .field("has_event", &self.event.is_some())
            .field("has_backfill", &self.backfill.is_some())
            .field("achievable", &self.achievable)
            .finish()
    }
}

/// The seam between definitions and handler code.
///
/// Implementations resolve a [`HandlerRef`] to actual behavior: an
/// in-process closure registry ([`NativeEvaluator`]), an embedded
/// scripting runtime, an RPC bridge. The engine only ever calls `invoke`.
///
/// [`NativeEvaluator`]: crate::native::NativeEvaluator
pub trait Evaluator: Send + Sync {
    /// Run the referenced handler against the given bindings.
    fn invoke(
        &self,
        handler: &HandlerRef,
        ctx: &mut BindingContext<'_>,
    ) -> Result<Value, EvalError>;

    /// Run the referenced handler as a predicate. Anything other than a
    /// JSON boolean is an error, never a truthiness coercion.
    fn invoke_predicate(
        &self,
        handler: &HandlerRef,
        ctx: &mut BindingContext<'_>,
    ) -> Result<bool, EvalError> {
        match self.invoke(handler, ctx)? {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::UnexpectedResult {
                handler: handler.clone(),
                expected: "a boolean",
                got: value_kind(&other),
            }),
        }
    }
}

/// Human-readable kind of a JSON value, for error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
