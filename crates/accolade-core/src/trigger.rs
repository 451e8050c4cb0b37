// trigger.rs — Trigger model: routing keys and the host occurrence contract.
//
// A Trigger is what the host hands to the dispatcher: a string type tag,
// optionally carrying the occurrence that caused it. Routing is exact
// string match on the type tag; there is no wildcard or hierarchy
// matching. Handlers observe the occurrence as JSON, never as a host type.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::player::PlayerId;

/// The routing key for a trigger. Definitions bind handlers per type, and
/// the dispatcher matches types by exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerType(String);

impl TriggerType {
    pub fn new(t: impl Into<String>) -> Self {
        Self(t.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TriggerType {
    fn from(t: &str) -> Self {
        Self(t.to_string())
    }
}

impl From<String> for TriggerType {
    fn from(t: String) -> Self {
        Self(t)
    }
}

/// An occurrence in the host system (a login, a purchase, a block broken).
///
/// Hosts implement this for their own event types. The engine only ever
/// asks three things: which trigger type the occurrence maps to, whether
/// it is scoped to one player, and a JSON view of its payload for
/// handlers.
pub trait Event: Send + Sync {
    /// The trigger type this occurrence dispatches under.
    fn trigger_type(&self) -> TriggerType;

    /// The player this occurrence is scoped to, if any.
    ///
    /// A `Some` target restricts the player phase to exactly that player;
    /// `None` means the occurrence is global and every applicable player
    /// is processed.
    fn player(&self) -> Option<&PlayerId> {
        None
    }

    /// The payload handlers observe. Computed once per dispatch.
    fn payload(&self) -> Value;
}

/// A dispatchable trigger: a type tag plus the occurrence behind it.
///
/// `of_type` builds a bare trigger with no occurrence, used for synthetic
/// or administrative dispatch (e.g. a periodic tick).
#[derive(Clone)]
pub struct Trigger {
    trigger_type: TriggerType,
    event: Option<Arc<dyn Event>>,
}

impl Trigger {
    /// Build a trigger from a host occurrence. The type tag is derived
    /// from the occurrence itself.
    pub fn from_event(event: Arc<dyn Event>) -> Self {
        Self {
            trigger_type: event.trigger_type(),
            event: Some(event),
        }
    }

    /// Build a bare trigger carrying no occurrence.
    pub fn of_type(trigger_type: impl Into<TriggerType>) -> Self {
        Self {
            trigger_type: trigger_type.into(),
            event: None,
        }
    }

    pub fn trigger_type(&self) -> &TriggerType {
        &self.trigger_type
    }

    /// The player the underlying occurrence targets, if it is scoped.
    pub fn target_player(&self) -> Option<&PlayerId> {
        self.event.as_deref().and_then(|e| e.player())
    }

    /// JSON payload of the underlying occurrence. `None` for bare triggers.
    pub fn payload(&self) -> Option<Value> {
        self.event.as_deref().map(|e| e.payload())
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger")
            .field("trigger_type", &self.trigger_type)
            .field("target_player", &self.target_player())
            .finish()
    }
}

/// A ready-made [`Event`] for hosts that don't have their own event types
/// (and for tests): a type tag, an optional target player, and a JSON
/// payload.
#[derive(Debug, Clone)]
pub struct SimpleEvent {
    trigger_type: TriggerType,
    player: Option<PlayerId>,
    payload: Value,
}

impl SimpleEvent {
    /// A global occurrence of the given type with a null payload.
    pub fn new(trigger_type: impl Into<TriggerType>) -> Self {
        Self {
            trigger_type: trigger_type.into(),
            player: None,
            payload: Value::Null,
        }
    }

    /// An occurrence scoped to one player.
    pub fn for_player(trigger_type: impl Into<TriggerType>, player: impl Into<PlayerId>) -> Self {
        Self {
            trigger_type: trigger_type.into(),
            player: Some(player.into()),
            payload: Value::Null,
        }
    }

    /// Attach a payload.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Wrap into a dispatchable trigger.
    pub fn into_trigger(self) -> Trigger {
        Trigger::from_event(Arc::new(self))
    }
}

impl Event for SimpleEvent {
    fn trigger_type(&self) -> TriggerType {
        self.trigger_type.clone()
    }

    fn player(&self) -> Option<&PlayerId> {
        self.player.as_ref()
    }

    fn payload(&self) -> Value {
        self.payload.clone()
    }
}
