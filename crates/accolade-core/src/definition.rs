// definition.rs — Achievable definitions and their builder form.
//
// A definition is immutable once built: identity, handler-binding tables,
// predicates, and frozen initial state all arrive through the builder and
// never change. The one runtime-mutable piece is the applicable-player
// override, which hosts adjust while the dispatcher holds shared
// references to the definition.
//
// The builder is the serializable face: it round-trips through JSON with
// handler tables in the shape {"<trigger type>": ["<handler id>", ...]},
// and `build()` is where validation happens.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::BuildError;
use crate::evaluator::HandlerRef;
use crate::player::PlayerId;
use crate::predicate::Predicate;
use crate::state::StateMap;
use crate::trigger::TriggerType;

/// A registered achievement/goal: what to listen for, how to accumulate
/// state, and when a player has earned it.
///
/// Identity is the UUID alone. Two definitions with the same UUID are the
/// same achievable no matter what else differs, which is what lets a
/// re-deployed definition keep its completions and stored state.
#[derive(Debug)]
pub struct AchievableDefinition {
    id: Uuid,
    static_handlers: HashMap<TriggerType, Vec<HandlerRef>>,
    player_handlers: HashMap<TriggerType, Vec<HandlerRef>>,
    satisfied: Predicate,
    disqualified: Option<Predicate>,
    backfill: Option<HandlerRef>,
    progress: Option<HandlerRef>,
    initial_player_state: Arc<StateMap>,
    initial_static_state: Arc<StateMap>,
    applicable_players: RwLock<Option<Vec<PlayerId>>>,
}

impl AchievableDefinition {
    /// Start a builder.
    pub fn builder() -> AchievableBuilder {
        AchievableBuilder::new()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Every trigger type this definition binds handlers for, static and
    /// player tables combined.
    pub fn trigger_types(&self) -> BTreeSet<TriggerType> {
        self.static_handlers
            .keys()
            .chain(self.player_handlers.keys())
            .cloned()
            .collect()
    }

    /// Whether any handler table binds this trigger type.
    pub fn handles(&self, trigger_type: &TriggerType) -> bool {
        self.static_handlers.contains_key(trigger_type)
            || self.player_handlers.contains_key(trigger_type)
    }

    /// Static handlers bound to a trigger type, in registration order.
    pub fn static_handlers_for(&self, trigger_type: &TriggerType) -> &[HandlerRef] {
        self.static_handlers
            .get(trigger_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Player handlers bound to a trigger type, in registration order.
    pub fn player_handlers_for(&self, trigger_type: &TriggerType) -> &[HandlerRef] {
        self.player_handlers
            .get(trigger_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The satisfaction predicate.
    pub fn satisfied(&self) -> &Predicate {
        &self.satisfied
    }

    /// The disqualification predicate, if one was declared.
    pub fn disqualified(&self) -> Option<&Predicate> {
        self.disqualified.as_ref()
    }

    /// The backfill handler, if one was declared.
    pub fn backfill_handler(&self) -> Option<&HandlerRef> {
        self.backfill.as_ref()
    }

    pub fn has_backfill(&self) -> bool {
        self.backfill.is_some()
    }

    /// The progress handler, if one was declared.
    pub fn progress_handler(&self) -> Option<&HandlerRef> {
        self.progress.as_ref()
    }

    /// The frozen declared per-player defaults, shared for layering under
    /// state views.
    pub fn player_defaults(&self) -> Arc<StateMap> {
        self.initial_player_state.clone()
    }

    /// The frozen declared shared defaults.
    pub fn static_defaults(&self) -> Arc<StateMap> {
        self.initial_static_state.clone()
    }

    /// An independently-mutable deep copy of the declared per-player
    /// initial state. The frozen canonical map is never handed out to
    /// mutating consumers.
    pub fn initial_player_state(&self) -> StateMap {
        (*self.initial_player_state).clone()
    }

    /// An independently-mutable deep copy of the declared shared initial
    /// state.
    pub fn initial_static_state(&self) -> StateMap {
        (*self.initial_static_state).clone()
    }

    /// The applicable-player override: `Some` restricts the player phase
    /// to the listed players, `None` defers to the store roster.
    pub fn applicable_players(&self) -> Option<Vec<PlayerId>> {
        self.applicable_read().clone()
    }

    /// Replace the applicable-player override. `None` clears it.
    pub fn set_applicable_players(&self, players: Option<Vec<PlayerId>>) {
        *self.applicable_write() = players;
    }

    /// Add a player to the override. On an unrestricted definition this
    /// installs a singleton override, restricting it to that player.
    pub fn add_applicable_player(&self, player: impl Into<PlayerId>) {
        let player = player.into();
        let mut guard = self.applicable_write();
        match guard.as_mut() {
            Some(list) => {
                if !list.contains(&player) {
                    list.push(player);
                }
            }
            None => *guard = Some(vec![player]),
        }
    }

    /// Remove a player from the override. Returns whether the player was
    /// present. A `None` override is untouched.
    pub fn remove_applicable_player(&self, player: &PlayerId) -> bool {
        let mut guard = self.applicable_write();
        match guard.as_mut() {
            Some(list) => {
                let before = list.len();
                list.retain(|p| p != player);
                list.len() != before
            }
            None => false,
        }
    }

    /// Reconstruct an equivalent builder (including the current
    /// applicable-player override).
    pub fn to_builder(&self) -> AchievableBuilder {
        let satisfied = match &self.satisfied {
            Predicate::All(children) => children.clone(),
            other => vec![other.clone()],
        };
        let disqualified = match &self.disqualified {
            None => Vec::new(),
            Some(Predicate::Any(children)) => children.clone(),
            Some(other) => vec![other.clone()],
        };
        AchievableBuilder {
            id: Some(self.id),
            initial_player_state: (*self.initial_player_state).clone(),
            initial_static_state: (*self.initial_static_state).clone(),
            static_handlers: to_ordered(&self.static_handlers),
            player_handlers: to_ordered(&self.player_handlers),
            satisfied,
            disqualified,
            backfill: self.backfill.clone(),
            progress: self.progress.clone(),
            applicable_players: self.applicable_read().clone(),
        }
    }

    // Lock poisoning recovery: the guarded value is a plain list with no
    // torn states, so the poison marker carries no information.
    fn applicable_read(&self) -> RwLockReadGuard<'_, Option<Vec<PlayerId>>> {
        self.applicable_players
            .read()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn applicable_write(&self) -> RwLockWriteGuard<'_, Option<Vec<PlayerId>>> {
        self.applicable_players
            .write()
            .unwrap_or_else(|e| e.into_inner())
    }
}

impl PartialEq for AchievableDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for AchievableDefinition {}

impl std::hash::Hash for AchievableDefinition {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

fn to_ordered(
    table: &HashMap<TriggerType, Vec<HandlerRef>>,
) -> BTreeMap<TriggerType, Vec<HandlerRef>> {
    table
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// The declarative, serializable form of an [`AchievableDefinition`].
///
/// Handler tables use ordered maps so the JSON form is stable; handler
/// lists keep their declaration order, which is the order the dispatcher
/// runs them in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievableBuilder {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "StateMap::is_empty")]
    pub initial_player_state: StateMap,
    #[serde(skip_serializing_if = "StateMap::is_empty")]
    pub initial_static_state: StateMap,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub static_handlers: BTreeMap<TriggerType, Vec<HandlerRef>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub player_handlers: BTreeMap<TriggerType, Vec<HandlerRef>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub satisfied: Vec<Predicate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disqualified: Vec<Predicate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backfill: Option<HandlerRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<HandlerRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicable_players: Option<Vec<PlayerId>>,
}

impl AchievableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the definition's identity. Omitted ids are assigned at build.
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Declare an initial per-player state entry.
    pub fn player_state_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.initial_player_state.insert(key.into(), value);
        self
    }

    /// Declare an initial shared state entry.
    pub fn static_state_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.initial_static_state.insert(key.into(), value);
        self
    }

    /// Bind a player handler to a trigger type. Repeated calls for the
    /// same type append, preserving order.
    pub fn on_player_trigger(
        mut self,
        trigger_type: impl Into<TriggerType>,
        handler: impl Into<HandlerRef>,
    ) -> Self {
        self.player_handlers
            .entry(trigger_type.into())
            .or_default()
            .push(handler.into());
        self
    }

    /// Bind a static handler to a trigger type. Repeated calls for the
    /// same type append, preserving order.
    pub fn on_static_trigger(
        mut self,
        trigger_type: impl Into<TriggerType>,
        handler: impl Into<HandlerRef>,
    ) -> Self {
        self.static_handlers
            .entry(trigger_type.into())
            .or_default()
            .push(handler.into());
        self
    }

    /// Add a satisfaction check. Multiple checks are AND-combined.
    pub fn satisfied_when(mut self, predicate: Predicate) -> Self {
        self.satisfied.push(predicate);
        self
    }

    /// Add a disqualification check. Multiple checks are OR-combined.
    pub fn disqualified_when(mut self, predicate: Predicate) -> Self {
        self.disqualified.push(predicate);
        self
    }

    /// Declare the backfill handler.
    pub fn backfill_with(mut self, handler: impl Into<HandlerRef>) -> Self {
        self.backfill = Some(handler.into());
        self
    }

    /// Declare the progress handler.
    pub fn progress_with(mut self, handler: impl Into<HandlerRef>) -> Self {
        self.progress = Some(handler.into());
        self
    }

    /// Restrict the player phase to these players instead of the store
    /// roster.
    pub fn applicable_to(mut self, players: Vec<PlayerId>) -> Self {
        self.applicable_players = Some(players);
        self
    }

    /// Serialize to the stable JSON form.
    pub fn to_json(&self) -> Result<String, BuildError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse the stable JSON form.
    pub fn from_json(json: &str) -> Result<Self, BuildError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate and freeze into a definition.
    ///
    /// Requires at least one satisfied check. Assigns a random v4 UUID
    /// when no identity was pinned.
    pub fn build(self) -> Result<AchievableDefinition, BuildError> {
        let mut satisfied = self.satisfied;
        let satisfied = match satisfied.len() {
            0 => return Err(BuildError::MissingSatisfiedPredicate),
            1 => satisfied.remove(0),
            _ => Predicate::All(satisfied),
        };

        let mut disqualified = self.disqualified;
        let disqualified = match disqualified.len() {
            0 => None,
            1 => Some(disqualified.remove(0)),
            _ => Some(Predicate::Any(disqualified)),
        };

        Ok(AchievableDefinition {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            static_handlers: self.static_handlers.into_iter().collect(),
            player_handlers: self.player_handlers.into_iter().collect(),
            satisfied,
            disqualified,
            backfill: self.backfill,
            progress: self.progress,
            initial_player_state: Arc::new(self.initial_player_state),
            initial_static_state: Arc::new(self.initial_static_state),
            applicable_players: RwLock::new(self.applicable_players),
        })
    }
}
