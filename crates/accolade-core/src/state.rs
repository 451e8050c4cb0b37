// state.rs — Two-layer state views over persisted and declared-default maps.
//
// Every achievable declares initial per-player and shared state. At run
// time a StateView layers the live (persisted or in-flight) map over a
// frozen copy of those defaults: reads fall through to the defaults and
// memoize what they find, writes land in the live layer and mark the view
// dirty. Only the live layer is ever persisted; the defaults stay with
// the definition.

use std::sync::Arc;

use serde_json::Value;

/// A string-keyed JSON map, the universal state shape.
///
/// `serde_json`'s number handling already does what the persistence
/// contract requires: integral literals parse as integers, fractional
/// ones as floats.
pub type StateMap = serde_json::Map<String, Value>;

/// A live state map layered over frozen declared defaults.
///
/// Reads through [`StateView::get_or_default`] never panic on unknown
/// keys: a key absent from both layers is an explicit `None`. A default
/// hit is memoized into the live layer so later persists carry it.
#[derive(Debug, Clone)]
pub struct StateView {
    live: StateMap,
    defaults: Arc<StateMap>,
    dirty: bool,
}

impl StateView {
    /// A view over an existing persisted map.
    pub fn seeded(live: StateMap, defaults: Arc<StateMap>) -> Self {
        Self {
            live,
            defaults,
            dirty: false,
        }
    }

    /// A view for first contact: the live layer starts as an independent
    /// deep copy of the declared defaults.
    pub fn fresh(defaults: Arc<StateMap>) -> Self {
        Self {
            live: (*defaults).clone(),
            defaults,
            dirty: false,
        }
    }

    /// Read a key, falling through to the declared default and memoizing
    /// it into the live layer. Absent from both layers yields `None`.
    ///
    /// Memoizing is a read, not a write: it does not mark the view dirty.
    pub fn get_or_default(&mut self, key: &str) -> Option<&Value> {
        if !self.live.contains_key(key) {
            if let Some(default) = self.defaults.get(key) {
                self.live.insert(key.to_string(), default.clone());
            }
        }
        self.live.get(key)
    }

    /// Read a key without memoizing (live layer first, then defaults).
    pub fn peek(&self, key: &str) -> Option<&Value> {
        self.live.get(key).or_else(|| self.defaults.get(key))
    }

    /// Write a key into the live layer and mark the view dirty.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.live.insert(key.into(), value);
        self.dirty = true;
    }

    /// Remove a key from the live layer, marking the view dirty if it was
    /// present. The declared default is not removed: a later
    /// [`get_or_default`] falls through to it again.
    ///
    /// [`get_or_default`]: StateView::get_or_default
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.live.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Replace the live layer wholesale (disqualification reset) and mark
    /// the view dirty.
    pub fn reset(&mut self, live: StateMap) {
        self.live = live;
        self.dirty = true;
    }

    /// Whether the live layer has unpersisted writes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag after a successful persist.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// The live layer, the map that persistence writes.
    pub fn as_map(&self) -> &StateMap {
        &self.live
    }

    /// Consume the view, yielding the live layer.
    pub fn into_map(self) -> StateMap {
        self.live
    }
}
