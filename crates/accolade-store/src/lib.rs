//! # accolade-store
//!
//! Persistence backends for the Accolade achievement engine.
//!
//! The [`StateStore`] trait is the engine's only view of durability: it
//! owns per-player state maps, the shared state map, the monotonic
//! completion flag, and the player roster.
//!
//! ## Key components
//!
//! - [`StateStore`] — the persistence boundary the engine dispatches
//!   through
//! - [`MemoryStore`] — in-process backend for tests and stateless hosts
//! - [`JsonDirStore`] — one JSON file per state map / completion record,
//!   inspectable by hand
//! - [`CompletionRecord`] — who completed what, and when

pub mod error;
pub mod json;
pub mod memory;
pub mod store;

pub use error::StoreError;
pub use json::JsonDirStore;
pub use memory::MemoryStore;
pub use store::{CompletionRecord, StateStore};
