//! # accolade-engine
//!
//! The dispatch core: routes host triggers to registered achievable
//! definitions, runs their handlers through an [`Evaluator`], tracks
//! per-player and shared state through a [`StateStore`], and signals
//! completions.
//!
//! ## Key components
//!
//! - [`TriggerDispatcher`]: definition registry plus the two-phase
//!   dispatch loop (static handlers first, then per-player processing).
//! - [`DispatchSummary`]: per-dispatch counts for host logs.
//! - [`BackfillCoordinator`] / [`BackfillSupplier`]: re-runnable import
//!   of pre-existing player data into achievable state.
//! - [`EngineError`]: the failures that surface to callers. Handler and
//!   per-player failures inside a dispatch are logged and absorbed
//!   instead.
//!
//! [`Evaluator`]: accolade_core::Evaluator
//! [`StateStore`]: accolade_store::StateStore

pub mod backfill;
pub mod engine;
pub mod error;
pub mod states;

pub use backfill::{BackfillCoordinator, BackfillOutcome, BackfillSupplier, NoBackfillData};
pub use engine::{DispatchSummary, TriggerDispatcher};
pub use error::EngineError;
pub use states::StateAccess;
