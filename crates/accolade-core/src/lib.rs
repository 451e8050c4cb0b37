//! # accolade-core
//!
//! Core data model for the Accolade achievement engine.
//!
//! An [`AchievableDefinition`] describes one achievement or goal: which
//! trigger types it listens to, the handlers that accumulate per-player
//! and shared state when those triggers arrive, and the predicates that
//! decide satisfaction and disqualification. Definitions reference
//! handler code through an [`Evaluator`] rather than holding it, so the
//! same definition works against an in-process closure registry, an
//! embedded scripting runtime, or anything else that can resolve a
//! [`HandlerRef`].
//!
//! ## Key components
//!
//! - [`AchievableDefinition`] / [`AchievableBuilder`] — the immutable
//!   definition and its serializable, validated builder form
//! - [`Trigger`] / [`Event`] — the host occurrence contract and its
//!   dispatchable wrapper
//! - [`StateView`] — live state layered over frozen declared defaults,
//!   with memoizing read-through and dirty tracking
//! - [`Predicate`] — explicit All/Any/Check trees with short-circuit
//!   evaluation
//! - [`Evaluator`] / [`BindingContext`] — the handler invocation seam
//! - [`NativeEvaluator`] — a named-closure registry for hosts without a
//!   scripting runtime
//! - [`Progress`] — progress snapshots from a definition's optional
//!   progress handler

pub mod definition;
pub mod error;
pub mod evaluator;
pub mod native;
pub mod player;
pub mod predicate;
pub mod progress;
pub mod state;
pub mod trigger;

pub use definition::{AchievableBuilder, AchievableDefinition};
pub use error::{BuildError, EvalError};
pub use evaluator::{BindingContext, Evaluator, HandlerRef};
pub use native::NativeEvaluator;
pub use player::PlayerId;
pub use predicate::Predicate;
pub use progress::Progress;
pub use state::{StateMap, StateView};
pub use trigger::{Event, SimpleEvent, Trigger, TriggerType};
