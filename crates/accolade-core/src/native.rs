// native.rs — In-process handler registry.
//
// The simplest Evaluator: named Rust closures. Hosts that don't embed a
// scripting runtime register their handler logic here and reference it
// from definitions by name.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::EvalError;
use crate::evaluator::{BindingContext, Evaluator, HandlerRef};

type HandlerFn = Box<dyn Fn(&mut BindingContext<'_>) -> Result<Value, EvalError> + Send + Sync>;

/// An [`Evaluator`] backed by a map of named closures.
pub struct NativeEvaluator {
    handlers: HashMap<HandlerRef, HandlerFn>,
}

impl NativeEvaluator {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under a name. Re-registering a name replaces
    /// the previous handler.
    pub fn register<F>(&mut self, handler: impl Into<HandlerRef>, f: F)
    where
        F: Fn(&mut BindingContext<'_>) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        self.handlers.insert(handler.into(), Box::new(f));
    }

    /// Whether a handler is registered under this name.
    pub fn contains(&self, handler: &HandlerRef) -> bool {
        self.handlers.contains_key(handler)
    }
}

impl Default for NativeEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator for NativeEvaluator {
    fn invoke(
        &self,
        handler: &HandlerRef,
        ctx: &mut BindingContext<'_>,
    ) -> Result<Value, EvalError> {
        let f = self
            .handlers
            .get(handler)
            .ok_or_else(|| EvalError::UnknownHandler(handler.clone()))?;
        f(ctx)
    }
}
