// predicate.rs — Boolean predicate trees over handler checks.
//
// Satisfaction and disqualification are expressed as explicit trees of
// All / Any over leaf checks, not as an opaque combined handler. The
// tagged enum serializes as e.g. {"all": [{"check": "has_pings"}]}, so a
// stored definition states its combinator structure in the open.

use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::evaluator::{BindingContext, Evaluator, HandlerRef};

/// A boolean expression over handler checks.
///
/// Evaluation short-circuits: `All` stops at the first false child,
/// `Any` stops at the first true child. An empty `All` is true and an
/// empty `Any` is false, the usual identities; builders refuse the cases
/// where that would surprise (a definition with no satisfied checks).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// True when every child is true.
    All(Vec<Predicate>),
    /// True when at least one child is true.
    Any(Vec<Predicate>),
    /// Delegate to a handler, which must return a boolean.
    Check(HandlerRef),
}

impl Predicate {
    pub fn all(children: Vec<Predicate>) -> Self {
        Predicate::All(children)
    }

    pub fn any(children: Vec<Predicate>) -> Self {
        Predicate::Any(children)
    }

    pub fn check(handler: impl Into<HandlerRef>) -> Self {
        Predicate::Check(handler.into())
    }

    /// Evaluate the tree against an evaluator, short-circuiting. The
    /// first handler failure aborts the whole evaluation.
    pub fn evaluate(
        &self,
        evaluator: &dyn Evaluator,
        ctx: &mut BindingContext<'_>,
    ) -> Result<bool, EvalError> {
        match self {
            Predicate::All(children) => {
                for child in children {
                    if !child.evaluate(evaluator, ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Any(children) => {
                for child in children {
                    if child.evaluate(evaluator, ctx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Predicate::Check(handler) => evaluator.invoke_predicate(handler, ctx),
        }
    }

    /// Every handler referenced anywhere in the tree, in evaluation order.
    pub fn referenced_handlers(&self) -> Vec<&HandlerRef> {
        let mut out = Vec::new();
        self.collect_handlers(&mut out);
        out
    }

    fn collect_handlers<'a>(&'a self, out: &mut Vec<&'a HandlerRef>) {
        match self {
            Predicate::All(children) | Predicate::Any(children) => {
                for child in children {
                    child.collect_handlers(out);
                }
            }
            Predicate::Check(handler) => out.push(handler),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::player::PlayerId;
    use crate::state::{StateMap, StateView};

    /// Answers according to the handler name and counts invocations.
    struct ScriptedEvaluator {
        calls: AtomicUsize,
    }

    impl ScriptedEvaluator {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Evaluator for ScriptedEvaluator {
        fn invoke(
            &self,
            handler: &HandlerRef,
            _ctx: &mut BindingContext<'_>,
        ) -> Result<Value, EvalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match handler.as_str() {
                "yes" => Ok(json!(true)),
                "no" => Ok(json!(false)),
                "boom" => Err(EvalError::HandlerFailed {
                    handler: handler.clone(),
                    message: "scripted failure".to_string(),
                }),
                other => Err(EvalError::UnknownHandler(HandlerRef::from(other))),
            }
        }
    }

    fn ctx_parts() -> (PlayerId, StateView, StateView) {
        let defaults = Arc::new(StateMap::new());
        (
            PlayerId::from("alice"),
            StateView::fresh(defaults.clone()),
            StateView::fresh(defaults),
        )
    }

    #[test]
    fn all_requires_every_check() {
        let (player, mut state, mut shared) = ctx_parts();
        let evaluator = ScriptedEvaluator::new();

        let p = Predicate::all(vec![Predicate::check("yes"), Predicate::check("no")]);
        let mut ctx = BindingContext::player_scope(&player, &mut state, &mut shared, None);
        assert!(!p.evaluate(&evaluator, &mut ctx).unwrap());
    }

    #[test]
    fn all_short_circuits_on_first_false() {
        let (player, mut state, mut shared) = ctx_parts();
        let evaluator = ScriptedEvaluator::new();

        // "boom" would error, but the false before it stops evaluation.
        let p = Predicate::all(vec![Predicate::check("no"), Predicate::check("boom")]);
        let mut ctx = BindingContext::player_scope(&player, &mut state, &mut shared, None);
        assert!(!p.evaluate(&evaluator, &mut ctx).unwrap());
        assert_eq!(evaluator.calls(), 1);
    }

    #[test]
    fn any_short_circuits_on_first_true() {
        let (player, mut state, mut shared) = ctx_parts();
        let evaluator = ScriptedEvaluator::new();

        let p = Predicate::any(vec![Predicate::check("yes"), Predicate::check("boom")]);
        let mut ctx = BindingContext::player_scope(&player, &mut state, &mut shared, None);
        assert!(p.evaluate(&evaluator, &mut ctx).unwrap());
        assert_eq!(evaluator.calls(), 1);
    }

    #[test]
    fn nested_trees_evaluate() {
        let (player, mut state, mut shared) = ctx_parts();
        let evaluator = ScriptedEvaluator::new();

        let p = Predicate::all(vec![
            Predicate::check("yes"),
            Predicate::any(vec![Predicate::check("no"), Predicate::check("yes")]),
        ]);
        let mut ctx = BindingContext::player_scope(&player, &mut state, &mut shared, None);
        assert!(p.evaluate(&evaluator, &mut ctx).unwrap());
    }

    #[test]
    fn handler_failure_aborts_evaluation() {
        let (player, mut state, mut shared) = ctx_parts();
        let evaluator = ScriptedEvaluator::new();

        let p = Predicate::all(vec![Predicate::check("yes"), Predicate::check("boom")]);
        let mut ctx = BindingContext::player_scope(&player, &mut state, &mut shared, None);
        let err = p.evaluate(&evaluator, &mut ctx).unwrap_err();
        assert!(matches!(err, EvalError::HandlerFailed { .. }));
    }

    #[test]
    fn empty_identities() {
        let (player, mut state, mut shared) = ctx_parts();
        let evaluator = ScriptedEvaluator::new();

        let mut ctx = BindingContext::player_scope(&player, &mut state, &mut shared, None);
        assert!(Predicate::all(vec![]).evaluate(&evaluator, &mut ctx).unwrap());
        assert!(!Predicate::any(vec![]).evaluate(&evaluator, &mut ctx).unwrap());
        assert_eq!(evaluator.calls(), 0);
    }

    #[test]
    fn serialization_shape_and_round_trip() {
        let p = Predicate::all(vec![
            Predicate::check("has_pings"),
            Predicate::any(vec![Predicate::check("is_vip"), Predicate::check("is_og")]),
        ]);

        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"all\""));
        assert!(json.contains("\"any\""));
        assert!(json.contains("{\"check\":\"has_pings\"}"));

        let restored: Predicate = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, p);
    }

    #[test]
    fn referenced_handlers_walks_the_tree() {
        let p = Predicate::all(vec![
            Predicate::check("a"),
            Predicate::any(vec![Predicate::check("b"), Predicate::check("c")]),
        ]);
        let refs: Vec<&str> = p.referenced_handlers().iter().map(|h| h.as_str()).collect();
        assert_eq!(refs, vec!["a", "b", "c"]);
    }
}
