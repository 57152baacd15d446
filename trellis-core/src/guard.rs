//! Transition guards.
//!
//! A guard is a pure predicate over the machine context, evaluated before a
//! transition commits. Guards should not mutate the context; a guard that
//! does participates in the transition step but makes `can_transition`
//! unreliable.

use crate::context::Context;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A first-class guard predicate.
#[derive(Clone)]
pub struct Guard(Arc<dyn Fn(&Context) -> bool + Send + Sync>);

impl Guard {
    /// Wraps a predicate closure.
    pub fn new(f: impl Fn(&Context) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Evaluates the guard against a context.
    pub fn check(&self, ctx: &Context) -> bool {
        (self.0)(ctx)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard")
    }
}

/// A guard that always allows the transition.
pub fn always_true() -> Guard {
    Guard::new(|_| true)
}

/// A guard that never allows the transition.
pub fn always_false() -> Guard {
    Guard::new(|_| false)
}

/// Allows the transition when the key is present in the context.
pub fn context_has_key(key: impl Into<String>) -> Guard {
    let key = key.into();
    Guard::new(move |ctx| ctx.contains_key(&key))
}

/// Allows the transition when the context value equals the expected value.
///
/// Numbers compare by value, so an integer `3` in the context matches an
/// expected `3.0`.
pub fn context_equals(key: impl Into<String>, expected: impl Into<Value>) -> Guard {
    let key = key.into();
    let expected = expected.into();
    Guard::new(move |ctx| match ctx.get(&key) {
        Some(actual) => values_equal(&actual, &expected),
        None => false,
    })
}

/// Allows the transition when the numeric context value exceeds the
/// threshold. Integer and floating-point values are both accepted.
pub fn context_greater_than(key: impl Into<String>, threshold: f64) -> Guard {
    let key = key.into();
    Guard::new(move |ctx| match ctx.get(&key).as_ref().and_then(value_as_f64) {
        Some(v) => v > threshold,
        None => false,
    })
}

/// Coerces a JSON value to f64 when it is numeric.
pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Value equality with numeric coercion.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .zip(b.as_f64())
            .map(|(a, b)| (a - b).abs() < f64::EPSILON)
            .unwrap_or(false),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_constant_guards() {
        let ctx = Context::new();
        assert!(always_true().check(&ctx));
        assert!(!always_false().check(&ctx));
    }

    #[test]
    fn test_context_has_key() {
        let ctx = Context::new();
        let guard = context_has_key("token");
        assert!(!guard.check(&ctx));

        ctx.set("token", json!(1));
        assert!(guard.check(&ctx));
    }

    #[test]
    fn test_context_equals() {
        let ctx = Context::new();
        ctx.set("status", json!("active"));
        ctx.set("count", json!(3));

        assert!(context_equals("status", "active").check(&ctx));
        assert!(!context_equals("status", "inactive").check(&ctx));
        assert!(!context_equals("missing", "x").check(&ctx));

        // Integer in context, float expectation: coerced.
        assert!(context_equals("count", 3.0).check(&ctx));
        assert!(!context_equals("count", 4).check(&ctx));
    }

    #[test]
    fn test_context_greater_than() {
        let ctx = Context::new();
        ctx.set("amount", json!(150));
        ctx.set("rate", json!(0.75));
        ctx.set("label", json!("high"));

        let guard = context_greater_than("amount", 100.0);
        assert!(guard.check(&ctx));
        assert!(!context_greater_than("amount", 150.0).check(&ctx));
        assert!(context_greater_than("rate", 0.5).check(&ctx));

        // Non-numeric and missing values never pass.
        assert!(!context_greater_than("label", 0.0).check(&ctx));
        assert!(!context_greater_than("missing", 0.0).check(&ctx));
    }

    #[test]
    fn test_custom_guard() {
        let ctx = Context::new();
        ctx.set("a", json!(2));
        ctx.set("b", json!(3));

        let guard = Guard::new(|ctx| {
            ctx.get_i64("a").unwrap_or(0) + ctx.get_i64("b").unwrap_or(0) > 4
        });
        assert!(guard.check(&ctx));

        ctx.set("b", json!(1));
        assert!(!guard.check(&ctx));
    }
}
