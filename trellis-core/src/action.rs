//! Transition actions.
//!
//! An action runs once per committed transition, between the before hooks
//! and the exit/enter hooks. Actions may mutate the context and may fail;
//! a failing action aborts the transition and leaves the machine in its
//! source state.

use crate::context::Context;
use crate::definition::{Event, State};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Error type returned by actions.
pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

type ActionFn = dyn Fn(&State, &State, &Event, &Context) -> Result<(), ActionError> + Send + Sync;

/// A first-class transition action.
#[derive(Clone)]
pub struct Action(Arc<ActionFn>);

impl Action {
    /// Wraps an action closure.
    pub fn new(
        f: impl Fn(&State, &State, &Event, &Context) -> Result<(), ActionError> + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(f))
    }

    /// Executes the action.
    pub fn run(&self, from: &State, to: &State, event: &Event, ctx: &Context) -> Result<(), ActionError> {
        (self.0)(from, to, event, ctx)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Action")
    }
}

/// An action that logs the transition with a message.
pub fn log(message: impl Into<String>) -> Action {
    let message = message.into();
    Action::new(move |from, to, event, _ctx| {
        tracing::info!(target: "trellis::action", %from, %to, %event, "{}", message);
        Ok(())
    })
}

/// An action that stores a value in the context.
pub fn set_context(key: impl Into<String>, value: impl Into<Value>) -> Action {
    let key = key.into();
    let value = value.into();
    Action::new(move |_from, _to, _event, ctx| {
        ctx.set(key.clone(), value.clone());
        Ok(())
    })
}

/// An action that increments a numeric counter in the context.
///
/// A missing key starts at 1; integer and floating-point counters are both
/// supported. Non-numeric values are left untouched.
pub fn increment_counter(key: impl Into<String>) -> Action {
    let key = key.into();
    Action::new(move |_from, _to, _event, ctx| {
        match ctx.get(&key) {
            None => ctx.set(key.clone(), 1),
            Some(Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    ctx.set(key.clone(), i + 1);
                } else if let Some(f) = n.as_f64() {
                    ctx.set(key.clone(), f + 1.0);
                }
            }
            Some(_) => {}
        }
        Ok(())
    })
}
