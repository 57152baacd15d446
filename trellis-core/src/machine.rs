//! The transition core.
//!
//! A [`Machine`] binds a definition, a context, and a current state, and
//! executes the transition protocol: precondition checks, guard
//! evaluation, action execution, and hook dispatch, all as one atomic step
//! serialized by the machine's lock.
//!
//! Locking discipline: mutating operations (`send_event`, `set_state`,
//! lifecycle, transition/hook mutation) hold the exclusive lock for the
//! entire step, including hook execution. Hooks therefore MUST NOT call
//! back into the same machine synchronously; follow-up events must be
//! scheduled on a separate thread. Read operations take the shared lock.

use crate::context::Context;
use crate::definition::{validate_tables, Event, MachineDefinition, State, Transition};
use crate::error::CoreError;
use crate::hook::{Hook, HookKind, HookSet};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use uuid::Uuid;

/// The outcome of one transition attempt.
///
/// Lifecycle emissions (`start`, `stop`, `reset`, `set_state`) carry no
/// `event`; the first state placement carries no `from`, and `stop`
/// carries no `to`.
#[derive(Debug, Clone)]
pub struct TransitionResult {
    /// Whether the attempt committed.
    pub success: bool,
    /// State before the attempt.
    pub from: Option<State>,
    /// State after the attempt (target state for failed attempts).
    pub to: Option<State>,
    /// Event that triggered the attempt.
    pub event: Option<Event>,
    /// The failure, when `success` is false.
    pub error: Option<CoreError>,
    /// When the attempt was executed.
    pub timestamp: DateTime<Utc>,
    /// Unique identifier for this attempt (128 random bits as hex).
    pub execution_id: String,
}

impl TransitionResult {
    fn new(
        success: bool,
        from: Option<State>,
        to: Option<State>,
        event: Option<Event>,
        error: Option<CoreError>,
    ) -> Self {
        Self {
            success,
            from,
            to,
            event,
            error,
            timestamp: Utc::now(),
            execution_id: Uuid::new_v4().simple().to_string(),
        }
    }

    /// A committed transition result.
    pub(crate) fn committed(from: State, to: State, event: Event) -> Self {
        Self::new(true, Some(from), Some(to), Some(event), None)
    }

    /// A failed attempt.
    pub(crate) fn failed(
        from: Option<State>,
        to: Option<State>,
        event: Option<Event>,
        error: CoreError,
    ) -> Self {
        Self::new(false, from, to, event, Some(error))
    }

    /// A lifecycle emission (start/stop/reset/set_state).
    pub(crate) fn lifecycle(from: Option<State>, to: Option<State>) -> Self {
        Self::new(true, from, to, None, None)
    }

    /// The error kind tag, when the attempt failed.
    pub fn error_kind(&self) -> Option<&'static str> {
        self.error.as_ref().map(|e| e.kind())
    }
}

struct Inner {
    name: String,
    description: String,
    states: HashSet<State>,
    events: HashSet<Event>,
    transitions: HashMap<(State, Event), Transition>,
    hooks: HookSet,
    context: Context,
    current: Option<State>,
    running: bool,
    initial: Option<State>,
}

/// A runtime machine instance.
///
/// The machine is `Send + Sync`; share it behind an `Arc` and drive it
/// from any number of threads. All transitions on one machine are totally
/// ordered.
pub struct Machine {
    inner: RwLock<Inner>,
}

impl Machine {
    /// Creates an empty machine with no states, events, or transitions.
    pub fn new() -> Self {
        Self::from_definition(MachineDefinition::default())
    }

    /// Creates a machine instance from a validated definition.
    ///
    /// The machine is not running; the initial state is recorded at the
    /// first `start`, not here.
    pub fn from_definition(definition: MachineDefinition) -> Self {
        Self {
            inner: RwLock::new(Inner {
                name: definition.name,
                description: definition.description,
                states: definition.states,
                events: definition.events,
                transitions: definition.transitions,
                hooks: definition.hooks,
                context: Context::new(),
                current: None,
                running: false,
                initial: None,
            }),
        }
    }

    /// Machine name (from the definition, may be empty).
    pub fn name(&self) -> String {
        self.inner.read().name.clone()
    }

    /// Machine description (from the definition, may be empty).
    pub fn description(&self) -> String {
        self.inner.read().description.clone()
    }

    // =========================================================================
    // Event processing
    // =========================================================================

    /// Sends an event through the transition protocol.
    ///
    /// The whole step runs under the exclusive lock: preconditions, guard,
    /// `BeforeTransition` hooks, the action, `OnStateExit`, the state
    /// change, `OnStateEnter`, `AfterTransition`. Every failure fires the
    /// `OnTransitionError` hooks with a failed result and leaves the
    /// current state untouched. A failed action aborts the attempt before
    /// any exit or enter hook has fired.
    pub fn send_event(&self, event: impl Into<Event>) -> Result<TransitionResult, CoreError> {
        let event = event.into();
        let mut inner = self.inner.write();

        if !inner.running {
            let err = CoreError::MachineNotRunning {
                event: event.clone(),
            };
            return Err(fail(&inner, Some(event), err));
        }

        if !inner.events.contains(&event) {
            let err = CoreError::EventNotFound {
                event: event.clone(),
            };
            return Err(fail(&inner, Some(event), err));
        }

        let Some(from) = inner.current.clone() else {
            let err = CoreError::MachineNotRunning {
                event: event.clone(),
            };
            return Err(fail(&inner, Some(event), err));
        };

        let transition = match inner.transitions.get(&(from.clone(), event.clone())) {
            Some(t) => t.clone(),
            None => {
                let err = CoreError::InvalidTransition {
                    from: from.clone(),
                    event: event.clone(),
                };
                return Err(fail(&inner, Some(event), err));
            }
        };

        if let Some(guard) = &transition.guard {
            if !guard.check(&inner.context) {
                let err = CoreError::ConditionNotMet {
                    from: from.clone(),
                    event: event.clone(),
                };
                return Err(fail(&inner, Some(event), err));
            }
        }

        let ctx = inner.context.clone();
        let mut result = TransitionResult::committed(from.clone(), transition.to.clone(), event.clone());

        dispatch_hooks(inner.hooks.get(HookKind::BeforeTransition), &result, &ctx);

        if let Some(action) = &transition.action {
            if let Err(source) = action.run(&from, &transition.to, &event, &ctx) {
                let error = CoreError::ActionFailed {
                    from: from.clone(),
                    event: event.clone(),
                    source: Arc::from(source),
                };
                result.success = false;
                result.error = Some(error.clone());
                dispatch_hooks(inner.hooks.get(HookKind::OnTransitionError), &result, &ctx);
                return Err(error);
            }
        }

        dispatch_hooks(inner.hooks.get(HookKind::OnStateExit), &result, &ctx);
        inner.current = Some(transition.to.clone());
        dispatch_hooks(inner.hooks.get(HookKind::OnStateEnter), &result, &ctx);
        dispatch_hooks(inner.hooks.get(HookKind::AfterTransition), &result, &ctx);

        tracing::debug!(
            from = %from,
            to = %transition.to,
            event = %event,
            execution_id = %result.execution_id,
            "transition applied"
        );

        Ok(result)
    }

    /// Returns true if the event could trigger a transition right now:
    /// the machine is running, the event is known, a transition exists for
    /// the current state, and its guard (if any) passes.
    pub fn can_transition(&self, event: impl Into<Event>) -> bool {
        let event = event.into();
        let inner = self.inner.read();
        can_transition_locked(&inner, &event)
    }

    /// All events for which `can_transition` holds at this instant.
    /// Point-in-time snapshot; no stability across calls.
    pub fn valid_events(&self) -> Vec<Event> {
        let inner = self.inner.read();
        inner
            .events
            .iter()
            .filter(|e| can_transition_locked(&inner, e))
            .cloned()
            .collect()
    }

    // =========================================================================
    // State access
    // =========================================================================

    /// Current state, or `None` before the first start.
    pub fn current_state(&self) -> Option<State> {
        self.inner.read().current.clone()
    }

    /// Places the machine in a state directly, bypassing guards and
    /// transition rules. Fires `OnStateExit`/`OnStateEnter` only; meant
    /// for initialization and recovery.
    pub fn set_state(&self, state: impl Into<State>) -> Result<(), CoreError> {
        let state = state.into();
        let mut inner = self.inner.write();

        if !inner.states.contains(&state) {
            return Err(CoreError::StateNotFound { state });
        }

        tracing::warn!(state = %state, "set_state bypasses guards and transition hooks");

        let old = inner.current.replace(state.clone());
        if let Some(old) = old.clone() {
            let result = TransitionResult::lifecycle(Some(old), Some(state.clone()));
            dispatch_hooks(inner.hooks.get(HookKind::OnStateExit), &result, &inner.context);
        }
        let result = TransitionResult::lifecycle(old, Some(state));
        dispatch_hooks(inner.hooks.get(HookKind::OnStateEnter), &result, &inner.context);
        Ok(())
    }

    /// Returns true if the state is defined in this machine.
    pub fn is_valid_state(&self, state: impl Into<State>) -> bool {
        self.inner.read().states.contains(&state.into())
    }

    /// All registered states, in no particular order.
    pub fn states(&self) -> Vec<State> {
        self.inner.read().states.iter().cloned().collect()
    }

    /// All registered events, in no particular order.
    pub fn events(&self) -> Vec<Event> {
        self.inner.read().events.iter().cloned().collect()
    }

    /// Registers a state at runtime. Idempotent.
    pub fn add_state(&self, state: impl Into<State>) {
        self.inner.write().states.insert(state.into());
    }

    /// Registers an event at runtime. Idempotent.
    pub fn add_event(&self, event: impl Into<Event>) {
        self.inner.write().events.insert(event.into());
    }

    // =========================================================================
    // Transition management
    // =========================================================================

    /// Adds a transition rule. The referenced states and event must
    /// already be registered. An existing rule for the same
    /// `(from, event)` pair is overwritten.
    pub fn add_transition(&self, transition: Transition) -> Result<(), CoreError> {
        let mut inner = self.inner.write();

        if !inner.states.contains(&transition.from) {
            return Err(CoreError::StateNotFound {
                state: transition.from.clone(),
            });
        }
        if !inner.states.contains(&transition.to) {
            return Err(CoreError::StateNotFound {
                state: transition.to.clone(),
            });
        }
        if !inner.events.contains(&transition.event) {
            return Err(CoreError::EventNotFound {
                event: transition.event.clone(),
            });
        }

        inner.transitions.insert(transition.key(), transition);
        Ok(())
    }

    /// Removes the transition for a `(from, event)` pair.
    pub fn remove_transition(
        &self,
        from: impl Into<State>,
        event: impl Into<Event>,
    ) -> Result<(), CoreError> {
        let from = from.into();
        let event = event.into();
        let mut inner = self.inner.write();

        if inner
            .transitions
            .remove(&(from.clone(), event.clone()))
            .is_none()
        {
            return Err(CoreError::TransitionNotFound { from, event });
        }
        Ok(())
    }

    /// Returns all transition rules.
    pub fn transitions(&self) -> Vec<Transition> {
        self.inner.read().transitions.values().cloned().collect()
    }

    // =========================================================================
    // Hooks and context
    // =========================================================================

    /// Registers a hook. Hooks of one kind fire in registration order.
    pub fn add_hook(&self, kind: HookKind, hook: Hook) {
        self.inner.write().hooks.push(kind, hook);
    }

    /// Removes all hooks of the given kind.
    pub fn remove_hooks(&self, kind: HookKind) {
        self.inner.write().hooks.clear(kind);
    }

    /// Returns a handle to the machine's context.
    pub fn context(&self) -> Context {
        self.inner.read().context.clone()
    }

    /// Replaces the machine's context.
    pub fn set_context(&self, context: Context) {
        self.inner.write().context = context;
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Starts the machine in the given state and fires `OnStateEnter`.
    ///
    /// Initialization is not a transition: no `BeforeTransition` or
    /// `AfterTransition` hooks fire. The initial state is recorded on the
    /// first start only (later starts do not change what `reset` returns
    /// to).
    pub fn start(&self, state: impl Into<State>) -> Result<(), CoreError> {
        let state = state.into();
        let mut inner = self.inner.write();

        if !inner.states.contains(&state) {
            return Err(CoreError::StateNotFound { state });
        }

        if inner.initial.is_none() {
            inner.initial = Some(state.clone());
        }
        inner.current = Some(state.clone());
        inner.running = true;

        let result = TransitionResult::lifecycle(None, Some(state.clone()));
        dispatch_hooks(inner.hooks.get(HookKind::OnStateEnter), &result, &inner.context);

        tracing::debug!(state = %state, "machine started");
        Ok(())
    }

    /// Stops the machine and fires `OnStateExit` for the current state.
    /// Subsequent events fail with `MachineNotRunning`. Idempotent.
    pub fn stop(&self) {
        let mut inner = self.inner.write();

        if inner.running {
            if let Some(current) = inner.current.clone() {
                let result = TransitionResult::lifecycle(Some(current), None);
                dispatch_hooks(inner.hooks.get(HookKind::OnStateExit), &result, &inner.context);
            }
            tracing::debug!("machine stopped");
        }
        inner.running = false;
    }

    /// Returns the machine to its recorded initial state and resumes it.
    /// Fails with `NoInitialState` if the machine has never been started.
    pub fn reset(&self) -> Result<(), CoreError> {
        let mut inner = self.inner.write();

        let Some(initial) = inner.initial.clone() else {
            return Err(CoreError::NoInitialState);
        };

        let old = inner.current.clone();
        if inner.running {
            if let Some(old) = old.clone() {
                let result = TransitionResult::lifecycle(Some(old), Some(initial.clone()));
                dispatch_hooks(inner.hooks.get(HookKind::OnStateExit), &result, &inner.context);
            }
        }

        inner.current = Some(initial.clone());
        inner.running = true;

        let result = TransitionResult::lifecycle(old, Some(initial.clone()));
        dispatch_hooks(inner.hooks.get(HookKind::OnStateEnter), &result, &inner.context);

        tracing::debug!(state = %initial, "machine reset");
        Ok(())
    }

    /// Returns true if the machine accepts events.
    pub fn is_running(&self) -> bool {
        self.inner.read().running
    }

    /// The state recorded at the first start, if any.
    pub fn initial_state(&self) -> Option<State> {
        self.inner.read().initial.clone()
    }

    /// Checks the machine configuration for consistency: non-empty state
    /// and event sets, and every transition referencing registered states
    /// and events.
    pub fn validate(&self) -> Result<(), CoreError> {
        let inner = self.inner.read();
        validate_tables(
            &inner.states,
            &inner.events,
            &inner.transitions,
            inner.initial.as_ref(),
        )
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Machine")
            .field("name", &inner.name)
            .field("current", &inner.current)
            .field("running", &inner.running)
            .field("states", &inner.states.len())
            .field("events", &inner.events.len())
            .field("transitions", &inner.transitions.len())
            .finish()
    }
}

/// Builds a failed result, fires the error hooks, and hands the error back.
fn fail(inner: &Inner, event: Option<Event>, error: CoreError) -> CoreError {
    let result = TransitionResult::failed(
        inner.current.clone(),
        inner.current.clone(),
        event,
        error.clone(),
    );
    dispatch_hooks(
        inner.hooks.get(HookKind::OnTransitionError),
        &result,
        &inner.context,
    );
    error
}

fn can_transition_locked(inner: &Inner, event: &Event) -> bool {
    if !inner.running || !inner.events.contains(event) {
        return false;
    }
    let Some(current) = &inner.current else {
        return false;
    };
    match inner.transitions.get(&(current.clone(), event.clone())) {
        Some(t) => t
            .guard
            .as_ref()
            .map(|g| g.check(&inner.context))
            .unwrap_or(true),
        None => false,
    }
}

/// Runs hooks in order. A panicking hook is logged and skipped; committed
/// state is never affected.
fn dispatch_hooks(hooks: &[Hook], result: &TransitionResult, ctx: &Context) {
    for hook in hooks {
        if catch_unwind(AssertUnwindSafe(|| hook.call(result, ctx))).is_err() {
            tracing::warn!(
                execution_id = %result.execution_id,
                "hook panicked; continuing with remaining hooks"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MachineBuilder;
    use crate::guard;
    use crate::action::Action;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn traffic_light() -> Machine {
        MachineBuilder::new()
            .transition("red", "timer", "green")
            .transition("green", "timer", "yellow")
            .transition("yellow", "timer", "red")
            .initial_state("red")
            .build()
            .unwrap()
    }

    #[test]
    fn test_send_event_walks_states() {
        let machine = traffic_light();
        assert_eq!(machine.current_state(), Some("red".into()));

        let result = machine.send_event("timer").unwrap();
        assert!(result.success);
        assert_eq!(result.from, Some("red".into()));
        assert_eq!(result.to, Some("green".into()));
        assert_eq!(result.event, Some("timer".into()));
        assert_eq!(result.execution_id.len(), 32);
        assert_eq!(machine.current_state(), Some("green".into()));
    }

    #[test]
    fn test_send_event_not_running() {
        let machine = traffic_light();
        machine.stop();

        let err = machine.send_event("timer").unwrap_err();
        assert!(matches!(err, CoreError::MachineNotRunning { .. }));
        assert_eq!(machine.current_state(), Some("red".into()));
    }

    #[test]
    fn test_send_event_unknown_event() {
        let machine = traffic_light();
        let err = machine.send_event("bogus").unwrap_err();
        assert!(matches!(err, CoreError::EventNotFound { .. }));
    }

    #[test]
    fn test_send_event_invalid_transition() {
        let machine = MachineBuilder::new()
            .transition("a", "go", "b")
            .transition("b", "back", "a")
            .initial_state("a")
            .build()
            .unwrap();

        let err = machine.send_event("back").unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert_eq!(machine.current_state(), Some("a".into()));
    }

    #[test]
    fn test_guard_blocks_until_met() {
        let machine = MachineBuilder::new()
            .transition_when("waiting", "check", "ready", guard::context_has_key("token"))
            .initial_state("waiting")
            .build()
            .unwrap();

        let err = machine.send_event("check").unwrap_err();
        assert!(matches!(err, CoreError::ConditionNotMet { .. }));
        assert_eq!(machine.current_state(), Some("waiting".into()));

        machine.context().set("token", json!(1));
        let result = machine.send_event("check").unwrap();
        assert!(result.success);
        assert_eq!(machine.current_state(), Some("ready".into()));
    }

    #[test]
    fn test_action_failure_keeps_state() {
        let machine = MachineBuilder::new()
            .transition_do(
                "a",
                "go",
                "b",
                Action::new(|_, _, _, _| Err("db unavailable".into())),
            )
            .initial_state("a")
            .build()
            .unwrap();

        let err = machine.send_event("go").unwrap_err();
        assert!(matches!(err, CoreError::ActionFailed { .. }));
        assert!(err.to_string().contains("db unavailable"));
        assert_eq!(machine.current_state(), Some("a".into()));
    }

    #[test]
    fn test_action_mutates_context() {
        let machine = MachineBuilder::new()
            .transition_do("a", "go", "b", crate::action::increment_counter("hops"))
            .transition_do("b", "back", "a", crate::action::increment_counter("hops"))
            .initial_state("a")
            .build()
            .unwrap();

        machine.send_event("go").unwrap();
        machine.send_event("back").unwrap();
        assert_eq!(machine.context().get_i64("hops"), Some(2));
    }

    #[test]
    fn test_error_hooks_fire_for_preconditions() {
        let machine = traffic_light();
        let errors = Arc::new(AtomicUsize::new(0));
        {
            let errors = errors.clone();
            machine.add_hook(
                HookKind::OnTransitionError,
                Hook::new(move |result, _| {
                    assert!(!result.success);
                    assert!(result.error.is_some());
                    errors.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }

        let _ = machine.send_event("bogus");
        machine.stop();
        let _ = machine.send_event("timer");
        assert_eq!(errors.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_can_transition_and_valid_events() {
        let machine = MachineBuilder::new()
            .transition("idle", "work", "busy")
            .transition("busy", "done", "idle")
            .transition_when("idle", "skip", "idle", guard::always_false())
            .initial_state("idle")
            .build()
            .unwrap();

        assert!(machine.can_transition("work"));
        assert!(!machine.can_transition("done"));
        assert!(!machine.can_transition("skip"));
        assert!(!machine.can_transition("unknown"));

        let valid = machine.valid_events();
        assert_eq!(valid, vec![Event::from("work")]);

        machine.stop();
        assert!(!machine.can_transition("work"));
        assert!(machine.valid_events().is_empty());
    }

    #[test]
    fn test_set_state_fires_exit_and_enter_only() {
        let machine = traffic_light();
        let trace = Arc::new(parking_lot::Mutex::new(Vec::new()));
        for kind in HookKind::ALL {
            let trace = trace.clone();
            machine.add_hook(
                kind,
                Hook::new(move |_, _| trace.lock().push(kind.as_str())),
            );
        }

        machine.set_state("yellow").unwrap();
        assert_eq!(machine.current_state(), Some("yellow".into()));
        assert_eq!(*trace.lock(), vec!["on_state_exit", "on_state_enter"]);

        let err = machine.set_state("purple").unwrap_err();
        assert!(matches!(err, CoreError::StateNotFound { .. }));
    }

    #[test]
    fn test_lifecycle_start_stop_reset() {
        let machine = traffic_light();
        machine.send_event("timer").unwrap();
        machine.send_event("timer").unwrap();
        assert_eq!(machine.current_state(), Some("yellow".into()));

        machine.stop();
        assert!(!machine.is_running());

        machine.reset().unwrap();
        assert!(machine.is_running());
        assert_eq!(machine.current_state(), Some("red".into()));
    }

    #[test]
    fn test_reset_requires_start() {
        let machine = Machine::new();
        machine.add_state("a");
        let err = machine.reset().unwrap_err();
        assert!(matches!(err, CoreError::NoInitialState));
    }

    #[test]
    fn test_initial_state_recorded_once() {
        let machine = traffic_light();
        machine.stop();
        machine.start("green").unwrap();
        machine.reset().unwrap();
        // Reset returns to the state of the *first* start.
        assert_eq!(machine.current_state(), Some("red".into()));
    }

    #[test]
    fn test_runtime_transition_management() {
        let machine = Machine::new();
        machine.add_state("a");
        machine.add_state("b");
        machine.add_event("go");

        machine.add_transition(Transition::new("a", "go", "b")).unwrap();
        assert_eq!(machine.transitions().len(), 1);

        // Unregistered references are rejected.
        let err = machine
            .add_transition(Transition::new("a", "go", "c"))
            .unwrap_err();
        assert!(matches!(err, CoreError::StateNotFound { .. }));
        let err = machine
            .add_transition(Transition::new("a", "jump", "b"))
            .unwrap_err();
        assert!(matches!(err, CoreError::EventNotFound { .. }));

        // Last writer wins for the same (from, event).
        machine.add_transition(Transition::new("a", "go", "a")).unwrap();
        assert_eq!(machine.transitions().len(), 1);
        assert_eq!(machine.transitions()[0].to, State::from("a"));

        machine.remove_transition("a", "go").unwrap();
        let err = machine.remove_transition("a", "go").unwrap_err();
        assert!(matches!(err, CoreError::TransitionNotFound { .. }));
    }

    #[test]
    fn test_remove_hooks() {
        let machine = traffic_light();
        let count = Arc::new(AtomicUsize::new(0));
        {
            let count = count.clone();
            machine.add_hook(
                HookKind::AfterTransition,
                Hook::new(move |_, _| {
                    count.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }

        machine.send_event("timer").unwrap();
        machine.remove_hooks(HookKind::AfterTransition);
        machine.send_event("timer").unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_hook_does_not_corrupt_state() {
        let machine = traffic_light();
        machine.add_hook(
            HookKind::OnStateEnter,
            Hook::new(|_, _| panic!("observer bug")),
        );
        let after = Arc::new(AtomicUsize::new(0));
        {
            let after = after.clone();
            machine.add_hook(
                HookKind::AfterTransition,
                Hook::new(move |_, _| {
                    after.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }

        let result = machine.send_event("timer").unwrap();
        assert!(result.success);
        assert_eq!(machine.current_state(), Some("green".into()));
        // Remaining hooks still ran.
        assert_eq!(after.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_set_context_replaces_store() {
        let machine = traffic_light();
        machine.context().set("old", json!(true));

        let fresh = Context::new();
        fresh.set("new", json!(1));
        machine.set_context(fresh);

        assert!(machine.context().get("old").is_none());
        assert_eq!(machine.context().get_i64("new"), Some(1));
    }

    #[test]
    fn test_validate_reports_missing_pieces() {
        let machine = Machine::new();
        assert!(matches!(machine.validate(), Err(CoreError::NoStates)));

        machine.add_state("a");
        assert!(matches!(machine.validate(), Err(CoreError::NoEvents)));

        machine.add_event("go");
        machine.validate().unwrap();
    }
}
