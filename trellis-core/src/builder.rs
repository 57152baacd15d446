//! Fluent machine construction.

use crate::action::Action;
use crate::context::Context;
use crate::definition::{Event, MachineDefinition, State, Transition};
use crate::error::CoreError;
use crate::guard::Guard;
use crate::hook::{Hook, HookKind, HookSet};
use crate::machine::{Machine, TransitionResult};
use std::collections::{HashMap, HashSet};

/// Chainable builder for machine definitions and instances.
///
/// States and events referenced by transitions are registered implicitly,
/// so a machine can be declared transition-first. Adding a second
/// transition for the same `(from, event)` pair overwrites the first.
///
/// `build` validates the definition and, when an initial state was set,
/// starts the machine before returning it.
#[derive(Default)]
pub struct MachineBuilder {
    name: String,
    description: String,
    states: HashSet<State>,
    events: HashSet<Event>,
    transitions: HashMap<(State, Event), Transition>,
    hooks: HookSet,
    initial: Option<State>,
}

impl MachineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the machine name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the machine description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds a state. Idempotent.
    pub fn add_state(mut self, state: impl Into<State>) -> Self {
        self.states.insert(state.into());
        self
    }

    /// Adds several states at once.
    pub fn add_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<State>,
    {
        self.states.extend(states.into_iter().map(Into::into));
        self
    }

    /// Adds an event. Idempotent.
    pub fn add_event(mut self, event: impl Into<Event>) -> Self {
        self.events.insert(event.into());
        self
    }

    /// Adds several events at once.
    pub fn add_events<I, E>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Event>,
    {
        self.events.extend(events.into_iter().map(Into::into));
        self
    }

    /// Adds a plain transition.
    pub fn transition(
        self,
        from: impl Into<State>,
        event: impl Into<Event>,
        to: impl Into<State>,
    ) -> Self {
        self.add_transition(Transition::new(from, event, to))
    }

    /// Adds a guarded transition.
    pub fn transition_when(
        self,
        from: impl Into<State>,
        event: impl Into<Event>,
        to: impl Into<State>,
        guard: Guard,
    ) -> Self {
        self.add_transition(Transition::new(from, event, to).with_guard(guard))
    }

    /// Adds a transition with an action.
    pub fn transition_do(
        self,
        from: impl Into<State>,
        event: impl Into<Event>,
        to: impl Into<State>,
        action: Action,
    ) -> Self {
        self.add_transition(Transition::new(from, event, to).with_action(action))
    }

    /// Adds a transition with both a guard and an action.
    pub fn transition_full(
        self,
        from: impl Into<State>,
        event: impl Into<Event>,
        to: impl Into<State>,
        guard: Guard,
        action: Action,
    ) -> Self {
        self.add_transition(
            Transition::new(from, event, to)
                .with_guard(guard)
                .with_action(action),
        )
    }

    /// Adds a pre-built transition, registering its states and event.
    pub fn add_transition(mut self, transition: Transition) -> Self {
        self.states.insert(transition.from.clone());
        self.states.insert(transition.to.clone());
        self.events.insert(transition.event.clone());
        self.transitions.insert(transition.key(), transition);
        self
    }

    /// Sets the state the machine starts in. The state is registered
    /// implicitly.
    pub fn initial_state(mut self, state: impl Into<State>) -> Self {
        let state = state.into();
        self.states.insert(state.clone());
        self.initial = Some(state);
        self
    }

    /// Registers a hook for a kind.
    pub fn hook(mut self, kind: HookKind, hook: Hook) -> Self {
        self.hooks.push(kind, hook);
        self
    }

    /// Registers a `BeforeTransition` hook.
    pub fn before_transition(
        self,
        f: impl Fn(&TransitionResult, &Context) + Send + Sync + 'static,
    ) -> Self {
        self.hook(HookKind::BeforeTransition, Hook::new(f))
    }

    /// Registers an `AfterTransition` hook.
    pub fn after_transition(
        self,
        f: impl Fn(&TransitionResult, &Context) + Send + Sync + 'static,
    ) -> Self {
        self.hook(HookKind::AfterTransition, Hook::new(f))
    }

    /// Registers an `OnStateEnter` hook.
    pub fn on_state_enter(
        self,
        f: impl Fn(&TransitionResult, &Context) + Send + Sync + 'static,
    ) -> Self {
        self.hook(HookKind::OnStateEnter, Hook::new(f))
    }

    /// Registers an `OnStateExit` hook.
    pub fn on_state_exit(
        self,
        f: impl Fn(&TransitionResult, &Context) + Send + Sync + 'static,
    ) -> Self {
        self.hook(HookKind::OnStateExit, Hook::new(f))
    }

    /// Registers an `OnTransitionError` hook.
    pub fn on_transition_error(
        self,
        f: impl Fn(&TransitionResult, &Context) + Send + Sync + 'static,
    ) -> Self {
        self.hook(HookKind::OnTransitionError, Hook::new(f))
    }

    /// Validates and returns the definition without creating a machine.
    pub fn definition(self) -> Result<MachineDefinition, CoreError> {
        let definition = MachineDefinition {
            name: self.name,
            description: self.description,
            states: self.states,
            events: self.events,
            transitions: self.transitions,
            hooks: self.hooks,
            initial: self.initial,
        };
        definition.validate()?;
        Ok(definition)
    }

    /// Validates the definition and returns a machine, started in the
    /// initial state when one was set.
    pub fn build(self) -> Result<Machine, CoreError> {
        let initial = self.initial.clone();
        let machine = Machine::from_definition(self.definition()?);
        if let Some(initial) = initial {
            machine.start(initial)?;
        }
        Ok(machine)
    }
}
