//! Machine definition types.
//!
//! A [`MachineDefinition`] is the validated blueprint a machine instance is
//! created from: the state and event sets, the `(from, event)` transition
//! table, hook bindings, and an optional initial state. Definitions are
//! immutable once validated; they are produced by the builder or a
//! declarative loader.

use crate::action::Action;
use crate::error::CoreError;
use crate::guard::Guard;
use crate::hook::HookSet;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A state in the machine. Equality is by label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State(pub String);

impl State {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for State {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for State {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An event that can trigger transitions. Equality is by label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(pub String);

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Event {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Event {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A transition rule: `(from, event, to)` with an optional guard and action.
///
/// `guard_name` and `action_name` record the symbolic registry names when
/// the transition was compiled from a document, so a definition can be
/// extracted back out of a live machine.
#[derive(Debug, Clone)]
pub struct Transition {
    pub from: State,
    pub event: Event,
    pub to: State,
    pub guard: Option<Guard>,
    pub action: Option<Action>,
    pub guard_name: Option<String>,
    pub action_name: Option<String>,
}

impl Transition {
    /// Creates a plain transition with no guard or action.
    pub fn new(from: impl Into<State>, event: impl Into<Event>, to: impl Into<State>) -> Self {
        Self {
            from: from.into(),
            event: event.into(),
            to: to.into(),
            guard: None,
            action: None,
            guard_name: None,
            action_name: None,
        }
    }

    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_guard_name(mut self, name: impl Into<String>) -> Self {
        self.guard_name = Some(name.into());
        self
    }

    pub fn with_action_name(mut self, name: impl Into<String>) -> Self {
        self.action_name = Some(name.into());
        self
    }

    /// The unique key of this transition within a definition.
    pub fn key(&self) -> (State, Event) {
        (self.from.clone(), self.event.clone())
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --{}--> {}", self.from, self.event, self.to)
    }
}

/// Validated and indexed machine definition.
#[derive(Debug, Clone, Default)]
pub struct MachineDefinition {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) states: HashSet<State>,
    pub(crate) events: HashSet<Event>,
    pub(crate) transitions: HashMap<(State, Event), Transition>,
    pub(crate) hooks: HookSet,
    pub(crate) initial: Option<State>,
}

impl MachineDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns true if the state is part of the definition.
    pub fn has_state(&self, state: &State) -> bool {
        self.states.contains(state)
    }

    /// Returns true if the event is part of the definition.
    pub fn has_event(&self, event: &Event) -> bool {
        self.events.contains(event)
    }

    pub fn states(&self) -> &HashSet<State> {
        &self.states
    }

    pub fn events(&self) -> &HashSet<Event> {
        &self.events
    }

    pub fn initial(&self) -> Option<&State> {
        self.initial.as_ref()
    }

    /// Looks up the transition for a `(from, event)` pair.
    pub fn get_transition(&self, from: &State, event: &Event) -> Option<&Transition> {
        self.transitions.get(&(from.clone(), event.clone()))
    }

    /// Returns all transitions.
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.values()
    }

    /// Checks the definition for consistency.
    ///
    /// Uniqueness of `(from, event)` is structural (the table is keyed by
    /// it); the remaining rules are checked here.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_tables(&self.states, &self.events, &self.transitions, self.initial.as_ref())
    }
}

/// Validation shared between definitions and live machines.
pub(crate) fn validate_tables(
    states: &HashSet<State>,
    events: &HashSet<Event>,
    transitions: &HashMap<(State, Event), Transition>,
    initial: Option<&State>,
) -> Result<(), CoreError> {
    if states.is_empty() {
        return Err(CoreError::NoStates);
    }
    if events.is_empty() {
        return Err(CoreError::NoEvents);
    }

    for transition in transitions.values() {
        if !states.contains(&transition.from) {
            return Err(CoreError::StateNotFound {
                state: transition.from.clone(),
            });
        }
        if !states.contains(&transition.to) {
            return Err(CoreError::StateNotFound {
                state: transition.to.clone(),
            });
        }
        if !events.contains(&transition.event) {
            return Err(CoreError::EventNotFound {
                event: transition.event.clone(),
            });
        }
    }

    if let Some(initial) = initial {
        if !states.contains(initial) {
            return Err(CoreError::StateNotFound {
                state: initial.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MachineBuilder;

    #[test]
    fn test_state_event_labels() {
        let state = State::from("red");
        assert_eq!(state.as_str(), "red");
        assert_eq!(state, State::new("red".to_string()));
        assert_eq!(format!("{}", state), "red");

        let event: Event = "timer".into();
        assert_eq!(event.as_str(), "timer");
    }

    #[test]
    fn test_transition_display() {
        let t = Transition::new("a", "go", "b");
        assert_eq!(t.to_string(), "a --go--> b");
    }

    #[test]
    fn test_definition_lookup() {
        let def = MachineBuilder::new()
            .transition("red", "timer", "green")
            .transition("green", "timer", "yellow")
            .definition()
            .unwrap();

        assert!(def.has_state(&"red".into()));
        assert!(def.has_event(&"timer".into()));
        assert!(def
            .get_transition(&"red".into(), &"timer".into())
            .is_some());
        assert!(def.get_transition(&"red".into(), &"other".into()).is_none());
        assert_eq!(def.transitions().count(), 2);
    }

    #[test]
    fn test_validate_empty() {
        let def = MachineDefinition::default();
        assert!(matches!(def.validate(), Err(CoreError::NoStates)));
    }
}
