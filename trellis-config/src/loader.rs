//! Document-to-machine compilation.
//!
//! The [`Loader`] turns a [`MachineDocument`] into a validated definition
//! or a live machine. Guards, actions, and hooks are bound symbolically
//! through name-keyed registries; the built-in vocabulary is registered at
//! construction and embedders add their own with `register_*`.
//!
//! Built-in guards: `always_true`, `always_false`, `context_has_key{key}`,
//! `context_equals{key,value}`, `context_greater_than{key,threshold}`.
//! Built-in actions: `log{message}`, `set_context{key,value}`,
//! `increment_counter{key}`.
//! Built-in hooks: `log_transition{prefix}`, `log_state_enter{prefix}`.

use crate::document::{EventDoc, MachineDocument, StateDoc, TransitionDoc};
use crate::error::ConfigError;
use crate::registry::{ActionRegistry, GuardRegistry, HookRegistry, Props};
use serde_json::Value;
use trellis_core::{
    action, guard, Hook, HookKind, Machine, MachineBuilder, MachineDefinition, Transition,
};

/// Compiles machine documents through symbolic registries.
pub struct Loader {
    guards: GuardRegistry,
    actions: ActionRegistry,
    hooks: HookRegistry,
}

impl Loader {
    /// Creates a loader with the built-in vocabulary registered.
    pub fn new() -> Self {
        let mut loader = Self {
            guards: GuardRegistry::new(),
            actions: ActionRegistry::new(),
            hooks: HookRegistry::new(),
        };
        loader.register_builtins();
        loader
    }

    fn register_builtins(&mut self) {
        self.guards
            .register("always_true", Box::new(|_: &Props| guard::always_true()));
        self.guards
            .register("always_false", Box::new(|_: &Props| guard::always_false()));
        self.guards.register(
            "context_has_key",
            Box::new(|props: &Props| guard::context_has_key(prop(props, "key"))),
        );
        self.guards.register(
            "context_equals",
            Box::new(|props: &Props| {
                guard::context_equals(prop(props, "key"), parse_value(&prop(props, "value")))
            }),
        );
        self.guards.register(
            "context_greater_than",
            Box::new(|props: &Props| {
                let threshold = prop(props, "threshold").parse::<f64>().unwrap_or(0.0);
                guard::context_greater_than(prop(props, "key"), threshold)
            }),
        );

        self.actions.register(
            "log",
            Box::new(|props: &Props| action::log(prop(props, "message"))),
        );
        self.actions.register(
            "set_context",
            Box::new(|props: &Props| {
                action::set_context(prop(props, "key"), parse_value(&prop(props, "value")))
            }),
        );
        self.actions.register(
            "increment_counter",
            Box::new(|props: &Props| action::increment_counter(prop(props, "key"))),
        );

        self.hooks.register(
            "log_transition",
            Box::new(|props: &Props| {
                let prefix = prop_or(props, "prefix", "TRANSITION");
                Hook::new(move |result, _ctx| {
                    tracing::info!(
                        target: "trellis::hook",
                        "[{}] {} -> {} (event: {})",
                        prefix,
                        label(&result.from),
                        label(&result.to),
                        result.event.as_ref().map(|e| e.as_str()).unwrap_or("-"),
                    );
                })
            }),
        );
        self.hooks.register(
            "log_state_enter",
            Box::new(|props: &Props| {
                let prefix = prop_or(props, "prefix", "STATE_ENTER");
                Hook::new(move |result, _ctx| {
                    tracing::info!(
                        target: "trellis::hook",
                        "[{}] entered state: {}",
                        prefix,
                        label(&result.to),
                    );
                })
            }),
        );
    }

    /// Registers a custom guard factory.
    pub fn register_guard(&mut self, name: impl Into<String>, factory: crate::registry::GuardFactory) {
        self.guards.register(name, factory);
    }

    /// Registers a custom action factory.
    pub fn register_action(
        &mut self,
        name: impl Into<String>,
        factory: crate::registry::ActionFactory,
    ) {
        self.actions.register(name, factory);
    }

    /// Registers a custom hook factory.
    pub fn register_hook(&mut self, name: impl Into<String>, factory: crate::registry::HookFactory) {
        self.hooks.register(name, factory);
    }

    /// Compiles a document into a validated definition.
    ///
    /// Symbolic guard/action/hook names are resolved eagerly; any unknown
    /// name fails the load. Later transitions for the same `(from, event)`
    /// pair shadow earlier ones.
    pub fn compile(&self, doc: &MachineDocument) -> Result<MachineDefinition, ConfigError> {
        let mut builder = MachineBuilder::new()
            .name(doc.name.as_str())
            .description(doc.description.as_str());

        for state in &doc.states {
            builder = builder.add_state(state.name.as_str());
        }
        for event in &doc.events {
            builder = builder.add_event(event.name.as_str());
        }

        for t in &doc.transitions {
            let mut transition = Transition::new(t.from.as_str(), t.event.as_str(), t.to.as_str());

            if let Some(name) = &t.condition {
                let factory =
                    self.guards
                        .resolve(name)
                        .ok_or_else(|| ConfigError::UnknownGuard {
                            name: name.clone(),
                        })?;
                transition = transition
                    .with_guard(factory(&t.properties))
                    .with_guard_name(name.clone());
            }

            if let Some(name) = &t.action {
                let factory =
                    self.actions
                        .resolve(name)
                        .ok_or_else(|| ConfigError::UnknownAction {
                            name: name.clone(),
                        })?;
                transition = transition
                    .with_action(factory(&t.properties))
                    .with_action_name(name.clone());
            }

            builder = builder.add_transition(transition);
        }

        for (kind_name, hook_docs) in &doc.hooks {
            let kind = HookKind::parse(kind_name).ok_or_else(|| ConfigError::UnknownHookKind {
                name: kind_name.clone(),
            })?;
            for hook_doc in hook_docs {
                let factory = self.hooks.resolve(&hook_doc.action).ok_or_else(|| {
                    ConfigError::UnknownHook {
                        name: hook_doc.action.clone(),
                    }
                })?;
                builder = builder.hook(kind, factory(&hook_doc.properties));
            }
        }

        if !doc.initial_state.is_empty() {
            builder = builder.initial_state(doc.initial_state.as_str());
        }

        Ok(builder.definition()?)
    }

    /// Compiles a document and returns a live machine, started when the
    /// document names an initial state, with the document's context
    /// entries seeded.
    pub fn build_machine(&self, doc: &MachineDocument) -> Result<Machine, ConfigError> {
        let definition = self.compile(doc)?;
        let initial = definition.initial().cloned();

        let machine = Machine::from_definition(definition);
        if let Some(initial) = initial {
            machine.start(initial)?;
        }

        let ctx = machine.context();
        for (key, value) in &doc.context {
            ctx.set(key.clone(), value.clone());
        }

        tracing::debug!(machine = %doc.name, "machine built from document");
        Ok(machine)
    }

    /// Produces a document from a live machine.
    ///
    /// Transitions carry their symbolic guard/action names only where the
    /// machine recorded them (definitions built programmatically have
    /// none); bind-time properties are not recoverable.
    pub fn extract(&self, machine: &Machine, name: &str, description: &str) -> MachineDocument {
        let mut states: Vec<String> = machine
            .states()
            .into_iter()
            .map(|s| s.0)
            .collect();
        states.sort_unstable();

        let mut events: Vec<String> = machine
            .events()
            .into_iter()
            .map(|e| e.0)
            .collect();
        events.sort_unstable();

        let mut transitions = machine.transitions();
        transitions.sort_by(|a, b| {
            (a.from.as_str(), a.event.as_str()).cmp(&(b.from.as_str(), b.event.as_str()))
        });

        MachineDocument {
            name: name.to_string(),
            description: description.to_string(),
            initial_state: machine
                .initial_state()
                .or_else(|| machine.current_state())
                .map(|s| s.0)
                .unwrap_or_default(),
            states: states.into_iter().map(StateDoc::named).collect(),
            events: events.into_iter().map(EventDoc::named).collect(),
            transitions: transitions
                .into_iter()
                .map(|t| TransitionDoc {
                    from: t.from.0.clone(),
                    event: t.event.0.clone(),
                    to: t.to.0.clone(),
                    condition: t.guard_name.clone(),
                    action: t.action_name.clone(),
                    properties: Props::new(),
                })
                .collect(),
            context: machine.context().get_all(),
            hooks: Default::default(),
        }
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

fn prop(props: &Props, key: &str) -> String {
    props.get(key).cloned().unwrap_or_default()
}

fn prop_or(props: &Props, key: &str, fallback: &str) -> String {
    props
        .get(key)
        .filter(|v| !v.is_empty())
        .cloned()
        .unwrap_or_else(|| fallback.to_string())
}

/// Interprets a string property as a JSON scalar where possible, so
/// `"3"` binds as a number and `"true"` as a boolean; anything else stays
/// a plain string.
fn parse_value(input: &str) -> Value {
    serde_json::from_str(input).unwrap_or_else(|_| Value::String(input.to_string()))
}

fn label(state: &Option<trellis_core::State>) -> &str {
    state.as_ref().map(|s| s.as_str()).unwrap_or("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gate_doc() -> MachineDocument {
        MachineDocument::from_json(
            r#"{
                "name": "gate",
                "description": "guarded gate",
                "initial_state": "waiting",
                "states": [{"name": "waiting"}, {"name": "ready"}],
                "events": [{"name": "check"}],
                "transitions": [
                    {"from": "waiting", "event": "check", "to": "ready",
                     "condition": "context_has_key",
                     "properties": {"key": "token"}}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_compile_resolves_symbols() {
        let loader = Loader::new();
        let def = loader.compile(&gate_doc()).unwrap();

        let t = def
            .get_transition(&"waiting".into(), &"check".into())
            .unwrap();
        assert!(t.guard.is_some());
        assert_eq!(t.guard_name.as_deref(), Some("context_has_key"));
        assert_eq!(def.initial(), Some(&"waiting".into()));
    }

    #[test]
    fn test_unknown_symbols_fail_the_load() {
        let loader = Loader::new();

        let mut doc = gate_doc();
        doc.transitions[0].condition = Some("no_such_guard".to_string());
        assert!(matches!(
            loader.compile(&doc),
            Err(ConfigError::UnknownGuard { .. })
        ));

        let mut doc = gate_doc();
        doc.transitions[0].condition = None;
        doc.transitions[0].action = Some("no_such_action".to_string());
        assert!(matches!(
            loader.compile(&doc),
            Err(ConfigError::UnknownAction { .. })
        ));

        let mut doc = gate_doc();
        doc.hooks.insert(
            "after_transition".to_string(),
            vec![crate::document::HookDoc {
                hook_type: "after_transition".to_string(),
                action: "no_such_hook".to_string(),
                properties: Props::new(),
            }],
        );
        assert!(matches!(
            loader.compile(&doc),
            Err(ConfigError::UnknownHook { .. })
        ));

        let mut doc = gate_doc();
        doc.hooks.insert(
            "sometimes_maybe".to_string(),
            vec![crate::document::HookDoc {
                hook_type: "sometimes_maybe".to_string(),
                action: "log_transition".to_string(),
                properties: Props::new(),
            }],
        );
        assert!(matches!(
            loader.compile(&doc),
            Err(ConfigError::UnknownHookKind { .. })
        ));
    }

    #[test]
    fn test_build_machine_runs_the_gate() {
        let loader = Loader::new();
        let machine = loader.build_machine(&gate_doc()).unwrap();

        assert!(machine.is_running());
        let err = machine.send_event("check").unwrap_err();
        assert_eq!(err.kind(), "ConditionNotMet");

        machine.context().set("token", json!(1));
        machine.send_event("check").unwrap();
        assert_eq!(machine.current_state(), Some("ready".into()));
    }

    #[test]
    fn test_build_machine_seeds_context() {
        let loader = Loader::new();
        let mut doc = gate_doc();
        doc.context.insert("token".to_string(), json!("seeded"));

        let machine = loader.build_machine(&doc).unwrap();
        assert_eq!(machine.context().get_str("token").as_deref(), Some("seeded"));

        // The seeded key satisfies the guard immediately.
        machine.send_event("check").unwrap();
        assert_eq!(machine.current_state(), Some("ready".into()));
    }

    #[test]
    fn test_builtin_guard_coercion() {
        let loader = Loader::new();
        let doc = MachineDocument::from_json(
            r#"{
                "name": "spender",
                "initial_state": "low",
                "states": [{"name": "low"}, {"name": "high"}],
                "events": [{"name": "spend"}],
                "transitions": [
                    {"from": "low", "event": "spend", "to": "high",
                     "condition": "context_greater_than",
                     "properties": {"key": "amount", "threshold": "100"}}
                ]
            }"#,
        )
        .unwrap();

        let machine = loader.build_machine(&doc).unwrap();

        // Integer value coerces against the float threshold.
        machine.context().set("amount", json!(150));
        assert!(machine.can_transition("spend"));
        machine.context().set("amount", json!(50.5));
        assert!(!machine.can_transition("spend"));
    }

    #[test]
    fn test_builtin_actions() {
        let loader = Loader::new();
        let doc = MachineDocument::from_json(
            r#"{
                "name": "counter",
                "initial_state": "a",
                "states": [{"name": "a"}, {"name": "b"}],
                "events": [{"name": "go"}, {"name": "back"}],
                "transitions": [
                    {"from": "a", "event": "go", "to": "b",
                     "action": "increment_counter", "properties": {"key": "n"}},
                    {"from": "b", "event": "back", "to": "a",
                     "action": "set_context",
                     "properties": {"key": "done", "value": "true"}}
                ]
            }"#,
        )
        .unwrap();

        let machine = loader.build_machine(&doc).unwrap();
        machine.send_event("go").unwrap();
        machine.send_event("back").unwrap();

        assert_eq!(machine.context().get_i64("n"), Some(1));
        // "true" binds as a boolean, not the string "true".
        assert_eq!(machine.context().get_bool("done"), Some(true));
    }

    #[test]
    fn test_custom_registration() {
        let mut loader = Loader::new();
        loader.register_guard(
            "is_weekend",
            Box::new(|_: &Props| trellis_core::Guard::new(|ctx| ctx.get_bool("weekend").unwrap_or(false))),
        );

        let mut doc = gate_doc();
        doc.transitions[0].condition = Some("is_weekend".to_string());

        let machine = loader.build_machine(&doc).unwrap();
        assert!(!machine.can_transition("check"));
        machine.context().set("weekend", json!(true));
        assert!(machine.can_transition("check"));
    }

    #[test]
    fn test_extract_roundtrip() {
        let loader = Loader::new();
        let machine = loader.build_machine(&gate_doc()).unwrap();
        machine.context().set("token", json!(1));

        let doc = loader.extract(&machine, "gate", "extracted");
        assert_eq!(doc.name, "gate");
        assert_eq!(doc.initial_state, "waiting");
        assert_eq!(doc.state_names(), vec!["ready", "waiting"]);
        assert_eq!(doc.event_names(), vec!["check"]);
        assert_eq!(doc.transitions.len(), 1);
        assert_eq!(
            doc.transitions[0].condition.as_deref(),
            Some("context_has_key")
        );
        assert_eq!(doc.context["token"], json!(1));

        // The extracted document compiles again. The guard binds with an
        // empty property bag, so only the symbolic name survives.
        let def = loader.compile(&doc).unwrap();
        assert!(def
            .get_transition(&"waiting".into(), &"check".into())
            .unwrap()
            .guard
            .is_some());
    }

    #[test]
    fn test_extract_omits_unrecorded_symbols() {
        let machine = MachineBuilder::new()
            .transition_when("a", "go", "b", guard::always_true())
            .initial_state("a")
            .build()
            .unwrap();

        let loader = Loader::new();
        let doc = loader.extract(&machine, "prog", "");
        assert!(doc.transitions[0].condition.is_none());
        assert!(doc.transitions[0].action.is_none());
    }
}
