//! Symbolic name registries.
//!
//! The loader binds guards, actions, and hooks by name: a document refers
//! to `context_has_key`, and the registry maps that name to a factory
//! which, given the transition's string property bag, produces the actual
//! callable. Registries are populated when the loader is constructed and
//! are never mutated during compilation.

use std::collections::HashMap;
use trellis_core::{Action, Guard, Hook};

/// String parameter bag handed to factories at bind time.
pub type Props = HashMap<String, String>;

/// Produces a guard from bind-time properties.
pub type GuardFactory = Box<dyn Fn(&Props) -> Guard + Send + Sync>;

/// Produces an action from bind-time properties.
pub type ActionFactory = Box<dyn Fn(&Props) -> Action + Send + Sync>;

/// Produces a hook from bind-time properties.
pub type HookFactory = Box<dyn Fn(&Props) -> Hook + Send + Sync>;

/// A name-keyed factory table.
pub struct Registry<F> {
    entries: HashMap<String, F>,
}

impl<F> Registry<F> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registers a factory under a name, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, factory: F) {
        self.entries.insert(name.into(), factory);
    }

    /// Looks up a factory by name.
    pub fn resolve(&self, name: &str) -> Option<&F> {
        self.entries.get(name)
    }

    /// Returns true if the name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<F> Default for Registry<F> {
    fn default() -> Self {
        Self::new()
    }
}

pub type GuardRegistry = Registry<GuardFactory>;
pub type ActionRegistry = Registry<ActionFactory>;
pub type HookRegistry = Registry<HookFactory>;

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{guard, Context};

    #[test]
    fn test_register_and_resolve() {
        let mut registry = GuardRegistry::new();
        registry.register("always_true", Box::new(|_props: &Props| guard::always_true()));

        assert!(registry.contains("always_true"));
        assert!(!registry.contains("always_false"));

        let factory = registry.resolve("always_true").unwrap();
        let guard = factory(&Props::new());
        assert!(guard.check(&Context::new()));
        assert!(registry.resolve("missing").is_none());
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = GuardRegistry::new();
        registry.register("b", Box::new(|_: &Props| guard::always_true()));
        registry.register("a", Box::new(|_: &Props| guard::always_true()));
        assert_eq!(registry.names(), vec!["a", "b"]);
    }
}
