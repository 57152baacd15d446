//! Shared key/value context.
//!
//! Every machine owns one [`Context`]: a string-keyed bag of JSON values
//! reachable from guards, actions, and hooks. The context has its own
//! internal lock, so writes from outside the transition step are safe;
//! writes performed inside a guard, action, or hook participate in that
//! machine's atomic step.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A clonable handle to a shared key/value store.
///
/// Clones share the same underlying map; [`Context::get_all`] produces a
/// detached copy instead.
#[derive(Clone, Default)]
pub struct Context {
    data: Arc<RwLock<HashMap<String, Value>>>,
}

impl Context {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieves a value by key.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.read().get(key).cloned()
    }

    /// Stores a key/value pair.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.write().insert(key.into(), value.into());
    }

    /// Removes a key, returning its previous value.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.data.write().remove(key)
    }

    /// Returns true if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// Returns a snapshot of all entries, disconnected from future writes.
    pub fn get_all(&self) -> HashMap<String, Value> {
        self.data.read().clone()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if the context holds no entries.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Retrieves a boolean value.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Retrieves a numeric value, coercing integers to floats.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Retrieves an integer value.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Retrieves a string value.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("entries", &self.data.read().len())
            .finish()
    }
}

impl FromIterator<(String, Value)> for Context {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            data: Arc::new(RwLock::new(iter.into_iter().collect())),
        }
    }
}
