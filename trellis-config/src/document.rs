//! Declarative machine documents.
//!
//! A [`MachineDocument`] is the serialized shape a machine definition
//! travels in, identical in JSON and YAML:
//!
//! ```yaml
//! name: order
//! initial_state: pending
//! states:
//!   - name: pending
//!   - name: shipped
//! events:
//!   - name: ship
//! transitions:
//!   - from: pending
//!     event: ship
//!     to: shipped
//!     condition: context_has_key
//!     properties:
//!       key: paid
//! context:
//!   paid: true
//! hooks:
//!   after_transition:
//!     - action: log_transition
//!       properties:
//!         prefix: ORDER
//! ```
//!
//! `condition` and `action` are symbolic names resolved through the
//! loader's registries.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A machine definition document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineDocument {
    pub name: String,
    pub description: String,
    pub initial_state: String,
    pub states: Vec<StateDoc>,
    pub events: Vec<EventDoc>,
    pub transitions: Vec<TransitionDoc>,
    pub context: HashMap<String, Value>,
    pub hooks: HashMap<String, Vec<HookDoc>>,
}

impl MachineDocument {
    /// Parses a document from a JSON string.
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Parses a document from a YAML string.
    pub fn from_yaml(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(input)?)
    }

    /// Serializes the document to pretty JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Serializes the document to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Returns the names of all declared states.
    pub fn state_names(&self) -> Vec<&str> {
        self.states.iter().map(|s| s.name.as_str()).collect()
    }

    /// Returns the names of all declared events.
    pub fn event_names(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.name.as_str()).collect()
    }
}

/// A state declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StateDoc {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
}

impl StateDoc {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// An event declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventDoc {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
}

impl EventDoc {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A transition declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionDoc {
    pub from: String,
    pub event: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    pub properties: HashMap<String, String>,
}

impl TransitionDoc {
    pub fn new(
        from: impl Into<String>,
        event: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            event: event.into(),
            to: to.into(),
            ..Default::default()
        }
    }
}

/// A hook binding inside a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HookDoc {
    #[serde(rename = "type")]
    pub hook_type: String,
    pub action: String,
    pub properties: HashMap<String, String>,
}
