//! Bus event messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// A message routed through the bus to one machine.
///
/// `id` and `timestamp` may be left unset; the bus fills them in on
/// publish. Timestamps serialize as RFC3339.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    #[serde(default)]
    pub id: String,
    pub machine_id: String,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub context: HashMap<String, Value>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub destination: String,
}

impl EventMessage {
    /// Creates a message with a fresh id and timestamp.
    pub fn new(machine_id: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            id: generate_message_id(),
            machine_id: machine_id.into(),
            event: event.into(),
            timestamp: Some(Utc::now()),
            context: HashMap::new(),
            source: String::new(),
            destination: String::new(),
        }
    }

    pub fn with_context(mut self, context: HashMap<String, Value>) -> Self {
        self.context = context;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    /// Fills in a missing id or timestamp.
    pub fn fill_defaults(&mut self) {
        if self.id.is_empty() {
            self.id = generate_message_id();
        }
        if self.timestamp.is_none() {
            self.timestamp = Some(Utc::now());
        }
    }
}

fn generate_message_id() -> String {
    format!("evt-{}", Uuid::new_v4().simple())
}
