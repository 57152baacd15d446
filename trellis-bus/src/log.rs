//! Append-only event log.
//!
//! An in-memory record of every published message, with per-machine and
//! timestamp filters, JSON serialization, and replay. Ordering follows
//! append order; across machines that only reflects publish order, not a
//! global transition order.

use crate::bus::process_message;
use crate::error::BusError;
use crate::message::EventMessage;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use trellis_core::Machine;

/// An append-only, in-memory message log.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<EventMessage>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message.
    pub fn append(&self, msg: EventMessage) {
        self.events.lock().push(msg);
    }

    /// Returns a snapshot of all messages in append order.
    pub fn all(&self) -> Vec<EventMessage> {
        self.events.lock().clone()
    }

    /// Returns the messages addressed to one machine.
    pub fn for_machine(&self, machine_id: &str) -> Vec<EventMessage> {
        self.events
            .lock()
            .iter()
            .filter(|msg| msg.machine_id == machine_id)
            .cloned()
            .collect()
    }

    /// Returns the messages stamped after the given instant.
    pub fn after(&self, timestamp: DateTime<Utc>) -> Vec<EventMessage> {
        self.events
            .lock()
            .iter()
            .filter(|msg| msg.timestamp.map(|t| t > timestamp).unwrap_or(false))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Serializes the log to JSON.
    pub fn to_json(&self) -> Result<String, BusError> {
        Ok(serde_json::to_string(&*self.events.lock())?)
    }

    /// Restores a log from its JSON form.
    pub fn from_json(input: &str) -> Result<Self, BusError> {
        let events: Vec<EventMessage> = serde_json::from_str(input)?;
        Ok(Self {
            events: Mutex::new(events),
        })
    }

    /// Replays one machine's messages onto a machine instance: each
    /// message merges its context, then sends its event. Rejected events
    /// are skipped, as during live processing.
    pub fn replay(&self, machine: &Machine, machine_id: &str) {
        for msg in self.for_machine(machine_id) {
            process_message(machine, &msg);
        }
    }
}
