//! # trellis-bus
//!
//! In-process event bus for trellis machines.
//!
//! This crate provides:
//! - Per-machine bounded event queues with processor tasks
//! - Subscriber fan-out with non-blocking, drop-on-full delivery
//! - Broadcast to all registered machines
//! - An optional append-only event log with JSON serialization and replay

pub mod bus;
pub mod error;
pub mod log;
pub mod message;

pub use bus::{BusConfig, EventBus, EventHandler};
pub use error::BusError;
pub use log::EventLog;
pub use message::EventMessage;
