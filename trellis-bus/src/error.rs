//! Bus error types.

use thiserror::Error;

/// Errors from the in-process event bus.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("machine not registered: {id}")]
    MachineNotRegistered { id: String },

    #[error("timed out publishing event to machine {id}")]
    PublishTimeout { id: String },

    #[error("broadcast failed for {failures} machine(s)")]
    Broadcast { failures: usize },

    #[error("event bus is closed")]
    Closed,

    #[error("handler error: {0}")]
    Handler(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
