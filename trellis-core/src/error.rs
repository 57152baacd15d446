//! Core error types.

use crate::definition::{Event, State};
use std::sync::Arc;
use thiserror::Error;

/// Errors from the state machine runtime.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("state '{state}' is not defined in this machine")]
    StateNotFound { state: State },

    #[error("event '{event}' is not defined in this machine")]
    EventNotFound { event: Event },

    #[error("no transition from state '{from}' on event '{event}'")]
    InvalidTransition { from: State, event: Event },

    #[error("transition condition not met for '{from}' on event '{event}'")]
    ConditionNotMet { from: State, event: Event },

    #[error("cannot send event '{event}' to a stopped machine")]
    MachineNotRunning { event: Event },

    #[error("cannot reset: machine has never been started")]
    NoInitialState,

    #[error("machine has no states defined")]
    NoStates,

    #[error("machine has no events defined")]
    NoEvents,

    #[error("no transition found from state '{from}' on event '{event}'")]
    TransitionNotFound { from: State, event: Event },

    #[error("action failed for '{from}' on event '{event}': {source}")]
    ActionFailed {
        from: State,
        event: Event,
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
}

impl CoreError {
    /// Returns the error kind as a stable tag.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::StateNotFound { .. } => "StateNotFound",
            CoreError::EventNotFound { .. } => "EventNotFound",
            CoreError::InvalidTransition { .. } => "InvalidTransition",
            CoreError::ConditionNotMet { .. } => "ConditionNotMet",
            CoreError::MachineNotRunning { .. } => "MachineNotRunning",
            CoreError::NoInitialState => "NoInitialState",
            CoreError::NoStates => "NoStates",
            CoreError::NoEvents => "NoEvents",
            CoreError::TransitionNotFound { .. } => "TransitionNotFound",
            CoreError::ActionFailed { .. } => "ActionFailed",
        }
    }
}
