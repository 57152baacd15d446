//! Configuration error types.

use thiserror::Error;
use trellis_core::CoreError;

/// Errors from document compilation and parsing.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown guard: {name}")]
    UnknownGuard { name: String },

    #[error("unknown action: {name}")]
    UnknownAction { name: String },

    #[error("unknown hook action: {name}")]
    UnknownHook { name: String },

    #[error("unknown hook kind: {name}")]
    UnknownHookKind { name: String },

    #[error("definition contains no states")]
    EmptyDefinition,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}
