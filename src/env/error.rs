//! Environment error types

use thiserror::Error;

/// Failures raised by an RL environment capability
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    #[error("Action {action} outside action space of size {size}")]
    InvalidAction { action: u32, size: u32 },

    #[error("Environment stepped before reset")]
    NotReset,

    #[error("Environment stepped without a pushed FL state")]
    MissingState,

    #[error("Environment failure: {0}")]
    Failed(String),
}
