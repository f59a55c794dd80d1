//! Lifecycle error types

use thiserror::Error;

use super::controller::LifecycleState;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LifecycleError {
    #[error("Cannot {action} while {state}")]
    InvalidTransition { state: LifecycleState, action: &'static str },

    #[error("Round outcome for round {reported} does not follow round {completed}")]
    RoundMismatch { reported: u32, completed: u32 },

    #[error("Round {round} reported accuracy {accuracy}, outside [0, 1]")]
    InvalidAccuracy { round: u32, accuracy: f64 },

    #[error("No episode termination criterion: configure a round budget or a target accuracy")]
    MissingCriterion,

    #[error("Episode budget must be at least 1")]
    EmptyEpisodeBudget,
}
