//! RL environment capability

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::EnvError;
use super::space::{Action, ActionSpace};

/// Observation vector returned by `reset` and `step`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Observation {
    pub values: Vec<f64>,
}

impl Observation {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }
}

/// Result of one environment step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub observation: Observation,
    pub reward: f64,
    pub done: bool,
    pub info: serde_json::Value,
}

/// Gym-style environment fed with federated round outcomes
///
/// The observation and reward computation is the environment's own business;
/// the adapter only pushes FL state in with [`get_state`](Self::get_state)
/// and steps it once per round.
#[async_trait]
pub trait RlEnvironment: Send {
    fn action_space(&self) -> &ActionSpace;

    /// Push the outcome of the round the next `step` observes
    fn get_state(&mut self, accuracy: f64, done: bool);

    async fn reset(&mut self) -> Result<Observation, EnvError>;

    async fn step(&mut self, action: Action) -> Result<StepResult, EnvError>;
}
