//! Default environment: observe accuracy, reward accuracy gain

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::environment::{Observation, RlEnvironment, StepResult};
use super::error::EnvError;
use super::space::{Action, ActionSpace};

/// Environment whose observation is `[accuracy, round]` and whose reward is
/// the accuracy gained by the last round
#[derive(Debug, Clone)]
pub struct AccuracyEnv {
    space: ActionSpace,
    pending: Option<(f64, bool)>,
    last_accuracy: f64,
    round: u32,
    ready: bool,
}

impl AccuracyEnv {
    pub fn new(space: ActionSpace) -> Self {
        Self {
            space,
            pending: None,
            last_accuracy: 0.0,
            round: 0,
            ready: false,
        }
    }
}

#[async_trait]
impl RlEnvironment for AccuracyEnv {
    fn action_space(&self) -> &ActionSpace {
        &self.space
    }

    fn get_state(&mut self, accuracy: f64, done: bool) {
        debug!(%accuracy, %done, "AccuracyEnv::get_state: called");
        self.pending = Some((accuracy, done));
    }

    async fn reset(&mut self) -> Result<Observation, EnvError> {
        debug!("AccuracyEnv::reset: called");
        self.pending = None;
        self.last_accuracy = 0.0;
        self.round = 0;
        self.ready = true;
        Ok(Observation::new(vec![0.0, 0.0]))
    }

    async fn step(&mut self, action: Action) -> Result<StepResult, EnvError> {
        if !self.ready {
            return Err(EnvError::NotReset);
        }
        let tuned_value = self.space.to_tuned_value(action)?;
        let (accuracy, done) = self.pending.take().ok_or(EnvError::MissingState)?;

        self.round += 1;
        let reward = accuracy - self.last_accuracy;
        self.last_accuracy = accuracy;
        if done {
            self.ready = false;
        }

        Ok(StepResult {
            observation: Observation::new(vec![accuracy, self.round as f64]),
            reward,
            done,
            info: json!({ "round": self.round, "tuned-value": tuned_value }),
        })
    }
}
