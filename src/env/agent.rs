//! Random agent driving the RL flow of a campaign

use std::sync::Arc;

use eyre::Result;
use serde::Serialize;
use tracing::{debug, info};

use crate::handshake::TuningHandshake;
use crate::lifecycle::LifecycleController;

use super::adapter::{AdapterHandle, Boundary, EnvironmentAdapter};
use super::environment::RlEnvironment;
use super::policy::RandomPolicy;

/// Rewards collected over one episode
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeReport {
    pub episode: u32,
    pub steps: u32,
    pub total_reward: f64,
}

/// Everything the agent saw during a campaign
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentReport {
    pub episodes: Vec<EpisodeReport>,
}

impl AgentReport {
    pub fn total_steps(&self) -> u32 {
        self.episodes.iter().map(|e| e.steps).sum()
    }

    pub fn best_episode(&self) -> Option<&EpisodeReport> {
        self.episodes
            .iter()
            .max_by(|a, b| a.total_reward.total_cmp(&b.total_reward))
    }
}

/// Plays sampled actions until the campaign is over
///
/// Episode boundaries come from the FL side through the adapter, so the
/// agent never needs to know the round budget.
pub struct RandomAgent {
    adapter: EnvironmentAdapter,
    target_reward: Option<f64>,
}

impl RandomAgent {
    pub fn new(
        env: Box<dyn RlEnvironment>,
        seed: Option<u64>,
        handshake: Arc<TuningHandshake>,
        controller: Arc<LifecycleController>,
    ) -> (Self, AdapterHandle) {
        debug!(?seed, "RandomAgent::new: called");
        let policy = Box::new(RandomPolicy::new(seed));
        let (adapter, handle) = EnvironmentAdapter::new(env, policy, handshake, controller);
        let agent = Self {
            adapter,
            target_reward: None,
        };
        (agent, handle)
    }

    /// Reward whose crossing is reported in the log
    pub fn with_target_reward(mut self, target_reward: Option<f64>) -> Self {
        self.target_reward = target_reward;
        self
    }

    pub async fn run(mut self) -> Result<AgentReport> {
        debug!("RandomAgent::run: called");
        self.adapter.start().await?;

        let mut report = AgentReport::default();
        let mut current = EpisodeReport {
            episode: 0,
            steps: 0,
            total_reward: 0.0,
        };

        loop {
            let outcome = self.adapter.drive_one_step().await?;
            current.episode = outcome.episode;
            current.steps += 1;
            current.total_reward += outcome.result.reward;
            debug!(
                episode = outcome.episode,
                round = outcome.round,
                reward = outcome.result.reward,
                "RandomAgent::run: stepped"
            );

            if outcome.boundary == Boundary::None {
                continue;
            }

            info!(
                "RL Agent: episode {} finished after {} steps with total reward {:.4}",
                current.episode + 1,
                current.steps,
                current.total_reward
            );
            if let Some(target) = self.target_reward {
                if current.total_reward >= target {
                    info!("RL Agent: target reward {:.2}% reached in episode {}", 100.0 * target, current.episode + 1);
                }
            }

            let next_episode = match outcome.boundary {
                Boundary::NextEpisode(next) => Some(next),
                _ => None,
            };
            report.episodes.push(current.clone());

            match next_episode {
                Some(next) => {
                    current = EpisodeReport {
                        episode: next,
                        steps: 0,
                        total_reward: 0.0,
                    };
                }
                None => return Ok(report),
            }
        }
    }
}
