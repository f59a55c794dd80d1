//! LifecycleController implementation

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::episode::SharedEpisode;
use crate::fl::RoundOutcome;
use crate::handshake::Signal;

use super::error::LifecycleError;

/// Lifecycle of the live episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    Running,
    EpisodeDone,
    AwaitingReset,
    CampaignDone,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::EpisodeDone => write!(f, "episode-done"),
            Self::AwaitingReset => write!(f, "awaiting-reset"),
            Self::CampaignDone => write!(f, "campaign-done"),
        }
    }
}

/// Result of folding one round outcome into Episode State
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundVerdict {
    /// Neither termination condition met
    Continue,
    /// The episode ended with this round
    EpisodeDone {
        /// No episode is left in the budget
        campaign_done: bool,
    },
}

impl RoundVerdict {
    pub fn episode_done(&self) -> bool {
        matches!(self, RoundVerdict::EpisodeDone { .. })
    }
}

/// What the FL side does once an episode has ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeDecision {
    /// Wait for the RL side to begin the next episode
    AwaitReset,
    /// Release connections and stop the campaign
    Terminate,
}

/// Termination criteria for episodes and the campaign
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeLimits {
    pub rounds: Option<u32>,
    pub target_accuracy: Option<f64>,
    pub episodes: u32,
}

impl EpisodeLimits {
    pub fn new(rounds: Option<u32>, target_accuracy: Option<f64>, episodes: u32) -> Result<Self, LifecycleError> {
        if rounds.is_none() && target_accuracy.is_none() {
            return Err(LifecycleError::MissingCriterion);
        }
        if episodes == 0 {
            return Err(LifecycleError::EmptyEpisodeBudget);
        }
        Ok(Self {
            rounds,
            target_accuracy,
            episodes,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, LifecycleError> {
        Self::new(config.training.rounds, config.training.target_accuracy, config.rl.episodes)
    }

    fn accuracy_reached(&self, accuracy: f64) -> bool {
        self.target_accuracy.is_some_and(|target| accuracy >= target)
    }

    fn budget_exhausted(&self, round_count: u32) -> bool {
        self.rounds.is_some_and(|rounds| round_count >= rounds)
    }

    fn is_final_episode(&self, episode_id: u32) -> bool {
        episode_id + 1 >= self.episodes
    }
}

/// Owns the episode/campaign state machine
///
/// The FL side folds outcomes and concludes episodes; the RL side begins new
/// episodes. Both mutate Episode State only through this controller.
#[derive(Debug)]
pub struct LifecycleController {
    limits: EpisodeLimits,
    episode: SharedEpisode,
    state: Mutex<LifecycleState>,
    new_episode_begin: Signal,
}

impl LifecycleController {
    pub fn new(limits: EpisodeLimits, episode: SharedEpisode) -> Self {
        debug!(?limits, "LifecycleController::new: called");
        Self {
            limits,
            episode,
            state: Mutex::new(LifecycleState::Running),
            new_episode_begin: Signal::new("new-episode-begin"),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.lock_state()
    }

    /// Whether the episode budget allows another episode after the current one
    pub fn has_next_episode(&self) -> bool {
        !self.episode.read(|s| self.limits.is_final_episode(s.episode_id))
    }

    /// Fold a completed round into Episode State (FL side)
    pub fn fold_outcome(&self, outcome: &RoundOutcome) -> Result<RoundVerdict, LifecycleError> {
        debug!(round = outcome.round_index, accuracy = outcome.accuracy, "LifecycleController::fold_outcome: called");
        let mut lifecycle = self.lock_state();
        if *lifecycle != LifecycleState::Running {
            return Err(LifecycleError::InvalidTransition {
                state: *lifecycle,
                action: "fold a round outcome",
            });
        }
        if !(0.0..=1.0).contains(&outcome.accuracy) {
            return Err(LifecycleError::InvalidAccuracy {
                round: outcome.round_index,
                accuracy: outcome.accuracy,
            });
        }

        let verdict = self.episode.update(|state| {
            if outcome.round_index != state.round_count + 1 {
                return Err(LifecycleError::RoundMismatch {
                    reported: outcome.round_index,
                    completed: state.round_count,
                });
            }
            state.round_count = outcome.round_index;
            state.observed_accuracy = outcome.accuracy;

            if self.limits.accuracy_reached(state.observed_accuracy) {
                info!("Target accuracy of FL reached.");
                state.episode_done = true;
            }
            if self.limits.budget_exhausted(state.round_count) {
                info!("Target number of FL training rounds reached.");
                state.episode_done = true;
            }

            if state.episode_done {
                Ok(RoundVerdict::EpisodeDone {
                    campaign_done: self.limits.is_final_episode(state.episode_id),
                })
            } else {
                Ok(RoundVerdict::Continue)
            }
        })?;

        if verdict.episode_done() {
            *lifecycle = LifecycleState::EpisodeDone;
        }
        let now = *lifecycle;
        debug!(?verdict, state = %now, "LifecycleController::fold_outcome: folded");
        Ok(verdict)
    }

    /// Decide what follows a finished episode (FL side)
    ///
    /// Moves to `CampaignDone` when the episode budget is exhausted, otherwise
    /// to `AwaitingReset`. If the RL side already began the next episode the
    /// state is left `Running` and the latched begin signal is still pending.
    pub fn conclude_episode(&self) -> Result<EpisodeDecision, LifecycleError> {
        debug!("LifecycleController::conclude_episode: called");
        let mut lifecycle = self.lock_state();
        match *lifecycle {
            LifecycleState::EpisodeDone => {
                let episode_id = self.episode.read(|s| s.episode_id);
                if self.limits.is_final_episode(episode_id) {
                    info!("RL Agent: Target number of training episodes reached.");
                    self.episode.update(|s| s.training_done = true);
                    *lifecycle = LifecycleState::CampaignDone;
                    Ok(EpisodeDecision::Terminate)
                } else {
                    *lifecycle = LifecycleState::AwaitingReset;
                    Ok(EpisodeDecision::AwaitReset)
                }
            }
            LifecycleState::Running if self.new_episode_begin.is_set() => Ok(EpisodeDecision::AwaitReset),
            state => Err(LifecycleError::InvalidTransition {
                state,
                action: "conclude an episode",
            }),
        }
    }

    /// Reset Episode State and raise "new episode begin" (RL side)
    pub fn begin_new_episode(&self) -> Result<u32, LifecycleError> {
        debug!("LifecycleController::begin_new_episode: called");
        let mut lifecycle = self.lock_state();
        let state = *lifecycle;
        let resettable = matches!(state, LifecycleState::EpisodeDone | LifecycleState::AwaitingReset);
        if !resettable || self.episode.read(|s| self.limits.is_final_episode(s.episode_id)) {
            return Err(LifecycleError::InvalidTransition {
                state,
                action: "begin a new episode",
            });
        }

        let episode_id = self.episode.update(|s| {
            s.begin_next_episode();
            s.episode_id
        });
        *lifecycle = LifecycleState::Running;
        drop(lifecycle);

        info!("RL Agent: starting episode {}...", episode_id + 1);
        self.new_episode_begin.set();
        Ok(episode_id)
    }

    /// Wait until the RL side has begun the next episode (FL side)
    pub async fn await_new_episode(&self) -> Result<u32, LifecycleError> {
        debug!("LifecycleController::await_new_episode: called");
        self.new_episode_begin.consume().await;
        match self.state() {
            LifecycleState::Running => Ok(self.episode.read(|s| s.episode_id)),
            state => Err(LifecycleError::InvalidTransition {
                state,
                action: "resume after a new episode began",
            }),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
