//! FedRlServer - the base round scheduler extended with RL tuning

use std::sync::Arc;
use std::time::Instant;

use eyre::{Context, Result};
use tracing::{debug, info};

use crate::config::Config;
use crate::env::AdapterHandle;
use crate::fl::{RoundConfig, RoundScheduler, TUNED_VALUE_FIELD};
use crate::handshake::TuningHandshake;
use crate::lifecycle::{EpisodeDecision, LifecycleController};

use super::summary::{CampaignSummary, EpisodeSummary};

/// Federated server whose per-round tuned value comes from an RL agent
///
/// Each round waits for the agent's value, runs the base scheduler with it,
/// folds the outcome and hands it back to the environment. Episode ends are
/// resolved through the lifecycle controller.
pub struct FedRlServer {
    config: Config,
    base: Box<dyn RoundScheduler>,
    handshake: Arc<TuningHandshake>,
    controller: Arc<LifecycleController>,
    adapter: AdapterHandle,
}

impl FedRlServer {
    pub fn new(
        config: Config,
        base: Box<dyn RoundScheduler>,
        handshake: Arc<TuningHandshake>,
        controller: Arc<LifecycleController>,
        adapter: AdapterHandle,
    ) -> Self {
        debug!(kind = %base.kind(), "FedRlServer::new: called");
        Self {
            config,
            base,
            handshake,
            controller,
            adapter,
        }
    }

    /// Log the campaign banner and configure the base scheduler
    pub async fn configure(&mut self) -> Result<()> {
        debug!("FedRlServer::configure: called");
        info!("Configuring a RL agent and a {} server...", self.base.kind());
        info!("This RL agent will tune the number of aggregations on edge servers.");

        let episodes = self.config.rl.episodes;
        match self.config.rl.target_reward {
            Some(reward) => info!("RL Training: {} episodes or {}% reward", episodes, 100.0 * reward),
            None => info!("RL Training: {} episodes", episodes),
        }

        self.base.configure().await.context("Failed to configure FL server")
    }

    /// Run rounds until the episode budget is exhausted
    pub async fn run(mut self) -> Result<CampaignSummary> {
        debug!("FedRlServer::run: called");
        let started = Instant::now();
        self.configure().await?;

        let mut episodes = Vec::new();
        let mut last_tuned_value = None;

        loop {
            let value = self.handshake.await_tuned_value().await?;
            let (episode, round) = self.handshake.episode().read(|s| (s.episode_id, s.next_round()));
            last_tuned_value = Some(value);
            debug!(%episode, %round, %value, "FedRlServer::run: dispatching round");

            let round_start = Instant::now();
            let config = RoundConfig::new(round).with_field(TUNED_VALUE_FIELD, value);
            let outcome = self
                .base
                .run_round(config)
                .await
                .context(format!("Round {} of episode {} failed", round, episode + 1))?;
            debug!(%round, elapsed = ?round_start.elapsed(), "FedRlServer::run: round finished");

            let verdict = self.controller.fold_outcome(&outcome)?;
            // Taken before posting: once the outcome is out the RL side may
            // already begin the next episode
            let folded = self.handshake.episode().snapshot();
            self.adapter.post_round_outcome(&outcome, verdict.episode_done())?;

            // The environment must have stepped on this outcome before the
            // next round or the episode boundary is handled
            self.adapter.await_step_done().await;

            if !verdict.episode_done() {
                continue;
            }

            episodes.push(EpisodeSummary {
                episode: folded.episode_id,
                rounds: folded.round_count,
                final_accuracy: folded.observed_accuracy,
            });

            match self.controller.conclude_episode()? {
                EpisodeDecision::Terminate => {
                    self.base
                        .close_connections()
                        .await
                        .context("Failed to close connections")?;
                    let summary = CampaignSummary {
                        server: self.base.kind(),
                        episodes,
                        last_tuned_value,
                        elapsed: started.elapsed(),
                    };
                    info!(
                        "Campaign finished: {} episodes, {} rounds in {:.2?}",
                        summary.episodes.len(),
                        summary.total_rounds(),
                        summary.elapsed
                    );
                    return Ok(summary);
                }
                EpisodeDecision::AwaitReset => {
                    let next = self.controller.await_new_episode().await?;
                    debug!(episode = next, "FedRlServer::run: new episode began");
                    self.base.configure().await.context("Failed to reconfigure FL server")?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{AccuracyEnv, ActionSpace, RandomAgent};
    use crate::episode::{EpisodeState, SharedEpisode};
    use crate::fl::{FlServerKind, RoundOutcome};
    use crate::lifecycle::EpisodeLimits;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scheduler returning scripted accuracies and recording what it saw
    #[derive(Clone, Default)]
    struct Recorder {
        configures: Arc<Mutex<u32>>,
        rounds: Arc<Mutex<Vec<RoundConfig>>>,
        closed: Arc<Mutex<bool>>,
    }

    struct ScriptedScheduler {
        accuracies: Vec<f64>,
        recorder: Recorder,
    }

    #[async_trait]
    impl RoundScheduler for ScriptedScheduler {
        fn kind(&self) -> FlServerKind {
            FlServerKind::FedAvgCrossSilo
        }

        async fn configure(&mut self) -> Result<()> {
            *self.recorder.configures.lock().unwrap() += 1;
            Ok(())
        }

        async fn run_round(&mut self, config: RoundConfig) -> Result<RoundOutcome> {
            let round_index = config.current_round;
            let accuracy = self.accuracies[(round_index - 1) as usize % self.accuracies.len()];
            self.recorder.rounds.lock().unwrap().push(config);
            Ok(RoundOutcome { round_index, accuracy })
        }

        async fn close_connections(&mut self) -> Result<()> {
            *self.recorder.closed.lock().unwrap() = true;
            Ok(())
        }
    }

    async fn run(config: Config, accuracies: Vec<f64>) -> (CampaignSummary, Recorder) {
        let episode = SharedEpisode::new(EpisodeState::new());
        let handshake = Arc::new(TuningHandshake::new(episode.clone()));
        let limits = EpisodeLimits::from_config(&config).unwrap();
        let controller = Arc::new(LifecycleController::new(limits, episode));
        let space = ActionSpace::new(config.rl.min_tuned_value, config.rl.max_tuned_value).unwrap();
        let (agent, handle) = RandomAgent::new(
            Box::new(AccuracyEnv::new(space)),
            Some(3),
            handshake.clone(),
            controller.clone(),
        );
        let recorder = Recorder::default();
        let base = Box::new(ScriptedScheduler {
            accuracies,
            recorder: recorder.clone(),
        });
        let server = FedRlServer::new(config, base, handshake, controller, handle);

        let (summary, _report) = tokio::try_join!(server.run(), agent.run()).unwrap();
        (summary, recorder)
    }

    #[tokio::test]
    async fn test_accuracy_target_ends_each_episode() {
        let mut config = Config::default();
        config.rl.episodes = 2;
        config.training.rounds = Some(10);
        config.training.target_accuracy = Some(0.9);

        let (summary, recorder) = run(config, vec![0.3, 0.5, 0.7, 0.85, 0.92]).await;

        assert_eq!(summary.episodes.len(), 2);
        assert!(summary.episodes.iter().all(|e| e.rounds == 5));
        let ids: Vec<u32> = summary.episodes.iter().map(|e| e.episode).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(summary.episodes[1].final_accuracy, 0.92);
        assert!(*recorder.closed.lock().unwrap());
        // Initial configure plus one per reset
        assert_eq!(*recorder.configures.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_every_round_carries_a_tuned_value_in_range() {
        let mut config = Config::default();
        config.rl.episodes = 3;
        config.rl.min_tuned_value = 2;
        config.rl.max_tuned_value = 4;
        config.training.rounds = Some(3);
        config.training.target_accuracy = None;

        let (summary, recorder) = run(config, vec![0.1]).await;

        let rounds = recorder.rounds.lock().unwrap();
        assert_eq!(rounds.len(), 9);
        let indices: Vec<u32> = rounds.iter().map(|r| r.current_round).collect();
        assert_eq!(indices, vec![1, 2, 3, 1, 2, 3, 1, 2, 3]);
        assert!(rounds.iter().all(|r| (2..=4).contains(&r.tuned_value().unwrap())));
        assert_eq!(summary.last_tuned_value, rounds.last().and_then(|r| r.tuned_value()));
        assert_eq!(summary.total_rounds(), 9);
    }
}
