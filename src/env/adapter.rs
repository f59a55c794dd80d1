//! EnvironmentAdapter - drives the tuning handshake from the RL side

use std::sync::Arc;

use eyre::{Context, Result, eyre};
use tracing::{debug, info, warn};

use crate::fl::RoundOutcome;
use crate::handshake::{HandshakeError, RoundObservation, Signal, TuningHandshake};
use crate::lifecycle::LifecycleController;

use super::environment::{Observation, RlEnvironment, StepResult};
use super::policy::Policy;
use super::space::Action;

/// What followed the step just driven
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Same episode; the value for the next round is published
    None,
    /// Episode ended and the given episode has begun
    NextEpisode(u32),
    /// Episode ended and no episode is left
    CampaignDone,
}

/// Result of [`EnvironmentAdapter::drive_one_step`]
#[derive(Debug, Clone, PartialEq)]
pub struct DriveOutcome {
    /// Round whose outcome was stepped
    pub round: u32,
    /// Episode the round belonged to
    pub episode: u32,
    pub result: StepResult,
    pub boundary: Boundary,
}

/// FL-side handle of the adapter
///
/// Cloneable, like the coordinator handles loops get: it only posts outcomes
/// and waits for the environment's acknowledgement.
#[derive(Clone)]
pub struct AdapterHandle {
    handshake: Arc<TuningHandshake>,
    step_done: Arc<Signal>,
}

impl AdapterHandle {
    /// Forward a folded round outcome to the environment
    pub fn post_round_outcome(&self, outcome: &RoundOutcome, episode_done: bool) -> Result<(), HandshakeError> {
        debug!(round = outcome.round_index, accuracy = outcome.accuracy, %episode_done, "AdapterHandle::post_round_outcome: called");
        self.handshake.signal_step_complete(RoundObservation {
            round: outcome.round_index,
            accuracy: outcome.accuracy,
            episode_done,
        })
    }

    /// Wait until the environment has consumed the posted outcome
    pub async fn await_step_done(&self) {
        debug!("AdapterHandle::await_step_done: called");
        self.step_done.consume().await;
    }
}

/// RL-side bridge between the environment and the FL server
pub struct EnvironmentAdapter {
    env: Box<dyn RlEnvironment>,
    policy: Box<dyn Policy>,
    handshake: Arc<TuningHandshake>,
    controller: Arc<LifecycleController>,
    step_done: Arc<Signal>,
    pending_action: Option<Action>,
}

impl EnvironmentAdapter {
    /// Create the adapter and the handle the FL side posts outcomes through
    pub fn new(
        env: Box<dyn RlEnvironment>,
        policy: Box<dyn Policy>,
        handshake: Arc<TuningHandshake>,
        controller: Arc<LifecycleController>,
    ) -> (Self, AdapterHandle) {
        debug!("EnvironmentAdapter::new: called");
        let step_done = Arc::new(Signal::new("step-done"));
        let handle = AdapterHandle {
            handshake: handshake.clone(),
            step_done: step_done.clone(),
        };
        let adapter = Self {
            env,
            policy,
            handshake,
            controller,
            step_done,
            pending_action: None,
        };
        (adapter, handle)
    }

    /// Reset the environment and publish the value for the first round
    pub async fn start(&mut self) -> Result<()> {
        debug!("EnvironmentAdapter::start: called");
        let observation = self.env.reset().await.context("RL environment reset failed")?;
        self.publish_next(&observation)
    }

    /// Run one RL step for the round the FL side just completed
    ///
    /// Waits for the posted outcome, steps the environment with the action
    /// whose value that round used, and publishes the value for the next
    /// round. At an episode boundary the environment is reset first, or
    /// nothing is published when the campaign is over.
    pub async fn drive_one_step(&mut self) -> Result<DriveOutcome> {
        debug!("EnvironmentAdapter::drive_one_step: called");
        let action = self
            .pending_action
            .take()
            .ok_or_else(|| eyre!("No action in flight; call start() before driving steps"))?;

        let observed = self.handshake.await_step_complete().await?;
        let episode = self.handshake.episode().read(|s| s.episode_id);

        self.env.get_state(observed.accuracy, observed.episode_done);
        let result = self
            .env
            .step(action)
            .await
            .context(format!("RL environment step failed at round {}", observed.round))?;
        self.step_done.set();

        if result.done != observed.episode_done {
            warn!(
                round = observed.round,
                env_done = result.done,
                fl_done = observed.episode_done,
                "Environment and FL server disagree on episode end; following the FL server"
            );
        }

        let boundary = if !observed.episode_done {
            self.publish_next(&result.observation)?;
            Boundary::None
        } else if self.controller.has_next_episode() {
            let observation = self.env.reset().await.context("RL environment reset failed")?;
            let next = self.controller.begin_new_episode()?;
            self.publish_next(&observation)?;
            Boundary::NextEpisode(next)
        } else {
            info!("RL Agent: campaign finished after episode {}", episode + 1);
            Boundary::CampaignDone
        };

        Ok(DriveOutcome {
            round: observed.round,
            episode,
            result,
            boundary,
        })
    }

    fn publish_next(&mut self, observation: &Observation) -> Result<()> {
        let space = *self.env.action_space();
        let action = self.policy.select_action(observation, &space);
        let value = space.to_tuned_value(action)?;
        let round = self.handshake.episode().read(|s| s.next_round());

        self.handshake.publish_tuned_value(value, round)?;
        debug!(?action, %value, %round, "EnvironmentAdapter::publish_next: published");
        self.pending_action = Some(action);
        Ok(())
    }
}
