//! TuningHandshake implementation

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::episode::SharedEpisode;

use super::error::HandshakeError;
use super::signal::Signal;

/// Round outcome posted by the FL side for one RL step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundObservation {
    /// Round the outcome belongs to (1-based within the episode)
    pub round: u32,

    /// Global accuracy measured after the round
    pub accuracy: f64,

    /// The round ended the episode
    pub episode_done: bool,
}

/// Two one-shot signal pairs guarding the tuned value and the round outcome
///
/// A round is in flight from the moment the FL side takes its tuned value
/// until the RL side has consumed its outcome. No value for a later round is
/// accepted while one is in flight.
#[derive(Debug)]
pub struct TuningHandshake {
    episode: SharedEpisode,
    value_ready: Signal,
    step_complete: Signal,
    outcome: Mutex<Option<RoundObservation>>,
    in_flight: Mutex<Option<u32>>,
}

impl TuningHandshake {
    pub fn new(episode: SharedEpisode) -> Self {
        debug!("TuningHandshake::new: called");
        Self {
            episode,
            value_ready: Signal::new("value-ready"),
            step_complete: Signal::new("step-complete"),
            outcome: Mutex::new(None),
            in_flight: Mutex::new(None),
        }
    }

    pub fn episode(&self) -> &SharedEpisode {
        &self.episode
    }

    /// Publish the tuned value for the next round (RL side)
    ///
    /// `expected_round` must be `round_count + 1` and the previous round's
    /// outcome must have been consumed. On any violation Episode State is
    /// left untouched.
    pub fn publish_tuned_value(&self, value: u32, expected_round: u32) -> Result<(), HandshakeError> {
        debug!(%value, %expected_round, "TuningHandshake::publish_tuned_value: called");
        self.episode.update(|state| {
            let next = state.next_round();
            if expected_round != next {
                error!(requested = expected_round, expected = next, "Tuned value targets the wrong round");
                return Err(HandshakeError::Desynchronized {
                    requested: expected_round,
                    expected: next,
                });
            }
            if let Some(outstanding) = *self.lock_in_flight() {
                error!(requested = expected_round, %outstanding, "Tuned value published while a round is in flight");
                return Err(HandshakeError::OutcomeOutstanding {
                    requested: expected_round,
                    outstanding,
                });
            }
            if self.value_ready.is_set() {
                error!(round = expected_round, "Tuned value published twice for one round");
                return Err(HandshakeError::UnconsumedValue { round: expected_round });
            }
            state.tuned_value = Some(value);
            Ok(())
        })?;

        debug!(%value, round = expected_round, "RL agent: tuned value published");
        self.value_ready.set();
        Ok(())
    }

    /// Wait for the tuned value of the round about to be dispatched (FL side)
    ///
    /// Pairs 1:1 with [`publish_tuned_value`](Self::publish_tuned_value). A
    /// second call before the next publish stays suspended.
    pub async fn await_tuned_value(&self) -> Result<u32, HandshakeError> {
        debug!("TuningHandshake::await_tuned_value: called");
        self.value_ready.consume().await;
        let (value, round) = self.episode.read(|state| (state.tuned_value, state.next_round()));
        let value = value.ok_or(HandshakeError::MissingValue)?;
        *self.lock_in_flight() = Some(round);
        debug!(%value, %round, "TuningHandshake::await_tuned_value: value ready");
        Ok(value)
    }

    /// Post a round outcome for the RL side (FL side)
    pub fn signal_step_complete(&self, observation: RoundObservation) -> Result<(), HandshakeError> {
        debug!(?observation, "TuningHandshake::signal_step_complete: called");
        {
            let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
            if self.step_complete.is_set() || slot.is_some() {
                error!(round = observation.round, "Round outcome posted twice without an RL step");
                return Err(HandshakeError::UnconsumedOutcome {
                    round: observation.round,
                });
            }
            *slot = Some(observation);
        }
        self.step_complete.set();
        Ok(())
    }

    /// Wait for the next posted round outcome (RL side)
    pub async fn await_step_complete(&self) -> Result<RoundObservation, HandshakeError> {
        debug!("TuningHandshake::await_step_complete: called");
        self.step_complete.consume().await;
        let observation = self
            .outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(HandshakeError::MissingOutcome)?;
        *self.lock_in_flight() = None;
        debug!(?observation, "TuningHandshake::await_step_complete: outcome received");
        Ok(observation)
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<u32>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Round whose tuned value was taken but whose outcome is not yet consumed
    #[cfg(test)]
    pub(crate) fn round_in_flight(&self) -> Option<u32> {
        *self.lock_in_flight()
    }

    #[cfg(test)]
    pub(crate) fn value_pending(&self) -> bool {
        self.value_ready.is_set()
    }

    #[cfg(test)]
    pub(crate) fn outcome_pending(&self) -> bool {
        self.step_complete.is_set()
    }
}
