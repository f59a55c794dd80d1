//! EpisodeState and its shared cell

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Record describing the live RL episode and the current FL round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeState {
    /// Episode counter, starts at 0
    pub episode_id: u32,

    /// Rounds completed in the current episode
    pub round_count: u32,

    /// Last measured global accuracy
    pub observed_accuracy: f64,

    /// Value under RL control, set by the first completed handshake
    pub tuned_value: Option<u32>,

    /// Current episode has met its termination condition
    pub episode_done: bool,

    /// Campaign has met its termination condition
    pub training_done: bool,
}

impl Default for EpisodeState {
    fn default() -> Self {
        Self::new()
    }
}

impl EpisodeState {
    pub fn new() -> Self {
        Self {
            episode_id: 0,
            round_count: 0,
            observed_accuracy: 0.0,
            tuned_value: None,
            episode_done: false,
            training_done: false,
        }
    }

    /// The round the next tuned value has to target
    pub fn next_round(&self) -> u32 {
        self.round_count + 1
    }

    /// Start the next episode
    ///
    /// `round_count` and `episode_done` are reset together with the episode
    /// increment. The accuracy and the last tuned value carry over until the
    /// next round and handshake replace them.
    pub fn begin_next_episode(&mut self) {
        self.episode_id += 1;
        self.round_count = 0;
        self.episode_done = false;
    }
}

/// Cloneable handle to the single [`EpisodeState`] of a campaign
///
/// The lock is held only for the duration of a closure, never across an
/// await point.
#[derive(Debug, Clone, Default)]
pub struct SharedEpisode {
    inner: Arc<Mutex<EpisodeState>>,
}

impl SharedEpisode {
    pub fn new(state: EpisodeState) -> Self {
        debug!(episode = state.episode_id, "SharedEpisode::new: called");
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> EpisodeState {
        self.lock().clone()
    }

    /// Read a value out of the state
    pub fn read<R>(&self, f: impl FnOnce(&EpisodeState) -> R) -> R {
        f(&self.lock())
    }

    /// Mutate the state in one critical section
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut EpisodeState) -> R) -> R {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, EpisodeState> {
        // Every critical section leaves the state consistent, so a poisoned
        // lock still guards valid data.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
