//! Discrete action space over tuned values

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::EnvError;

/// Index into an [`ActionSpace`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action(pub u32);

/// Tuned values `low..=high`, action `i` selecting `low + i`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpace {
    low: u32,
    high: u32,
}

impl ActionSpace {
    /// Reject empty ranges and ranges whose size does not fit in a `u32`
    pub fn new(low: u32, high: u32) -> Result<Self, EnvError> {
        if low > high {
            return Err(EnvError::Failed(format!("Empty action space [{}, {}]", low, high)));
        }
        if high - low == u32::MAX {
            return Err(EnvError::Failed(format!("Action space [{}, {}] too large", low, high)));
        }
        Ok(Self { low, high })
    }

    pub fn len(&self) -> u32 {
        self.high - self.low + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, action: Action) -> bool {
        action.0 < self.len()
    }

    /// Uniformly random action
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Action {
        Action(rng.random_range(0..self.len()))
    }

    /// Tuned value selected by `action`
    pub fn to_tuned_value(&self, action: Action) -> Result<u32, EnvError> {
        if !self.contains(action) {
            return Err(EnvError::InvalidAction {
                action: action.0,
                size: self.len(),
            });
        }
        Ok(self.low + action.0)
    }
}
