//! Action-choosing policies

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use super::environment::Observation;
use super::space::{Action, ActionSpace};

/// Chooses the next action from the latest observation
pub trait Policy: Send {
    fn select_action(&mut self, observation: &Observation, space: &ActionSpace) -> Action;
}

/// Samples the action space uniformly, ignoring observations
#[derive(Debug, Clone)]
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    /// Seeded for reproducible campaigns, OS entropy otherwise
    pub fn new(seed: Option<u64>) -> Self {
        debug!(?seed, "RandomPolicy::new: called");
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { rng }
    }
}

impl Policy for RandomPolicy {
    fn select_action(&mut self, _observation: &Observation, space: &ActionSpace) -> Action {
        space.sample(&mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_policy_is_reproducible() {
        let space = ActionSpace::new(1, 10).unwrap();
        let obs = Observation::default();
        let mut a = RandomPolicy::new(Some(42));
        let mut b = RandomPolicy::new(Some(42));

        let xs: Vec<Action> = (0..20).map(|_| a.select_action(&obs, &space)).collect();
        let ys: Vec<Action> = (0..20).map(|_| b.select_action(&obs, &space)).collect();
        assert_eq!(xs, ys);
        assert!(xs.iter().all(|x| space.contains(*x)));
    }
}
