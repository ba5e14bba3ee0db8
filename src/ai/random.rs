use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use super::agent::Policy;
use crate::env::{Action, Observation};
use crate::error::AgentError;

/// A policy that selects uniformly at random among `num_actions` actions.
pub struct RandomPolicy {
    num_actions: usize,
    rng: StdRng,
}

impl RandomPolicy {
    pub fn new(num_actions: usize, seed: u64) -> Self {
        assert!(num_actions > 0, "RandomPolicy needs at least one action");
        RandomPolicy {
            num_actions,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn select_action(&mut self, _observation: &Observation) -> Result<Action, AgentError> {
        Ok(self.rng.random_range(0..self.num_actions))
    }

    fn name(&self) -> &str {
        "Random"
    }
}
