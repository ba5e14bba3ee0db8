//! Open gridworld: an N×N grid without walls. The agent starts in the
//! top-left cell and the episode ends when it reaches the bottom-right cell
//! or runs out of steps.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{
    Action, ActionSpace, EnvStep, Environment, Info, Observation, ObservationSpace,
    TRUNCATED_INFO_KEY,
};
use crate::error::EnvError;

const UP: Action = 0;
const DOWN: Action = 1;
const LEFT: Action = 2;
const RIGHT: Action = 3;

pub struct OpenGridworld {
    size: usize,
    row: usize,
    col: usize,
    ticks: u32,
    max_steps: u32,
    /// Probability that a move is replaced by a uniformly random one.
    slip_prob: f32,
    done: bool,
    rng: StdRng,
    observation_space: ObservationSpace,
    action_space: ActionSpace,
}

impl OpenGridworld {
    pub fn new(size: usize, max_steps: u32, slip_prob: f32) -> Self {
        assert!(size >= 2, "gridworld needs at least 2x2 cells");
        let cells = size * size;
        OpenGridworld {
            size,
            row: 0,
            col: 0,
            ticks: 0,
            max_steps,
            slip_prob,
            done: true,
            rng: StdRng::seed_from_u64(0),
            observation_space: ObservationSpace::flat_box(vec![0.0; cells], vec![1.0; cells]),
            action_space: ActionSpace::Discrete(4),
        }
    }

    /// `OpenGridworld-v0`: 5×5, 50-step limit, deterministic moves.
    pub fn v0() -> Self {
        Self::new(5, 50, 0.0)
    }

    fn observation(&self) -> Observation {
        let mut one_hot = vec![0.0; self.size * self.size];
        one_hot[self.row * self.size + self.col] = 1.0;
        Observation::Dense(one_hot)
    }

    fn at_goal(&self) -> bool {
        self.row == self.size - 1 && self.col == self.size - 1
    }
}

impl Environment for OpenGridworld {
    fn reset(&mut self) -> Result<Observation, EnvError> {
        self.row = 0;
        self.col = 0;
        self.ticks = 0;
        self.done = false;
        Ok(self.observation())
    }

    fn step(&mut self, action: Action) -> Result<EnvStep, EnvError> {
        if self.done {
            return Err(EnvError::NeedsReset);
        }
        if action > RIGHT {
            return Err(EnvError::InvalidAction {
                action,
                num_actions: 4,
            });
        }

        let action = if self.slip_prob > 0.0 && self.rng.random::<f32>() < self.slip_prob {
            self.rng.random_range(0..4)
        } else {
            action
        };

        // Moves into the border leave the agent in place.
        match action {
            UP => self.row = self.row.saturating_sub(1),
            DOWN => self.row = (self.row + 1).min(self.size - 1),
            LEFT => self.col = self.col.saturating_sub(1),
            _ => self.col = (self.col + 1).min(self.size - 1),
        }
        self.ticks += 1;

        let reached = self.at_goal();
        self.done = reached || self.ticks >= self.max_steps;

        let mut info = Info::new();
        if self.done && !reached {
            info.insert(TRUNCATED_INFO_KEY.to_string(), 1.0);
        }

        Ok(EnvStep {
            observation: self.observation(),
            reward: if reached { 1.0 } else { 0.0 },
            terminal: self.done,
            info,
        })
    }

    fn observation_space(&self) -> &ObservationSpace {
        &self.observation_space
    }

    fn action_space(&self) -> &ActionSpace {
        &self.action_space
    }

    fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    fn name(&self) -> &str {
        "OpenGridworld-v0"
    }
}
