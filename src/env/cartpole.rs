//! Classic control CartPole, single instance.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{
    Action, ActionSpace, EnvStep, Environment, Info, Observation, ObservationSpace,
    TRUNCATED_INFO_KEY,
};
use crate::error::EnvError;

const GRAVITY: f32 = 9.8;
const CART_MASS: f32 = 1.0;
const POLE_MASS: f32 = 0.1;
const POLE_LENGTH: f32 = 0.5;
const FORCE_MAG: f32 = 10.0;
const DT: f32 = 0.02;
const X_THRESHOLD: f32 = 2.4;
const THETA_THRESHOLD: f32 = 12.0 * std::f32::consts::PI / 180.0;
const INIT_RANGE: f32 = 0.05;

/// Cart-pole balancing. Reward is 1.0 for every step taken, including the
/// one that ends the episode.
pub struct CartPole {
    name: String,
    x: f32,
    x_dot: f32,
    theta: f32,
    theta_dot: f32,
    ticks: u32,
    max_steps: u32,
    done: bool,
    rng: StdRng,
    observation_space: ObservationSpace,
    action_space: ActionSpace,
}

impl CartPole {
    pub fn new(name: impl Into<String>, max_steps: u32) -> Self {
        let high = vec![X_THRESHOLD * 2.0, f32::MAX, THETA_THRESHOLD * 2.0, f32::MAX];
        let low = high.iter().map(|h| -h).collect();
        CartPole {
            name: name.into(),
            x: 0.0,
            x_dot: 0.0,
            theta: 0.0,
            theta_dot: 0.0,
            ticks: 0,
            max_steps,
            done: true,
            rng: StdRng::seed_from_u64(0),
            observation_space: ObservationSpace::flat_box(low, high),
            action_space: ActionSpace::Discrete(2),
        }
    }

    /// `CartPole-v0`: 200-step episodes.
    pub fn v0() -> Self {
        Self::new("CartPole-v0", 200)
    }

    /// `CartPole-v1`: 500-step episodes.
    pub fn v1() -> Self {
        Self::new("CartPole-v1", 500)
    }

    fn observation(&self) -> Observation {
        Observation::Dense(vec![self.x, self.x_dot, self.theta, self.theta_dot])
    }
}

impl Environment for CartPole {
    fn reset(&mut self) -> Result<Observation, EnvError> {
        self.x = self.rng.random_range(-INIT_RANGE..INIT_RANGE);
        self.x_dot = self.rng.random_range(-INIT_RANGE..INIT_RANGE);
        self.theta = self.rng.random_range(-INIT_RANGE..INIT_RANGE);
        self.theta_dot = self.rng.random_range(-INIT_RANGE..INIT_RANGE);
        self.ticks = 0;
        self.done = false;
        Ok(self.observation())
    }

    fn step(&mut self, action: Action) -> Result<EnvStep, EnvError> {
        if self.done {
            return Err(EnvError::NeedsReset);
        }
        if action > 1 {
            return Err(EnvError::InvalidAction {
                action,
                num_actions: 2,
            });
        }

        let force = if action == 1 { FORCE_MAG } else { -FORCE_MAG };
        let cos_theta = self.theta.cos();
        let sin_theta = self.theta.sin();

        let total_mass = CART_MASS + POLE_MASS;
        let pole_mass_length = POLE_MASS * POLE_LENGTH;

        let temp =
            (force + pole_mass_length * self.theta_dot * self.theta_dot * sin_theta) / total_mass;
        let theta_acc = (GRAVITY * sin_theta - cos_theta * temp)
            / (POLE_LENGTH * (4.0 / 3.0 - POLE_MASS * cos_theta * cos_theta / total_mass));
        let x_acc = temp - pole_mass_length * theta_acc * cos_theta / total_mass;

        self.x += DT * self.x_dot;
        self.x_dot += DT * x_acc;
        self.theta += DT * self.theta_dot;
        self.theta_dot += DT * theta_acc;
        self.ticks += 1;

        let failed = self.x.abs() > X_THRESHOLD || self.theta.abs() > THETA_THRESHOLD;
        let truncated = self.ticks >= self.max_steps;
        self.done = failed || truncated;

        let mut info = Info::new();
        if truncated && !failed {
            info.insert(TRUNCATED_INFO_KEY.to_string(), 1.0);
        }

        Ok(EnvStep {
            observation: self.observation(),
            reward: 1.0,
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
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_is_within_init_range() {
        let mut env = CartPole::v0();
        env.seed(7);
        let obs = env.reset().unwrap();
        let values = obs.as_dense().unwrap();
        assert_eq!(values.len(), 4);
        assert!(values.iter().all(|v| v.abs() <= INIT_RANGE));
    }

    #[test]
    fn test_constant_push_fails_before_limit() {
        let mut env = CartPole::v0();
        env.seed(0);
        env.reset().unwrap();

        let mut steps = 0;
        loop {
            let step = env.step(1).unwrap();
            steps += 1;
            assert_eq!(step.reward, 1.0);
            if step.terminal {
                break;
            }
        }
        assert!(steps < 200, "pushing right forever should topple the pole");
    }

    #[test]
    fn test_step_after_done_needs_reset() {
        let mut env = CartPole::new("CartPole-test", 1);
        env.reset().unwrap();
        let step = env.step(0).unwrap();
        assert!(step.terminal);
        assert_eq!(step.info.get(TRUNCATED_INFO_KEY), Some(&1.0));
        assert_eq!(env.step(0), Err(EnvError::NeedsReset));
    }

    #[test]
    fn test_step_before_reset_needs_reset() {
        let mut env = CartPole::v0();
        assert_eq!(env.step(0), Err(EnvError::NeedsReset));
    }

    #[test]
    fn test_invalid_action_rejected() {
        let mut env = CartPole::v0();
        env.reset().unwrap();
        assert_eq!(
            env.step(2),
            Err(EnvError::InvalidAction {
                action: 2,
                num_actions: 2
            })
        );
    }

    #[test]
    fn test_same_seed_same_trajectory() {
        let run = |seed| {
            let mut env = CartPole::v0();
            env.seed(seed);
            let mut trace = vec![env.reset().unwrap()];
            for i in 0..10 {
                trace.push(env.step(i % 2).unwrap().observation);
            }
            trace
        };
        assert_eq!(run(3), run(3));
        assert_ne!(run(3), run(4));
    }
}
