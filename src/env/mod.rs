//! Environment interface, space descriptors, and the small built-in
//! environments used by the shipped scenarios.

mod cartpole;
mod factory;
mod gridworld;

use std::collections::BTreeMap;

pub use cartpole::CartPole;
pub use factory::EnvFactory;
pub use gridworld::OpenGridworld;

use crate::error::EnvError;

/// Index of a discrete action.
pub type Action = usize;

/// Free-form per-step diagnostics returned by an environment.
pub type Info = BTreeMap<String, f32>;

/// Info flag (1.0) set on a terminal step that an environment's own time
/// limit ended, as opposed to a failure or a goal.
pub const TRUNCATED_INFO_KEY: &str = "truncated";

/// Observation layout expected by serving policies: a value array with a
/// presence array of identical shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ServingFeatures {
    pub values: Vec<f32>,
    pub presence: Vec<f32>,
    /// `[rows, columns]` of both arrays.
    pub shape: [usize; 2],
}

/// An observation as seen by a policy.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// Raw flat vector, as produced by an environment.
    Dense(Vec<f32>),
    /// Serving-format observation, produced by a preprocessor.
    Serving(ServingFeatures),
}

impl Observation {
    pub fn as_dense(&self) -> Option<&[f32]> {
        match self {
            Observation::Dense(values) => Some(values),
            Observation::Serving(_) => None,
        }
    }
}

/// Observation space descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum ObservationSpace {
    /// Continuous box with per-element bounds (flattened, row-major).
    Box {
        low: Vec<f32>,
        high: Vec<f32>,
        shape: Vec<usize>,
    },
    /// Named sub-spaces, e.g. an image plus a direction.
    Dict(BTreeMap<String, ObservationSpace>),
    Discrete(usize),
}

impl ObservationSpace {
    /// A one-dimensional box with the given bounds.
    pub fn flat_box(low: Vec<f32>, high: Vec<f32>) -> Self {
        debug_assert_eq!(low.len(), high.len());
        let shape = vec![low.len()];
        ObservationSpace::Box { low, high, shape }
    }
}

/// Action space descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionSpace {
    Discrete(usize),
    Box { low: Vec<f32>, high: Vec<f32> },
}

impl ActionSpace {
    /// Number of actions for a discrete space.
    pub fn num_actions(&self) -> Option<usize> {
        match self {
            ActionSpace::Discrete(n) => Some(*n),
            ActionSpace::Box { .. } => None,
        }
    }
}

/// Result of a single environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvStep {
    pub observation: Observation,
    pub reward: f32,
    pub terminal: bool,
    pub info: Info,
}

/// A single-agent, step-driven environment.
pub trait Environment {
    /// Start a new episode and return its first observation.
    fn reset(&mut self) -> Result<Observation, EnvError>;

    /// Advance the episode by one action.
    fn step(&mut self, action: Action) -> Result<EnvStep, EnvError>;

    fn observation_space(&self) -> &ObservationSpace;

    fn action_space(&self) -> &ActionSpace;

    /// Reseed every random source of the environment.
    fn seed(&mut self, seed: u64);

    /// Registered name, e.g. `CartPole-v0`.
    fn name(&self) -> &str;
}
