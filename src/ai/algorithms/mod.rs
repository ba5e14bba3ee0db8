mod dqn;
mod q_policy;

pub use dqn::{DqnConfig, DqnTrainer, SharedQNetwork};
pub use q_policy::{argmax, GreedyServingPolicy, QFunction, SoftmaxPolicy};
