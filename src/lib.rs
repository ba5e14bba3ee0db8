//! # Replay Gym
//!
//! An online reinforcement-learning harness: agents act in gym-style
//! environments, transitions flow into a replay buffer, a scheduler decides
//! when to train, and an evaluation run checks both the exploring and the
//! serving policy against a reward bar. Models are built with the Burn ML
//! framework.
//!
//! ## Modules
//!
//! - [`env`]: Environment trait, observation/action spaces, CartPole, gridworld
//! - [`ai`]: Agent, policies, DQN trainer, networks, model managers
//! - [`training`]: Replay buffer, scheduler, episode runner, evaluation harness
//! - [`normalization`]: Feature normalization descriptors and preprocessing
//! - [`config`]: TOML scenario loading and validation
//! - [`error`]: Structured error types

#![recursion_limit = "256"]

pub mod ai;
pub mod config;
pub mod env;
pub mod error;
pub mod normalization;
pub mod training;
