use std::path::Path;

use crate::ai::model_manager::{ModelManagerUnion, RewardOptions};
use crate::env::EnvFactory;
use crate::error::ConfigError;
use crate::training::harness::EvaluationSettings;

/// One gym scenario: which environment, which model, and how to train and
/// judge it. Loadable from TOML.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Registered environment name, e.g. `CartPole-v0`.
    pub env: String,
    pub model: ModelManagerUnion,
    pub replay_memory_size: usize,
    pub train_every_ts: usize,
    pub train_after_ts: usize,
    pub num_episodes: usize,
    pub passing_score_bar: f32,
    /// Per-episode step cap. Environments still end episodes themselves.
    #[serde(default)]
    pub max_steps: Option<usize>,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub reward_options: RewardOptions,
}

impl ScenarioConfig {
    /// Load and validate a scenario from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content)
    }

    /// Parse and validate a scenario from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ScenarioConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !EnvFactory::REGISTERED.contains(&self.env.as_str()) {
            return Err(ConfigError::UnknownEnvironment(self.env.clone()));
        }
        self.model.validate()?;

        if self.replay_memory_size == 0 {
            return Err(ConfigError::Validation(
                "replay_memory_size must be > 0".into(),
            ));
        }
        if self.train_every_ts == 0 {
            return Err(ConfigError::Validation(
                "train_every_ts must be > 0".into(),
            ));
        }
        if self.num_episodes == 0 {
            return Err(ConfigError::Validation(
                "num_episodes must be > 0".into(),
            ));
        }
        if self.max_steps == Some(0) {
            return Err(ConfigError::Validation("max_steps must be > 0".into()));
        }
        if !self.passing_score_bar.is_finite() {
            return Err(ConfigError::Validation(
                "passing_score_bar must be finite".into(),
            ));
        }

        let ModelManagerUnion::DiscreteDqn(dqn) = &self.model;
        if dqn.minibatch_size > self.replay_memory_size {
            return Err(ConfigError::Validation(format!(
                "model.DiscreteDqn.minibatch_size ({}) must be <= replay_memory_size ({})",
                dqn.minibatch_size, self.replay_memory_size
            )));
        }

        Ok(())
    }

    /// Parameters of the evaluation run itself.
    pub fn evaluation_settings(&self) -> EvaluationSettings {
        EvaluationSettings {
            replay_memory_size: self.replay_memory_size,
            train_every_ts: self.train_every_ts,
            train_after_ts: self.train_after_ts,
            num_episodes: self.num_episodes,
            max_steps: self.max_steps,
            passing_score_bar: self.passing_score_bar,
            seed: self.seed,
            reward_options: self.reward_options.clone(),
        }
    }
}
