//! Model managers build a trainer for an environment and hand out the
//! policies that act with the trainer's current network.

use std::collections::BTreeMap;
use std::rc::Rc;

use burn::backend::{Autodiff, NdArray, Wgpu};
use log::info;

use crate::ai::agent::{Policy, Trainer, Transition};
use crate::ai::algorithms::{DqnConfig, DqnTrainer, GreedyServingPolicy, QFunction, SoftmaxPolicy};
use crate::error::ConfigError;
use crate::normalization::{NormalizationDataMap, Preprocessor, STATE_KEY};

type CpuBackend = Autodiff<NdArray<f32>>;
type GpuBackend = Autodiff<Wgpu<f32, i32>>;

/// How the training reward is derived from a transition.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RewardOptions {
    /// When non-empty, the reward is the weighted sum of these metrics from
    /// the transition info instead of the environment reward. Missing
    /// metrics count as zero.
    pub metric_reward_values: BTreeMap<String, f32>,
}

impl RewardOptions {
    pub fn reward_for(&self, transition: &Transition) -> f32 {
        if self.metric_reward_values.is_empty() {
            return transition.reward;
        }
        self.metric_reward_values
            .iter()
            .map(|(metric, weight)| transition.info.get(metric).copied().unwrap_or(0.0) * weight)
            .sum()
    }
}

/// Builds the trainer and policies for one model family.
pub trait ModelManager {
    /// Create the trainer. `normalization` describes the environment's
    /// observation features.
    fn initialize_trainer(
        &mut self,
        use_gpu: bool,
        reward_options: &RewardOptions,
        normalization: Option<&NormalizationDataMap>,
    ) -> Result<Box<dyn Trainer>, ConfigError>;

    /// A policy acting with the trainer's latest network. Serving policies
    /// are deterministic and expect the serving observation layout.
    fn create_policy(&self, serving: bool) -> Result<Box<dyn Policy>, ConfigError>;

    /// Number of discrete actions the model scores.
    fn num_actions(&self) -> usize;

    fn name(&self) -> &str;
}

/// Model manager for discrete-action DQN.
pub struct DiscreteDqnManager {
    config: DqnConfig,
    seed: u64,
    trained: Option<(Rc<dyn QFunction>, Preprocessor)>,
}

impl DiscreteDqnManager {
    pub fn new(config: DqnConfig, seed: u64) -> Self {
        DiscreteDqnManager {
            config,
            seed,
            trained: None,
        }
    }
}

impl ModelManager for DiscreteDqnManager {
    fn initialize_trainer(
        &mut self,
        use_gpu: bool,
        reward_options: &RewardOptions,
        normalization: Option<&NormalizationDataMap>,
    ) -> Result<Box<dyn Trainer>, ConfigError> {
        let state = normalization
            .and_then(|map| map.get(STATE_KEY))
            .ok_or_else(|| {
                ConfigError::Validation(
                    "DiscreteDqn needs state normalization; this observation space has none"
                        .into(),
                )
            })?;
        let preprocessor = Preprocessor::new(state).map_err(ConfigError::Validation)?;

        info!(
            "DiscreteDqn: {} features, {} actions, hidden {:?}, {}",
            preprocessor.num_features(),
            self.config.num_actions,
            self.config.hidden_sizes,
            if use_gpu { "wgpu" } else { "ndarray" }
        );

        let (trainer, q): (Box<dyn Trainer>, Rc<dyn QFunction>) = if use_gpu {
            let trainer = DqnTrainer::<GpuBackend>::new(
                self.config.clone(),
                preprocessor.clone(),
                reward_options.clone(),
                Default::default(),
                self.seed,
            );
            let q: Rc<dyn QFunction> = trainer.q_function();
            (Box::new(trainer) as Box<dyn Trainer>, q)
        } else {
            let trainer = DqnTrainer::<CpuBackend>::new(
                self.config.clone(),
                preprocessor.clone(),
                reward_options.clone(),
                Default::default(),
                self.seed,
            );
            let q: Rc<dyn QFunction> = trainer.q_function();
            (Box::new(trainer) as Box<dyn Trainer>, q)
        };

        self.trained = Some((q, preprocessor));
        Ok(trainer)
    }

    fn create_policy(&self, serving: bool) -> Result<Box<dyn Policy>, ConfigError> {
        let (q, preprocessor) = self.trained.as_ref().ok_or_else(|| {
            ConfigError::Validation("initialize_trainer must run before create_policy".into())
        })?;
        if serving {
            Ok(Box::new(GreedyServingPolicy::new(
                Rc::clone(q),
                preprocessor.clone(),
            )))
        } else {
            Ok(Box::new(SoftmaxPolicy::new(
                Rc::clone(q),
                preprocessor.clone(),
                self.config.temperature,
                self.seed.wrapping_add(1),
            )))
        }
    }

    fn num_actions(&self) -> usize {
        self.config.num_actions
    }

    fn name(&self) -> &str {
        "DiscreteDqn"
    }
}

/// Model section of a scenario file: exactly one model family.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ModelManagerUnion {
    DiscreteDqn(DqnConfig),
}

impl ModelManagerUnion {
    /// Validate the selected model's hyperparameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            ModelManagerUnion::DiscreteDqn(dqn) => {
                if dqn.num_actions == 0 {
                    return Err(ConfigError::Validation(
                        "model.DiscreteDqn.num_actions must be > 0".into(),
                    ));
                }
                if dqn.learning_rate <= 0.0 {
                    return Err(ConfigError::Validation(
                        "model.DiscreteDqn.learning_rate must be > 0".into(),
                    ));
                }
                if dqn.gamma < 0.0 || dqn.gamma > 1.0 {
                    return Err(ConfigError::Validation(
                        "model.DiscreteDqn.gamma must be in [0, 1]".into(),
                    ));
                }
                if dqn.minibatch_size == 0 {
                    return Err(ConfigError::Validation(
                        "model.DiscreteDqn.minibatch_size must be > 0".into(),
                    ));
                }
                if dqn.target_update_interval == 0 {
                    return Err(ConfigError::Validation(
                        "model.DiscreteDqn.target_update_interval must be > 0".into(),
                    ));
                }
                if dqn.temperature <= 0.0 {
                    return Err(ConfigError::Validation(
                        "model.DiscreteDqn.temperature must be > 0".into(),
                    ));
                }
                Ok(())
            }
        }
    }

    pub fn into_manager(self, seed: u64) -> Box<dyn ModelManager> {
        match self {
            ModelManagerUnion::DiscreteDqn(config) => Box::new(DiscreteDqnManager::new(config, seed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::state_encoding::encode_serving;
    use crate::env::{CartPole, Environment, Observation};
    use crate::normalization::build_normalizer;

    fn manager() -> DiscreteDqnManager {
        DiscreteDqnManager::new(
            DqnConfig {
                hidden_sizes: vec![8],
                minibatch_size: 4,
                ..Default::default()
            },
            3,
        )
    }

    fn cartpole_normalization() -> NormalizationDataMap {
        build_normalizer(CartPole::v0().observation_space())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_trainer_requires_normalization() {
        let mut m = manager();
        let err = m
            .initialize_trainer(false, &RewardOptions::default(), None)
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_policy_before_trainer_rejected() {
        let m = manager();
        assert!(matches!(
            m.create_policy(false).err().unwrap(),
            ConfigError::Validation(_)
        ));
    }

    #[test]
    fn test_policies_act_on_their_layouts() {
        let mut m = manager();
        let norm = cartpole_normalization();
        let trainer = m
            .initialize_trainer(false, &RewardOptions::default(), Some(&norm))
            .unwrap();
        assert_eq!(trainer.minibatch_size(), 4);

        let raw = Observation::Dense(vec![0.01, -0.02, 0.03, 0.0]);
        let mut exploring = m.create_policy(false).unwrap();
        assert!(exploring.select_action(&raw).unwrap() < 2);
        assert!(exploring.select_action(&encode_serving(&raw).unwrap()).is_err());

        let mut serving = m.create_policy(true).unwrap();
        let a = serving.select_action(&encode_serving(&raw).unwrap()).unwrap();
        let b = serving.select_action(&encode_serving(&raw).unwrap()).unwrap();
        assert!(a < 2);
        assert_eq!(a, b);
        assert!(serving.select_action(&raw).is_err());
    }

    #[test]
    fn test_union_parses_and_validates() {
        let model: ModelManagerUnion = toml::from_str(
            r#"
            [DiscreteDqn]
            num_actions = 4
            temperature = 0.1
            "#,
        )
        .unwrap();
        model.validate().unwrap();
        let manager = model.into_manager(0);
        assert_eq!(manager.num_actions(), 4);
        assert_eq!(manager.name(), "DiscreteDqn");
    }

    #[test]
    fn test_union_rejects_bad_hyperparameters() {
        let model = ModelManagerUnion::DiscreteDqn(DqnConfig {
            gamma: 1.5,
            ..Default::default()
        });
        assert!(matches!(model.validate(), Err(ConfigError::Validation(_))));
        let model = ModelManagerUnion::DiscreteDqn(DqnConfig {
            target_update_interval: 0,
            ..Default::default()
        });
        assert!(model.validate().is_err());
    }
}
