use std::cell::RefCell;
use std::rc::Rc;

use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::TensorData;

use crate::ai::agent::{Trainer, Transition, UpdateMetrics};
use crate::ai::algorithms::q_policy::{argmax, QFunction};
use crate::ai::model_manager::RewardOptions;
use crate::ai::networks::{QNetwork, QNetworkConfig};
use crate::error::{AgentError, TrainerError};
use crate::normalization::Preprocessor;
use crate::training::batch_preprocessor::{DiscreteDqnBatchPreprocessor, DiscreteDqnInput};

/// DQN hyperparameters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DqnConfig {
    pub num_actions: usize,
    pub hidden_sizes: Vec<usize>,
    pub learning_rate: f64,
    pub gamma: f32,
    pub minibatch_size: usize,
    pub target_update_interval: usize,
    pub double_q_learning: bool,
    /// Softmax temperature of the exploring policy.
    pub temperature: f32,
}

impl Default for DqnConfig {
    fn default() -> Self {
        DqnConfig {
            num_actions: 2,
            hidden_sizes: vec![128, 64],
            learning_rate: 1e-3,
            gamma: 0.99,
            minibatch_size: 64,
            target_update_interval: 100,
            double_q_learning: true,
            temperature: 0.35,
        }
    }
}

/// Online Q-network as seen by the policies. The trainer republishes its
/// weights after every update.
pub struct SharedQNetwork<B: Backend> {
    network: RefCell<QNetwork<B>>,
    device: B::Device,
    num_features: usize,
    num_actions: usize,
}

impl<B: Backend> SharedQNetwork<B> {
    fn publish(&self, network: QNetwork<B>) {
        *self.network.borrow_mut() = network;
    }
}

impl<B: Backend> QFunction for SharedQNetwork<B> {
    fn q_values(&self, features: &[f32]) -> Result<Vec<f32>, AgentError> {
        if features.is_empty() || features.len() % self.num_features != 0 {
            return Err(AgentError::Policy(format!(
                "expected rows of {} features, got {} values",
                self.num_features,
                features.len()
            )));
        }
        let rows = features.len() / self.num_features;
        let input = Tensor::<B, 1>::from_data(TensorData::from(features), &self.device)
            .reshape([rows as i32, self.num_features as i32]);
        let q_values = self.network.borrow().forward(input);
        q_values
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| AgentError::Policy(format!("{e:?}")))
    }

    fn num_features(&self) -> usize {
        self.num_features
    }

    fn num_actions(&self) -> usize {
        self.num_actions
    }
}

/// Discrete DQN trainer: online + target networks and an Adam optimizer.
pub struct DqnTrainer<B: AutodiffBackend> {
    q_network: QNetwork<B>,
    target_network: QNetwork<B::InnerBackend>,
    optimizer: burn::optim::adaptor::OptimizerAdaptor<burn::optim::Adam, QNetwork<B>, B>,
    shared: Rc<SharedQNetwork<B::InnerBackend>>,
    batch_preprocessor: DiscreteDqnBatchPreprocessor,
    reward_options: RewardOptions,
    config: DqnConfig,
    device: B::Device,
    step_count: usize,
}

impl<B: AutodiffBackend> DqnTrainer<B> {
    pub fn new(
        config: DqnConfig,
        state_preprocessor: Preprocessor,
        reward_options: RewardOptions,
        device: B::Device,
        seed: u64,
    ) -> Self {
        B::seed(seed);
        let num_features = state_preprocessor.num_features();
        let net_config = QNetworkConfig::new(
            num_features,
            config.hidden_sizes.clone(),
            config.num_actions,
        );
        let q_network: QNetwork<B> = net_config.init(&device);
        let target_network = q_network.valid();
        let shared = Rc::new(SharedQNetwork {
            network: RefCell::new(q_network.valid()),
            device: device.clone(),
            num_features,
            num_actions: config.num_actions,
        });

        DqnTrainer {
            q_network,
            target_network,
            optimizer: AdamConfig::new().init(),
            shared,
            batch_preprocessor: DiscreteDqnBatchPreprocessor::new(
                config.num_actions,
                state_preprocessor,
            ),
            reward_options,
            config,
            device,
            step_count: 0,
        }
    }

    /// Handle to the online network for policies.
    pub fn q_function(&self) -> Rc<SharedQNetwork<B::InnerBackend>> {
        Rc::clone(&self.shared)
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    /// Updates run so far.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// TD targets `r + gamma * Q_target(s', a*)`, or `r` after a terminal
    /// transition. `a*` maximizes the target network, or the online network
    /// with double Q-learning.
    fn compute_targets(
        &self,
        input: &DiscreteDqnInput,
        rewards: &[f32],
    ) -> Result<Vec<f32>, TrainerError> {
        let batch_size = input.batch_size;
        let num_actions = input.num_actions;
        let next_states = || {
            Tensor::<B::InnerBackend, 1>::from_data(
                TensorData::from(input.next_state.as_slice()),
                &self.device,
            )
            .reshape([batch_size as i32, input.num_features as i32])
        };

        let target_q: Vec<f32> = self
            .target_network
            .forward(next_states())
            .into_data()
            .to_vec::<f32>()
            .map_err(tensor_error)?;
        let online_q: Option<Vec<f32>> = if self.config.double_q_learning {
            Some(
                self.q_network
                    .valid()
                    .forward(next_states())
                    .into_data()
                    .to_vec::<f32>()
                    .map_err(tensor_error)?,
            )
        } else {
            None
        };

        let mut targets = Vec::with_capacity(batch_size);
        for i in 0..batch_size {
            if input.not_terminal[i] == 0.0 {
                targets.push(rewards[i]);
                continue;
            }
            let row = i * num_actions..(i + 1) * num_actions;
            let next_value = match &online_q {
                Some(online) => target_q[row.start + argmax(&online[row])],
                None => target_q[row].iter().copied().fold(f32::NEG_INFINITY, f32::max),
            };
            targets.push(rewards[i] + self.config.gamma * next_value);
        }
        Ok(targets)
    }
}

impl<B: AutodiffBackend> Trainer for DqnTrainer<B> {
    fn update(&mut self, batch: &[Transition]) -> Result<UpdateMetrics, TrainerError> {
        let input = self.batch_preprocessor.preprocess(batch)?;
        let batch_size = input.batch_size;
        let num_actions = input.num_actions;
        let rewards: Vec<f32> = batch
            .iter()
            .map(|t| self.reward_options.reward_for(t))
            .collect();
        let target_data = self.compute_targets(&input, &rewards)?;

        // Forward pass on current states: [B, A]
        let states = Tensor::<B, 1>::from_data(TensorData::from(input.state.as_slice()), &self.device)
            .reshape([batch_size as i32, input.num_features as i32]);
        let q_all = self.q_network.forward(states);

        let action_mask =
            Tensor::<B, 1>::from_data(TensorData::from(input.action.as_slice()), &self.device)
                .reshape([batch_size as i32, num_actions as i32]);

        // Q(s, a) = sum(q_all * mask, dim=1) -> [B, 1]
        let q_taken = (q_all * action_mask).sum_dim(1);

        let targets =
            Tensor::<B, 1>::from_data(TensorData::from(target_data.as_slice()), &self.device)
                .reshape([batch_size as i32, 1]);

        // MSE loss
        let diff = q_taken.clone() - targets;
        let loss = (diff.clone() * diff).mean();

        let loss_val = scalar(loss.clone())?;
        let mean_q = scalar(q_taken.mean())?;

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.q_network);
        self.q_network = self
            .optimizer
            .step(self.config.learning_rate, self.q_network.clone(), grads);

        // Periodically sync target network
        self.step_count += 1;
        if self.step_count % self.config.target_update_interval == 0 {
            self.target_network = self.q_network.valid();
        }
        self.shared.publish(self.q_network.valid());

        Ok(UpdateMetrics {
            loss: loss_val,
            mean_q: Some(mean_q),
        })
    }

    fn minibatch_size(&self) -> usize {
        self.config.minibatch_size
    }
}

fn scalar<B: Backend>(tensor: Tensor<B, 1>) -> Result<f32, TrainerError> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(tensor_error)?
        .first()
        .copied()
        .ok_or_else(|| TrainerError::Tensor("empty scalar tensor".into()))
}

fn tensor_error<E: std::fmt::Debug>(e: E) -> TrainerError {
    TrainerError::Tensor(format!("{e:?}"))
}
