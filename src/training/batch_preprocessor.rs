//! Turns sampled transitions into the flat, normalized arrays a discrete DQN
//! update consumes.

use crate::ai::Transition;
use crate::env::Observation;
use crate::error::TrainerError;
use crate::normalization::Preprocessor;

/// Row-major training arrays for a batch of `batch_size` transitions.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteDqnInput {
    pub batch_size: usize,
    pub num_features: usize,
    pub num_actions: usize,
    /// `[batch, features]`
    pub state: Vec<f32>,
    /// `[batch, features]`
    pub next_state: Vec<f32>,
    /// One-hot `[batch, actions]`
    pub action: Vec<f32>,
    /// `[batch]`
    pub reward: Vec<f32>,
    /// `[batch]`, 1.0 unless the transition ended the episode.
    pub not_terminal: Vec<f32>,
    /// `[batch, actions]`, all zero after a terminal transition.
    pub possible_next_actions_mask: Vec<f32>,
}

/// Builds [`DiscreteDqnInput`] from transitions.
pub struct DiscreteDqnBatchPreprocessor {
    num_actions: usize,
    state_preprocessor: Preprocessor,
}

impl DiscreteDqnBatchPreprocessor {
    pub fn new(num_actions: usize, state_preprocessor: Preprocessor) -> Self {
        DiscreteDqnBatchPreprocessor {
            num_actions,
            state_preprocessor,
        }
    }

    pub fn num_features(&self) -> usize {
        self.state_preprocessor.num_features()
    }

    pub fn preprocess(&self, batch: &[Transition]) -> Result<DiscreteDqnInput, TrainerError> {
        if batch.is_empty() {
            return Err(TrainerError::EmptyBatch);
        }
        let batch_size = batch.len();
        let num_features = self.num_features();
        let num_actions = self.num_actions;

        let mut state_values = Vec::with_capacity(batch_size * num_features);
        let mut state_presence = Vec::with_capacity(batch_size * num_features);
        let mut next_values = Vec::with_capacity(batch_size * num_features);
        let mut next_presence = Vec::with_capacity(batch_size * num_features);
        let mut action = vec![0.0; batch_size * num_actions];
        let mut reward = Vec::with_capacity(batch_size);
        let mut possible_next_actions_mask = Vec::with_capacity(batch_size * num_actions);

        for (i, t) in batch.iter().enumerate() {
            push_features(&t.observation, num_features, &mut state_values, &mut state_presence)?;
            push_features(
                &t.next_observation,
                num_features,
                &mut next_values,
                &mut next_presence,
            )?;

            if t.action >= num_actions {
                return Err(TrainerError::ShapeMismatch(format!(
                    "action {} outside {num_actions} actions",
                    t.action
                )));
            }
            action[i * num_actions + t.action] = 1.0;
            reward.push(t.reward);

            let next_mask = if t.terminal { 0.0 } else { 1.0 };
            possible_next_actions_mask.extend(std::iter::repeat_n(next_mask, num_actions));
        }

        let state = self
            .state_preprocessor
            .apply(&state_values, &state_presence)
            .map_err(TrainerError::ShapeMismatch)?;
        let next_state = self
            .state_preprocessor
            .apply(&next_values, &next_presence)
            .map_err(TrainerError::ShapeMismatch)?;

        // Not terminal iff at least one next action is possible.
        let not_terminal = possible_next_actions_mask
            .chunks(num_actions)
            .map(|row| row.iter().copied().fold(0.0, f32::max))
            .collect();

        Ok(DiscreteDqnInput {
            batch_size,
            num_features,
            num_actions,
            state,
            next_state,
            action,
            reward,
            not_terminal,
            possible_next_actions_mask,
        })
    }
}

fn push_features(
    observation: &Observation,
    num_features: usize,
    values: &mut Vec<f32>,
    presence: &mut Vec<f32>,
) -> Result<(), TrainerError> {
    let (v, p) = match observation {
        Observation::Dense(v) => (v.as_slice(), None),
        Observation::Serving(features) => {
            (features.values.as_slice(), Some(features.presence.as_slice()))
        }
    };
    if v.len() != num_features {
        return Err(TrainerError::ShapeMismatch(format!(
            "expected {num_features} features, got {}",
            v.len()
        )));
    }
    values.extend_from_slice(v);
    match p {
        Some(p) => presence.extend_from_slice(p),
        None => presence.extend(std::iter::repeat_n(1.0, num_features)),
    }
    Ok(())
}
