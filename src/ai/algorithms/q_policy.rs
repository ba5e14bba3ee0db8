use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::ai::agent::Policy;
use crate::ai::state_encoding::{expect_dense, expect_serving};
use crate::env::{Action, Observation};
use crate::error::AgentError;
use crate::normalization::Preprocessor;

/// Read-only view of a Q-function over normalized features.
pub trait QFunction {
    /// Q-values for one or more rows of `num_features` normalized features,
    /// returned row-major as `[rows, num_actions]`.
    fn q_values(&self, features: &[f32]) -> Result<Vec<f32>, AgentError>;

    fn num_features(&self) -> usize;

    fn num_actions(&self) -> usize;
}

/// Boltzmann exploration over Q-values of raw observations.
pub struct SoftmaxPolicy<Q: QFunction + ?Sized> {
    q: std::rc::Rc<Q>,
    preprocessor: Preprocessor,
    temperature: f32,
    rng: StdRng,
}

impl<Q: QFunction + ?Sized> SoftmaxPolicy<Q> {
    pub fn new(q: std::rc::Rc<Q>, preprocessor: Preprocessor, temperature: f32, seed: u64) -> Self {
        SoftmaxPolicy {
            q,
            preprocessor,
            temperature,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<Q: QFunction + ?Sized> Policy for SoftmaxPolicy<Q> {
    fn select_action(&mut self, observation: &Observation) -> Result<Action, AgentError> {
        let values = expect_dense(observation, self.q.num_features())?;
        let features = self
            .preprocessor
            .apply_dense(values)
            .map_err(AgentError::Preprocessing)?;
        let q_values = self.q.q_values(&features)?;
        let probs = softmax(&q_values, self.temperature);
        Ok(sample_categorical(&probs, &mut self.rng))
    }

    fn name(&self) -> &str {
        "Softmax"
    }
}

/// Deterministic argmax over Q-values of serving-layout observations.
pub struct GreedyServingPolicy<Q: QFunction + ?Sized> {
    q: std::rc::Rc<Q>,
    preprocessor: Preprocessor,
}

impl<Q: QFunction + ?Sized> GreedyServingPolicy<Q> {
    pub fn new(q: std::rc::Rc<Q>, preprocessor: Preprocessor) -> Self {
        GreedyServingPolicy { q, preprocessor }
    }
}

impl<Q: QFunction + ?Sized> Policy for GreedyServingPolicy<Q> {
    fn select_action(&mut self, observation: &Observation) -> Result<Action, AgentError> {
        let (values, presence) = expect_serving(observation, self.q.num_features())?;
        let features = self
            .preprocessor
            .apply(values, presence)
            .map_err(AgentError::Preprocessing)?;
        let q_values = self.q.q_values(&features)?;
        Ok(argmax(&q_values))
    }

    fn name(&self) -> &str {
        "GreedyServing"
    }
}

/// Index of the largest value; the first one wins ties.
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Softmax of `values / temperature`.
fn softmax(values: &[f32], temperature: f32) -> Vec<f32> {
    let temperature = temperature.max(f32::EPSILON);
    // Numerically stable softmax
    let max_val = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut probs: Vec<f32> = values
        .iter()
        .map(|&v| ((v - max_val) / temperature).exp())
        .collect();
    let sum: f32 = probs.iter().sum();
    for p in &mut probs {
        *p /= sum;
    }
    probs
}

/// Sample an action from a categorical distribution defined by probs.
fn sample_categorical(probs: &[f32], rng: &mut StdRng) -> usize {
    let r: f32 = rng.random_range(0.0..1.0);
    let mut cumulative = 0.0;
    for (i, &p) in probs.iter().enumerate() {
        cumulative += p;
        if r < cumulative {
            return i;
        }
    }
    // Rounding can leave the total just under one.
    probs.iter().rposition(|&p| p > 0.0).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::ai::state_encoding::encode_serving;
    use crate::normalization::{only_continuous_normalizer, NormalizationData};

    /// Q(s, a) = s[0] * weight[a], ignoring the other features.
    struct LinearQ {
        weights: Vec<f32>,
        num_features: usize,
    }

    impl QFunction for LinearQ {
        fn q_values(&self, features: &[f32]) -> Result<Vec<f32>, AgentError> {
            Ok(features
                .chunks(self.num_features)
                .flat_map(|row| self.weights.iter().map(move |w| row[0] * w))
                .collect())
        }

        fn num_features(&self) -> usize {
            self.num_features
        }

        fn num_actions(&self) -> usize {
            self.weights.len()
        }
    }

    fn identity(num_features: usize) -> Preprocessor {
        let ids: Vec<usize> = (0..num_features).collect();
        let data = NormalizationData {
            dense_normalization_parameters: only_continuous_normalizer(&ids, &[], &[]),
        };
        Preprocessor::new(&data).unwrap()
    }

    fn q(weights: Vec<f32>) -> Rc<LinearQ> {
        Rc::new(LinearQ {
            weights,
            num_features: 2,
        })
    }

    #[test]
    fn test_argmax_prefers_first_on_ties() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0]), 1);
        assert_eq!(argmax(&[-1.0]), 0);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0], 0.5);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_low_temperature_is_nearly_greedy() {
        let mut policy = SoftmaxPolicy::new(q(vec![-1.0, 1.0]), identity(2), 0.01, 7);
        let obs = Observation::Dense(vec![1.0, 0.0]);
        for _ in 0..50 {
            assert_eq!(policy.select_action(&obs).unwrap(), 1);
        }
    }

    #[test]
    fn test_high_temperature_explores() {
        let mut policy = SoftmaxPolicy::new(q(vec![0.0, 0.1]), identity(2), 100.0, 7);
        let obs = Observation::Dense(vec![1.0, 0.0]);
        let mut counts = [0usize; 2];
        for _ in 0..400 {
            counts[policy.select_action(&obs).unwrap()] += 1;
        }
        assert!(counts[0] > 100 && counts[1] > 100, "counts {counts:?}");
    }

    #[test]
    fn test_softmax_policy_rejects_serving_layout() {
        let mut policy = SoftmaxPolicy::new(q(vec![1.0, 2.0]), identity(2), 1.0, 0);
        let obs = encode_serving(&Observation::Dense(vec![1.0, 0.0])).unwrap();
        assert!(matches!(
            policy.select_action(&obs),
            Err(AgentError::Preprocessing(_))
        ));
    }

    #[test]
    fn test_greedy_serving_policy_takes_argmax() {
        let mut policy = GreedyServingPolicy::new(q(vec![1.0, -1.0, 0.5]), identity(2));
        let positive = encode_serving(&Observation::Dense(vec![2.0, 0.0])).unwrap();
        let negative = encode_serving(&Observation::Dense(vec![-2.0, 0.0])).unwrap();
        assert_eq!(policy.select_action(&positive).unwrap(), 0);
        assert_eq!(policy.select_action(&negative).unwrap(), 1);
    }

    #[test]
    fn test_greedy_serving_policy_rejects_raw_observation() {
        let mut policy = GreedyServingPolicy::new(q(vec![1.0, 2.0]), identity(2));
        assert!(policy
            .select_action(&Observation::Dense(vec![1.0, 0.0]))
            .is_err());
    }
}
