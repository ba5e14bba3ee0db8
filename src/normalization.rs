//! Observation-space normalization descriptors and the dense feature
//! preprocessor that applies them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::env::ObservationSpace;
use crate::error::EnvError;

/// Normalized features are clamped to `[-MAX_FEATURE_VALUE, MAX_FEATURE_VALUE]`.
pub const MAX_FEATURE_VALUE: f32 = 6.0;

/// Key of the state features in a [`NormalizationDataMap`].
pub const STATE_KEY: &str = "state";

/// Continuous feature: standardized with `mean` and `stddev`, then clamped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationParameters {
    pub mean: f32,
    pub stddev: f32,
    pub min_value: Option<f32>,
    pub max_value: Option<f32>,
}

/// Per-feature normalization, keyed by feature id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizationData {
    pub dense_normalization_parameters: BTreeMap<usize, NormalizationParameters>,
}

pub type NormalizationDataMap = BTreeMap<String, NormalizationData>;

/// Continuous normalization (mean 0, stddev 1) for every feature id, keeping
/// the finite bounds of the space for reference.
pub fn only_continuous_normalizer(
    feature_ids: &[usize],
    low: &[f32],
    high: &[f32],
) -> BTreeMap<usize, NormalizationParameters> {
    let finite = |v: f32| (v.is_finite() && v.abs() < f32::MAX).then_some(v);
    feature_ids
        .iter()
        .map(|&id| {
            let params = NormalizationParameters {
                mean: 0.0,
                stddev: 1.0,
                min_value: low.get(id).copied().and_then(finite),
                max_value: high.get(id).copied().and_then(finite),
            };
            (id, params)
        })
        .collect()
}

/// Derive the normalization descriptor for an observation space.
///
/// A one-dimensional box yields continuous normalization for every element.
/// A dictionary space is treated as an opaque image-like observation and
/// yields `None`. Anything else is unsupported.
pub fn build_normalizer(space: &ObservationSpace) -> Result<Option<NormalizationDataMap>, EnvError> {
    match space {
        ObservationSpace::Box { low, high, shape } => {
            if shape.len() != 1 {
                return Err(EnvError::UnsupportedSpace(format!(
                    "Box with shape {shape:?} (only 1-D boxes are supported)"
                )));
            }
            let ids: Vec<usize> = (0..shape[0]).collect();
            let mut map = NormalizationDataMap::new();
            map.insert(
                STATE_KEY.to_string(),
                NormalizationData {
                    dense_normalization_parameters: only_continuous_normalizer(&ids, low, high),
                },
            );
            Ok(Some(map))
        }
        ObservationSpace::Dict(_) => Ok(None),
        ObservationSpace::Discrete(n) => Err(EnvError::UnsupportedSpace(format!("Discrete({n})"))),
    }
}

/// Applies [`NormalizationParameters`] to dense feature rows.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    parameters: Vec<NormalizationParameters>,
}

impl Preprocessor {
    /// Feature ids must be contiguous from zero.
    pub fn new(data: &NormalizationData) -> Result<Self, String> {
        let params = &data.dense_normalization_parameters;
        for (expected, id) in params.keys().enumerate() {
            if *id != expected {
                return Err(format!("feature ids must be 0..{}, found {id}", params.len()));
            }
        }
        Ok(Preprocessor {
            parameters: params.values().cloned().collect(),
        })
    }

    pub fn num_features(&self) -> usize {
        self.parameters.len()
    }

    /// Normalize `values` (one or more rows of `num_features`). Features whose
    /// presence is zero come out as zero.
    pub fn apply(&self, values: &[f32], presence: &[f32]) -> Result<Vec<f32>, String> {
        let width = self.parameters.len();
        if values.len() != presence.len() {
            return Err(format!(
                "values ({}) and presence ({}) differ in length",
                values.len(),
                presence.len()
            ));
        }
        if width == 0 || values.len() % width != 0 {
            return Err(format!(
                "expected rows of {width} features, got {} values",
                values.len()
            ));
        }

        let out = values
            .iter()
            .zip(presence)
            .enumerate()
            .map(|(i, (&v, &p))| {
                if p == 0.0 {
                    return 0.0;
                }
                let params = &self.parameters[i % width];
                ((v - params.mean) / params.stddev).clamp(-MAX_FEATURE_VALUE, MAX_FEATURE_VALUE)
            })
            .collect();
        Ok(out)
    }

    /// Normalize rows that are fully present.
    pub fn apply_dense(&self, values: &[f32]) -> Result<Vec<f32>, String> {
        self.apply(values, &vec![1.0; values.len()])
    }
}
