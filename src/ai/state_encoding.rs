//! Conversions between raw environment observations and the serving
//! observation layout.

use crate::ai::agent::ObsPreprocessor;
use crate::env::{Observation, ServingFeatures};
use crate::error::AgentError;

/// Encode a raw dense observation as a single serving row: the values with
/// an all-ones presence array of the same shape.
pub fn encode_serving(observation: &Observation) -> Result<Observation, AgentError> {
    match observation {
        Observation::Dense(values) => {
            let width = values.len();
            Ok(Observation::Serving(ServingFeatures {
                values: values.clone(),
                presence: vec![1.0; width],
                shape: [1, width],
            }))
        }
        Observation::Serving(_) => Err(AgentError::Preprocessing(
            "observation is already in serving layout".into(),
        )),
    }
}

/// Boxed [`encode_serving`], ready for a serving agent.
pub fn serving_preprocessor() -> ObsPreprocessor {
    Box::new(encode_serving)
}

/// Check a serving observation against the feature width a policy expects
/// and return its values and presence.
pub fn expect_serving(
    observation: &Observation,
    num_features: usize,
) -> Result<(&[f32], &[f32]), AgentError> {
    let features = match observation {
        Observation::Serving(features) => features,
        Observation::Dense(_) => {
            return Err(AgentError::Preprocessing(
                "expected serving layout, got a raw observation".into(),
            ))
        }
    };
    let [rows, cols] = features.shape;
    if rows != 1 || cols != num_features {
        return Err(AgentError::Preprocessing(format!(
            "expected shape [1, {num_features}], got {:?}",
            features.shape
        )));
    }
    if features.values.len() != cols || features.presence.len() != cols {
        return Err(AgentError::Preprocessing(format!(
            "values ({}) and presence ({}) do not match shape {:?}",
            features.values.len(),
            features.presence.len(),
            features.shape
        )));
    }
    Ok((&features.values, &features.presence))
}

/// Check a raw observation against the feature width a policy expects.
pub fn expect_dense(observation: &Observation, num_features: usize) -> Result<&[f32], AgentError> {
    match observation {
        Observation::Dense(values) if values.len() == num_features => Ok(values),
        Observation::Dense(values) => Err(AgentError::Preprocessing(format!(
            "expected {num_features} features, got {}",
            values.len()
        ))),
        Observation::Serving(_) => Err(AgentError::Preprocessing(
            "expected a raw observation, got serving layout".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_serving_adds_presence() {
        let encoded = encode_serving(&Observation::Dense(vec![0.5, -1.0, 2.0])).unwrap();
        let Observation::Serving(features) = encoded else {
            panic!("expected serving layout");
        };
        assert_eq!(features.values, vec![0.5, -1.0, 2.0]);
        assert_eq!(features.presence, vec![1.0; 3]);
        assert_eq!(features.shape, [1, 3]);
    }

    #[test]
    fn test_encode_serving_rejects_serving_input() {
        let once = encode_serving(&Observation::Dense(vec![1.0])).unwrap();
        assert!(matches!(
            encode_serving(&once),
            Err(AgentError::Preprocessing(_))
        ));
    }

    #[test]
    fn test_expect_serving_checks_width() {
        let obs = encode_serving(&Observation::Dense(vec![1.0, 2.0])).unwrap();
        let (values, presence) = expect_serving(&obs, 2).unwrap();
        assert_eq!(values, &[1.0, 2.0]);
        assert_eq!(presence, &[1.0, 1.0]);
        assert!(expect_serving(&obs, 4).is_err());
        assert!(expect_serving(&Observation::Dense(vec![1.0, 2.0]), 2).is_err());
    }

    #[test]
    fn test_expect_dense_checks_width() {
        let obs = Observation::Dense(vec![1.0, 2.0]);
        assert_eq!(expect_dense(&obs, 2).unwrap(), &[1.0, 2.0]);
        assert!(expect_dense(&obs, 3).is_err());
    }
}
