//! Classifier boundary
//!
//! The trained model is an external collaborator: the engine hands it a
//! fixed-shape float tensor and gets back one probability-like score per
//! activity. This module defines that boundary: tensor assembly, the
//! [`Classifier`] trait injected into the orchestrator, and decoding of the
//! score vector into a [`ClassificationResult`].

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::{Activity, ClassificationResult, LabelConfidence, Sample};

/// Dense float32 input tensor of logical shape `[1, frames, 3]`.
///
/// Built by stacking a window snapshot oldest→newest along the time axis,
/// each sample laid out `[x, y, z]`. The model contract is float32, so the
/// filtered `f64` values are narrowed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowTensor {
    data: Vec<f32>,
    frames: usize,
}

impl WindowTensor {
    /// Assemble the tensor from an ordered window snapshot.
    pub fn from_samples(samples: &[Sample]) -> Self {
        let mut data = Vec::with_capacity(samples.len() * 3);
        for s in samples {
            data.push(s.x as f32);
            data.push(s.y as f32);
            data.push(s.z as f32);
        }
        Self {
            data,
            frames: samples.len(),
        }
    }

    /// Logical shape `[batch, frames, channels]`.
    pub fn shape(&self) -> [usize; 3] {
        [1, self.frames, 3]
    }

    /// Flattened row-major data, `frames * 3` floats.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// The opaque classifier capability injected into the orchestrator.
///
/// Expected to behave as a pure, synchronous function from tensor to score
/// vector; loading and owning the model artifact is the implementor's
/// responsibility. Any closure with the right signature qualifies, which is
/// how tests substitute deterministic stubs.
pub trait Classifier {
    fn classify(&mut self, input: &WindowTensor) -> Result<Vec<f32>, EngineError>;
}

impl<F> Classifier for F
where
    F: FnMut(&WindowTensor) -> Result<Vec<f32>, EngineError>,
{
    fn classify(&mut self, input: &WindowTensor) -> Result<Vec<f32>, EngineError> {
        self(input)
    }
}

/// Decode a classifier score vector into a result.
///
/// Arg-max with first-maximum tie-break scanning in fixed label order; the
/// distribution is reported in that same order, probabilities as produced
/// by the classifier. A score vector of the wrong length is a contract
/// violation and fails decoding.
pub fn decode(scores: &[f32]) -> Result<ClassificationResult, EngineError> {
    if scores.len() != Activity::ALL.len() {
        return Err(EngineError::ScoreShape {
            expected: Activity::ALL.len(),
            got: scores.len(),
        });
    }

    let mut best = 0;
    for (i, &score) in scores.iter().enumerate().skip(1) {
        if score > scores[best] {
            best = i;
        }
    }

    let distribution = Activity::ALL
        .iter()
        .zip(scores)
        .map(|(&label, &probability)| LabelConfidence {
            label,
            probability: f64::from(probability),
        })
        .collect();

    Ok(ClassificationResult {
        // best is always in range after the length check
        label: Activity::ALL[best],
        distribution,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_layout_oldest_first() {
        let samples = vec![Sample::new(1.0, 2.0, 3.0), Sample::new(4.0, 5.0, 6.0)];
        let tensor = WindowTensor::from_samples(&samples);

        assert_eq!(tensor.shape(), [1, 2, 3]);
        assert_eq!(tensor.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_decode_picks_highest_score() {
        let result = decode(&[0.1, 0.05, 0.05, 0.1, 0.7]).unwrap();
        assert_eq!(result.label, Activity::Walking);
        assert!((result.confidence() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_decode_tie_break_lowest_index() {
        let result = decode(&[0.2, 0.2, 0.2, 0.2, 0.2]).unwrap();
        assert_eq!(result.label, Activity::ClimbingDown);
    }

    #[test]
    fn test_decode_distribution_in_label_order() {
        let result = decode(&[0.5, 0.2, 0.1, 0.1, 0.1]).unwrap();
        let labels: Vec<Activity> = result.distribution.iter().map(|c| c.label).collect();
        assert_eq!(labels, Activity::ALL.to_vec());
        assert!((result.distribution[1].probability - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        match decode(&[0.5, 0.5]) {
            Err(EngineError::ScoreShape { expected, got }) => {
                assert_eq!(expected, 5);
                assert_eq!(got, 2);
            }
            other => panic!("expected ScoreShape error, got {:?}", other),
        }
    }

    #[test]
    fn test_closure_satisfies_classifier() {
        let mut stub = |input: &WindowTensor| -> Result<Vec<f32>, EngineError> {
            assert_eq!(input.shape()[2], 3);
            Ok(vec![0.0, 0.0, 1.0, 0.0, 0.0])
        };
        let tensor = WindowTensor::from_samples(&[Sample::default()]);
        let scores = stub.classify(&tensor).unwrap();
        assert_eq!(decode(&scores).unwrap().label, Activity::Running);
    }
}
