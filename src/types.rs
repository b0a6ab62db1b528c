//! Core types for the Motionsense pipeline
//!
//! This module defines the data that flows through each stage of the
//! pipeline: raw readings, filtered samples, classification results, and
//! the serialized report payload handed to host applications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Activity classes in the model's training order.
///
/// The variant order is load-bearing: output vector index `i` corresponds
/// to `Activity::ALL[i]`. Reordering without retraining the model corrupts
/// results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    ClimbingDown,
    ClimbingUp,
    Running,
    Sitting,
    Walking,
}

impl Activity {
    /// All activities in training/index order.
    pub const ALL: [Activity; 5] = [
        Activity::ClimbingDown,
        Activity::ClimbingUp,
        Activity::Running,
        Activity::Sitting,
        Activity::Walking,
    ];

    /// Display label as shown to users.
    pub fn as_str(&self) -> &'static str {
        match self {
            Activity::ClimbingDown => "Climbing Down",
            Activity::ClimbingUp => "Climbing Up",
            Activity::Running => "Running",
            Activity::Sitting => "Sitting",
            Activity::Walking => "Walking",
        }
    }

    /// Activity for a classifier output index, if in range.
    pub fn from_index(index: usize) -> Option<Activity> {
        Self::ALL.get(index).copied()
    }
}

/// One raw accelerometer triple as delivered by a sensor source.
///
/// Units are m/s² (linear acceleration; raw accelerometer including gravity
/// may substitute, but mixing the two within one session biases the filter).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    /// Capture time, if the source provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl RawReading {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            timestamp: None,
            x,
            y,
            z,
        }
    }

    /// Axis values as an array in `[x, y, z]` order.
    pub fn axes(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Reject non-finite readings before they reach the filters.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.axes().iter().all(|v| v.is_finite()) {
            Ok(())
        } else {
            Err(EngineError::MalformedSample {
                x: self.x,
                y: self.y,
                z: self.z,
            })
        }
    }
}

/// One filtered reading, produced by applying the three axis filters to a
/// raw triple.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Sample {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Probability assigned to one activity label
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelConfidence {
    pub label: Activity,
    pub probability: f64,
}

/// Decoded classifier output: best label plus the full confidence
/// distribution in fixed label order.
///
/// Probabilities are reported as produced by the classifier, not
/// renormalized. One result is created per full window and handed to the
/// caller; the engine retains nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: Activity,
    pub distribution: Vec<LabelConfidence>,
}

impl ClassificationResult {
    /// Probability of the winning label.
    pub fn confidence(&self) -> f64 {
        self.distribution
            .iter()
            .find(|c| c.label == self.label)
            .map(|c| c.probability)
            .unwrap_or(0.0)
    }
}

/// Session counters for locally-recovered failures and throughput.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Raw triples offered to the engine
    pub samples_seen: u64,
    /// Non-finite triples rejected before the filters
    pub samples_rejected: u64,
    /// Results successfully decoded and emitted
    pub predictions: u64,
    /// Classifier invocations that failed and were skipped
    pub inference_failures: u64,
}

/// Report producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Report provenance information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProvenance {
    pub source_device_id: String,
    pub observed_at_utc: String,
    pub computed_at_utc: String,
}

/// Report quality metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportQuality {
    /// Fraction of offered samples accepted into the pipeline (0-1)
    pub coverage: f64,
    /// Seconds since the underlying reading was observed
    pub freshness_sec: i64,
    /// Probability of the winning label (0-1)
    pub confidence: f64,
    /// Quality flags
    pub flags: Vec<String>,
}

/// One decoded prediction in serialized form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub label: Activity,
    pub confidence: f64,
    pub distribution: Vec<LabelConfidence>,
}

/// Complete prediction report payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPayload {
    pub report_version: String,
    pub producer: ReportProducer,
    pub provenance: ReportProvenance,
    pub quality: ReportQuality,
    pub prediction: PredictionRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_order_matches_training_order() {
        let labels: Vec<&str> = Activity::ALL.iter().map(|a| a.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Climbing Down",
                "Climbing Up",
                "Running",
                "Sitting",
                "Walking"
            ]
        );
    }

    #[test]
    fn test_from_index() {
        assert_eq!(Activity::from_index(0), Some(Activity::ClimbingDown));
        assert_eq!(Activity::from_index(4), Some(Activity::Walking));
        assert_eq!(Activity::from_index(5), None);
    }

    #[test]
    fn test_reading_validate_rejects_non_finite() {
        assert!(RawReading::new(0.1, -0.2, 9.8).validate().is_ok());
        assert!(RawReading::new(f64::NAN, 0.0, 0.0).validate().is_err());
        assert!(RawReading::new(0.0, f64::INFINITY, 0.0).validate().is_err());
        assert!(RawReading::new(0.0, 0.0, f64::NEG_INFINITY)
            .validate()
            .is_err());
    }

    #[test]
    fn test_reading_roundtrip_without_timestamp() {
        let json = r#"{"x": 0.5, "y": -1.25, "z": 9.81}"#;
        let reading: RawReading = serde_json::from_str(json).unwrap();
        assert_eq!(reading.timestamp, None);
        assert_eq!(reading.axes(), [0.5, -1.25, 9.81]);
    }

    #[test]
    fn test_result_confidence_is_winning_probability() {
        let result = ClassificationResult {
            label: Activity::Running,
            distribution: vec![
                LabelConfidence {
                    label: Activity::ClimbingDown,
                    probability: 0.1,
                },
                LabelConfidence {
                    label: Activity::Running,
                    probability: 0.9,
                },
            ],
        };
        assert!((result.confidence() - 0.9).abs() < f64::EPSILON);
    }
}
