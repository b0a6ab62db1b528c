//! Report encoding
//!
//! Encodes a decoded prediction into a versioned, machine-readable JSON
//! payload for host applications that log or ship predictions. The display
//! strings consumed by UI collaborators live in [`crate::format`].

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::EngineError;
use crate::types::{
    ClassificationResult, EngineStats, PredictionRecord, ReportPayload, ReportProducer,
    ReportProvenance, ReportQuality,
};
use crate::{ENGINE_VERSION, PRODUCER_NAME};

/// Current report schema version
pub const REPORT_VERSION: &str = "activity.prediction.v1";

/// Winning probability below which a report is flagged low-confidence
const LOW_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Report encoder for producing payloads with a stable instance identity
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Encode one prediction into a report payload.
    ///
    /// `observed_at` is the capture time of the newest reading in the
    /// window, when the source provides one; it defaults to the encoding
    /// time, making freshness zero.
    pub fn encode(
        &self,
        result: &ClassificationResult,
        stats: &EngineStats,
        device_id: &str,
        observed_at: Option<DateTime<Utc>>,
    ) -> ReportPayload {
        let computed_at = Utc::now();
        let observed_at = observed_at.unwrap_or(computed_at);

        let producer = ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: ENGINE_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        };

        let provenance = ReportProvenance {
            source_device_id: device_id.to_string(),
            observed_at_utc: observed_at.to_rfc3339(),
            computed_at_utc: computed_at.to_rfc3339(),
        };

        let quality = build_quality(result, stats, observed_at, computed_at);

        let prediction = PredictionRecord {
            label: result.label,
            confidence: result.confidence(),
            distribution: result.distribution.clone(),
        };

        ReportPayload {
            report_version: REPORT_VERSION.to_string(),
            producer,
            provenance,
            quality,
            prediction,
        }
    }

    /// Encode to JSON string
    pub fn encode_to_json(
        &self,
        result: &ClassificationResult,
        stats: &EngineStats,
        device_id: &str,
        observed_at: Option<DateTime<Utc>>,
    ) -> Result<String, EngineError> {
        let payload = self.encode(result, stats, device_id, observed_at);
        serde_json::to_string(&payload).map_err(EngineError::JsonError)
    }
}

fn build_quality(
    result: &ClassificationResult,
    stats: &EngineStats,
    observed_at: DateTime<Utc>,
    computed_at: DateTime<Utc>,
) -> ReportQuality {
    let coverage = if stats.samples_seen == 0 {
        1.0
    } else {
        (stats.samples_seen - stats.samples_rejected) as f64 / stats.samples_seen as f64
    };

    let confidence = result.confidence();

    let mut flags = Vec::new();
    if stats.samples_rejected > 0 {
        flags.push("malformedsamples".to_string());
    }
    if stats.inference_failures > 0 {
        flags.push("inferencefailures".to_string());
    }
    if confidence < LOW_CONFIDENCE_THRESHOLD {
        flags.push("lowconfidence".to_string());
    }

    ReportQuality {
        coverage,
        freshness_sec: (computed_at - observed_at).num_seconds(),
        confidence,
        flags,
    }
}
