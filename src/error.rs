//! Error types for Motionsense

use thiserror::Error;

/// Errors that can occur while running the recognition engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// No usable sensor source at session start. Fatal to startup; the
    /// pipeline never begins.
    #[error("No usable sensor source: {0}")]
    SensorUnavailable(String),

    /// Model artifact missing or corrupt at session start. The host may
    /// still run a degraded session (filter/window only) via
    /// `ActivityEngine::without_classifier`.
    #[error("Failed to load model artifact: {0}")]
    ModelLoad(String),

    /// A single classifier invocation failed. Recovered locally: the cycle
    /// is skipped and the stream continues.
    #[error("Inference failed: {0}")]
    Inference(String),

    /// The classifier returned a score vector of the wrong length.
    #[error("Classifier returned {got} scores, expected {expected}")]
    ScoreShape { expected: usize, got: usize },

    /// A raw triple contained NaN or infinity. Rejected before the filters;
    /// the recursion has no NaN recovery.
    #[error("Non-finite sample rejected: ({x}, {y}, {z})")]
    MalformedSample { x: f64, y: f64, z: f64 },

    /// Invalid engine configuration
    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// Invalid JSON on a report or FFI path
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
