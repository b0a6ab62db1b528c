//! Pipeline orchestration
//!
//! [`ActivityEngine`] is the per-session orchestrator: it consumes raw
//! accelerometer triples, drives the three axis filters and the sliding
//! window, triggers the classifier once the window is full, and decodes the
//! score vector into a [`ClassificationResult`].
//!
//! Control flow is strictly synchronous and data-driven by sample arrival:
//! one call per sample, no background scheduling, at most one call in
//! flight. The engine is not reentrant-safe; multi-threaded delivery needs
//! a single-writer queue feeding one thread that owns the engine.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::filter::{FilterConfig, TriAxisFilter};
use crate::inference::{decode, Classifier, WindowTensor};
use crate::types::{ClassificationResult, EngineStats, RawReading, Sample};
use crate::window::{WindowBuffer, DEFAULT_WINDOW_SIZE};

/// Engine configuration, fixed for the session.
///
/// Explicit configuration rather than compiled-in constants so tests can
/// run with small windows. The default window length matches the bundled
/// model contract (`[1, 150, 3]`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Samples per classifier input window
    pub window_size: usize,
    /// Tuning constants shared by all three axis filters
    pub filter: FilterConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            filter: FilterConfig::default(),
        }
    }
}

impl EngineConfig {
    fn validate(&self) -> Result<(), EngineError> {
        if self.window_size == 0 {
            return Err(EngineError::InvalidConfig(
                "window_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Session state as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    /// The window has not yet filled; no predictions are possible
    Warmup,
    /// The window is full and keeps sliding; one prediction per sample
    Ready,
}

/// Per-session recognition pipeline.
///
/// Owns all mutable state (three filter states and the window) exclusively.
/// Filters and window live for the whole session; results are ephemeral,
/// one per trigger.
pub struct ActivityEngine {
    config: EngineConfig,
    filters: TriAxisFilter,
    window: WindowBuffer,
    classifier: Option<Box<dyn Classifier>>,
    stats: EngineStats,
}

impl ActivityEngine {
    /// Engine with default configuration and an injected classifier.
    pub fn new(classifier: Box<dyn Classifier>) -> Self {
        // Default config always validates
        Self::build(EngineConfig::default(), Some(classifier))
    }

    /// Engine with explicit configuration.
    pub fn with_config(
        config: EngineConfig,
        classifier: Box<dyn Classifier>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self::build(config, Some(classifier)))
    }

    /// Degraded session for hosts whose model artifact failed to load, and
    /// for hosts that run the model themselves (the FFI integration mode).
    ///
    /// The filter and window stages run normally; every inference step is
    /// skipped. Use [`ActivityEngine::window_tensor`] plus
    /// [`crate::inference::decode`] to drive inference externally.
    pub fn without_classifier(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self::build(config, None))
    }

    fn build(config: EngineConfig, classifier: Option<Box<dyn Classifier>>) -> Self {
        Self {
            filters: TriAxisFilter::new(config.filter),
            window: WindowBuffer::new(config.window_size),
            config,
            classifier,
            stats: EngineStats::default(),
        }
    }

    /// Feed one raw triple through the pipeline.
    ///
    /// Returns a result only when the window was full at the time of this
    /// call; `None` during warmup and on locally-recovered failures.
    /// Malformed (non-finite) triples are rejected before the filters and
    /// a single failed inference skips only its own cycle; in both cases
    /// the session keeps running and no state is reset.
    pub fn on_sample(&mut self, raw: [f64; 3]) -> Option<ClassificationResult> {
        self.stats.samples_seen += 1;

        if !raw.iter().all(|v| v.is_finite()) {
            self.stats.samples_rejected += 1;
            warn!(
                "rejected non-finite sample ({}, {}, {})",
                raw[0], raw[1], raw[2]
            );
            return None;
        }

        let sample = self.filters.apply(raw);
        self.window.push(sample);

        if !self.window.is_full() {
            return None;
        }

        let classifier = self.classifier.as_mut()?;
        let tensor = WindowTensor::from_samples(&self.window.snapshot());
        let decoded = classifier
            .classify(&tensor)
            .and_then(|scores| decode(&scores));

        match decoded {
            Ok(result) => {
                self.stats.predictions += 1;
                Some(result)
            }
            Err(e) => {
                self.stats.inference_failures += 1;
                warn!("inference cycle skipped: {}", e);
                None
            }
        }
    }

    /// Serde-form convenience for CLI and FFI paths; same semantics as
    /// [`ActivityEngine::on_sample`].
    pub fn on_reading(&mut self, reading: &RawReading) -> Option<ClassificationResult> {
        self.on_sample(reading.axes())
    }

    /// Complete one host-driven inference cycle.
    ///
    /// Decodes a score vector the host obtained by running its own model
    /// on [`ActivityEngine::window_tensor`], keeping the session counters
    /// accurate. Failures follow the same skip-and-continue contract as
    /// internal inference: the error is reported, nothing is reset.
    pub fn decode_scores(&mut self, scores: &[f32]) -> Result<ClassificationResult, EngineError> {
        match decode(scores) {
            Ok(result) => {
                self.stats.predictions += 1;
                Ok(result)
            }
            Err(e) => {
                self.stats.inference_failures += 1;
                warn!("inference cycle skipped: {}", e);
                Err(e)
            }
        }
    }

    /// Current per-axis filter estimates, for display alongside raw values.
    pub fn filtered(&self) -> Sample {
        self.filters.estimates()
    }

    /// The assembled classifier input, once the window is full.
    pub fn window_tensor(&self) -> Option<WindowTensor> {
        if self.window.is_full() {
            Some(WindowTensor::from_samples(&self.window.snapshot()))
        } else {
            None
        }
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn is_warmed_up(&self) -> bool {
        self.window.is_full()
    }

    pub fn state(&self) -> EngineState {
        if self.window.is_full() {
            EngineState::Ready
        } else {
            EngineState::Warmup
        }
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Discard filter and window state for a host-driven session restart.
    /// Counters survive; the engine itself never resets between
    /// predictions.
    pub fn reset(&mut self) {
        self.filters = TriAxisFilter::new(self.config.filter);
        self.window.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Activity;

    fn small_config(window_size: usize) -> EngineConfig {
        EngineConfig {
            window_size,
            filter: FilterConfig::default(),
        }
    }

    fn constant_classifier(scores: Vec<f32>) -> Box<dyn Classifier> {
        Box::new(move |_: &WindowTensor| -> Result<Vec<f32>, EngineError> { Ok(scores.clone()) })
    }

    #[test]
    fn test_no_result_until_window_full_then_every_sample() {
        let window_size = 10;
        let mut engine = ActivityEngine::with_config(
            small_config(window_size),
            constant_classifier(vec![0.1, 0.05, 0.05, 0.1, 0.7]),
        )
        .unwrap();

        for i in 1..window_size {
            assert!(engine.on_sample([0.1, 0.2, 0.3]).is_none(), "sample {}", i);
            assert_eq!(engine.state(), EngineState::Warmup);
        }

        // N-th sample and every sample thereafter: sliding-window cadence
        for _ in 0..25 {
            let result = engine.on_sample([0.1, 0.2, 0.3]).unwrap();
            assert_eq!(result.label, Activity::Walking);
            assert_eq!(engine.state(), EngineState::Ready);
        }

        assert_eq!(engine.stats().predictions, 25);
    }

    #[test]
    fn test_malformed_sample_rejected_without_touching_state() {
        let mut engine =
            ActivityEngine::with_config(small_config(5), constant_classifier(vec![0.2; 5]))
                .unwrap();

        engine.on_sample([1.0, 2.0, 3.0]);
        let before = engine.filtered();
        let len_before = engine.window_len();

        assert!(engine.on_sample([f64::NAN, 0.0, 0.0]).is_none());

        assert_eq!(engine.filtered(), before);
        assert_eq!(engine.window_len(), len_before);
        assert_eq!(engine.stats().samples_rejected, 1);
    }

    #[test]
    fn test_malformed_sample_does_not_block_convergence() {
        let mut engine =
            ActivityEngine::with_config(small_config(5), constant_classifier(vec![0.2; 5]))
                .unwrap();

        engine.on_sample([f64::NAN, 0.0, 0.0]);
        for _ in 0..200 {
            engine.on_sample([5.0, 5.0, 5.0]);
        }

        let filtered = engine.filtered();
        assert!((filtered.x - 5.0).abs() < 1e-3);
        assert!((filtered.y - 5.0).abs() < 1e-3);
        assert!((filtered.z - 5.0).abs() < 1e-3);
        assert_eq!(engine.stats().samples_seen, 201);
        assert_eq!(engine.stats().samples_rejected, 1);
    }

    #[test]
    fn test_single_inference_failure_skips_one_cycle() {
        let mut calls = 0usize;
        let classifier = Box::new(move |_: &WindowTensor| -> Result<Vec<f32>, EngineError> {
            calls += 1;
            if calls == 1 {
                Err(EngineError::Inference("interpreter busy".to_string()))
            } else {
                Ok(vec![0.0, 0.0, 1.0, 0.0, 0.0])
            }
        });

        let mut engine = ActivityEngine::with_config(small_config(3), classifier).unwrap();

        engine.on_sample([0.0, 0.0, 0.0]);
        engine.on_sample([0.0, 0.0, 0.0]);

        // Cycle m fails, cycle m+1 recovers with unchanged input
        assert!(engine.on_sample([0.0, 0.0, 0.0]).is_none());
        let result = engine.on_sample([0.0, 0.0, 0.0]).unwrap();
        assert_eq!(result.label, Activity::Running);

        assert_eq!(engine.stats().inference_failures, 1);
        assert_eq!(engine.stats().predictions, 1);
    }

    #[test]
    fn test_wrong_score_shape_is_an_inference_failure() {
        let mut engine =
            ActivityEngine::with_config(small_config(2), constant_classifier(vec![1.0, 0.0]))
                .unwrap();

        engine.on_sample([0.0, 0.0, 0.0]);
        assert!(engine.on_sample([0.0, 0.0, 0.0]).is_none());
        assert_eq!(engine.stats().inference_failures, 1);
    }

    #[test]
    fn test_degraded_session_fills_window_but_never_predicts() {
        let mut engine = ActivityEngine::without_classifier(small_config(4)).unwrap();

        for _ in 0..10 {
            assert!(engine.on_sample([0.5, 0.5, 0.5]).is_none());
        }

        assert!(engine.is_warmed_up());
        let tensor = engine.window_tensor().unwrap();
        assert_eq!(tensor.shape(), [1, 4, 3]);
        assert_eq!(engine.stats().predictions, 0);
        assert_eq!(engine.stats().inference_failures, 0);
    }

    #[test]
    fn test_zero_window_size_rejected() {
        assert!(matches!(
            ActivityEngine::without_classifier(small_config(0)),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_reset_returns_to_warmup() {
        let mut engine =
            ActivityEngine::with_config(small_config(2), constant_classifier(vec![0.2; 5]))
                .unwrap();

        engine.on_sample([1.0, 1.0, 1.0]);
        engine.on_sample([1.0, 1.0, 1.0]);
        assert_eq!(engine.state(), EngineState::Ready);

        engine.reset();
        assert_eq!(engine.state(), EngineState::Warmup);
        assert_eq!(engine.window_len(), 0);
        assert_eq!(engine.filtered(), Sample::default());
    }
}
