//! Motionsense - On-device activity recognition engine for phone
//! accelerometer streams
//!
//! Motionsense turns an unbounded, noisy 3-axis linear-acceleration stream
//! into classified physical activity through a deterministic pipeline:
//! per-axis recursive filtering → sliding-window assembly → classifier
//! invocation → arg-max decoding into a label plus confidence distribution.
//!
//! The classifier itself is an external collaborator injected at
//! construction (fixed-shape float tensor in, fixed-shape score vector
//! out); hosts that own the model (the usual phone integration) run the
//! engine without one and drive decoding through [`pipeline::ActivityEngine::window_tensor`]
//! and [`inference::decode`].

pub mod encoder;
pub mod error;
pub mod filter;
pub mod format;
pub mod inference;
pub mod pipeline;
pub mod types;
pub mod window;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use encoder::{ReportEncoder, REPORT_VERSION};
pub use error::EngineError;
pub use filter::{AxisFilter, FilterConfig, TriAxisFilter};
pub use inference::{decode, Classifier, WindowTensor};
pub use pipeline::{ActivityEngine, EngineConfig, EngineState};
pub use types::{Activity, ClassificationResult, EngineStats, LabelConfidence, RawReading, Sample};
pub use window::{WindowBuffer, DEFAULT_WINDOW_SIZE};

/// Engine version embedded in all report payloads
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for report payloads
pub const PRODUCER_NAME: &str = "motionsense";
