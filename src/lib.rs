// Sweep Analyzer Core - acoustic material classification
// Capture conditioning, baseline normalization and spectral feature extraction

// Module declarations
pub mod analysis;
pub mod audio;
pub mod baseline;
pub mod calibration;
pub mod config;
pub mod context;
pub mod dataset;
pub mod error;
pub mod pipeline;

// Re-exports for convenience
pub use config::PipelineConfig;
pub use context::{ContextHandle, PipelineContext};
pub use error::PipelineError;
pub use pipeline::{process_capture, process_file, CaptureOutcome, ClassificationEvent};
