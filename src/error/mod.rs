// Error types for the sweep analyzer
//
// This module defines per-domain error types for audio decoding, calibration
// persistence and classifier loading, each carrying a stable numeric code.
// Capture-quality rejections are deliberately NOT errors: they are reported as
// values by the pipeline (see `pipeline::CaptureOutcome`).

mod audio;
mod calibration;
mod model;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use model::{log_model_error, ModelError, ModelErrorCodes};

use thiserror::Error;

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the library and CLI boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

/// Errors that halt a capture before a prediction is produced.
///
/// Everything else (baseline tier failures, degenerate spectra, corrupt
/// caches) degrades to defaults inside the pipeline and never reaches here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    #[error(transparent)]
    Model(#[from] ModelError),

    /// A thread panicked while holding the shared pipeline context
    #[error("pipeline context lock poisoned")]
    ContextPoisoned,
}

/// Code for `PipelineError::ContextPoisoned`
pub const CONTEXT_POISONED: i32 = 4001;

impl ErrorCode for PipelineError {
    fn code(&self) -> i32 {
        match self {
            PipelineError::Audio(err) => err.code(),
            PipelineError::Calibration(err) => err.code(),
            PipelineError::Model(err) => err.code(),
            PipelineError::ContextPoisoned => CONTEXT_POISONED,
        }
    }

    fn message(&self) -> String {
        self.to_string()
    }
}
