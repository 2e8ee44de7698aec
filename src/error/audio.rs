// Audio error types and constants

use crate::error::ErrorCode;
use log::error;
use std::path::PathBuf;
use thiserror::Error;

/// Audio error code constants
///
/// Error code range: 1001-1005
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// WAV file could not be opened or decoded
    pub const DECODE_FAILED: i32 = 1001;

    /// Sample format is not supported
    pub const UNSUPPORTED_FORMAT: i32 = 1002;

    /// Sample rate is zero or otherwise unusable
    pub const INVALID_SAMPLE_RATE: i32 = 1003;

    /// Waveform contains no samples
    pub const EMPTY_INPUT: i32 = 1004;

    /// WAV file could not be written
    pub const WRITE_FAILED: i32 = 1005;
}

/// Log an audio error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=Waveform, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// These errors cover decoding recordings from disk and validating the
/// resulting waveform before analysis.
///
/// Error code range: 1001-1005
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AudioError {
    /// WAV file could not be opened or decoded
    #[error("failed to decode {}: {reason}", path.display())]
    DecodeFailed { path: PathBuf, reason: String },

    /// Sample format is not supported
    #[error("unsupported bits_per_sample={bits} for {}", path.display())]
    UnsupportedFormat { path: PathBuf, bits: u16 },

    /// Sample rate is zero or otherwise unusable
    #[error("invalid sample rate {rate} Hz")]
    InvalidSampleRate { rate: u32 },

    /// Waveform contains no samples
    #[error("waveform contains no samples")]
    EmptyInput,

    /// WAV file could not be written
    #[error("failed to write {}: {reason}", path.display())]
    WriteFailed { path: PathBuf, reason: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::DecodeFailed { .. } => AudioErrorCodes::DECODE_FAILED,
            AudioError::UnsupportedFormat { .. } => AudioErrorCodes::UNSUPPORTED_FORMAT,
            AudioError::InvalidSampleRate { .. } => AudioErrorCodes::INVALID_SAMPLE_RATE,
            AudioError::EmptyInput => AudioErrorCodes::EMPTY_INPUT,
            AudioError::WriteFailed { .. } => AudioErrorCodes::WRITE_FAILED,
        }
    }

    fn message(&self) -> String {
        self.to_string()
    }
}
