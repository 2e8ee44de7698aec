// Calibration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::path::PathBuf;
use thiserror::Error;

/// Calibration error code constants
///
/// Error code range: 2001-2003
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// Calibration record exists but could not be read
    pub const READ_FAILED: i32 = 2001;

    /// Calibration record could not be parsed
    pub const MALFORMED: i32 = 2002;

    /// Calibration record could not be written
    pub const WRITE_FAILED: i32 = 2003;
}

/// Log a calibration error with structured context
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=CalibrationStore, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
///
/// A missing profile is not an error (the device is simply uncalibrated);
/// these variants cover records that exist but cannot be used, and failures
/// to persist a new record.
///
/// Error code range: 2001-2003
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    /// Calibration record exists but could not be read
    #[error("failed to read calibration record {}: {reason}", path.display())]
    ReadFailed { path: PathBuf, reason: String },

    /// Calibration record could not be parsed
    #[error("malformed calibration record for device {device_id}: {reason}")]
    Malformed { device_id: String, reason: String },

    /// Calibration record could not be written
    #[error("failed to write calibration record {}: {reason}", path.display())]
    WriteFailed { path: PathBuf, reason: String },
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::ReadFailed { .. } => CalibrationErrorCodes::READ_FAILED,
            CalibrationError::Malformed { .. } => CalibrationErrorCodes::MALFORMED,
            CalibrationError::WriteFailed { .. } => CalibrationErrorCodes::WRITE_FAILED,
        }
    }

    fn message(&self) -> String {
        self.to_string()
    }
}
