// Model error types and constants

use crate::error::ErrorCode;
use log::error;
use std::path::PathBuf;
use thiserror::Error;

/// Model error code constants
///
/// Error code range: 3001-3003
pub struct ModelErrorCodes {}

impl ModelErrorCodes {
    /// No candidate artifact exists in the model directory
    pub const NOT_FOUND: i32 = 3001;

    /// Artifact exists but could not be read or deserialized
    pub const INVALID_ARTIFACT: i32 = 3002;

    /// Feature vector does not match what the model was trained on
    pub const SCHEMA_MISMATCH: i32 = 3003;
}

/// Log a model error with structured context
pub fn log_model_error(err: &ModelError, context: &str) {
    error!(
        "Model error in {}: code={}, component=ModelSelector, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Classifier loading and prediction errors
///
/// `NotFound` and `InvalidArtifact` are fatal for the process: there is no
/// fallback classifier.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("no model found in {candidates:?} under {}", directory.display())]
    NotFound {
        candidates: Vec<String>,
        directory: PathBuf,
    },

    #[error("invalid model artifact {}: {reason}", path.display())]
    InvalidArtifact { path: PathBuf, reason: String },

    #[error("feature vector has {actual} columns, model expects {expected}")]
    SchemaMismatch { expected: usize, actual: usize },
}

impl ErrorCode for ModelError {
    fn code(&self) -> i32 {
        match self {
            ModelError::NotFound { .. } => ModelErrorCodes::NOT_FOUND,
            ModelError::InvalidArtifact { .. } => ModelErrorCodes::INVALID_ARTIFACT,
            ModelError::SchemaMismatch { .. } => ModelErrorCodes::SCHEMA_MISMATCH,
        }
    }

    fn message(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_codes() {
        assert_eq!(
            ModelError::NotFound {
                candidates: vec![],
                directory: PathBuf::from(".")
            }
            .code(),
            3001
        );
        assert_eq!(
            ModelError::InvalidArtifact {
                path: PathBuf::from("m.json"),
                reason: "eof".to_string()
            }
            .code(),
            3002
        );
        assert_eq!(
            ModelError::SchemaMismatch {
                expected: 3,
                actual: 2
            }
            .code(),
            3003
        );
    }

    #[test]
    fn test_not_found_lists_candidates() {
        let err = ModelError::NotFound {
            candidates: vec!["robust_model.json".to_string()],
            directory: PathBuf::from("models"),
        };
        assert!(err.message().contains("robust_model.json"));
        assert!(err.message().contains("models"));
    }
}
