//! Model artifacts and best-candidate selection.
//!
//! Artifacts are JSON documents tagged by `kind`. Each one records the ordered
//! feature schema it was fitted on; vectors are realigned onto that schema
//! before prediction. An artifact without a schema accepts vectors as-is and
//! only checks their width.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::classifier::{
    Classifier, ConstantModel, LogisticModel, NearestCentroidModel, Prediction, StandardScaler,
};
use crate::analysis::features::{ColumnKey, FeatureVector};
use crate::error::ModelError;

/// Serialized classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Logistic {
        classes: Vec<String>,
        #[serde(default)]
        schema: Vec<ColumnKey>,
        #[serde(default)]
        scaler: Option<StandardScaler>,
        coefficients: Vec<Vec<f64>>,
        intercepts: Vec<f64>,
    },
    NearestCentroid {
        classes: Vec<String>,
        #[serde(default)]
        schema: Vec<ColumnKey>,
        #[serde(default)]
        scaler: Option<StandardScaler>,
        centroids: Vec<Vec<f64>>,
    },
    Constant {
        label: String,
        #[serde(default)]
        schema: Vec<ColumnKey>,
    },
}

impl ModelArtifact {
    pub fn schema(&self) -> &[ColumnKey] {
        match self {
            ModelArtifact::Logistic { schema, .. }
            | ModelArtifact::NearestCentroid { schema, .. }
            | ModelArtifact::Constant { schema, .. } => schema,
        }
    }

    /// Check internal consistency; the message describes the first problem
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ModelArtifact::Logistic {
                classes,
                schema,
                scaler,
                coefficients,
                intercepts,
            } => {
                check_classes(classes)?;
                if coefficients.len() != classes.len() || intercepts.len() != classes.len() {
                    return Err(format!(
                        "{} classes but {} coefficient rows and {} intercepts",
                        classes.len(),
                        coefficients.len(),
                        intercepts.len()
                    ));
                }
                check_rows(coefficients, schema, scaler)
            }
            ModelArtifact::NearestCentroid {
                classes,
                schema,
                scaler,
                centroids,
            } => {
                check_classes(classes)?;
                if centroids.len() != classes.len() {
                    return Err(format!(
                        "{} classes but {} centroids",
                        classes.len(),
                        centroids.len()
                    ));
                }
                check_rows(centroids, schema, scaler)
            }
            ModelArtifact::Constant { label, .. } => {
                if label.is_empty() {
                    return Err("constant model has an empty label".to_string());
                }
                Ok(())
            }
        }
    }

    /// Build the runtime classifier, consuming the artifact
    pub fn into_classifier(self) -> Classifier {
        match self {
            ModelArtifact::Logistic {
                classes,
                scaler,
                coefficients,
                intercepts,
                ..
            } => Classifier::Probabilistic(Box::new(LogisticModel::new(
                classes,
                coefficients,
                intercepts,
                scaler,
            ))),
            ModelArtifact::NearestCentroid {
                classes,
                scaler,
                centroids,
                ..
            } => Classifier::Point(Box::new(NearestCentroidModel::new(
                classes, centroids, scaler,
            ))),
            ModelArtifact::Constant { label, schema } => {
                let width = (!schema.is_empty()).then_some(schema.len());
                Classifier::Point(Box::new(ConstantModel::new(label, width)))
            }
        }
    }

    /// Read and validate an artifact from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let invalid = |reason: String| ModelError::InvalidArtifact {
            path: path.to_path_buf(),
            reason,
        };
        let contents = fs::read_to_string(path).map_err(|err| invalid(err.to_string()))?;
        let artifact: ModelArtifact =
            serde_json::from_str(&contents).map_err(|err| invalid(err.to_string()))?;
        artifact.validate().map_err(invalid)?;
        Ok(artifact)
    }

    /// Write the artifact as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        let path = path.as_ref();
        let invalid = |reason: String| ModelError::InvalidArtifact {
            path: path.to_path_buf(),
            reason,
        };
        let json = serde_json::to_string_pretty(self).map_err(|err| invalid(err.to_string()))?;
        fs::write(path, json).map_err(|err| invalid(err.to_string()))
    }
}

fn check_classes(classes: &[String]) -> Result<(), String> {
    if classes.is_empty() {
        return Err("model has no classes".to_string());
    }
    Ok(())
}

fn check_rows(
    rows: &[Vec<f64>],
    schema: &[ColumnKey],
    scaler: &Option<StandardScaler>,
) -> Result<(), String> {
    let width = rows[0].len();
    if rows.iter().any(|row| row.len() != width) {
        return Err("rows have inconsistent widths".to_string());
    }
    if !schema.is_empty() && schema.len() != width {
        return Err(format!(
            "schema has {} columns but rows have {}",
            schema.len(),
            width
        ));
    }
    if let Some(scaler) = scaler {
        if scaler.mean.len() != width || scaler.scale.len() != width {
            return Err(format!(
                "scaler has {}/{} entries but rows have {}",
                scaler.mean.len(),
                scaler.scale.len(),
                width
            ));
        }
    }
    Ok(())
}

/// Classifier ready for prediction, plus where it came from
pub struct LoadedModel {
    pub classifier: Classifier,
    pub schema: Vec<ColumnKey>,
    pub path: PathBuf,
}

impl LoadedModel {
    pub fn from_artifact(artifact: ModelArtifact, path: PathBuf) -> Self {
        let schema = artifact.schema().to_vec();
        Self {
            classifier: artifact.into_classifier(),
            schema,
            path,
        }
    }

    /// Align `vector` to the model schema (when it has one) and classify it
    pub fn predict(&self, vector: &FeatureVector) -> Result<Prediction, ModelError> {
        if self.schema.is_empty() {
            return self.classifier.predict(vector.values());
        }
        let aligned = vector.reindex(&self.schema);
        self.classifier.predict(aligned.values())
    }
}

/// Load the first candidate artifact that exists under `directory`
///
/// Candidates are tried in order; later ones are never consulted once an
/// earlier file exists, even if that file turns out to be invalid.
///
/// # Errors
/// * `ModelError::NotFound` if no candidate exists
/// * `ModelError::InvalidArtifact` if the first existing candidate is unusable
pub fn load_best<P: AsRef<Path>>(
    candidates: &[String],
    directory: P,
) -> Result<LoadedModel, ModelError> {
    let directory = directory.as_ref();
    for candidate in candidates {
        let path = directory.join(candidate);
        if path.exists() {
            let artifact = ModelArtifact::load(&path)?;
            tracing::info!("[ModelSelector] Loaded model from {}", path.display());
            return Ok(LoadedModel::from_artifact(artifact, path));
        }
        tracing::debug!("[ModelSelector] Candidate {} not present", path.display());
    }
    Err(ModelError::NotFound {
        candidates: candidates.to_vec(),
        directory: directory.to_path_buf(),
    })
}
