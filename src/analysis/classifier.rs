// Classifier - material classification from feature vectors
//
// Models come in two capabilities:
//
// Point:         label only (confidence reported as 1.0)
// Probabilistic: label plus per-class probabilities (confidence is the
//                largest probability)
//
// Concrete models implement one of the two traits and are wrapped in the
// `Classifier` enum, so callers never probe for optional methods at runtime.
// Every model can carry a standard scaler applied before scoring.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Predicted material label with confidence in [0, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
}

/// Model that outputs a label only
pub trait PointClassifier: Send + Sync {
    /// Class labels in model order
    fn classes(&self) -> &[String];

    /// Expected input width, `None` if any width is accepted
    fn num_features(&self) -> Option<usize>;

    fn predict(&self, features: &[f64]) -> String;
}

/// Model that also outputs a probability per class
pub trait ProbabilisticClassifier: PointClassifier {
    /// Probabilities aligned with `classes()`, summing to 1
    fn predict_probability(&self, features: &[f64]) -> Vec<f64>;
}

/// A loaded model tagged by capability
pub enum Classifier {
    Probabilistic(Box<dyn ProbabilisticClassifier>),
    Point(Box<dyn PointClassifier>),
}

impl Classifier {
    pub fn classes(&self) -> &[String] {
        match self {
            Classifier::Probabilistic(model) => model.classes(),
            Classifier::Point(model) => model.classes(),
        }
    }

    pub fn num_features(&self) -> Option<usize> {
        match self {
            Classifier::Probabilistic(model) => model.num_features(),
            Classifier::Point(model) => model.num_features(),
        }
    }

    pub fn is_probabilistic(&self) -> bool {
        matches!(self, Classifier::Probabilistic(_))
    }

    /// Classify one aligned feature row
    ///
    /// # Errors
    /// `ModelError::SchemaMismatch` if the row width differs from what the
    /// model was fitted on
    pub fn predict(&self, features: &[f64]) -> Result<Prediction, ModelError> {
        if let Some(expected) = self.num_features() {
            if expected != features.len() {
                return Err(ModelError::SchemaMismatch {
                    expected,
                    actual: features.len(),
                });
            }
        }

        let prediction = match self {
            Classifier::Probabilistic(model) => {
                let probabilities = model.predict_probability(features);
                let confidence = probabilities
                    .iter()
                    .copied()
                    .filter(|p| p.is_finite())
                    .fold(0.0, f64::max);
                Prediction {
                    label: model.predict(features),
                    confidence: confidence.clamp(0.0, 1.0),
                }
            }
            Classifier::Point(model) => Prediction {
                label: model.predict(features),
                confidence: 1.0,
            },
        };
        Ok(prediction)
    }
}

/// Per-feature standardization `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn transform(&self, features: &[f64]) -> Vec<f64> {
        features
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                let mean = self.mean.get(i).copied().unwrap_or(0.0);
                let scale = match self.scale.get(i).copied() {
                    Some(s) if s != 0.0 => s,
                    _ => 1.0,
                };
                (x - mean) / scale
            })
            .collect()
    }
}

fn scaled(scaler: &Option<StandardScaler>, features: &[f64]) -> Vec<f64> {
    match scaler {
        Some(scaler) => scaler.transform(features),
        None => features.to_vec(),
    }
}

fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, &v)| {
            if v > best.1 {
                (i, v)
            } else {
                best
            }
        })
        .0
}

/// Multinomial logistic regression (softmax over linear class scores)
pub struct LogisticModel {
    classes: Vec<String>,
    /// `coefficients[class][feature]`
    coefficients: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
    scaler: Option<StandardScaler>,
}

impl LogisticModel {
    pub fn new(
        classes: Vec<String>,
        coefficients: Vec<Vec<f64>>,
        intercepts: Vec<f64>,
        scaler: Option<StandardScaler>,
    ) -> Self {
        Self {
            classes,
            coefficients,
            intercepts,
            scaler,
        }
    }

    fn scores(&self, features: &[f64]) -> Vec<f64> {
        let x = scaled(&self.scaler, features);
        self.coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(weights, bias)| bias + weights.iter().zip(&x).map(|(w, v)| w * v).sum::<f64>())
            .collect()
    }
}

impl PointClassifier for LogisticModel {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn num_features(&self) -> Option<usize> {
        self.coefficients.first().map(Vec::len)
    }

    fn predict(&self, features: &[f64]) -> String {
        let probabilities = self.predict_probability(features);
        self.classes[argmax(&probabilities)].clone()
    }
}

impl ProbabilisticClassifier for LogisticModel {
    fn predict_probability(&self, features: &[f64]) -> Vec<f64> {
        let scores = self.scores(features);
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
        let total: f64 = exps.iter().sum();
        exps.iter().map(|e| e / total).collect()
    }
}

/// Label of the closest class centroid (Euclidean)
pub struct NearestCentroidModel {
    classes: Vec<String>,
    centroids: Vec<Vec<f64>>,
    scaler: Option<StandardScaler>,
}

impl NearestCentroidModel {
    pub fn new(
        classes: Vec<String>,
        centroids: Vec<Vec<f64>>,
        scaler: Option<StandardScaler>,
    ) -> Self {
        Self {
            classes,
            centroids,
            scaler,
        }
    }
}

impl PointClassifier for NearestCentroidModel {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn num_features(&self) -> Option<usize> {
        self.centroids.first().map(Vec::len)
    }

    fn predict(&self, features: &[f64]) -> String {
        let x = scaled(&self.scaler, features);
        let negative_distances: Vec<f64> = self
            .centroids
            .iter()
            .map(|centroid| {
                -centroid
                    .iter()
                    .zip(&x)
                    .map(|(c, v)| (c - v).powi(2))
                    .sum::<f64>()
            })
            .collect();
        self.classes[argmax(&negative_distances)].clone()
    }
}

/// Always predicts the same label (the majority class of its training data)
pub struct ConstantModel {
    classes: Vec<String>,
    num_features: Option<usize>,
}

impl ConstantModel {
    pub fn new(label: String, num_features: Option<usize>) -> Self {
        Self {
            classes: vec![label],
            num_features,
        }
    }
}

impl PointClassifier for ConstantModel {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn num_features(&self) -> Option<usize> {
        self.num_features
    }

    fn predict(&self, _features: &[f64]) -> String {
        self.classes[0].clone()
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
