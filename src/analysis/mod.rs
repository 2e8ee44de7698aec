// Analysis module - DSP and classification stages of the capture pipeline
//
// Stages, in the order a capture passes through them:
// - preprocess: DC/drift highpass, level/noise/SNR metrics, quality gate
// - features: STFT, spectral rows, summary descriptors, feature vectors
// - classifier: point and probabilistic model capabilities
// - model: artifact loading and best-candidate selection

pub mod classifier;
pub mod features;
pub mod model;
pub mod preprocess;

pub use classifier::{Classifier, Prediction};
pub use features::{FeatureExtractor, FeatureVector, SpectralRow, SpectralSummary, Spectrogram};
pub use model::{load_best, LoadedModel, ModelArtifact};
pub use preprocess::{preprocess, QualityGate, QualityMetrics, QualityRejection};
