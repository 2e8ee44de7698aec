// Pipeline module - capture flow from raw waveform to classification event
//
// Stages, in order:
//   resample -> highpass + SNR -> quality gate -> calibration gain
//   -> spectrogram -> spectral row -> baseline subtraction
//   -> summary descriptors -> feature vector -> classifier
//
// A capture that fails the quality gate stops before any spectral work and is
// reported as `CaptureOutcome::Rejected`. It is a normal result, not an error.

pub mod events;

use std::path::Path;

use crate::analysis::features::{FeatureExtractor, FeatureVector, SpectralSummary};
use crate::analysis::preprocess::{self, QualityGate, QualityMetrics, QualityRejection};
use crate::audio::{load_wav, Waveform};
use crate::baseline::{self, BaselineStore};
use crate::calibration::{self, CalibrationProfile};
use crate::config::PipelineConfig;
use crate::context::PipelineContext;
use crate::error::{AudioError, PipelineError};
pub use events::{ClassificationEvent, EventKind};

/// Features of one accepted capture
#[derive(Debug, Clone)]
pub struct CaptureAnalysis {
    /// Level/noise measurements of the cleaned, uncalibrated capture
    pub metrics: QualityMetrics,
    pub summary: SpectralSummary,
    /// Sanitized classifier input (spectral row then descriptors)
    pub vector: FeatureVector,
    /// Whether a dataset baseline was subtracted from the spectral row
    pub baseline_applied: bool,
}

/// Result of running one capture through the pipeline
#[derive(Debug, Clone)]
pub enum CaptureOutcome {
    Rejected(QualityRejection),
    Classified(ClassificationEvent),
}

/// Everything between a raw waveform and a feature vector
///
/// Owns the pre-planned feature extractor and the baseline store, so one
/// analyzer serves any number of captures.
pub struct CaptureAnalyzer {
    target_sample_rate: u32,
    highpass_cutoff_hz: f64,
    gate: QualityGate,
    calibration: Option<CalibrationProfile>,
    extractor: FeatureExtractor,
    baselines: BaselineStore,
}

impl CaptureAnalyzer {
    pub fn new(config: &PipelineConfig, calibration: Option<CalibrationProfile>) -> Self {
        Self::with_baselines(
            config,
            calibration,
            BaselineStore::new(&config.paths, &config.audio),
        )
    }

    /// Analyzer using a caller-supplied baseline store
    pub fn with_baselines(
        config: &PipelineConfig,
        calibration: Option<CalibrationProfile>,
        baselines: BaselineStore,
    ) -> Self {
        Self {
            target_sample_rate: config.audio.target_sample_rate,
            highpass_cutoff_hz: config.audio.highpass_cutoff_hz,
            gate: QualityGate::from_config(&config.quality),
            calibration,
            extractor: FeatureExtractor::new(&config.audio, &config.summary),
            baselines,
        }
    }

    pub fn calibration(&self) -> Option<&CalibrationProfile> {
        self.calibration.as_ref()
    }

    pub fn baselines(&self) -> &BaselineStore {
        &self.baselines
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Load a capture from disk at the analysis sample rate
    pub fn load(&self, path: &Path) -> Result<Waveform, AudioError> {
        load_wav(path, Some(self.target_sample_rate))
    }

    /// Run a capture through preprocessing, the gate and feature extraction
    ///
    /// `dataset` selects the baseline to subtract; `None` skips normalization.
    pub fn analyze(
        &self,
        wave: Waveform,
        dataset: Option<&str>,
    ) -> Result<CaptureAnalysis, QualityRejection> {
        let wave = wave.resampled(self.target_sample_rate);
        let (cleaned, _) = preprocess::preprocess(&wave, self.highpass_cutoff_hz);
        let metrics = preprocess::measure(&cleaned.to_f64());
        self.gate.check(metrics.avg_db, metrics.snr_db)?;

        let calibrated = calibration::apply(cleaned, self.calibration.as_ref());
        let spectrogram = self.extractor.spectrogram(&calibrated);
        let mut row = self.extractor.row(&spectrogram);

        let reference = dataset.and_then(|name| self.baselines.resolve(name));
        if let Some(spectrum) = &reference {
            row = baseline::subtract(&row, spectrum);
        }

        let summary = self.extractor.summarize(&spectrogram, &calibrated);
        let vector = FeatureVector::from_parts(&row, &summary).sanitize();
        tracing::debug!(
            "[Pipeline] Extracted {} features (snr {:.1} dB, baseline {})",
            vector.len(),
            metrics.snr_db,
            reference.is_some()
        );

        Ok(CaptureAnalysis {
            metrics,
            summary,
            vector,
            baseline_applied: reference.is_some(),
        })
    }
}

/// Classify an in-memory capture
///
/// # Errors
/// `AudioError::EmptyInput` for a capture with no samples, or a model error
/// if the vector cannot be mapped onto the classifier's inputs.
pub fn process_capture(
    context: &PipelineContext,
    wave: Waveform,
    dataset: Option<&str>,
) -> Result<CaptureOutcome, PipelineError> {
    if wave.is_empty() {
        return Err(AudioError::EmptyInput.into());
    }

    let analysis = match context.analyzer.analyze(wave, dataset) {
        Ok(analysis) => analysis,
        Err(rejection) => {
            tracing::info!("[Pipeline] Capture rejected: {}", rejection.hint());
            return Ok(CaptureOutcome::Rejected(rejection));
        }
    };

    let prediction = context.model.predict(&analysis.vector)?;
    tracing::info!(
        "[Pipeline] Predicted {} ({:.2})",
        prediction.label,
        prediction.confidence
    );

    Ok(CaptureOutcome::Classified(ClassificationEvent::new(
        prediction,
        analysis.metrics.snr_db,
        &analysis.summary,
        &context.device_id,
        context.is_calibrated(),
        &context.model_path().display().to_string(),
    )))
}

/// Load a WAV capture and classify it
pub fn process_file<P: AsRef<Path>>(
    context: &PipelineContext,
    path: P,
    dataset: Option<&str>,
) -> Result<CaptureOutcome, PipelineError> {
    let wave = context.analyzer.load(path.as_ref())?;
    process_capture(context, wave, dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::features::ColumnKey;
    use crate::analysis::model::{LoadedModel, ModelArtifact};
    use crate::baseline::{BaselineSource, BaselineSpectrum, CacheSource};
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    const RATE: u32 = 44_100;

    /// One second of a 1 kHz tone over seeded low-level noise
    fn tone_with_noise(amplitude: f64) -> Waveform {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let samples = (0..RATE as usize)
            .map(|i| {
                let t = i as f64 / RATE as f64;
                let tone = amplitude * (2.0 * std::f64::consts::PI * 1_000.0 * t).sin();
                (tone + rng.gen_range(-1e-4..1e-4)) as f32
            })
            .collect();
        Waveform::new(samples, RATE)
    }

    fn constant_context(config: PipelineConfig, calibration: Option<CalibrationProfile>) -> PipelineContext {
        let model = LoadedModel::from_artifact(
            ModelArtifact::Constant {
                label: "metal".to_string(),
                schema: vec![],
            },
            PathBuf::from("robust_model.json"),
        );
        PipelineContext::from_parts(config, "bench".to_string(), calibration, model)
    }

    fn permissive_config(root: &Path) -> PipelineConfig {
        let mut config = PipelineConfig::default().with_root(root);
        config.quality.min_snr_db = f64::NEG_INFINITY;
        config
    }

    struct FixedSource(BaselineSpectrum);

    impl BaselineSource for FixedSource {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn fetch(&self, _dataset: &str) -> Option<BaselineSpectrum> {
            Some(self.0.clone())
        }
    }

    #[test]
    fn test_silence_is_rejected_as_too_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let context = constant_context(PipelineConfig::default().with_root(dir.path()), None);

        let outcome = process_capture(&context, Waveform::new(vec![0.0; RATE as usize], RATE), None)
            .unwrap();
        assert!(matches!(
            outcome,
            CaptureOutcome::Rejected(QualityRejection::TooQuiet { .. })
        ));
    }

    #[test]
    fn test_empty_capture_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let context = constant_context(PipelineConfig::default().with_root(dir.path()), None);

        let err = process_capture(&context, Waveform::new(vec![], RATE), None).unwrap_err();
        assert!(matches!(err, PipelineError::Audio(AudioError::EmptyInput)));
    }

    #[test]
    fn test_accepted_capture_produces_event() {
        let dir = tempfile::tempdir().unwrap();
        let context = constant_context(
            permissive_config(dir.path()),
            Some(CalibrationProfile::new(2.0, RATE)),
        );

        let outcome = process_capture(&context, tone_with_noise(0.5), None).unwrap();
        let CaptureOutcome::Classified(event) = outcome else {
            panic!("expected a classification");
        };
        assert_eq!(event.prediction, "metal");
        assert_eq!(event.confidence, 1.0);
        assert_eq!(event.device_id, "bench");
        assert!(event.calibrated);
        assert_eq!(event.model_path, "robust_model.json");
        assert!(event.spectral_centroid > 0.0);
    }

    #[test]
    fn test_analysis_vector_is_finite_and_resampled() {
        let dir = tempfile::tempdir().unwrap();
        let config = permissive_config(dir.path());
        let analyzer = CaptureAnalyzer::new(&config, None);

        let mut wave = tone_with_noise(0.5);
        wave.sample_rate = 48_000;
        let analysis = analyzer.analyze(wave, None).unwrap();
        assert!(!analysis.vector.is_empty());
        assert!(analysis.vector.is_finite());
        assert!(!analysis.baseline_applied);
        assert!(analysis.summary.duration_s > 0.9);
    }

    #[test]
    fn test_baseline_is_subtracted_from_row() {
        let dir = tempfile::tempdir().unwrap();
        let config = permissive_config(dir.path());
        let plain = CaptureAnalyzer::new(&config, None)
            .analyze(tone_with_noise(0.5), None)
            .unwrap();
        let first = plain.vector.columns()[0].clone();
        let ColumnKey::Bin(bin) = first else {
            panic!("spectral bins come first");
        };

        let baseline = BaselineSpectrum::from(BTreeMap::from([(bin, 0.25)]));
        let store = BaselineStore::with_tiers(
            CacheSource::new(dir.path().join("cache")),
            vec![Box::new(FixedSource(baseline))],
        );
        let normalized = CaptureAnalyzer::with_baselines(&config, None, store)
            .analyze(tone_with_noise(0.5), Some("lab"))
            .unwrap();

        assert!(normalized.baseline_applied);
        assert_eq!(plain.vector.columns(), normalized.vector.columns());
        let before = plain.vector.get(&first).unwrap();
        let after = normalized.vector.get(&first).unwrap();
        assert!((before - 0.25 - after).abs() < 1e-12);
        assert_eq!(plain.vector.values()[1], normalized.vector.values()[1]);
    }

    #[test]
    fn test_process_file_surfaces_decode_errors() {
        let dir = tempfile::tempdir().unwrap();
        let context = constant_context(PipelineConfig::default().with_root(dir.path()), None);
        let path = dir.path().join("broken.wav");
        std::fs::write(&path, b"not a wav").unwrap();

        let err = process_file(&context, &path, None).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Audio(AudioError::DecodeFailed { .. })
        ));
    }
}
