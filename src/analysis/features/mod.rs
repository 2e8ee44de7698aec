// FeatureExtractor - spectral feature extraction for material classification
//
// This module turns a cleaned waveform into the classifier input: a
// time-averaged spectral row keyed by integer frequency bin, followed by a
// fixed set of summary descriptors computed from the same spectrogram and
// the waveform itself.
//
// Module organization:
// - spectrum: STFT, band restriction, spectral rows
// - spectral: Frequency-domain descriptors (centroid, bandwidth, rolloff, ...)
// - mel: Mel filterbank and cepstral coefficients
// - temporal: Time-domain descriptors (ZCR, peak level, crest factor)
// - types: SpectralSummary, ColumnKey, FeatureVector
// - mod.rs: Coordinator (FeatureExtractor)
//
// References:
// - Peeters, G. (2004). A large set of audio features for sound description
// - Lerch, A. (2012). An Introduction to Audio Content Analysis

pub mod mel;
pub mod spectral;
pub mod spectrum;
pub mod temporal;
mod types;

pub use spectrum::{AnalysisOptions, SpectralRow, Spectrogram, SpectrumAnalyzer, WindowKind};
pub use types::{ColumnKey, FeatureVector, SpectralSummary};

use crate::analysis::preprocess;
use crate::audio::Waveform;
use crate::config::{AudioConfig, SummaryConfig};
use mel::summarize_mel;
use spectral::SpectralFeatures;

/// Compute the full descriptor set for one capture
///
/// # Arguments
/// * `spectrogram` - Band-limited magnitude spectrogram of `samples`
/// * `samples` - Cleaned (and calibrated) waveform samples
/// * `sample_rate` - Sample rate of `samples` in Hz
/// * `config` - Mel/cepstral sizes and rolloff fraction
pub fn summarize(
    spectrogram: &Spectrogram,
    samples: &[f64],
    sample_rate: u32,
    config: &SummaryConfig,
) -> SpectralSummary {
    let mut summary = SpectralSummary {
        mfcc_mean: vec![0.0; config.n_mfcc],
        mfcc_std: vec![0.0; config.n_mfcc],
        ..SpectralSummary::default()
    };

    if !spectrogram.is_empty() {
        let spectral = SpectralFeatures::new(config.rolloff_pct);
        let freqs = &spectrogram.freqs;
        let mean_mag = spectrogram.mean_magnitude();

        let energy = spectral.compute_energy(&mean_mag);
        let centroid = spectral.compute_centroid(freqs, &mean_mag, energy);
        summary.spectral_energy = energy;
        summary.spectral_energy_std = spectral.compute_energy_std(&mean_mag);
        summary.spectral_centroid = centroid;
        summary.spectral_bandwidth = spectral.compute_bandwidth(freqs, &mean_mag, centroid, energy);
        summary.spectral_rolloff = spectral.compute_rolloff(freqs, &mean_mag, energy);
        summary.spectral_flatness = spectral.compute_flatness(&mean_mag);
        summary.spectral_flux = spectral.compute_flux(spectrogram);
        summary.spectral_entropy = spectral.compute_entropy(&mean_mag, energy);

        let mel = summarize_mel(spectrogram, config.n_mels, config.n_mfcc);
        summary.mel_mean = mel.mel_mean;
        summary.mel_std = mel.mel_std;
        summary.mfcc_mean = mel.mfcc_mean;
        summary.mfcc_std = mel.mfcc_std;
    }

    let metrics = preprocess::measure(samples);
    summary.snr_db = metrics.snr_db;
    summary.noise_floor_db = metrics.noise_floor_db;
    summary.rms_db = metrics.avg_db;
    summary.zero_crossing_rate = temporal::zero_crossing_rate(samples);
    summary.peak_db = temporal::peak_db(samples);
    summary.crest_factor = temporal::crest_factor(samples);
    summary.duration_s = if sample_rate > 0 {
        samples.len() as f64 / sample_rate as f64
    } else {
        0.0
    };
    summary
}

/// FeatureExtractor coordinates spectral analysis and summary extraction
///
/// Built once from configuration; the FFT plan and window are reused for
/// every capture.
pub struct FeatureExtractor {
    analyzer: SpectrumAnalyzer,
    row_options: AnalysisOptions,
    summary_config: SummaryConfig,
}

impl FeatureExtractor {
    pub fn new(audio: &AudioConfig, summary: &SummaryConfig) -> Self {
        Self {
            analyzer: SpectrumAnalyzer::new(audio),
            row_options: AnalysisOptions::from_config(audio),
            summary_config: summary.clone(),
        }
    }

    pub fn spectrogram(&self, wave: &Waveform) -> Spectrogram {
        self.analyzer.compute(&wave.to_f64(), wave.sample_rate)
    }

    /// Time-averaged spectral row using the configured row options
    pub fn row(&self, spectrogram: &Spectrogram) -> SpectralRow {
        SpectralRow::from_spectrogram(spectrogram, self.row_options)
    }

    /// Spectrogram and row in one step
    pub fn spectral_row(&self, wave: &Waveform) -> SpectralRow {
        self.row(&self.spectrogram(wave))
    }

    pub fn summarize(&self, spectrogram: &Spectrogram, wave: &Waveform) -> SpectralSummary {
        summarize(
            spectrogram,
            &wave.to_f64(),
            wave.sample_rate,
            &self.summary_config,
        )
    }

    /// Extract the raw (not baseline-normalized) feature vector
    pub fn extract(&self, wave: &Waveform) -> FeatureVector {
        let spectrogram = self.spectrogram(wave);
        let row = self.row(&spectrogram);
        let summary = self.summarize(&spectrogram, wave);
        FeatureVector::from_parts(&row, &summary).sanitize()
    }
}
