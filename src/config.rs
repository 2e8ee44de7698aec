//! Configuration management for the capture analysis pipeline
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling threshold and path tuning without recompilation. Every section
//! carries defaults, so a partial file only overrides what it names.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::features::WindowKind;

/// Complete pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub audio: AudioConfig,
    pub quality: QualityConfig,
    pub summary: SummaryConfig,
    pub paths: PathsConfig,
    pub dataset: DatasetConfig,
    /// Device identifier used when the caller does not supply one
    pub device_id: String,
}

/// Signal conditioning and spectral analysis parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Every recording is resampled to this rate before analysis
    pub target_sample_rate: u32,
    /// FFT size (and analysis frame length) in samples
    pub n_fft: usize,
    /// Hop between successive analysis frames
    pub hop_length: usize,
    /// Analysis window applied to each frame
    pub window: WindowKind,
    /// Lower edge of the analyzed band (Hz)
    pub fmin: f64,
    /// Upper edge of the analyzed band (Hz)
    pub fmax: f64,
    /// Cutoff of the DC/drift highpass (Hz)
    pub highpass_cutoff_hz: f64,
    /// Average log10 magnitudes instead of linear ones in spectral rows
    pub log_magnitude: bool,
    /// Per-frame values below this are left out of a bin's row average
    pub row_threshold: Option<f64>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 44_100,
            n_fft: 32_768,
            hop_length: 1_024,
            window: WindowKind::Hann,
            fmin: 1_000.0,
            fmax: 20_000.0,
            highpass_cutoff_hz: 20.0,
            log_magnitude: true,
            row_threshold: Some(0.0),
        }
    }
}

/// Capture quality gate thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Reject captures whose RMS level (dB) is below this
    pub silence_db_threshold: f64,
    /// Reject captures whose SNR (dB) is below this
    pub min_snr_db: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            silence_db_threshold: -45.0,
            min_snr_db: 8.0,
        }
    }
}

/// Spectral summary descriptor parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    pub n_mels: usize,
    pub n_mfcc: usize,
    /// Fraction of total energy that defines the rolloff frequency
    pub rolloff_pct: f64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            n_mels: 24,
            n_mfcc: 6,
            rolloff_pct: 0.85,
        }
    }
}

/// Filesystem locations for datasets, caches, calibration and models
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of raw dataset recordings (`<dir>/<dataset>/*.wav`)
    pub data_audio_dir: PathBuf,
    /// Root of legacy precomputed baseline summaries (`<dir>/<dataset>/control*.csv`)
    pub legacy_summary_dir: PathBuf,
    pub baseline_cache_dir: PathBuf,
    pub calibration_dir: PathBuf,
    pub model_dir: PathBuf,
    /// Model artifact file names, tried in order
    pub model_candidates: Vec<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_audio_dir: PathBuf::from("datasets/raw"),
            legacy_summary_dir: PathBuf::from("datasets/processed"),
            baseline_cache_dir: PathBuf::from("cache/baseline"),
            calibration_dir: PathBuf::from("calibration"),
            model_dir: PathBuf::from("."),
            model_candidates: vec![
                "robust_model.json".to_string(),
                "combined_all_model.json".to_string(),
            ],
        }
    }
}

/// Training-table assembly settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Dataset directories to include; empty means every directory
    pub included: Vec<String>,
    /// Maximum accepted samples per label
    pub label_caps: BTreeMap<String, usize>,
    /// Cap for labels missing from `label_caps`
    pub default_cap: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            included: vec!["dataset_1".to_string(), "dataset_2".to_string()],
            label_caps: [
                ("metal", 400),
                ("plastic", 400),
                ("paper", 250),
                ("organic", 250),
                ("glass", 200),
            ]
            .into_iter()
            .map(|(label, cap)| (label.to_string(), cap))
            .collect(),
            default_cap: 200,
        }
    }
}

impl DatasetConfig {
    pub fn cap_for(&self, label: &str) -> usize {
        self.label_caps
            .get(label)
            .copied()
            .unwrap_or(self.default_cap)
    }
}

impl Default for PipelineConfig {
    /// Default configuration values (fallback if config file not found)
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            quality: QualityConfig::default(),
            summary: SummaryConfig::default(),
            paths: PathsConfig::default(),
            dataset: DatasetConfig::default(),
            device_id: "desktop_default".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file doesn't exist
    /// or its JSON is invalid (a warning is logged in both cases).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Rebase every relative path onto `root`
    ///
    /// Used by tests and the CLI to point a whole configuration at a
    /// workspace directory in one call.
    pub fn with_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        let root = root.as_ref();
        let paths = &mut self.paths;
        for dir in [
            &mut paths.data_audio_dir,
            &mut paths.legacy_summary_dir,
            &mut paths.baseline_cache_dir,
            &mut paths.calibration_dir,
            &mut paths.model_dir,
        ] {
            if dir.is_relative() {
                *dir = root.join(&*dir);
            }
        }
        self
    }
}
