// Baseline sources - the tiers a dataset baseline can be resolved from
//
// Tiers are tried in order by `BaselineStore`:
// 1. CacheSource: previously resolved baseline (`<dataset>_baseline.json`)
// 2. LegacySummarySource: precomputed CSV pair (`control.csv`, `control_mean.csv`)
// 3. ControlRecordingSource: averages analyzed `control*.wav` recordings
//
// A tier that cannot produce a baseline returns `None` and the next tier is
// tried; tiers never fail the resolution.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{is_valid_dataset_id, BaselineSpectrum};
use crate::analysis::features::{AnalysisOptions, SpectralRow, SpectrumAnalyzer};
use crate::analysis::preprocess;
use crate::audio::load_wav;
use crate::calibration::safe_file_stem;
use crate::config::AudioConfig;

/// One way of producing a dataset baseline
pub trait BaselineSource: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn fetch(&self, dataset: &str) -> Option<BaselineSpectrum>;
}

/// JSON cache of resolved baselines
pub struct CacheSource {
    dir: PathBuf,
}

impl CacheSource {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, dataset: &str) -> PathBuf {
        self.dir
            .join(format!("{}_baseline.json", safe_file_stem(dataset)))
    }

    /// Write a baseline to the cache
    pub fn store(&self, dataset: &str, baseline: &BaselineSpectrum) -> std::io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(dataset);
        let json = serde_json::to_string(baseline)?;
        fs::write(&path, json)?;
        Ok(path)
    }

    /// Delete a cached baseline; a missing file is not an error
    pub fn remove(&self, dataset: &str) -> std::io::Result<()> {
        match fs::remove_file(self.path_for(dataset)) {
            Err(err) if err.kind() != ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}

impl BaselineSource for CacheSource {
    fn name(&self) -> &'static str {
        "cache"
    }

    fn fetch(&self, dataset: &str) -> Option<BaselineSpectrum> {
        let path = self.path_for(dataset);
        let contents = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(baseline) => Some(baseline),
            Err(err) => {
                tracing::warn!(
                    "[BaselineStore] Ignoring corrupt cache {}: {}",
                    path.display(),
                    err
                );
                None
            }
        }
    }
}

/// Legacy precomputed summaries
///
/// `control.csv`'s first row holds the frequency labels and
/// `control_mean.csv`'s first column holds the matching mean values. The
/// two are truncated to the shorter length.
pub struct LegacySummarySource {
    dir: PathBuf,
}

impl LegacySummarySource {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    fn read(&self, dataset: &str) -> Option<BaselineSpectrum> {
        if !is_valid_dataset_id(dataset) {
            return None;
        }
        let dataset_dir = self.dir.join(dataset);
        let labels = fs::read_to_string(dataset_dir.join("control.csv")).ok()?;
        let means = fs::read_to_string(dataset_dir.join("control_mean.csv")).ok()?;

        let bins = parse_label_row(&labels)?;
        let values = parse_first_column(&means)?;
        let len = bins.len().min(values.len());
        if len == 0 {
            return None;
        }

        let spectrum: BTreeMap<i32, f64> = bins[..len]
            .iter()
            .copied()
            .zip(values[..len].iter().copied())
            .collect();
        Some(BaselineSpectrum::from(spectrum))
    }
}

impl BaselineSource for LegacySummarySource {
    fn name(&self) -> &'static str {
        "legacy summary"
    }

    fn fetch(&self, dataset: &str) -> Option<BaselineSpectrum> {
        self.read(dataset)
    }
}

/// First CSV line as integer bins; float labels are truncated, empty cells skipped
fn parse_label_row(contents: &str) -> Option<Vec<i32>> {
    let first = contents.lines().next()?;
    first
        .split(',')
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(|cell| cell.parse::<f64>().ok().map(|f| f as i32))
        .collect()
}

/// First cell of every non-empty CSV line as a float
fn parse_first_column(contents: &str) -> Option<Vec<f64>> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.split(',').next().unwrap_or("").trim().parse::<f64>().ok())
        .collect()
}

/// Baseline computed from the dataset's reference recordings
pub struct ControlRecordingSource {
    audio_dir: PathBuf,
    target_sample_rate: u32,
    highpass_cutoff_hz: f64,
    analyzer: SpectrumAnalyzer,
    options: AnalysisOptions,
}

impl ControlRecordingSource {
    pub fn new<P: Into<PathBuf>>(audio_dir: P, audio: &AudioConfig) -> Self {
        Self {
            audio_dir: audio_dir.into(),
            target_sample_rate: audio.target_sample_rate,
            highpass_cutoff_hz: audio.highpass_cutoff_hz,
            analyzer: SpectrumAnalyzer::new(audio),
            // Same row options as the extractor, so subtraction stays in one scale
            options: AnalysisOptions::from_config(audio),
        }
    }

    fn analyze(&self, path: &Path) -> Option<SpectralRow> {
        let wave = match load_wav(path, Some(self.target_sample_rate)) {
            Ok(wave) => wave,
            Err(err) => {
                tracing::warn!("[BaselineStore] Skipping control {}: {}", path.display(), err);
                return None;
            }
        };
        let (cleaned, _) = preprocess::preprocess(&wave, self.highpass_cutoff_hz);
        let spectrogram = self.analyzer.compute(&cleaned.to_f64(), cleaned.sample_rate);
        Some(SpectralRow::from_spectrogram(&spectrogram, self.options))
    }
}

impl BaselineSource for ControlRecordingSource {
    fn name(&self) -> &'static str {
        "control recordings"
    }

    fn fetch(&self, dataset: &str) -> Option<BaselineSpectrum> {
        if !is_valid_dataset_id(dataset) {
            return None;
        }
        let controls = control_recordings(&self.audio_dir.join(dataset));
        if controls.is_empty() {
            return None;
        }
        tracing::debug!(
            "[BaselineStore] Averaging {} control recordings for {}",
            controls.len(),
            dataset
        );
        let rows: Vec<SpectralRow> = controls.iter().filter_map(|p| self.analyze(p)).collect();
        mean_of_rows(&rows)
    }
}

/// `control*.wav` files directly inside `dir`, sorted by path
pub fn control_recordings(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            path.is_file() && name.starts_with("control") && name.ends_with(".wav")
        })
        .collect();
    paths.sort();
    paths
}

/// Per-bin mean across rows; a bin is averaged only over the rows that have it
pub fn mean_of_rows(rows: &[SpectralRow]) -> Option<BaselineSpectrum> {
    if rows.is_empty() {
        return None;
    }
    let mut totals: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
    for row in rows {
        for (bin, value) in row.iter() {
            let entry = totals.entry(bin).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }
    let spectrum: BTreeMap<i32, f64> = totals
        .into_iter()
        .map(|(bin, (sum, count))| (bin, sum / count as f64))
        .collect();
    Some(BaselineSpectrum::from(spectrum))
}
