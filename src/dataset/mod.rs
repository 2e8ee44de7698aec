// Dataset module - labeled feature tables for classifier training exports
//
// Layout: `<audio_root>/<dataset>/*.wav`. A sample's label comes from a
// keyword in its file name; reference (`control*`) and `silence*` captures
// are never samples. Every accepted sample is run through the same
// `CaptureAnalyzer` as live captures, with its dataset's baseline, so the
// exported columns match what the classifier sees at inference time.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::analysis::features::{ColumnKey, FeatureVector};
use crate::config::DatasetConfig;
use crate::error::log_audio_error;
use crate::pipeline::CaptureAnalyzer;

/// File-name keyword to label, first match wins
const LABEL_KEYWORDS: &[(&str, &str)] = &[
    ("metal", "metal"),
    ("glass", "glass"),
    ("plastic", "plastic"),
    ("cardboard", "paper"),
    ("paper", "paper"),
    ("apple", "organic"),
    ("banana", "organic"),
    ("onion", "organic"),
    ("orange", "organic"),
    ("pear", "organic"),
];

/// Derive a material label from a file name (case-insensitive)
pub fn derive_label(file_name: &str) -> Option<&'static str> {
    let name = file_name.to_lowercase();
    LABEL_KEYWORDS
        .iter()
        .find(|(keyword, _)| name.contains(keyword))
        .map(|&(_, label)| label)
}

/// A recording with its derived label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledSample {
    pub path: PathBuf,
    pub label: &'static str,
}

/// Labeled WAV samples in `dir`, sorted by path
pub fn discover_samples(dir: &Path) -> Vec<LabeledSample> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut samples: Vec<LabeledSample> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
        })
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?.to_lowercase();
            if name.contains("control") || name.contains("silence") {
                return None;
            }
            let label = derive_label(&name)?;
            Some(LabeledSample { path, label })
        })
        .collect();
    samples.sort_by(|a, b| a.path.cmp(&b.path));
    samples
}

/// Dataset directory names under `audio_root`, sorted
///
/// A non-empty `included` list restricts the result to those names.
pub fn list_datasets(audio_root: &Path, included: &[String]) -> Vec<String> {
    let Ok(entries) = fs::read_dir(audio_root) else {
        tracing::warn!(
            "[Dataset] Audio root {} is not readable",
            audio_root.display()
        );
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| included.is_empty() || included.contains(name))
        .collect();
    names.sort();
    names
}

/// One exported sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub label: String,
    pub values: Vec<f64>,
}

/// Fixed-schema table of labeled feature vectors
///
/// The first accepted vector fixes the column schema; every later vector is
/// reindexed onto it (missing columns are 0, extra columns are dropped).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureTable {
    columns: Vec<ColumnKey>,
    rows: Vec<TableRow>,
    #[serde(skip)]
    counts: BTreeMap<String, usize>,
}

impl FeatureTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a vector, fixing the schema on the first call
    pub fn push(&mut self, label: &str, vector: &FeatureVector) {
        if self.columns.is_empty() {
            self.columns = vector.columns().to_vec();
        }
        let aligned = vector.reindex(&self.columns).sanitize();
        self.rows.push(TableRow {
            label: label.to_string(),
            values: aligned.values().to_vec(),
        });
        *self.counts.entry(label.to_string()).or_default() += 1;
    }

    pub fn count(&self, label: &str) -> usize {
        self.counts.get(label).copied().unwrap_or(0)
    }

    /// Accepted samples per label
    pub fn counts(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }

    pub fn columns(&self) -> &[ColumnKey] {
        &self.columns
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the table as pretty JSON (`{"columns": [...], "rows": [...]}`)
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }
}

/// Assemble the training table from every selected dataset
///
/// Captures that fail the quality gate or cannot be decoded are skipped, and
/// a label stops accepting samples once it reaches its cap.
pub fn collect_features(
    analyzer: &CaptureAnalyzer,
    audio_root: &Path,
    config: &DatasetConfig,
) -> FeatureTable {
    let mut table = FeatureTable::new();

    for dataset in list_datasets(audio_root, &config.included) {
        let samples = discover_samples(&audio_root.join(&dataset));
        tracing::info!("[Dataset] {}: {} labeled samples", dataset, samples.len());

        for sample in samples {
            if table.count(sample.label) >= config.cap_for(sample.label) {
                continue;
            }
            let wave = match analyzer.load(&sample.path) {
                Ok(wave) => wave,
                Err(err) => {
                    log_audio_error(&err, "collect_features");
                    continue;
                }
            };
            match analyzer.analyze(wave, Some(&dataset)) {
                Ok(analysis) => table.push(sample.label, &analysis.vector),
                Err(rejection) => tracing::debug!(
                    "[Dataset] Skipping {}: {:?}",
                    sample.path.display(),
                    rejection
                ),
            }
        }
    }

    tracing::info!("[Dataset] Collected counts: {:?}", table.counts());
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{write_wav, Waveform};
    use crate::config::PipelineConfig;

    const RATE: u32 = 44_100;

    /// Low-level tone with a loud 2 kHz burst in the middle
    fn burst() -> Waveform {
        let samples = (0..RATE as usize)
            .map(|i| {
                let t = i as f64 / RATE as f64;
                let envelope = if (17_640..26_460).contains(&i) { 0.5 } else { 0.0005 };
                (envelope * (2.0 * std::f64::consts::PI * 2_000.0 * t).sin()) as f32
            })
            .collect();
        Waveform::new(samples, RATE)
    }

    fn vector(pairs: &[(ColumnKey, f64)]) -> FeatureVector {
        let mut vector = FeatureVector::new();
        for (key, value) in pairs {
            vector.push(key.clone(), *value);
        }
        vector
    }

    #[test]
    fn test_derive_label_keywords() {
        assert_eq!(derive_label("Metal_can_03.wav"), Some("metal"));
        assert_eq!(derive_label("cardboard_box.wav"), Some("paper"));
        assert_eq!(derive_label("banana-peel.wav"), Some("organic"));
        assert_eq!(derive_label("glass_jar.wav"), Some("glass"));
        assert_eq!(derive_label("mystery.wav"), None);
    }

    #[test]
    fn test_derive_label_first_keyword_wins() {
        // "metal" is listed before "paper"
        assert_eq!(derive_label("paper_on_metal.wav"), Some("metal"));
    }

    #[test]
    fn test_discover_skips_reference_and_unlabeled() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "control_1.wav",
            "silence.wav",
            "b_plastic.wav",
            "a_metal.wav",
            "unknown.wav",
            "metal_notes.txt",
        ] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let samples = discover_samples(dir.path());
        let names: Vec<_> = samples
            .iter()
            .map(|s| s.path.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a_metal.wav", "b_plastic.wav"]);
        assert_eq!(samples[0].label, "metal");
    }

    #[test]
    fn test_list_datasets_respects_inclusion() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["dataset_2", "dataset_1", "dataset_3"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("dataset_4"), b"").unwrap();

        assert_eq!(
            list_datasets(dir.path(), &[]),
            vec!["dataset_1", "dataset_2", "dataset_3"]
        );
        let included = vec!["dataset_3".to_string()];
        assert_eq!(list_datasets(dir.path(), &included), vec!["dataset_3"]);
    }

    #[test]
    fn test_table_schema_fixed_by_first_row() {
        let mut table = FeatureTable::new();
        table.push(
            "metal",
            &vector(&[(ColumnKey::Bin(1000), 1.0), (ColumnKey::Bin(1001), 2.0)]),
        );
        table.push(
            "glass",
            &vector(&[(ColumnKey::Bin(1001), 5.0), (ColumnKey::Bin(1002), 9.0)]),
        );

        assert_eq!(table.columns(), &[ColumnKey::Bin(1000), ColumnKey::Bin(1001)]);
        assert_eq!(table.rows()[1].values, vec![0.0, 5.0]);
        assert_eq!(table.count("metal"), 1);
        assert_eq!(table.count("glass"), 1);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_table_json_export() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = FeatureTable::new();
        table.push(
            "paper",
            &vector(&[
                (ColumnKey::Bin(1000), f64::NAN),
                (ColumnKey::Descriptor("rms_db".to_string()), -20.0),
            ]),
        );
        let path = dir.path().join("out/table.json");
        table.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["columns"][0], "1000");
        assert_eq!(value["columns"][1], "rms_db");
        assert_eq!(value["rows"][0]["label"], "paper");
        assert_eq!(value["rows"][0]["values"][0], 0.0);
    }

    #[test]
    fn test_collect_features_caps_and_skips() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PipelineConfig::default().with_root(dir.path());
        config.dataset.label_caps = BTreeMap::from([("metal".to_string(), 1)]);

        let dataset_dir = config.paths.data_audio_dir.join("dataset_1");
        fs::create_dir_all(&dataset_dir).unwrap();
        let silent = Waveform::new(vec![0.0; RATE as usize], RATE);
        // metal_a is rejected by the gate, so it must not use up the metal cap
        write_wav(dataset_dir.join("metal_a.wav"), &silent).unwrap();
        write_wav(dataset_dir.join("metal_b.wav"), &burst()).unwrap();
        write_wav(dataset_dir.join("metal_c.wav"), &burst()).unwrap();
        write_wav(dataset_dir.join("glass_a.wav"), &burst()).unwrap();
        write_wav(dataset_dir.join("silence_x.wav"), &burst()).unwrap();
        write_wav(dataset_dir.join("control_1.wav"), &burst()).unwrap();
        fs::write(dataset_dir.join("plastic_broken.wav"), b"not a wav").unwrap();

        // Not in the default inclusion list
        let skipped_dir = config.paths.data_audio_dir.join("dataset_9");
        fs::create_dir_all(&skipped_dir).unwrap();
        write_wav(skipped_dir.join("paper_a.wav"), &burst()).unwrap();

        let analyzer = CaptureAnalyzer::new(&config, None);
        let table = collect_features(&analyzer, &config.paths.data_audio_dir, &config.dataset);

        assert_eq!(table.len(), 2);
        assert_eq!(table.count("metal"), 1);
        assert_eq!(table.count("glass"), 1);
        assert_eq!(table.count("plastic"), 0);
        assert_eq!(table.count("paper"), 0);
        assert_eq!(table.rows()[0].label, "glass");
        assert_eq!(table.rows()[1].label, "metal");

        // The control recording fed the dataset baseline instead of the table
        assert_eq!(analyzer.baselines().computations(), 1);

        let first = analyzer
            .analyze(analyzer.load(&dataset_dir.join("glass_a.wav")).unwrap(), Some("dataset_1"))
            .unwrap();
        assert!(first.baseline_applied);
        assert_eq!(table.columns(), first.vector.columns());
        assert_eq!(table.rows()[0].values, first.vector.values());
    }

    #[test]
    fn test_collect_features_empty_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::default().with_root(dir.path());
        let analyzer = CaptureAnalyzer::new(&config, None);

        let table = collect_features(&analyzer, &config.paths.data_audio_dir, &config.dataset);
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
    }
}
