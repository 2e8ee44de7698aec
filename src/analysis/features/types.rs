// Types module - Data structures for spectral summaries and feature vectors
//
// A feature vector is an ordered list of labeled columns. Spectral bins are
// labeled by their integer frequency, summary descriptors by name. Models
// store their column schema as strings, so both kinds round-trip through
// their `Display` form.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::spectrum::SpectralRow;

/// Fixed set of summary descriptors for one capture
///
/// Degenerate input (empty band, zero energy, single frame) yields zeros,
/// never an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectralSummary {
    pub spectral_energy: f64,
    pub spectral_energy_std: f64,
    /// Weighted mean frequency (Hz)
    pub spectral_centroid: f64,
    pub spectral_bandwidth: f64,
    /// Frequency below which `rolloff_pct` of the energy lies (Hz)
    pub spectral_rolloff: f64,
    pub spectral_flatness: f64,
    pub spectral_flux: f64,
    /// Shannon entropy of the normalized spectrum (bits)
    pub spectral_entropy: f64,
    pub mel_mean: f64,
    pub mel_std: f64,
    pub mfcc_mean: Vec<f64>,
    pub mfcc_std: Vec<f64>,
    pub snr_db: f64,
    pub noise_floor_db: f64,
    pub rms_db: f64,
    pub zero_crossing_rate: f64,
    pub peak_db: f64,
    pub crest_factor: f64,
    pub duration_s: f64,
}

impl SpectralSummary {
    /// Descriptor columns in their fixed order
    pub fn to_columns(&self) -> Vec<(String, f64)> {
        let mut columns = vec![
            ("spectral_energy".to_string(), self.spectral_energy),
            ("spectral_energy_std".to_string(), self.spectral_energy_std),
            ("spectral_centroid".to_string(), self.spectral_centroid),
            ("spectral_bandwidth".to_string(), self.spectral_bandwidth),
            ("spectral_rolloff".to_string(), self.spectral_rolloff),
            ("spectral_flatness".to_string(), self.spectral_flatness),
            ("spectral_flux".to_string(), self.spectral_flux),
            ("spectral_entropy".to_string(), self.spectral_entropy),
            ("mel_mean".to_string(), self.mel_mean),
            ("mel_std".to_string(), self.mel_std),
        ];
        columns.extend(
            self.mfcc_mean
                .iter()
                .enumerate()
                .map(|(i, &v)| (format!("mfcc_mean_{i}"), v)),
        );
        columns.extend(
            self.mfcc_std
                .iter()
                .enumerate()
                .map(|(i, &v)| (format!("mfcc_std_{i}"), v)),
        );
        columns.extend([
            ("snr_db".to_string(), self.snr_db),
            ("noise_floor_db".to_string(), self.noise_floor_db),
            ("rms_db".to_string(), self.rms_db),
            ("zero_crossing_rate".to_string(), self.zero_crossing_rate),
            ("peak_db".to_string(), self.peak_db),
            ("crest_factor".to_string(), self.crest_factor),
            ("duration_s".to_string(), self.duration_s),
        ]);
        columns
    }
}

/// Label of one feature-vector column
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ColumnKey {
    /// Spectral bin, integer frequency in Hz
    Bin(i32),
    /// Named summary descriptor
    Descriptor(String),
}

impl ColumnKey {
    /// Parse a stored label; integers become bins, anything else a descriptor
    pub fn parse(label: &str) -> Self {
        match label.trim().parse::<i32>() {
            Ok(bin) => ColumnKey::Bin(bin),
            Err(_) => ColumnKey::Descriptor(label.to_string()),
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKey::Bin(bin) => write!(f, "{bin}"),
            ColumnKey::Descriptor(name) => f.write_str(name),
        }
    }
}

impl From<String> for ColumnKey {
    fn from(label: String) -> Self {
        ColumnKey::parse(&label)
    }
}

impl From<ColumnKey> for String {
    fn from(key: ColumnKey) -> Self {
        key.to_string()
    }
}

/// Ordered, labeled classifier input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    columns: Vec<ColumnKey>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spectral bins followed by summary descriptors
    pub fn from_parts(row: &SpectralRow, summary: &SpectralSummary) -> Self {
        let mut vector = Self::new();
        for (bin, value) in row.iter() {
            vector.push(ColumnKey::Bin(bin), value);
        }
        for (name, value) in summary.to_columns() {
            vector.push(ColumnKey::Descriptor(name), value);
        }
        vector
    }

    pub fn push(&mut self, key: ColumnKey, value: f64) {
        self.columns.push(key);
        self.values.push(value);
    }

    pub fn columns(&self) -> &[ColumnKey] {
        &self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of the first column labeled `key`
    pub fn get(&self, key: &ColumnKey) -> Option<f64> {
        self.columns
            .iter()
            .position(|column| column == key)
            .map(|i| self.values[i])
    }

    /// Column labels in their string form
    pub fn labels(&self) -> Vec<String> {
        self.columns.iter().map(ToString::to_string).collect()
    }

    /// Realign onto `schema`: missing columns become 0, extra columns are dropped
    pub fn reindex(&self, schema: &[ColumnKey]) -> Self {
        let mut positions: HashMap<&ColumnKey, usize> = HashMap::with_capacity(self.len());
        for (i, column) in self.columns.iter().enumerate() {
            positions.entry(column).or_insert(i);
        }

        let values = schema
            .iter()
            .map(|key| positions.get(key).map_or(0.0, |&i| self.values[i]))
            .collect();
        Self {
            columns: schema.to_vec(),
            values,
        }
    }

    /// Replace NaN and infinite values with 0
    pub fn sanitize(mut self) -> Self {
        for value in &mut self.values {
            if !value.is_finite() {
                *value = 0.0;
            }
        }
        self
    }

    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}
