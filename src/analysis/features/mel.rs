// Mel module - triangular mel filterbank and cepstral coefficients
//
// Band edges are spaced evenly on the mel scale m = 2595 * log10(1 + f / 700)
// between the lowest and highest analyzed frequency. Each band is a triangle
// rising from its left edge to 1.0 at its center and falling to its right edge.
// Cepstra are the orthonormal DCT-II of log10 band energies.

use super::spectral::{population_std, EPSILON};
use super::spectrum::Spectrogram;

pub fn hz_to_mel(freq: f64) -> f64 {
    2595.0 * (1.0 + freq / 700.0).log10()
}

pub fn mel_to_hz(mel: f64) -> f64 {
    700.0 * (10f64.powf(mel / 2595.0) - 1.0)
}

/// Triangular filters over a fixed frequency axis
#[derive(Debug, Clone)]
pub struct MelFilterbank {
    /// Center frequency of each band (Hz)
    centers: Vec<f64>,
    /// `weights[band][bin]`
    weights: Vec<Vec<f64>>,
}

impl MelFilterbank {
    /// Build `n_mels` bands spanning `freqs[0]..=freqs[last]`
    ///
    /// Bands whose edges collapse (e.g. a single-bin axis) stay all zero.
    pub fn new(freqs: &[f64], n_mels: usize) -> Self {
        let (Some(&fmin), Some(&fmax)) = (freqs.first(), freqs.last()) else {
            return Self {
                centers: Vec::new(),
                weights: Vec::new(),
            };
        };

        let mel_min = hz_to_mel(fmin);
        let mel_max = hz_to_mel(fmax);
        let steps = (n_mels + 1) as f64;
        let hz_points: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / steps))
            .collect();

        let weights = (0..n_mels)
            .map(|band| {
                let (left, center, right) =
                    (hz_points[band], hz_points[band + 1], hz_points[band + 2]);
                let mut row = vec![0.0; freqs.len()];
                if center <= left || right <= center {
                    return row;
                }
                for (weight, &f) in row.iter_mut().zip(freqs) {
                    if f >= left && f <= center {
                        *weight = (f - left) / (center - left);
                    }
                    if f >= center && f <= right {
                        *weight = (right - f) / (right - center);
                    }
                }
                row
            })
            .collect();

        Self {
            centers: hz_points[1..=n_mels].to_vec(),
            weights,
        }
    }

    /// True when there is no frequency axis to project
    pub fn is_empty(&self) -> bool {
        self.weights.first().map_or(true, |row| row.is_empty())
    }

    pub fn num_bands(&self) -> usize {
        self.weights.len()
    }

    pub fn centers(&self) -> &[f64] {
        &self.centers
    }

    pub fn weights(&self, band: usize) -> &[f64] {
        &self.weights[band]
    }

    /// Band energies of one magnitude frame (each bin floored by epsilon)
    pub fn apply(&self, frame: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .map(|row| row.iter().zip(frame).map(|(w, m)| w * (m + EPSILON)).sum())
            .collect()
    }
}

/// Mel and cepstral statistics over a spectrogram
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MelSummary {
    pub mel_mean: f64,
    pub mel_std: f64,
    pub mfcc_mean: Vec<f64>,
    pub mfcc_std: Vec<f64>,
}

/// Project `spectrogram` through a filterbank and summarize over time
///
/// Always returns exactly `n_mfcc` cepstral means and stds; coefficients the
/// filterbank cannot provide are 0.
pub fn summarize_mel(spectrogram: &Spectrogram, n_mels: usize, n_mfcc: usize) -> MelSummary {
    let mut summary = MelSummary {
        mfcc_mean: vec![0.0; n_mfcc],
        mfcc_std: vec![0.0; n_mfcc],
        ..MelSummary::default()
    };

    let filterbank = MelFilterbank::new(&spectrogram.freqs, n_mels);
    if filterbank.is_empty() || spectrogram.frames.is_empty() {
        return summary;
    }

    // energies[frame][band]
    let energies: Vec<Vec<f64>> = spectrogram
        .frames
        .iter()
        .map(|frame| filterbank.apply(frame))
        .collect();

    let num_bands = filterbank.num_bands();
    let mut band_means = Vec::with_capacity(num_bands);
    let mut band_stds = Vec::with_capacity(num_bands);
    for band in 0..num_bands {
        let series: Vec<f64> = energies.iter().map(|frame| frame[band]).collect();
        band_means.push(series.iter().sum::<f64>() / series.len() as f64);
        band_stds.push(population_std(&series));
    }
    summary.mel_mean = band_means.iter().sum::<f64>() / num_bands as f64;
    summary.mel_std = band_stds.iter().sum::<f64>() / num_bands as f64;

    let num_coeffs = n_mfcc.min(num_bands);
    // cepstra[frame][coeff]
    let cepstra: Vec<Vec<f64>> = energies
        .iter()
        .map(|frame| {
            let log_energy: Vec<f64> = frame.iter().map(|e| (e + EPSILON).log10()).collect();
            dct_ortho(&log_energy, num_coeffs)
        })
        .collect();

    for coeff in 0..num_coeffs {
        let series: Vec<f64> = cepstra.iter().map(|frame| frame[coeff]).collect();
        summary.mfcc_mean[coeff] = series.iter().sum::<f64>() / series.len() as f64;
        summary.mfcc_std[coeff] = population_std(&series);
    }
    summary
}

/// First `num_coeffs` coefficients of the orthonormal DCT-II of `input`
pub fn dct_ortho(input: &[f64], num_coeffs: usize) -> Vec<f64> {
    let n = input.len();
    if n == 0 {
        return vec![0.0; num_coeffs];
    }
    let len = n as f64;
    (0..num_coeffs.min(n))
        .map(|k| {
            let scale = if k == 0 {
                (1.0 / len).sqrt()
            } else {
                (2.0 / len).sqrt()
            };
            let sum: f64 = input
                .iter()
                .enumerate()
                .map(|(i, x)| {
                    x * (std::f64::consts::PI * k as f64 * (2 * i + 1) as f64 / (2.0 * len)).cos()
                })
                .sum();
            scale * sum
        })
        .collect()
}
