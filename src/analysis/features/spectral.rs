// Spectral module - Frequency-domain summary descriptors
//
// Everything except flux works on the time-averaged magnitude spectrum
// (mean over frames per bin). Flux needs the per-frame matrix.
//
// References:
// - Peeters, G. (2004). A large set of audio features for sound description
// - Lerch, A. (2012). An Introduction to Audio Content Analysis

use super::spectrum::Spectrogram;

/// Small constant guarding divisions and logarithms
pub(crate) const EPSILON: f64 = 1e-9;

/// Default rolloff threshold (85% of spectral energy)
pub const DEFAULT_ROLLOFF_PCT: f64 = 0.85;

/// Frequency-domain descriptor computation
pub struct SpectralFeatures {
    rolloff_pct: f64,
}

impl SpectralFeatures {
    /// # Arguments
    /// * `rolloff_pct` - Fraction of total energy that defines the rolloff
    pub fn new(rolloff_pct: f64) -> Self {
        Self { rolloff_pct }
    }

    /// Total energy: sum of the mean magnitudes
    pub fn compute_energy(&self, mean_mag: &[f64]) -> f64 {
        mean_mag.iter().sum()
    }

    /// Population standard deviation of the mean magnitudes
    pub fn compute_energy_std(&self, mean_mag: &[f64]) -> f64 {
        population_std(mean_mag)
    }

    /// Compute spectral centroid (weighted mean frequency)
    ///
    /// Formula: centroid = Σ(f_i × m_i) / Σm_i, 0 when the energy is not positive
    pub fn compute_centroid(&self, freqs: &[f64], mean_mag: &[f64], energy: f64) -> f64 {
        if energy <= 0.0 {
            return 0.0;
        }
        freqs.iter().zip(mean_mag).map(|(f, m)| f * m).sum::<f64>() / energy
    }

    /// Magnitude-weighted spread around the centroid
    pub fn compute_bandwidth(
        &self,
        freqs: &[f64],
        mean_mag: &[f64],
        centroid: f64,
        energy: f64,
    ) -> f64 {
        if energy <= 0.0 {
            return 0.0;
        }
        let spread: f64 = freqs
            .iter()
            .zip(mean_mag)
            .map(|(f, m)| (f - centroid).powi(2) * m)
            .sum();
        (spread / (energy + EPSILON)).max(0.0).sqrt()
    }

    /// Compute spectral rolloff
    ///
    /// First frequency whose cumulative magnitude reaches `rolloff_pct` of the
    /// energy; the highest frequency if none does.
    pub fn compute_rolloff(&self, freqs: &[f64], mean_mag: &[f64], energy: f64) -> f64 {
        let Some(&last) = freqs.last() else {
            return 0.0;
        };
        let level = self.rolloff_pct * energy;

        let mut cumulative = 0.0;
        for (&freq, &mag) in freqs.iter().zip(mean_mag) {
            cumulative += mag;
            if cumulative >= level {
                return freq;
            }
        }
        last
    }

    /// Compute spectral flatness (geometric over arithmetic mean)
    ///
    /// Close to 0 for a pure tone, close to 1 for white noise.
    pub fn compute_flatness(&self, mean_mag: &[f64]) -> f64 {
        if mean_mag.is_empty() {
            return 0.0;
        }
        let n = mean_mag.len() as f64;
        let arithmetic = mean_mag.iter().map(|m| m + EPSILON).sum::<f64>() / n;
        let geometric = (mean_mag.iter().map(|m| (m + EPSILON).ln()).sum::<f64>() / n).exp();
        geometric / (arithmetic + EPSILON)
    }

    /// Mean Euclidean distance between consecutive frames
    pub fn compute_flux(&self, spectrogram: &Spectrogram) -> f64 {
        let frames = &spectrogram.frames;
        if frames.len() < 2 {
            return 0.0;
        }
        let total: f64 = frames
            .windows(2)
            .map(|pair| {
                pair[1]
                    .iter()
                    .zip(&pair[0])
                    .map(|(cur, prev)| (cur - prev).powi(2))
                    .sum::<f64>()
                    .sqrt()
            })
            .sum();
        total / (frames.len() - 1) as f64
    }

    /// Shannon entropy (bits) of the normalized mean spectrum
    pub fn compute_entropy(&self, mean_mag: &[f64], energy: f64) -> f64 {
        -mean_mag
            .iter()
            .map(|m| {
                let p = m / (energy + EPSILON);
                p * (p + EPSILON).log2()
            })
            .sum::<f64>()
    }
}

impl Default for SpectralFeatures {
    fn default() -> Self {
        Self::new(DEFAULT_ROLLOFF_PCT)
    }
}

pub(crate) fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}
