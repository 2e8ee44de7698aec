// Preprocess module - DC/drift removal and capture quality metrics
//
// The highpass is a second-order Butterworth section run forward and then
// backward over the signal (zero phase). Edges are handled the usual way for
// forward-backward filtering: the signal is odd-extended by a few samples and
// both passes start from the filter's steady-state response to the first
// extended sample, so a constant input produces no transient.
//
// Level and noise metrics are in dB relative to full scale:
// - avg level: RMS level of the whole signal
// - noise floor: median absolute deviation around the median
// - SNR: the difference of the two

use serde::{Deserialize, Serialize};

use crate::audio::Waveform;
use crate::config::QualityConfig;

/// Numerical floor used in every dB conversion
const DB_EPSILON: f64 = 1e-9;

/// Default DC/drift highpass cutoff in Hz
pub const DEFAULT_HIGHPASS_HZ: f64 = 20.0;

/// Scalar quality measurements for one waveform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub avg_db: f64,
    pub noise_floor_db: f64,
    pub snr_db: f64,
}

/// Reason a capture was judged unusable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum QualityRejection {
    /// RMS level below the silence threshold
    TooQuiet { level_db: f64, threshold_db: f64 },
    /// SNR below the minimum acceptable value
    TooNoisy { snr_db: f64, threshold_db: f64 },
}

impl QualityRejection {
    /// Short user-facing hint, matching what the capture front end shows
    pub fn hint(&self) -> &'static str {
        match self {
            QualityRejection::TooQuiet { .. } => {
                "Capture too quiet; try again closer to the source."
            }
            QualityRejection::TooNoisy { .. } => "Capture too noisy; try again in a quieter spot.",
        }
    }
}

/// Threshold-based capture gate
///
/// The silence check runs first; a capture that is both quiet and noisy is
/// reported as too quiet.
#[derive(Debug, Clone, Copy)]
pub struct QualityGate {
    pub silence_db_threshold: f64,
    pub min_snr_db: f64,
}

impl QualityGate {
    pub fn from_config(config: &QualityConfig) -> Self {
        Self {
            silence_db_threshold: config.silence_db_threshold,
            min_snr_db: config.min_snr_db,
        }
    }

    /// Check a preprocessed signal's level and SNR against the thresholds
    pub fn check(&self, level_db: f64, snr_db: f64) -> Result<(), QualityRejection> {
        if level_db < self.silence_db_threshold {
            return Err(QualityRejection::TooQuiet {
                level_db,
                threshold_db: self.silence_db_threshold,
            });
        }
        if snr_db < self.min_snr_db {
            return Err(QualityRejection::TooNoisy {
                snr_db,
                threshold_db: self.min_snr_db,
            });
        }
        Ok(())
    }
}

/// Remove DC and sub-audio drift, then estimate SNR
///
/// # Returns
/// The cleaned waveform (same length and rate) and its SNR in dB
pub fn preprocess(wave: &Waveform, cutoff_hz: f64) -> (Waveform, f64) {
    let cleaned = highpass_zero_phase(&wave.to_f64(), wave.sample_rate, cutoff_hz);
    let snr = estimate_snr_db(&cleaned);
    let samples = cleaned.into_iter().map(|s| s as f32).collect();
    (Waveform::new(samples, wave.sample_rate), snr)
}

/// Compute level, noise floor and SNR for a waveform that is already cleaned
pub fn measure(samples: &[f64]) -> QualityMetrics {
    let avg_db = rms_db(samples);
    let noise_floor_db = noise_floor_db(samples);
    QualityMetrics {
        avg_db,
        noise_floor_db,
        snr_db: avg_db - noise_floor_db,
    }
}

/// RMS level in dB
pub fn rms_db(samples: &[f64]) -> f64 {
    let mean_square = if samples.is_empty() {
        0.0
    } else {
        samples.iter().map(|s| s * s).sum::<f64>() / samples.len() as f64
    };
    20.0 * ((mean_square + DB_EPSILON).sqrt() + DB_EPSILON).log10()
}

/// Robust noise floor: median absolute deviation around the median, in dB
pub fn noise_floor_db(samples: &[f64]) -> f64 {
    let center = median(samples);
    let deviations: Vec<f64> = samples.iter().map(|s| (s - center).abs()).collect();
    20.0 * (median(&deviations) + DB_EPSILON).log10()
}

pub fn estimate_snr_db(samples: &[f64]) -> f64 {
    rms_db(samples) - noise_floor_db(samples)
}

/// Median; even-length input averages the two middle values, empty input is 0
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Second-order section in transposed direct form II
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b: [f64; 3],
    a: [f64; 3],
}

impl Biquad {
    /// Butterworth highpass via the bilinear transform with prewarping
    fn butterworth_highpass(cutoff_hz: f64, sample_rate: u32) -> Option<Self> {
        let nyquist = sample_rate as f64 / 2.0;
        if !(cutoff_hz > 0.0 && cutoff_hz < nyquist) {
            return None;
        }
        let k = (std::f64::consts::PI * cutoff_hz / sample_rate as f64).tan();
        let sqrt2 = std::f64::consts::SQRT_2;
        let norm = 1.0 / (1.0 + sqrt2 * k + k * k);
        Some(Self {
            b: [norm, -2.0 * norm, norm],
            a: [1.0, 2.0 * (k * k - 1.0) * norm, (1.0 - sqrt2 * k + k * k) * norm],
        })
    }

    /// Initial state matching the steady-state response to a unit step
    fn steady_state(&self) -> [f64; 2] {
        let [b0, b1, b2] = self.b;
        let [_, a1, a2] = self.a;
        let rhs0 = b1 - a1 * b0;
        let rhs1 = b2 - a2 * b0;
        let z0 = (rhs0 + rhs1) / (1.0 + a1 + a2);
        [z0, rhs1 - a2 * z0]
    }

    fn filter(&self, input: &[f64], initial: [f64; 2]) -> Vec<f64> {
        let [b0, b1, b2] = self.b;
        let [_, a1, a2] = self.a;
        let [mut z0, mut z1] = initial;
        input
            .iter()
            .map(|&x| {
                let y = b0 * x + z0;
                z0 = b1 * x - a1 * y + z1;
                z1 = b2 * x - a2 * y;
                y
            })
            .collect()
    }
}

/// Forward-backward highpass; returns the input unchanged if the cutoff is
/// not below Nyquist or the signal is too short to filter
pub fn highpass_zero_phase(samples: &[f64], sample_rate: u32, cutoff_hz: f64) -> Vec<f64> {
    let Some(section) = Biquad::butterworth_highpass(cutoff_hz, sample_rate) else {
        return samples.to_vec();
    };
    if samples.len() < 2 {
        return samples.to_vec();
    }

    let pad = (3 * section.b.len()).min(samples.len() - 1);
    let extended = odd_extend(samples, pad);
    let zi = section.steady_state();

    let first = extended[0];
    let forward = section.filter(&extended, [zi[0] * first, zi[1] * first]);

    let mut reversed: Vec<f64> = forward.into_iter().rev().collect();
    let first = reversed[0];
    let backward = section.filter(&reversed, [zi[0] * first, zi[1] * first]);
    reversed = backward.into_iter().rev().collect();

    reversed[pad..pad + samples.len()].to_vec()
}

/// Point-symmetric extension by `pad` samples on each side
fn odd_extend(samples: &[f64], pad: usize) -> Vec<f64> {
    let n = samples.len();
    let first = samples[0];
    let last = samples[n - 1];
    let mut out = Vec::with_capacity(n + 2 * pad);
    out.extend((1..=pad).rev().map(|i| 2.0 * first - samples[i]));
    out.extend_from_slice(samples);
    out.extend((1..=pad).map(|i| 2.0 * last - samples[n - 1 - i]));
    out
}
