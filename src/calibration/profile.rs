// CalibrationProfile - per-device gain correction and capture metrics
//
// A profile scales every capture from its device by `gain_scale` before
// spectral analysis. The level metrics are informational: they record what
// the reference capture looked like when the profile was measured.

use serde::{Deserialize, Serialize};

use crate::analysis::preprocess;
use crate::audio::Waveform;

/// Stored calibration for one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    /// Multiplier applied to every sample
    #[serde(alias = "gainScale", default = "default_gain")]
    pub gain_scale: f64,
    /// Rate the profile was measured at (Hz)
    #[serde(alias = "sampleRate")]
    pub sample_rate: u32,
    #[serde(alias = "snrDb", default, skip_serializing_if = "Option::is_none")]
    pub snr_db: Option<f64>,
    #[serde(alias = "avgDb", default, skip_serializing_if = "Option::is_none")]
    pub avg_db: Option<f64>,
    #[serde(alias = "noiseFloorDb", default, skip_serializing_if = "Option::is_none")]
    pub noise_floor_db: Option<f64>,
}

fn default_gain() -> f64 {
    1.0
}

impl CalibrationProfile {
    /// Profile with a gain only
    pub fn new(gain_scale: f64, sample_rate: u32) -> Self {
        Self {
            gain_scale,
            sample_rate,
            snr_db: None,
            avg_db: None,
            noise_floor_db: None,
        }
    }

    /// Profile with metrics measured from a reference capture
    ///
    /// The capture is cleaned with the same highpass live captures get.
    pub fn measured(
        gain_scale: f64,
        sample_rate: u32,
        highpass_cutoff_hz: f64,
        reference: &Waveform,
    ) -> Self {
        let (cleaned, _) = preprocess::preprocess(reference, highpass_cutoff_hz);
        let metrics = preprocess::measure(&cleaned.to_f64());
        Self {
            gain_scale,
            sample_rate,
            snr_db: Some(metrics.snr_db),
            avg_db: Some(metrics.avg_db),
            noise_floor_db: Some(metrics.noise_floor_db),
        }
    }

    /// Scale `wave` by this profile's gain
    pub fn apply(&self, wave: &Waveform) -> Waveform {
        let gain = self.gain_scale as f32;
        Waveform::new(
            wave.samples.iter().map(|s| s * gain).collect(),
            wave.sample_rate,
        )
    }
}
