// Audio module - waveform container, WAV decoding and sample-rate conversion
//
// Every recording enters the pipeline as a mono `Waveform` at a known sample
// rate. Multi-channel files keep only their first channel.

pub mod resample;
pub mod wav;

pub use resample::resample;
pub use wav::{load_wav, write_wav};

/// Mono audio samples in [-1, 1] plus their sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds (0 for an invalid sample rate)
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Samples widened to f64 for analysis
    pub fn to_f64(&self) -> Vec<f64> {
        self.samples.iter().map(|&s| s as f64).collect()
    }

    /// Resample to `target_rate`, returning `self` unchanged when rates match
    pub fn resampled(self, target_rate: u32) -> Self {
        if target_rate == 0 || self.sample_rate == 0 || target_rate == self.sample_rate {
            return self;
        }
        let samples = resample(&self.samples, self.sample_rate, target_rate);
        Self::new(samples, target_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        let wave = Waveform::new(vec![0.0; 22_050], 44_100);
        assert!((wave.duration_secs() - 0.5).abs() < 1e-12);
        assert_eq!(Waveform::new(vec![0.0; 10], 0).duration_secs(), 0.0);
    }

    #[test]
    fn test_resampled_same_rate_is_identity() {
        let wave = Waveform::new(vec![0.1, -0.2, 0.3], 44_100);
        assert_eq!(wave.clone().resampled(44_100), wave);
    }
}
