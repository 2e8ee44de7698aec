// Spectrum module - short-time Fourier analysis and time-averaged rows
//
// Frames are `n_fft` samples long and start every `hop_length` samples. Signals
// shorter than one frame are mirror-extended to a full frame; the tail of a
// longer signal is zero-padded so the last frame reaches its end. Magnitudes
// are scaled by 1 / sum(window) and floored at a small epsilon so a later log
// never sees zero.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::config::AudioConfig;

/// Floor added to every magnitude
pub const MAGNITUDE_EPSILON: f64 = 1e-9;

/// Analysis window applied to each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    /// Periodic Hann window
    #[default]
    Hann,
    /// Periodic Hamming window
    Hamming,
    Rectangular,
}

impl WindowKind {
    /// Window coefficients for a frame of `len` samples
    pub fn coefficients(self, len: usize) -> Vec<f64> {
        let n = len as f64;
        (0..len)
            .map(|i| {
                let phase = 2.0 * std::f64::consts::PI * i as f64 / n;
                match self {
                    WindowKind::Hann => 0.5 - 0.5 * phase.cos(),
                    WindowKind::Hamming => 0.54 - 0.46 * phase.cos(),
                    WindowKind::Rectangular => 1.0,
                }
            })
            .collect()
    }
}

/// Band-limited magnitude spectrogram
///
/// `frames[t][k]` is the magnitude of bin `freqs[k]` in frame `t`. Every
/// frame has exactly `freqs.len()` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    pub freqs: Vec<f64>,
    pub frames: Vec<Vec<f64>>,
}

impl Spectrogram {
    pub fn num_bins(&self) -> usize {
        self.freqs.len()
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.freqs.is_empty() || self.frames.is_empty()
    }

    /// Per-bin mean across frames (zeros when there are no frames)
    pub fn mean_magnitude(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.num_bins()];
        for frame in &self.frames {
            for (sum, &value) in sums.iter_mut().zip(frame) {
                *sum += value;
            }
        }
        if !self.frames.is_empty() {
            let count = self.frames.len() as f64;
            for sum in &mut sums {
                *sum /= count;
            }
        }
        sums
    }
}

/// STFT processor holding a pre-planned FFT and pre-computed window
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f64>>,
    n_fft: usize,
    hop_length: usize,
    window: Vec<f64>,
    /// 1 / sum(window)
    scale: f64,
    fmin: f64,
    fmax: f64,
}

impl SpectrumAnalyzer {
    /// Create an analyzer from the audio section of the configuration
    pub fn new(config: &AudioConfig) -> Self {
        Self::with_params(
            config.n_fft,
            config.hop_length,
            config.window,
            config.fmin,
            config.fmax,
        )
    }

    /// Create an analyzer with explicit parameters
    ///
    /// `n_fft` is raised to at least 2 and `hop_length` to at least 1.
    pub fn with_params(
        n_fft: usize,
        hop_length: usize,
        window: WindowKind,
        fmin: f64,
        fmax: f64,
    ) -> Self {
        let n_fft = n_fft.max(2);
        let window = window.coefficients(n_fft);
        let window_sum: f64 = window.iter().sum();
        let scale = if window_sum > 0.0 { 1.0 / window_sum } else { 1.0 };
        let fft = FftPlanner::new().plan_fft_forward(n_fft);

        Self {
            fft,
            n_fft,
            hop_length: hop_length.max(1),
            window,
            scale,
            fmin,
            fmax,
        }
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    /// Compute the band-limited magnitude spectrogram of `samples`
    pub fn compute(&self, samples: &[f64], sample_rate: u32) -> Spectrogram {
        let signal = self.frame_aligned(samples);
        let num_frames = 1 + (signal.len() - self.n_fft) / self.hop_length;

        let num_bins = self.n_fft / 2 + 1;
        let bin_width = sample_rate as f64 / self.n_fft as f64;
        let all_freqs: Vec<f64> = (0..num_bins).map(|k| k as f64 * bin_width).collect();

        let mut band: Vec<usize> = all_freqs
            .iter()
            .enumerate()
            .filter(|&(_, &f)| f >= self.fmin && f <= self.fmax)
            .map(|(k, _)| k)
            .collect();
        if band.is_empty() {
            band = (0..num_bins).collect();
        }

        let mut buffer = vec![Complex::new(0.0, 0.0); self.n_fft];
        let mut scratch = vec![Complex::new(0.0, 0.0); self.fft.get_inplace_scratch_len()];
        let frames = (0..num_frames)
            .map(|t| {
                let start = t * self.hop_length;
                let frame = &signal[start..start + self.n_fft];
                for ((slot, &sample), &w) in buffer.iter_mut().zip(frame).zip(&self.window) {
                    *slot = Complex::new(sample * w, 0.0);
                }
                self.fft.process_with_scratch(&mut buffer, &mut scratch);
                band.iter()
                    .map(|&k| buffer[k].norm() * self.scale + MAGNITUDE_EPSILON)
                    .collect()
            })
            .collect();

        Spectrogram {
            freqs: band.iter().map(|&k| all_freqs[k]).collect(),
            frames,
        }
    }

    /// Extend or pad the signal so it is a whole number of hops past one frame
    fn frame_aligned(&self, samples: &[f64]) -> Vec<f64> {
        let mut signal = if samples.len() >= self.n_fft {
            samples.to_vec()
        } else if samples.len() >= 2 {
            reflect_extend(samples, self.n_fft)
        } else {
            let mut padded = samples.to_vec();
            padded.resize(self.n_fft, 0.0);
            padded
        };

        let excess = signal.len() - self.n_fft;
        let hops = excess.div_ceil(self.hop_length);
        signal.resize(self.n_fft + hops * self.hop_length, 0.0);
        signal
    }
}

/// Mirror-extend `samples` on the right to `target_len` without repeating
/// the edge sample; the reflection repeats periodically if needed
fn reflect_extend(samples: &[f64], target_len: usize) -> Vec<f64> {
    let n = samples.len();
    let period = 2 * (n - 1);
    (0..target_len)
        .map(|i| {
            let m = i % period;
            if m < n {
                samples[m]
            } else {
                samples[period - m]
            }
        })
        .collect()
}

/// Options for collapsing a spectrogram into one row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisOptions {
    /// Convert magnitudes to log10 before averaging
    pub log_magnitude: bool,
    /// Values below this are excluded from a bin's average
    pub threshold: Option<f64>,
}

impl AnalysisOptions {
    /// Row options for inference rows and control baselines alike
    pub fn from_config(config: &AudioConfig) -> Self {
        Self {
            log_magnitude: config.log_magnitude,
            threshold: config.row_threshold,
        }
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            log_magnitude: false,
            threshold: None,
        }
    }
}

/// Time-averaged spectrum keyed by integer frequency bin (Hz, truncated)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpectralRow {
    pub bins: Vec<i32>,
    pub values: Vec<f64>,
}

impl SpectralRow {
    /// Average a spectrogram across frames
    ///
    /// With a threshold, frames whose value falls below it do not count
    /// toward that bin's mean; a bin with no remaining frames averages to 0.
    pub fn from_spectrogram(spec: &Spectrogram, options: AnalysisOptions) -> Self {
        let mut sums = vec![0.0; spec.num_bins()];
        let mut counts = vec![0usize; spec.num_bins()];

        for frame in &spec.frames {
            for (k, &magnitude) in frame.iter().enumerate() {
                let value = if options.log_magnitude {
                    magnitude.log10()
                } else {
                    magnitude
                };
                if options.threshold.is_some_and(|t| value < t) {
                    continue;
                }
                sums[k] += value;
                counts[k] += 1;
            }
        }

        let values = sums
            .iter()
            .zip(&counts)
            .map(|(&sum, &count)| if count > 0 { sum / count as f64 } else { 0.0 })
            .collect();

        Self {
            bins: spec.freqs.iter().map(|&f| f as i32).collect(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.bins.iter().copied().zip(self.values.iter().copied())
    }
}
