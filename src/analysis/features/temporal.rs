// Temporal module - Time-domain descriptors
//
// These features are computed directly from the cleaned waveform and capture
// level and sign-change behavior independent of the spectral analysis.

use super::spectral::EPSILON;

/// Compute zero-crossing rate (ZCR)
///
/// Formula: ZCR = Σ|sign(x[n]) - sign(x[n-1])| / 2 / (N - 1)
///
/// `sign(0)` is 0, so touching zero counts as half a crossing.
///
/// # Returns
/// Zero-crossing rate (0.0 to 1.0), 0 for fewer than two samples
pub fn zero_crossing_rate(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let changes: f64 = samples
        .windows(2)
        .map(|pair| (sign(pair[1]) - sign(pair[0])).abs())
        .sum();
    changes / 2.0 / (samples.len() - 1) as f64
}

/// Peak absolute sample level in dB
pub fn peak_db(samples: &[f64]) -> f64 {
    20.0 * (peak(samples) + EPSILON).log10()
}

/// Ratio of peak amplitude to RMS amplitude
pub fn crest_factor(samples: &[f64]) -> f64 {
    let rms = if samples.is_empty() {
        0.0
    } else {
        (samples.iter().map(|s| s * s).sum::<f64>() / samples.len() as f64).sqrt()
    };
    (peak(samples) + EPSILON) / (rms + EPSILON)
}

fn peak(samples: &[f64]) -> f64 {
    samples.iter().fold(0.0, |acc: f64, s| acc.max(s.abs()))
}

fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zcr_alternating_signal() {
        let samples = [1.0, -1.0, 1.0, -1.0, 1.0];
        assert!((zero_crossing_rate(&samples) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zcr_counts_zero_as_half() {
        let samples = [1.0, 0.0, 1.0];
        // |0 - 1| + |1 - 0| = 2 -> 2 / 2 / 2
        assert!((zero_crossing_rate(&samples) - 0.5).abs() < 1e-12);
        assert_eq!(zero_crossing_rate(&[0.3]), 0.0);
        assert_eq!(zero_crossing_rate(&[0.0; 50]), 0.0);
    }

    #[test]
    fn test_zcr_low_frequency_sine_is_small() {
        let samples: Vec<f64> = (0..48_000)
            .map(|i| (2.0 * std::f64::consts::PI * 100.0 * i as f64 / 48_000.0).sin())
            .collect();
        let zcr = zero_crossing_rate(&samples);
        assert!(zcr < 0.01, "expected low ZCR, got {zcr}");
    }

    #[test]
    fn test_peak_and_crest() {
        let square = [0.5, -0.5, 0.5, -0.5];
        assert!((peak_db(&square) - 20.0 * 0.5f64.log10()).abs() < 1e-6);
        assert!((crest_factor(&square) - 1.0).abs() < 1e-6);
        assert!(peak_db(&[]).is_finite());
        assert!((crest_factor(&[]) - 1.0).abs() < 1e-12);
    }
}
