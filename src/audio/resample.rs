// Resample module - rational polyphase sample-rate conversion
//
// The conversion ratio is reduced by the greatest common divisor of the two
// rates into an up/down pair. The signal is conceptually zero-stuffed by `up`,
// low-passed by a Kaiser-windowed sinc FIR at 1/max(up, down) of Nyquist, and
// decimated by `down`. Only the taps that land on real input samples are
// evaluated, so the cost per output sample is about 2 * 10 * max(up, down) / up.

/// Kaiser window shape parameter
const KAISER_BETA: f64 = 5.0;

/// Filter half-length in units of max(up, down)
const HALF_LEN_FACTOR: usize = 10;

/// Resample `samples` from `from_rate` to `to_rate`
///
/// Output length is `ceil(len * up / down)`. Equal rates return a copy.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 || samples.is_empty() {
        return samples.to_vec();
    }

    let (up, down) = rational_factors(from_rate, to_rate);
    let filter = design_filter(up, down);
    let half_len = (filter.len() - 1) / 2;

    let out_len = (samples.len() * up).div_ceil(down);
    let mut output = Vec::with_capacity(out_len);

    for k in 0..out_len {
        // y[k] = sum_n x[n] * h[k*down + half_len - n*up]
        let center = k * down + half_len;
        let n_max = (center / up).min(samples.len() - 1);
        let n_min = center.saturating_sub(filter.len() - 1).div_ceil(up);

        let mut acc = 0.0f64;
        let mut n = n_min;
        while n <= n_max {
            acc += samples[n] as f64 * filter[center - n * up];
            n += 1;
        }
        output.push(acc as f32);
    }

    output
}

/// Reduce the rate ratio to (up, down)
pub fn rational_factors(from_rate: u32, to_rate: u32) -> (usize, usize) {
    let g = gcd(from_rate as usize, to_rate as usize);
    (to_rate as usize / g, from_rate as usize / g)
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Kaiser-windowed sinc low-pass, unit DC gain scaled by `up`
fn design_filter(up: usize, down: usize) -> Vec<f64> {
    let max_rate = up.max(down);
    let half_len = HALF_LEN_FACTOR * max_rate;
    let num_taps = 2 * half_len + 1;
    let cutoff = 1.0 / max_rate as f64;
    let alpha = (num_taps - 1) as f64 / 2.0;
    let i0_beta = bessel_i0(KAISER_BETA);

    let mut taps: Vec<f64> = (0..num_taps)
        .map(|i| {
            let m = i as f64 - alpha;
            let ratio = m / alpha;
            let window = bessel_i0(KAISER_BETA * (1.0 - ratio * ratio).max(0.0).sqrt()) / i0_beta;
            cutoff * sinc(cutoff * m) * window
        })
        .collect();

    let sum: f64 = taps.iter().sum();
    let scale = up as f64 / sum;
    for tap in &mut taps {
        *tap *= scale;
    }
    taps
}

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        let px = std::f64::consts::PI * x;
        px.sin() / px
    }
}

/// Zeroth-order modified Bessel function of the first kind (power series)
fn bessel_i0(x: f64) -> f64 {
    let half = x / 2.0;
    let mut term = 1.0;
    let mut sum = 1.0;
    let mut k = 1.0;
    while term > sum * 1e-16 {
        term *= (half / k) * (half / k);
        sum += term;
        k += 1.0;
    }
    sum
}
