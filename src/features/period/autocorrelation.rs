//! Autocorrelation-based tempo estimation per window
//!
//! Finds the dominant periodicity of one onset segment using FFT-accelerated
//! autocorrelation, and measures how well the half lag (double tempo) is
//! supported.
//!
//! # Algorithm
//!
//! 1. Center the segment (remove its mean)
//! 2. Compute `ACF = IFFT(|FFT(x)|²)` with zero padding, so that
//!    `ACF[lag] = Σ x[i]·x[i−lag]`
//! 3. Search lags in `[round(60·rate/bpm_max), round(60·rate/bpm_min)]` for the
//!    maximum (optionally divided by `lag^bias`)
//! 4. Convert the best lag to BPM: `BPM = 60 · rate / lag`
//! 5. Compare the best of `lag/2` and `lag/2 + 1` against the best lag
//!
//! # Reference
//!
//! Ellis, D. P. W., & Pikrakis, A. (2006). Real-time Beat Induction.
//! *Proceedings of the International Conference on Music Information Retrieval*.

use super::BandHint;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

const EPSILON: f64 = 1e-12;

/// Minimum segment length in envelope frames
pub const MIN_SEGMENT_FRAMES: usize = 8;

/// Estimate the tempo of one onset segment
///
/// # Arguments
///
/// * `segment` - Onset strength values of one window and band
/// * `envelope_rate_hz` - Envelope sample rate (frames per second)
/// * `bpm_min` - Minimum tempo
/// * `bpm_max` - Maximum tempo
/// * `lag_bias_exponent` - Exponent of the lag penalty (0 disables it)
///
/// # Returns
///
/// `None` when the segment is shorter than 8 frames or the lag range is empty.
pub fn estimate_segment_tempo(
    segment: &[f64],
    envelope_rate_hz: f64,
    bpm_min: f64,
    bpm_max: f64,
    lag_bias_exponent: f64,
) -> Option<BandHint> {
    let n = segment.len();
    if n < MIN_SEGMENT_FRAMES {
        return None;
    }

    let mean = segment.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = segment.iter().map(|&v| v - mean).collect();

    let min_lag = ((envelope_rate_hz * 60.0 / bpm_max).round() as usize).max(1);
    let max_lag = ((envelope_rate_hz * 60.0 / bpm_min).round() as usize).min(n - 1);
    if max_lag <= min_lag {
        return None;
    }

    let acf = compute_autocorrelation_fft(&centered);
    let energy = acf[0] + EPSILON;
    let bias = lag_bias_exponent.max(0.0);

    let (best_lag, best_raw) = best_lag_in(&acf, min_lag..=max_lag, bias)?;
    let mut hint = BandHint {
        best_bpm: 60.0 * envelope_rate_hz / best_lag as f64,
        best_score: best_raw.abs() / energy,
        double_bpm: None,
        double_ratio: None,
    };

    if best_raw.abs() <= EPSILON {
        return Some(hint);
    }

    let half = best_lag / 2;
    let half_lags = [half, half + 1];
    let candidates = half_lags.iter().copied().filter(|&lag| lag >= min_lag);
    if let Some((half_lag, half_raw)) = best_lag_in(&acf, candidates, bias) {
        let double_bpm = 60.0 * envelope_rate_hz / half_lag as f64;
        if double_bpm <= bpm_max {
            hint.double_bpm = Some(double_bpm);
            hint.double_ratio = Some(half_raw.abs() / best_raw.abs());
        }
    }

    Some(hint)
}

/// Pick the lag with the largest (bias-adjusted) correlation; ties keep the
/// shorter lag
fn best_lag_in(
    acf: &[f64],
    lags: impl IntoIterator<Item = usize>,
    bias: f64,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64, f64)> = None;
    for lag in lags {
        let Some(&raw) = acf.get(lag) else {
            continue;
        };
        let adjusted = if bias > 0.0 {
            raw / (lag as f64).powf(bias)
        } else {
            raw
        };
        if best.map_or(true, |(_, _, adj)| adjusted > adj) {
            best = Some((lag, raw, adjusted));
        }
    }
    best.map(|(lag, raw, _)| (lag, raw))
}

/// Compute autocorrelation using FFT acceleration
///
/// Uses the identity: ACF = IFFT(|FFT(signal)|²). The input is zero-padded
/// to at least twice its length so the result is the linear (not circular)
/// autocorrelation.
///
/// # Returns
///
/// Autocorrelation function (same length as input), unnormalized
pub fn compute_autocorrelation_fft(signal: &[f64]) -> Vec<f64> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    let fft_size = (2 * n).next_power_of_two();

    let mut buffer: Vec<Complex<f64>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    buffer.resize(fft_size, Complex::new(0.0, 0.0));

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);
    fft.process(&mut buffer);

    for x in &mut buffer {
        *x = *x * x.conj();
    }

    let ifft = planner.plan_fft_inverse(fft_size);
    ifft.process(&mut buffer);

    let scale = 1.0 / fft_size as f64;
    buffer[..n].iter().map(|x| x.re * scale).collect()
}
