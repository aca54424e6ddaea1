//! One-pole band filters used to split the signal into low and high bands

use std::f64::consts::PI;

/// Smoothing coefficient of a one-pole low-pass at `cutoff_hz`
///
/// `alpha = w / (w + sr)` with `w = 2π·fc`.
pub fn lowpass_alpha(cutoff_hz: f64, sample_rate_hz: f64) -> f64 {
    let w = 2.0 * PI * cutoff_hz;
    w / (w + sample_rate_hz)
}

/// One-pole low-pass filter, `y[n] = y[n-1] + α·(x[n] − y[n-1])`, starting at 0
pub fn one_pole_lowpass(samples: &[f64], cutoff_hz: f64, sample_rate_hz: f64) -> Vec<f64> {
    let alpha = lowpass_alpha(cutoff_hz, sample_rate_hz);
    let mut y = 0.0;
    samples
        .iter()
        .map(|&x| {
            y += alpha * (x - y);
            y
        })
        .collect()
}

/// High band as the residual of a low-pass: `x − lowpass(x)`
pub fn one_pole_highpass(samples: &[f64], cutoff_hz: f64, sample_rate_hz: f64) -> Vec<f64> {
    let low = one_pole_lowpass(samples, cutoff_hz, sample_rate_hz);
    samples.iter().zip(low).map(|(&x, l)| x - l).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_range() {
        let alpha = lowpass_alpha(200.0, 44100.0);
        assert!(alpha > 0.0 && alpha < 1.0);
        assert!(lowpass_alpha(900.0, 44100.0) > alpha);
    }

    #[test]
    fn test_lowpass_converges_on_dc() {
        let dc = vec![1000.0; 4000];
        let low = one_pole_lowpass(&dc, 200.0, 8000.0);
        assert!((low[3999] - 1000.0).abs() < 1e-6);
        let high = one_pole_highpass(&dc, 900.0, 8000.0);
        assert!(high[3999].abs() < 1e-6);
    }

    #[test]
    fn test_highpass_passes_alternating_signal() {
        let signal: Vec<f64> = (0..2000).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let high = one_pole_highpass(&signal, 200.0, 8000.0);
        let low = one_pole_lowpass(&signal, 200.0, 8000.0);
        let high_energy: f64 = high[1000..].iter().map(|v| v.abs()).sum();
        let low_energy: f64 = low[1000..].iter().map(|v| v.abs()).sum();
        assert!(high_energy > 10.0 * low_energy);
    }
}
