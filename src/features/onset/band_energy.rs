//! Frame-level band energies
//!
//! The mono signal is split into a low band (one-pole low-pass) and a high
//! band (residual of a second low-pass). Each frame's energy is the mean
//! absolute value of the filtered samples. Filter state carries across frame
//! boundaries; the final frame may be partial.

use crate::preprocessing::filters::{one_pole_highpass, one_pole_lowpass};

/// Per-frame energies of the low and high bands
#[derive(Debug, Clone, PartialEq)]
pub struct BandEnergies {
    /// Low band energy per frame
    pub low: Vec<f64>,
    /// High band energy per frame
    pub high: Vec<f64>,
}

impl BandEnergies {
    /// Number of frames
    pub fn len(&self) -> usize {
        self.low.len()
    }

    /// Whether no frame was produced
    pub fn is_empty(&self) -> bool {
        self.low.is_empty()
    }
}

/// Compute low/high band energies per frame
///
/// # Arguments
///
/// * `mono` - Mono samples (16-bit scale)
/// * `sample_rate_hz` - Sample rate in Hz
/// * `frame_size` - Samples per frame (must be > 0)
/// * `lowpass_hz` - Low band cutoff
/// * `highpass_hz` - Crossover of the high band
pub fn compute_band_energies(
    mono: &[f64],
    sample_rate_hz: f64,
    frame_size: usize,
    lowpass_hz: f64,
    highpass_hz: f64,
) -> BandEnergies {
    let frame_size = frame_size.max(1);
    let low_band = one_pole_lowpass(mono, lowpass_hz, sample_rate_hz);
    let high_band = one_pole_highpass(mono, highpass_hz, sample_rate_hz);

    let mean_abs = |frame: &[f64]| frame.iter().map(|v| v.abs()).sum::<f64>() / frame.len() as f64;

    let low: Vec<f64> = low_band.chunks(frame_size).map(mean_abs).collect();
    let high: Vec<f64> = high_band.chunks(frame_size).map(mean_abs).collect();

    log::debug!(
        "Computed {} band energy frames (frame={} samples)",
        low.len(),
        frame_size
    );

    BandEnergies { low, high }
}
