//! Onset detection modules
//!
//! Produces two onset-strength envelopes (low and high band) sampled at the
//! envelope rate `1 / frame_seconds`.

pub mod band_energy;
pub mod energy_flux;

use crate::config::AnalyzerParams;
use crate::error::EngineError;
use crate::io::PcmAudio;
use crate::preprocessing::channel_mixer::mix_to_mono;

/// Onset-strength envelopes of one clip
#[derive(Debug, Clone, PartialEq)]
pub struct OnsetEnvelope {
    /// Low band onset strength
    pub low: Vec<f64>,
    /// High band onset strength
    pub high: Vec<f64>,
    /// Envelope sample rate in Hz
    pub rate_hz: f64,
}

/// Extract low/high onset envelopes from PCM
///
/// # Returns
///
/// `None` when the clip is shorter than `min_audio_seconds` or yields fewer
/// than 4 envelope frames.
///
/// # Errors
///
/// Returns `InvalidInput` for channel counts other than 1 or 2.
pub fn extract_onset_envelope(
    pcm: &PcmAudio,
    params: &AnalyzerParams,
) -> Result<Option<OnsetEnvelope>, EngineError> {
    let mono = mix_to_mono(&pcm.samples, pcm.channels)?;

    let sample_rate = pcm.sample_rate_hz as f64;
    let duration = pcm.duration_seconds();
    if duration < params.min_audio_seconds {
        log::debug!(
            "Clip too short for onset analysis: {:.2}s < {:.2}s",
            duration,
            params.min_audio_seconds
        );
        return Ok(None);
    }

    let frame_size = ((sample_rate * params.frame_seconds).round() as usize).max(1);
    let energies = band_energy::compute_band_energies(
        &mono,
        sample_rate,
        frame_size,
        params.lowpass_hz,
        params.highpass_hz,
    );
    if energies.len() < 4 {
        return Ok(None);
    }

    Ok(Some(OnsetEnvelope {
        low: energy_flux::energy_flux(&energies.low),
        high: energy_flux::energy_flux(&energies.high),
        rate_hz: 1.0 / params.frame_seconds,
    }))
}
