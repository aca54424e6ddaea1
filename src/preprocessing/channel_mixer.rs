//! Channel mixing utilities (stereo to mono conversion)

use crate::error::{EngineError, Stage};

/// Convert interleaved 16-bit PCM to mono
///
/// Stereo frames are averaged with integer floor division, `(L + R) div 2`,
/// so mixing is exact and deterministic.
///
/// # Arguments
///
/// * `samples` - Interleaved samples
/// * `channels` - Channel count (1 or 2)
///
/// # Returns
///
/// Mono samples as `f64`
///
/// # Errors
///
/// Returns `InvalidInput` (stage `preprocess`) for any other channel count.
pub fn mix_to_mono(samples: &[i16], channels: u16) -> Result<Vec<f64>, EngineError> {
    match channels {
        1 => Ok(samples.iter().map(|&s| s as f64).collect()),
        2 => {
            log::debug!("Mixing {} stereo frames to mono", samples.len() / 2);
            Ok(samples
                .chunks_exact(2)
                .map(|frame| (frame[0] as i32 + frame[1] as i32).div_euclid(2) as f64)
                .collect())
        }
        other => Err(EngineError::invalid(
            Stage::Preprocess,
            format!("unsupported channel count: {} (expected 1 or 2)", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_passthrough() {
        let mono = mix_to_mono(&[1, -2, 3], 1).unwrap();
        assert_eq!(mono, vec![1.0, -2.0, 3.0]);
    }

    #[test]
    fn test_stereo_floor_average() {
        let mono = mix_to_mono(&[1, 2, -1, -2, 32767, 32767], 2).unwrap();
        assert_eq!(mono, vec![1.0, -2.0, 32767.0]);
    }

    #[test]
    fn test_rejects_multichannel() {
        let err = mix_to_mono(&[0; 6], 3).unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }
}
