//! Audio decoding using hound
//!
//! Only 16-bit integer PCM WAV is accepted. Any other container is rejected as
//! unsupported; transcoding belongs outside the engine.

use super::{DecodedAudio, PcmAudio};
use crate::error::{EngineError, Stage};
use std::path::Path;

/// Decode a file, dispatching on its extension
///
/// # Arguments
///
/// * `path` - Path to the audio file
/// * `max_seconds` - Optional duration guard
///
/// # Errors
///
/// - `UnsupportedInput` (stage `ingest`) for anything but `.wav`
/// - `InvalidInput` (stage `ingest`) for unreadable or non-16-bit WAV data,
///   or audio exceeding `max_seconds`
pub fn decode_path(path: &Path, max_seconds: Option<f64>) -> Result<DecodedAudio, EngineError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "wav" => decode_wav(path, max_seconds),
        "" => Err(EngineError::unsupported(
            Stage::Ingest,
            "file has no extension",
        )),
        other => Err(EngineError::unsupported(
            Stage::Ingest,
            format!("unsupported audio format: .{}", other),
        )),
    }
}

/// Decode a 16-bit PCM WAV file
///
/// # Errors
///
/// Returns `InvalidInput` (stage `ingest`) if the file cannot be parsed, is not
/// 16-bit integer PCM, has no channels or sample rate, or exceeds `max_seconds`.
pub fn decode_wav(path: &Path, max_seconds: Option<f64>) -> Result<DecodedAudio, EngineError> {
    log::debug!("Decoding WAV file: {}", path.display());

    let mut reader = hound::WavReader::open(path)
        .map_err(|e| EngineError::invalid(Stage::Ingest, format!("unreadable WAV: {}", e)))?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(EngineError::invalid(
            Stage::Ingest,
            format!(
                "only 16-bit PCM WAV is supported (got {} bits, {:?})",
                spec.bits_per_sample, spec.sample_format
            ),
        ));
    }
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(EngineError::invalid(
            Stage::Ingest,
            "WAV header has zero channels or sample rate",
        ));
    }

    let frames = reader.duration() as f64;
    let duration_seconds = frames / spec.sample_rate as f64;
    if let Some(max) = max_seconds {
        if duration_seconds > max {
            return Err(EngineError::invalid(
                Stage::Ingest,
                format!(
                    "audio duration {:.2}s exceeds limit of {:.2}s",
                    duration_seconds, max
                ),
            ));
        }
    }

    let samples = reader
        .samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| EngineError::invalid(Stage::Ingest, format!("corrupt WAV data: {}", e)))?;

    let pcm = PcmAudio {
        sample_rate_hz: spec.sample_rate,
        channels: spec.channels,
        samples,
    };

    log::debug!(
        "Decoded {} frames at {} Hz, {} channel(s)",
        pcm.frame_count(),
        pcm.sample_rate_hz,
        pcm.channels
    );

    Ok(DecodedAudio::from_pcm(pcm, "wav"))
}
