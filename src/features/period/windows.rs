//! Window scheduling over onset envelopes
//!
//! Cuts the low/high onset envelopes into overlapping windows, estimates the
//! periodicity of each window in parallel, and flattens the per-window records
//! into plain tempo hints.

use super::autocorrelation::estimate_segment_tempo;
use super::WindowTempoHint;
use crate::config::AnalyzerParams;
use crate::error::{EngineError, Stage};
use crate::features::onset::{extract_onset_envelope, OnsetEnvelope};
use crate::io::PcmAudio;
use rayon::prelude::*;

/// A borrowed slice of both onset envelopes
///
/// Created by [`plan_windows`] and consumed once by the tempo estimator.
#[derive(Debug, Clone, Copy)]
pub struct AudioWindow<'a> {
    /// Window position in the schedule
    pub index: usize,
    /// Start time of the window in seconds
    pub start_seconds: f64,
    /// Low band onset strength
    pub low: &'a [f64],
    /// High band onset strength
    pub high: &'a [f64],
}

/// Split an envelope into windows of `window_frames`, advancing `hop_frames`
///
/// An envelope shorter than one window becomes a single window.
pub fn plan_windows(
    envelope: &OnsetEnvelope,
    window_frames: usize,
    hop_frames: usize,
) -> Vec<AudioWindow<'_>> {
    let window_frames = window_frames.max(1);
    let hop_frames = hop_frames.max(1);
    let len = envelope.low.len().min(envelope.high.len());

    if len < window_frames {
        return vec![AudioWindow {
            index: 0,
            start_seconds: 0.0,
            low: &envelope.low[..len],
            high: &envelope.high[..len],
        }];
    }

    (0..=len - window_frames)
        .step_by(hop_frames)
        .enumerate()
        .map(|(index, start)| AudioWindow {
            index,
            start_seconds: start as f64 / envelope.rate_hz,
            low: &envelope.low[start..start + window_frames],
            high: &envelope.high[start..start + window_frames],
        })
        .collect()
}

/// Check analyzer parameters
///
/// # Errors
///
/// Returns `InvalidInput` (stage `preprocess`) for non-positive durations or
/// cutoffs, an empty tempo range, or a negative lag bias.
pub fn validate_params(params: &AnalyzerParams) -> Result<(), EngineError> {
    if params.window_seconds <= 0.0 || params.hop_seconds <= 0.0 || params.frame_seconds <= 0.0 {
        return Err(EngineError::invalid(
            Stage::Preprocess,
            "window_seconds/hop_seconds/frame_seconds must be > 0",
        ));
    }
    if params.bpm_min <= 0.0 || params.bpm_max <= params.bpm_min {
        return Err(EngineError::invalid(
            Stage::Preprocess,
            format!("invalid BPM range: [{:.1}, {:.1}]", params.bpm_min, params.bpm_max),
        ));
    }
    if params.lowpass_hz <= 0.0 || params.highpass_hz <= 0.0 {
        return Err(EngineError::invalid(
            Stage::Preprocess,
            "filter cutoffs must be > 0",
        ));
    }
    if params.lag_bias_exponent < 0.0 {
        return Err(EngineError::invalid(
            Stage::Preprocess,
            "lag_bias_exponent must be >= 0",
        ));
    }
    Ok(())
}

/// Compute per-window tempo records from PCM
///
/// Windows are evaluated in parallel; results keep window order.
///
/// # Arguments
///
/// * `pcm` - 16-bit PCM, mono or stereo
/// * `params` - Analyzer parameters
///
/// # Returns
///
/// One record per window with a usable low band estimate. Empty when the clip
/// is too short.
///
/// # Errors
///
/// Returns `InvalidInput` for invalid parameters or channel counts other than
/// 1 or 2.
pub fn compute_window_hints(
    pcm: &PcmAudio,
    params: &AnalyzerParams,
) -> Result<Vec<WindowTempoHint>, EngineError> {
    validate_params(params)?;

    let Some(envelope) = extract_onset_envelope(pcm, params)? else {
        return Ok(Vec::new());
    };

    let window_frames = ((params.window_seconds * envelope.rate_hz).round() as usize).max(1);
    let hop_frames = ((params.hop_seconds * envelope.rate_hz).round() as usize).max(1);
    let windows = plan_windows(&envelope, window_frames, hop_frames);

    log::debug!(
        "Estimating tempo over {} windows ({} frames, hop {})",
        windows.len(),
        window_frames,
        hop_frames
    );

    let rate = envelope.rate_hz;
    let hints: Vec<WindowTempoHint> = windows
        .par_iter()
        .filter_map(|window| {
            let estimate = |segment: &[f64]| {
                estimate_segment_tempo(
                    segment,
                    rate,
                    params.bpm_min,
                    params.bpm_max,
                    params.lag_bias_exponent,
                )
            };
            let low = estimate(window.low)?;
            let high = estimate(window.high);
            Some(WindowTempoHint::from_bands(low, high))
        })
        .collect();

    log::debug!("Produced {} window tempo records", hints.len());
    Ok(hints)
}

/// Flatten window records into tempo hints
///
/// Each window contributes its low and high band best tempo, plus each
/// double-tempo candidate whose ratio reaches `double_tempo_alpha`. The best
/// tempo is never replaced by its double.
pub fn flatten_window_hints(details: &[WindowTempoHint], double_tempo_alpha: f64) -> Vec<f64> {
    let mut hints = Vec::with_capacity(details.len() * 2);
    for detail in details {
        hints.push(detail.best_bpm);
        if let Some(high) = detail.high_best_bpm {
            hints.push(high);
        }
        hints.extend(
            detail
                .double_evidence()
                .filter(|&(_, ratio)| ratio >= double_tempo_alpha)
                .map(|(bpm, _)| bpm),
        );
    }
    hints
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click_track(bpm: f64, seconds: f64, sample_rate: u32) -> PcmAudio {
        let n = (seconds * sample_rate as f64).round() as usize;
        let mut samples = vec![0i16; n];
        let period = 60.0 / bpm;
        let click_len = (0.005 * sample_rate as f64) as usize;
        let mut t = 0.0;
        while t < seconds {
            let start = (t * sample_rate as f64).round() as usize;
            for s in samples.iter_mut().skip(start).take(click_len) {
                *s = 20000;
            }
            t += period;
        }
        PcmAudio {
            sample_rate_hz: sample_rate,
            channels: 1,
            samples,
        }
    }

    #[test]
    fn test_plan_windows_overlap() {
        let envelope = OnsetEnvelope {
            low: vec![0.0; 2000],
            high: vec![0.0; 2000],
            rate_hz: 100.0,
        };
        let windows = plan_windows(&envelope, 800, 400);
        assert_eq!(windows.len(), 4);
        assert_eq!(windows[1].start_seconds, 4.0);
        assert_eq!(windows[3].low.len(), 800);
    }

    #[test]
    fn test_plan_windows_short_envelope() {
        let envelope = OnsetEnvelope {
            low: vec![0.0; 300],
            high: vec![0.0; 300],
            rate_hz: 100.0,
        };
        let windows = plan_windows(&envelope, 800, 400);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].low.len(), 300);
    }

    #[test]
    fn test_click_track_120bpm() {
        let pcm = click_track(120.0, 20.0, 8000);
        let hints = compute_window_hints(&pcm, &AnalyzerParams::default()).unwrap();
        assert_eq!(hints.len(), 4);
        for hint in &hints {
            assert!(
                (hint.best_bpm - 120.0).abs() <= 2.0,
                "BPM should be close to 120, got {:.2}",
                hint.best_bpm
            );
            assert!(hint.high_best_bpm.is_some());
        }
    }

    #[test]
    fn test_short_clip_yields_no_hints() {
        let pcm = click_track(120.0, 1.5, 8000);
        let hints = compute_window_hints(&pcm, &AnalyzerParams::default()).unwrap();
        assert!(hints.is_empty());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let pcm = click_track(120.0, 4.0, 8000);
        let params = AnalyzerParams {
            bpm_min: 200.0,
            bpm_max: 60.0,
            ..AnalyzerParams::default()
        };
        assert!(compute_window_hints(&pcm, &params).is_err());

        let params = AnalyzerParams {
            lag_bias_exponent: -1.0,
            ..AnalyzerParams::default()
        };
        assert!(compute_window_hints(&pcm, &params).is_err());
    }

    #[test]
    fn test_flatten_respects_alpha() {
        let details = vec![WindowTempoHint {
            best_bpm: 85.0,
            best_score: 0.6,
            double_bpm: Some(170.0),
            double_ratio: Some(0.5),
            high_best_bpm: Some(86.0),
            high_best_score: Some(0.5),
            high_double_bpm: Some(171.0),
            high_double_ratio: Some(0.9),
        }];
        assert_eq!(flatten_window_hints(&details, 0.8), vec![85.0, 86.0, 171.0]);
        assert_eq!(
            flatten_window_hints(&details, 0.4),
            vec![85.0, 86.0, 170.0, 171.0]
        );
        assert_eq!(flatten_window_hints(&details, 0.99), vec![85.0, 86.0]);
    }
}
