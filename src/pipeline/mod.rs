//! Analysis pipeline orchestrator
//!
//! Sequences the stages of one analysis:
//!
//! 1. validate: input shape and configuration
//! 2. ingest: decode a WAV path (path inputs only)
//! 3. preprocess: analyzer window records from PCM, unless hints supply them
//! 4. feature:bpm and feature:key_mode: candidate engines
//! 5. packaging and contract: role view, then the output validator
//!
//! A panic inside any stage is caught and reported as `Internal` for the
//! stage that was running. Low confidence is never a failure; the metric is
//! omitted and a `feature_omitted` event is emitted.

pub mod observer;

use crate::analysis::{assemble_votes, estimate_bpm, estimate_key_mode, BpmEvidence};
use crate::config::EngineConfig;
use crate::error::{EngineError, Stage};
use crate::features::period::{compute_window_hints, WindowTempoHint};
use crate::io::{decode_path, DecodedAudio, TrackInfo};
use crate::packaging::{package, validate_output, AnalysisReport, PackagedOutput, Role};
use chrono::{DateTime, Utc};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use uuid::Uuid;

pub use observer::{
    AnalysisEvent, AnalysisObserver, Feature, LogObserver, NoopObserver, OmissionReason,
    RecordingObserver,
};

/// What to analyze
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisInput {
    /// Metadata only; produces an envelope with empty metrics
    Track(TrackInfo),
    /// Already decoded audio with optional hints
    Audio(DecodedAudio),
    /// A file to decode (16-bit PCM WAV)
    Path(PathBuf),
}

/// Per-run overrides
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunOptions {
    /// Fixed analysis id (default: random v4)
    pub analysis_id: Option<Uuid>,
    /// Fixed creation time (default: now)
    pub created_at: Option<DateTime<Utc>>,
}

/// Run one analysis and return the role view
///
/// Emits `analysis_started`, any `feature_omitted`, then exactly one of
/// `analysis_completed` or `analysis_failed`.
///
/// # Arguments
///
/// * `input` - Track metadata, decoded audio, or a file path
/// * `role` - Caller tier
/// * `config` - Engine configuration
/// * `observer` - Event receiver
/// * `options` - Id and timestamp overrides
///
/// # Errors
///
/// - `InvalidInput` / `UnsupportedInput` for rejected input or configuration
/// - `ContractViolation` if the packaged output fails validation
/// - `Internal` for unexpected failures, including panics
///
/// # Example
///
/// ```no_run
/// use bnk_analysis_engine::pipeline::{run_analysis, AnalysisInput, LogObserver, RunOptions};
/// use bnk_analysis_engine::{EngineConfig, Role};
///
/// let output = run_analysis(
///     AnalysisInput::Path("clip.wav".into()),
///     Role::Free,
///     &EngineConfig::default(),
///     &LogObserver,
///     RunOptions::default(),
/// )?;
/// println!("{}", output.to_json_pretty()?);
/// # Ok::<(), bnk_analysis_engine::EngineError>(())
/// ```
pub fn run_analysis(
    input: AnalysisInput,
    role: Role,
    config: &EngineConfig,
    observer: &dyn AnalysisObserver,
    options: RunOptions,
) -> Result<PackagedOutput, EngineError> {
    let analysis_id = options.analysis_id.unwrap_or_else(Uuid::new_v4);
    let created_at = options.created_at.unwrap_or_else(Utc::now);

    observer.on_event(&AnalysisEvent::AnalysisStarted { analysis_id, role });
    log::debug!("Analysis {} started for role {}", analysis_id, role);

    let mut stage = Stage::Validate;
    let outcome = catch_unwind(AssertUnwindSafe(|| -> Result<PackagedOutput, EngineError> {
        let report = build_report(input, config, observer, analysis_id, created_at, &mut stage)?;
        stage = Stage::Packaging;
        let packaged = package(&report, role);
        let value = packaged.to_value()?;
        stage = Stage::Contract;
        validate_output(&value)?;
        Ok(packaged)
    }));

    let result = match outcome {
        Ok(result) => result,
        Err(payload) => Err(EngineError::internal(stage, panic_message(payload.as_ref()))),
    };

    match &result {
        Ok(_) => {
            observer.on_event(&AnalysisEvent::AnalysisCompleted { analysis_id });
            log::debug!("Analysis {} completed", analysis_id);
        }
        Err(e) => {
            observer.on_event(&AnalysisEvent::AnalysisFailed {
                analysis_id,
                error_code: e.code().to_string(),
                stage: e.stage(),
            });
            log::debug!("Analysis {} failed: {}", analysis_id, e);
        }
    }
    result
}

/// Run the analysis stages and return the full-detail report
///
/// Only `feature_omitted` events are emitted here; lifecycle events belong to
/// [`run_analysis`].
///
/// # Errors
///
/// Same as [`run_analysis`], minus packaging and contract failures. Panics are
/// not caught.
pub fn analyze_report(
    input: AnalysisInput,
    config: &EngineConfig,
    observer: &dyn AnalysisObserver,
    options: RunOptions,
) -> Result<AnalysisReport, EngineError> {
    let analysis_id = options.analysis_id.unwrap_or_else(Uuid::new_v4);
    let created_at = options.created_at.unwrap_or_else(Utc::now);
    let mut stage = Stage::Validate;
    build_report(input, config, observer, analysis_id, created_at, &mut stage)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic".to_string()
    }
}

fn validate_track(track: &TrackInfo) -> Result<(), EngineError> {
    if track.channels != 1 && track.channels != 2 {
        return Err(EngineError::invalid(
            Stage::Validate,
            format!("channels must be 1 or 2 (got {})", track.channels),
        ));
    }
    if track.sample_rate_hz == 0 {
        return Err(EngineError::invalid(Stage::Validate, "sample_rate_hz must be positive"));
    }
    if !track.duration_seconds.is_finite() || track.duration_seconds < 0.0 {
        return Err(EngineError::invalid(
            Stage::Validate,
            "duration_seconds must be finite and non-negative",
        ));
    }
    Ok(())
}

fn check_duration_limit(duration_seconds: f64, config: &EngineConfig) -> Result<(), EngineError> {
    match config.max_audio_seconds {
        Some(max) if duration_seconds > max => Err(EngineError::invalid(
            Stage::Validate,
            format!(
                "audio duration {:.2}s exceeds limit of {:.2}s",
                duration_seconds, max
            ),
        )),
        _ => Ok(()),
    }
}

fn omit(
    observer: &dyn AnalysisObserver,
    analysis_id: Uuid,
    feature: Feature,
    reason: OmissionReason,
    stage: Stage,
) {
    log::debug!("Omitting {:?}: {:?}", feature, reason);
    observer.on_event(&AnalysisEvent::FeatureOmitted {
        analysis_id,
        feature,
        reason,
        stage,
    });
}

fn build_report(
    input: AnalysisInput,
    config: &EngineConfig,
    observer: &dyn AnalysisObserver,
    analysis_id: Uuid,
    created_at: DateTime<Utc>,
    stage: &mut Stage,
) -> Result<AnalysisReport, EngineError> {
    *stage = Stage::Validate;
    config.validate()?;
    let tunables = &config.tunables;

    let audio = match input {
        AnalysisInput::Track(track) => {
            validate_track(&track)?;
            log::debug!("Track-only analysis; metrics left empty");
            return Ok(AnalysisReport::new(analysis_id, created_at, track));
        }
        AnalysisInput::Audio(audio) => {
            validate_track(&audio.track_info())?;
            check_duration_limit(audio.duration_seconds, config)?;
            audio
        }
        AnalysisInput::Path(path) => {
            *stage = Stage::Ingest;
            let audio = decode_path(&path, config.max_audio_seconds)?;
            *stage = Stage::Validate;
            validate_track(&audio.track_info())?;
            audio
        }
    };

    let duration = audio.duration_seconds;
    let hints = &audio.hints;
    let mut report = AnalysisReport::new(analysis_id, created_at, audio.track_info());

    *stage = Stage::Preprocess;
    let rhythm_wanted = hints.has_rhythm_evidence != Some(false);
    let details: Vec<WindowTempoHint> = if !hints.bpm_hint_window_details.is_empty() {
        hints.bpm_hint_window_details.clone()
    } else {
        match &audio.pcm {
            Some(pcm) if rhythm_wanted && hints.bpm_hint_windows.is_empty() => {
                compute_window_hints(pcm, &tunables.analyzer_params())?
            }
            _ => Vec::new(),
        }
    };

    *stage = Stage::FeatureBpm;
    if !rhythm_wanted {
        omit(observer, analysis_id, Feature::Bpm, OmissionReason::NoEvidence, Stage::FeatureBpm);
    } else {
        let bpm = BpmEvidence::assemble(
            &hints.bpm_hint_windows,
            &details,
            hints.bpm_hint_exact,
            duration,
            tunables,
        )
        .and_then(|evidence| estimate_bpm(&evidence, duration, tunables));
        match bpm {
            None => omit(
                observer,
                analysis_id,
                Feature::Bpm,
                OmissionReason::NoEvidence,
                Stage::FeatureBpm,
            ),
            Some(result) => {
                if result.bpm_reportable.is_none() {
                    omit(
                        observer,
                        analysis_id,
                        Feature::Bpm,
                        OmissionReason::ConfidenceBelowThreshold,
                        Stage::FeatureBpm,
                    );
                }
                report.bpm = Some(result);
            }
        }
    }

    *stage = Stage::FeatureKeyMode;
    if hints.has_tonal_evidence == Some(false) {
        omit(
            observer,
            analysis_id,
            Feature::KeyMode,
            OmissionReason::NoEvidence,
            Stage::FeatureKeyMode,
        );
    } else {
        let votes = assemble_votes(
            &hints.key_mode_hint_windows,
            hints.key_mode_hint.as_deref(),
            duration,
            tunables,
        );
        let skipped = hints.key_mode_hint_windows.len().saturating_sub(votes.len());
        if !hints.key_mode_hint_windows.is_empty() && skipped > 0 {
            report
                .warnings
                .push(format!("key_mode: skipped {} unparseable window labels", skipped));
        }
        match estimate_key_mode(&votes, duration, tunables) {
            None => omit(
                observer,
                analysis_id,
                Feature::KeyMode,
                OmissionReason::NoEvidence,
                Stage::FeatureKeyMode,
            ),
            Some(result) => {
                if result.value.is_none() {
                    omit(
                        observer,
                        analysis_id,
                        Feature::KeyMode,
                        OmissionReason::ConfidenceBelowThreshold,
                        Stage::FeatureKeyMode,
                    );
                }
                report.key_mode = Some(result);
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::AnalysisHints;

    fn hinted(duration: f64, hints: AnalysisHints) -> AnalysisInput {
        AnalysisInput::Audio(DecodedAudio::from_hints(44100, 2, duration, hints))
    }

    fn fixed() -> RunOptions {
        RunOptions {
            analysis_id: Some(Uuid::nil()),
            created_at: None,
        }
    }

    #[test]
    fn test_lifecycle_events_in_order() {
        let hints = AnalysisHints {
            bpm_hint_windows: vec![120.0; 12],
            key_mode_hint_windows: vec!["A minor".to_string(); 8],
            ..Default::default()
        };
        let recorder = RecordingObserver::new();
        let output = run_analysis(
            hinted(30.0, hints),
            Role::Pro,
            &EngineConfig::default(),
            &recorder,
            fixed(),
        )
        .unwrap();
        assert_eq!(output.analysis_id, Uuid::nil());
        assert_eq!(recorder.names(), vec!["analysis_started", "analysis_completed"]);
    }

    #[test]
    fn test_evidence_flags_omit_features() {
        let hints = AnalysisHints {
            bpm_hint_windows: vec![120.0; 12],
            has_rhythm_evidence: Some(false),
            has_tonal_evidence: Some(false),
            ..Default::default()
        };
        let recorder = RecordingObserver::new();
        let report = analyze_report(
            hinted(30.0, hints),
            &EngineConfig::default(),
            &recorder,
            fixed(),
        )
        .unwrap();
        assert!(report.bpm.is_none());
        assert!(report.key_mode.is_none());
        let events = recorder.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            AnalysisEvent::FeatureOmitted {
                feature: Feature::Bpm,
                reason: OmissionReason::NoEvidence,
                stage: Stage::FeatureBpm,
                ..
            }
        ));
    }

    #[test]
    fn test_low_confidence_emits_omission() {
        let mut windows = vec![70.0; 8];
        windows.extend(vec![140.0; 8]);
        let hints = AnalysisHints {
            bpm_hint_windows: windows,
            has_tonal_evidence: Some(false),
            ..Default::default()
        };
        let recorder = RecordingObserver::new();
        let report =
            analyze_report(hinted(30.0, hints), &EngineConfig::default(), &recorder, fixed())
                .unwrap();
        let bpm = report.bpm.unwrap();
        assert!(bpm.bpm_reportable.is_none());
        assert!(!bpm.candidates.is_empty());
        assert!(recorder.events().iter().any(|e| matches!(
            e,
            AnalysisEvent::FeatureOmitted {
                feature: Feature::Bpm,
                reason: OmissionReason::ConfidenceBelowThreshold,
                ..
            }
        )));
    }

    #[test]
    fn test_invalid_channels_fail_validate() {
        let recorder = RecordingObserver::new();
        let input = AnalysisInput::Audio(DecodedAudio::from_hints(
            44100,
            6,
            30.0,
            AnalysisHints::default(),
        ));
        let err = run_analysis(input, Role::Free, &EngineConfig::default(), &recorder, fixed())
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
        assert_eq!(err.stage(), Stage::Validate);
        assert_eq!(
            recorder.events().last(),
            Some(&AnalysisEvent::AnalysisFailed {
                analysis_id: Uuid::nil(),
                error_code: "INVALID_INPUT".to_string(),
                stage: Stage::Validate,
            })
        );
    }

    #[test]
    fn test_unsupported_path_fails_ingest() {
        let err = run_analysis(
            AnalysisInput::Path(PathBuf::from("clip.mp3")),
            Role::Guest,
            &EngineConfig::default(),
            &NoopObserver,
            fixed(),
        )
        .unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_INPUT");
        assert_eq!(err.stage(), Stage::Ingest);
    }

    #[test]
    fn test_track_only_has_empty_metrics() {
        let track = TrackInfo {
            duration_seconds: 12.0,
            format: "wav".to_string(),
            sample_rate_hz: 48000,
            channels: 1,
            codec: None,
            container: None,
        };
        let output = run_analysis(
            AnalysisInput::Track(track),
            Role::Guest,
            &EngineConfig::default(),
            &NoopObserver,
            fixed(),
        )
        .unwrap();
        let value = output.to_value().unwrap();
        assert_eq!(value["metrics"], serde_json::json!({}));
        assert_eq!(value["events"], serde_json::json!({}));
    }

    #[test]
    fn test_duration_limit() {
        let config = EngineConfig {
            max_audio_seconds: Some(10.0),
            ..Default::default()
        };
        let err = analyze_report(
            hinted(30.0, AnalysisHints::default()),
            &config,
            &NoopObserver,
            fixed(),
        )
        .unwrap_err();
        assert_eq!(err.stage(), Stage::Validate);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "panic: boom");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "panic");
    }
}
