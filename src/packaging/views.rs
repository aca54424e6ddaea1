//! Role-specific output views
//!
//! Each role gets a typed projection of the report. Guest views are built
//! from value-and-rank-only types, so confidence, scores, evidence, reason
//! codes and exact tempos cannot appear in them; locked previews are the only
//! free-form JSON and are stripped recursively.

use super::output::{AnalysisReport, Events, LockedMetric};
use super::{strip_guest_keys, Role, ENGINE_NAME, ENGINE_VERSION};
use crate::analysis::result::{
    BpmReasonCode, BpmResult, Confidence, Evidence, KeyCandidateFamily, KeyModeResult,
    KeyReasonCode, Timefeel,
};
use crate::error::{EngineError, Stage};
use crate::features::key::{Mode, PitchClass};
use crate::features::period::family::TempoFamily;
use crate::io::TrackInfo;
use chrono::SecondsFormat;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Method label of the BPM metric
pub const BPM_METHOD: &str = "tempo_candidates_v1";

/// Limits statement of the BPM metric
pub const BPM_LIMITS: &str =
    "v1 is candidate-first and will omit bpm.value when ambiguous or unstable.";

/// Method label of the key/mode metric
pub const KEY_MODE_METHOD: &str = "key_mode_candidates_v1";

/// Limits statement of the key/mode metric
pub const KEY_MODE_LIMITS: &str =
    "v1 is candidate-first and will omit key_mode.value when ambiguous or unstable.";

/// Engine identity block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineInfo {
    /// Engine name
    pub name: &'static str,
    /// Contract version
    pub version: &'static str,
}

/// Rounded tempo, the only tempo number a guest sees
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoundedTempo {
    /// Rounded tempo
    pub value_rounded: u32,
}

/// Guest tempo candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GuestBpmCandidate {
    /// Tempo
    pub value: RoundedTempo,
    /// 1-based rank
    pub rank: u32,
}

/// Guest BPM metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuestBpmView {
    /// Reportable tempo, absent when omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<RoundedTempo>,
    /// Ranked candidates
    pub candidates: Vec<GuestBpmCandidate>,
    /// Method label
    pub method: &'static str,
    /// Limits statement
    pub limits: &'static str,
}

/// Exact and rounded reported tempo
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExactTempo {
    /// Unrounded tempo
    pub value_exact: f64,
    /// Rounded tempo
    pub value_rounded: u32,
}

/// Octave relation of a candidate to the top candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateRelation {
    /// Neither half nor double
    Normal,
    /// Half the top tempo
    Half,
    /// Double the top tempo
    Double,
}

impl From<TempoFamily> for CandidateRelation {
    fn from(family: TempoFamily) -> Self {
        match family {
            TempoFamily::Half => CandidateRelation::Half,
            TempoFamily::Double => CandidateRelation::Double,
            _ => CandidateRelation::Normal,
        }
    }
}

/// Full tempo candidate in the generic precision shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FullBpmCandidate {
    /// Tempo
    pub value: RoundedTempo,
    /// 1-based rank
    pub rank: u32,
    /// Score rounded to 4 decimals
    pub score: f64,
    /// Octave relation to the top candidate
    pub relation: CandidateRelation,
}

/// Tempo family breakdown entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BpmFamilyCandidate {
    /// Tempo
    pub candidate_bpm: u32,
    /// Family relative to the top candidate
    pub candidate_family: TempoFamily,
    /// Score rounded to 4 decimals
    pub candidate_score: f64,
    /// Ratio to the top candidate
    pub relation_to_base: f64,
}

/// Full BPM metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullBpmView {
    /// Reported confidence
    pub confidence: Confidence,
    /// Reported tempo, absent when omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ExactTempo>,
    /// Ranked candidates
    pub candidates: Vec<FullBpmCandidate>,
    /// Method label
    pub method: &'static str,
    /// Limits statement
    pub limits: &'static str,
    /// Raw grid tempo
    pub bpm_raw: f64,
    /// Raw confidence
    pub bpm_raw_confidence: Confidence,
    /// Reportable tempo
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm_reportable: Option<u32>,
    /// Reportable confidence
    pub bpm_reportable_confidence: Confidence,
    /// Relation of reportable to raw
    pub timefeel: Timefeel,
    /// Ordered decision trail
    pub bpm_reason_codes: Vec<BpmReasonCode>,
    /// Family breakdown of the candidates
    pub bpm_candidates: Vec<BpmFamilyCandidate>,
    /// Gap and stability
    pub evidence: Evidence,
}

/// Guest key/mode metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuestKeyModeView {
    /// Tonic, absent when omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<PitchClass>,
    /// Mode, absent when omitted or withheld
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    /// Method label
    pub method: &'static str,
    /// Limits statement
    pub limits: &'static str,
}

/// Full key/mode candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullKeyCandidate {
    /// Label such as `"F# minor"`, or the tonic alone
    pub value: String,
    /// Tonic
    pub key: PitchClass,
    /// Mode, absent for tonic-level candidates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    /// 1-based rank
    pub rank: u32,
    /// Score rounded to 4 decimals
    pub score: f64,
    /// Aggregation level
    pub family: KeyCandidateFamily,
}

/// Full key/mode metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullKeyModeView {
    /// Tonic, absent when omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<PitchClass>,
    /// Mode, absent when omitted or withheld
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    /// Reported confidence
    pub confidence: Confidence,
    /// Ranked candidates
    pub candidates: Vec<FullKeyCandidate>,
    /// Canonical reason codes
    pub reason_codes: Vec<KeyReasonCode>,
    /// Gap and stability
    pub evidence: Evidence,
    /// Method label
    pub method: &'static str,
    /// Limits statement
    pub limits: &'static str,
}

/// BPM metric as seen by a role
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BpmView {
    /// Guest projection
    Guest(GuestBpmView),
    /// Free/pro projection
    Full(Box<FullBpmView>),
}

/// Key/mode metric as seen by a role
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KeyModeView {
    /// Guest projection
    Guest(GuestKeyModeView),
    /// Free/pro projection
    Full(FullKeyModeView),
}

/// Metrics map of a role view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsView {
    /// BPM, absent when omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm: Option<BpmView>,
    /// Key/mode, absent when omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_mode: Option<KeyModeView>,
    /// Locked metrics by name
    #[serde(flatten)]
    pub locked: BTreeMap<String, LockedMetric>,
}

/// Events hidden from guests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NoEvents {}

/// Events as seen by a role
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventsView {
    /// Guests always get `{}`
    Hidden(NoEvents),
    /// Categorized events
    Categorized(Events),
}

/// Role-projected output envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackagedOutput {
    /// Engine identity
    pub engine: EngineInfo,
    /// Analysis identifier
    pub analysis_id: Uuid,
    /// RFC 3339 creation time (UTC, whole seconds)
    pub created_at: String,
    /// Caller role
    pub role: Role,
    /// Track metadata
    pub track: TrackInfo,
    /// Metrics
    pub metrics: MetricsView,
    /// Events
    pub events: EventsView,
    /// Non-fatal warnings
    pub warnings: Vec<String>,
}

impl PackagedOutput {
    /// Serialize to a JSON value
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Internal` (stage `packaging`) if serialization fails.
    pub fn to_value(&self) -> Result<Value, EngineError> {
        serde_json::to_value(self).map_err(|e| EngineError::internal(Stage::Packaging, e.to_string()))
    }

    /// Serialize to a pretty-printed JSON string
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Internal` (stage `packaging`) if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::internal(Stage::Packaging, e.to_string()))
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

fn key_label(key: PitchClass, mode: Option<Mode>) -> String {
    match mode {
        Some(mode) => format!("{} {}", key, mode),
        None => key.to_string(),
    }
}

fn guest_bpm(bpm: &BpmResult) -> GuestBpmView {
    GuestBpmView {
        value: bpm.value.map(|v| RoundedTempo {
            value_rounded: v.value_rounded,
        }),
        candidates: bpm
            .candidates
            .iter()
            .map(|c| GuestBpmCandidate {
                value: RoundedTempo { value_rounded: c.bpm },
                rank: c.rank,
            })
            .collect(),
        method: BPM_METHOD,
        limits: BPM_LIMITS,
    }
}

fn full_bpm(bpm: &BpmResult) -> FullBpmView {
    FullBpmView {
        confidence: bpm.confidence,
        value: bpm.value.map(|v| ExactTempo {
            value_exact: v.value_exact,
            value_rounded: v.value_rounded,
        }),
        candidates: bpm
            .candidates
            .iter()
            .map(|c| FullBpmCandidate {
                value: RoundedTempo { value_rounded: c.bpm },
                rank: c.rank,
                score: round4(c.score),
                relation: c.family.into(),
            })
            .collect(),
        method: BPM_METHOD,
        limits: BPM_LIMITS,
        bpm_raw: bpm.bpm_raw,
        bpm_raw_confidence: bpm.bpm_raw_confidence,
        bpm_reportable: bpm.bpm_reportable,
        bpm_reportable_confidence: bpm.bpm_reportable_confidence,
        timefeel: bpm.timefeel,
        bpm_reason_codes: bpm.reason_codes.clone(),
        bpm_candidates: bpm
            .candidates
            .iter()
            .map(|c| BpmFamilyCandidate {
                candidate_bpm: c.bpm,
                candidate_family: c.family,
                candidate_score: round4(c.score),
                relation_to_base: round4(c.relation_to_base),
            })
            .collect(),
        evidence: bpm.evidence,
    }
}

fn guest_key_mode(key: &KeyModeResult) -> GuestKeyModeView {
    GuestKeyModeView {
        value: key.value,
        mode: key.mode,
        method: KEY_MODE_METHOD,
        limits: KEY_MODE_LIMITS,
    }
}

fn full_key_mode(key: &KeyModeResult) -> FullKeyModeView {
    FullKeyModeView {
        value: key.value,
        mode: key.mode,
        confidence: key.confidence,
        candidates: key
            .candidates
            .iter()
            .map(|c| FullKeyCandidate {
                value: key_label(c.key, c.mode),
                key: c.key,
                mode: c.mode,
                rank: c.rank,
                score: round4(c.score),
                family: c.family,
            })
            .collect(),
        reason_codes: key.reason_codes.clone(),
        evidence: key.evidence,
        method: KEY_MODE_METHOD,
        limits: KEY_MODE_LIMITS,
    }
}

/// Project a report into the view for `role`
///
/// The report is not modified.
///
/// # Arguments
///
/// * `report` - Full-detail report
/// * `role` - Caller tier
///
/// # Returns
///
/// Guests get value-and-rank-only metrics, stripped locked previews and empty
/// events. Free and pro callers get every field and all four event categories.
pub fn package(report: &AnalysisReport, role: Role) -> PackagedOutput {
    let guest = role == Role::Guest;

    let bpm = report.bpm.as_ref().map(|b| {
        if guest {
            BpmView::Guest(guest_bpm(b))
        } else {
            BpmView::Full(Box::new(full_bpm(b)))
        }
    });
    let key_mode = report.key_mode.as_ref().map(|k| {
        if guest {
            KeyModeView::Guest(guest_key_mode(k))
        } else {
            KeyModeView::Full(full_key_mode(k))
        }
    });
    let locked = report
        .locked
        .iter()
        .map(|(name, metric)| {
            let metric = if guest {
                metric.map_preview(strip_guest_keys)
            } else {
                metric.clone()
            };
            (name.clone(), metric)
        })
        .collect();

    PackagedOutput {
        engine: EngineInfo {
            name: ENGINE_NAME,
            version: ENGINE_VERSION,
        },
        analysis_id: report.analysis_id,
        created_at: report.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        role,
        track: report.track.clone(),
        metrics: MetricsView {
            bpm,
            key_mode,
            locked,
        },
        events: if guest {
            EventsView::Hidden(NoEvents {})
        } else {
            EventsView::Categorized(report.events.clone())
        },
        warnings: report.warnings.clone(),
    }
}
