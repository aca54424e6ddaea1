//! Raw to reportable tempo policy
//!
//! The raw tempo is the grid periodicity found in the signal. The reportable
//! tempo is what a listener would label the track with: usually the raw tempo,
//! sometimes its double. Doubling is only considered for slow, stable raw
//! tempos whose double lands in the reportable band, and only taken when
//! something directly supports the doubled tempo. A strong unrelated
//! runner-up forces omission.

use super::result::{BpmReasonCode, Confidence, Timefeel};
use crate::config::Tunables;
use crate::features::period::candidate_filter::ScoredTempo;
use crate::features::period::family::extended_family;

/// Distance (BPM) within which a scored candidate backs the doubled value
const EMIT_WITHIN_BPM: f64 = 1.0;

/// Inputs of the reportable policy
#[derive(Debug, Clone, Copy)]
pub struct RawTempo<'a> {
    /// Raw tempo (mean of supporting windows)
    pub exact: f64,
    /// Raw tempo rounded
    pub rounded: u32,
    /// Confidence of the raw tempo
    pub confidence: Confidence,
    /// Support fraction of the top candidate
    pub stability: f64,
    /// Ranked candidates, top first
    pub candidates: &'a [ScoredTempo],
    /// Fraction of window records carrying double-tempo evidence at 2×raw
    pub double_window_support: f64,
}

/// Outcome of the reportable policy
#[derive(Debug, Clone, PartialEq)]
pub struct ReportableDecision {
    /// Reportable tempo, `None` when omitted
    pub bpm: Option<u32>,
    /// Confidence of the reportable tempo
    pub confidence: Confidence,
    /// Relation of reportable to raw
    pub timefeel: Timefeel,
    /// Ordered decision trail
    pub reason_codes: Vec<BpmReasonCode>,
}

impl ReportableDecision {
    fn omitted(reason_codes: Vec<BpmReasonCode>) -> Self {
        Self {
            bpm: None,
            confidence: Confidence::Low,
            timefeel: Timefeel::Unknown,
            reason_codes,
        }
    }

    fn raw(raw: &RawTempo<'_>, reason_codes: Vec<BpmReasonCode>) -> Self {
        Self {
            bpm: Some(raw.rounded),
            confidence: raw.confidence,
            timefeel: Timefeel::Normal,
            reason_codes,
        }
    }

    /// Whether the reportable tempo is the doubled raw tempo
    pub fn is_doubled(&self) -> bool {
        self.timefeel == Timefeel::DoubleTimePreferred
    }
}

/// Choose the reportable tempo
///
/// Pure function of the raw tempo, its confidence and stability, and the
/// scored candidates.
///
/// # Arguments
///
/// * `raw` - Raw tempo and its evidence
/// * `tunables` - Policy thresholds
///
/// # Returns
///
/// The reportable tempo (raw, doubled, or omitted) with its confidence,
/// timefeel and ordered reason codes
pub fn select_reportable(raw: &RawTempo<'_>, tunables: &Tunables) -> ReportableDecision {
    use BpmReasonCode::*;

    if raw.confidence == Confidence::Low {
        return ReportableDecision::omitted(vec![OmittedLowConfidence]);
    }
    if raw.exact > tunables.bpm_raw_max {
        return ReportableDecision::raw(raw, vec![PreferRaw, CappedByRawMax]);
    }
    if raw.stability < tunables.bpm_raw_min_stability {
        return ReportableDecision::raw(raw, vec![PreferRaw, RawStabilityBelowMin]);
    }

    let doubled = raw.rounded * 2;
    let doubled_f = doubled as f64;
    if doubled_f < tunables.bpm_reportable_min || doubled_f > tunables.bpm_reportable_max {
        return ReportableDecision::raw(raw, vec![PreferRaw, CappedByReportableRange]);
    }

    let tol = tunables.bpm_tolerance;
    let double_score = raw
        .candidates
        .iter()
        .filter(|c| (c.bpm as f64 - doubled_f).abs() <= tol)
        .map(|c| c.score)
        .fold(0.0_f64, f64::max);
    let has_direct = raw.double_window_support > 0.0
        || double_score >= tunables.bpm_reportable_direct_double_min_score;
    let direct_code = if has_direct {
        HasDirectDoubleEvidence
    } else {
        NoDirectDoubleEvidence
    };

    let top_score = raw.candidates.first().map_or(0.0, |c| c.score);
    let runner_up = raw
        .candidates
        .iter()
        .find(|c| !extended_family(c.bpm as f64, raw.rounded as f64, tol));
    if let Some(runner_up) = runner_up {
        if runner_up.score > 0.0
            && runner_up.score >= tunables.bpm_reportable_runnerup_ratio * top_score
        {
            log::debug!(
                "Omitting reportable tempo: runner-up {} ({:.4}) against raw {} ({:.4})",
                runner_up.bpm,
                runner_up.score,
                raw.rounded,
                top_score
            );
            return ReportableDecision::omitted(vec![
                OmittedAmbiguousRunnerup,
                OmittedLowConfidence,
                direct_code,
            ]);
        }
    }

    if !has_direct {
        return ReportableDecision::raw(raw, vec![NoDirectDoubleEvidence, PreferRaw]);
    }

    let mut reason_codes = vec![PreferDoubleTimeFromRaw, HasDirectDoubleEvidence];
    if raw
        .candidates
        .iter()
        .any(|c| (c.bpm as f64 - doubled_f).abs() <= EMIT_WITHIN_BPM)
    {
        reason_codes.push(PreferEmitWithin1);
    }

    let mut confidence = raw.confidence;
    if double_score <= 0.0 {
        confidence = confidence.cap(Confidence::Medium);
        reason_codes.push(CappedConfidenceNoDirectScore);
    }

    ReportableDecision {
        bpm: Some(doubled),
        confidence,
        timefeel: Timefeel::DoubleTimePreferred,
        reason_codes,
    }
}
