//! BPM candidate engine
//!
//! Runs the candidate-first tempo estimate over window evidence:
//!
//! 1. Fold window tempos into the working range
//! 2. Build and score the candidate set, promote a dotted tempo if warranted
//! 3. Assign raw confidence from gap, stability and duration
//! 4. Force low confidence on multiband inconsistencies
//! 5. Choose the reportable tempo from the raw one
//!
//! Candidates and reason codes are returned even when no value is reported.

use super::confidence::{confidence_level, tempo_gap};
use super::reportable::{select_reportable, RawTempo};
use super::result::{BpmCandidate, BpmReasonCode, BpmResult, BpmValue, Confidence, Evidence};
use crate::config::Tunables;
use crate::features::period::candidate_filter::{
    candidate_set, fold_windows, promote_dotted, rank_candidates, ranked_histogram,
    relations_to,
};
use crate::features::period::multiband::{check_multiband, MultibandFinding};
use crate::features::period::{flatten_window_hints, WindowTempoHint};

/// Progress of one BPM estimate, used for debug logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BpmStage {
    /// No usable window evidence
    NoEvidence,
    /// Windows folded into range
    Folded,
    /// Candidates scored and ranked
    Scored,
    /// Raw confidence assigned
    ConfidenceAssigned,
    /// Reportable policy applied
    PolicySelected,
    /// A reportable value was emitted
    Emitted,
    /// The value was omitted, candidates kept
    Omitted,
}

/// Window evidence consumed by the BPM engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BpmEvidence {
    /// Per-window tempo values
    pub windows: Vec<f64>,
    /// Per-window analyzer records (after score filtering)
    pub details: Vec<WindowTempoHint>,
}

impl BpmEvidence {
    /// Assemble evidence from the available sources
    ///
    /// Precedence: explicit hint windows, then windows flattened from analyzer
    /// records, then an exact hint repeated, else no evidence.
    ///
    /// # Arguments
    ///
    /// * `hint_windows` - Per-window tempo values supplied upstream
    /// * `details` - Per-window analyzer records
    /// * `exact_hint` - A single known tempo
    /// * `duration_seconds` - Clip duration (selects the exact-hint repeat count)
    /// * `tunables` - Engine thresholds
    ///
    /// # Returns
    ///
    /// `None` when no source has evidence
    pub fn assemble(
        hint_windows: &[f64],
        details: &[WindowTempoHint],
        exact_hint: Option<f64>,
        duration_seconds: f64,
        tunables: &Tunables,
    ) -> Option<Self> {
        let details = filter_details(details, tunables.bpm_detail_min_score);

        let windows = if !hint_windows.is_empty() {
            hint_windows.to_vec()
        } else if !details.is_empty() {
            flatten_window_hints(&details, tunables.double_tempo_alpha)
        } else if let Some(exact) = exact_hint {
            vec![exact; tunables.exact_hint_repeats_for(duration_seconds)]
        } else {
            return None;
        };

        Some(Self { windows, details })
    }
}

/// Keep analyzer records whose low band scores at least `min_score`
///
/// High band fields are cleared on kept records whose high band score is
/// below the minimum. When nothing passes, the records are returned
/// unchanged so weak but consistent evidence is not discarded.
pub fn filter_details(details: &[WindowTempoHint], min_score: f64) -> Vec<WindowTempoHint> {
    let kept: Vec<WindowTempoHint> = details
        .iter()
        .filter(|d| d.best_score >= min_score)
        .map(|d| {
            let mut d = *d;
            if d.high_best_score.unwrap_or(0.0) < min_score {
                d.high_best_bpm = None;
                d.high_best_score = None;
                d.high_double_bpm = None;
                d.high_double_ratio = None;
            }
            d
        })
        .collect();

    if kept.is_empty() {
        details.to_vec()
    } else {
        if kept.len() < details.len() {
            log::debug!(
                "Dropped {} of {} window records below score {:.2}",
                details.len() - kept.len(),
                details.len(),
                min_score
            );
        }
        kept
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn multiband_code(finding: MultibandFinding) -> BpmReasonCode {
    match finding {
        MultibandFinding::Disagreement => BpmReasonCode::MultibandDisagreement,
        MultibandFinding::RunnerUp => BpmReasonCode::MultibandRunnerupAmbiguity,
        MultibandFinding::HalfDoubleAmbiguity => BpmReasonCode::HalfDoubleAmbiguity,
    }
}

/// Estimate BPM from window evidence
///
/// # Arguments
///
/// * `evidence` - Window tempos and analyzer records
/// * `duration_seconds` - Clip duration
/// * `tunables` - Engine thresholds
///
/// # Returns
///
/// `None` when no window survives folding; otherwise the full BPM result,
/// whose `value` and `bpm_reportable` are omitted when confidence is low
pub fn estimate_bpm(
    evidence: &BpmEvidence,
    duration_seconds: f64,
    tunables: &Tunables,
) -> Option<BpmResult> {
    let tol = tunables.bpm_tolerance;

    let folded = fold_windows(&evidence.windows, tunables);
    if folded.is_empty() {
        log::debug!("BPM stage {:?}: no usable windows", BpmStage::NoEvidence);
        return None;
    }
    log::debug!("BPM stage {:?}: {} windows", BpmStage::Folded, folded.len());

    let histogram = ranked_histogram(&folded.rounded);
    let base = histogram.first()?.0;
    let observed: Vec<i64> = histogram.iter().map(|&(bpm, _)| bpm).collect();
    let n = tunables.candidate_count();
    let set = candidate_set(&observed, base, tunables.bpm_min, tunables.bpm_max, n);
    let mut scored = rank_candidates(&set, &folded.rounded, tunables, n);

    let mut reason_codes = Vec::new();
    let promoted = promote_dotted(&mut scored, tunables);
    let top = *scored.first()?;
    log::debug!(
        "BPM stage {:?}: base {}, top {} ({:.4}), {} candidates",
        BpmStage::Scored,
        base,
        top.bpm,
        top.score,
        scored.len()
    );

    let gap = tempo_gap(&scored, tol);
    let stability = top.support;
    let mut raw_confidence = confidence_level(duration_seconds, gap, stability, &tunables.bpm_tiers);

    let findings = check_multiband(&evidence.details, tunables);
    if !findings.is_empty() {
        raw_confidence = Confidence::Low;
        reason_codes.extend(findings.iter().map(|&f| multiband_code(f)));
    }
    if promoted {
        reason_codes.push(BpmReasonCode::PromotedDottedFromTripletPeriodicity);
    }
    log::debug!(
        "BPM stage {:?}: gap {:.4}, stability {:.4}, raw confidence {:?}",
        BpmStage::ConfidenceAssigned,
        gap,
        stability,
        raw_confidence
    );

    let supporting: Vec<f64> = folded
        .exact
        .iter()
        .zip(folded.rounded.iter())
        .filter(|(_, &r)| (r as f64 - top.bpm as f64).abs() <= tol)
        .map(|(&x, _)| x)
        .collect();
    let raw_exact = if supporting.is_empty() {
        top.bpm as f64
    } else {
        round2(supporting.iter().sum::<f64>() / supporting.len() as f64)
    };
    let raw_rounded = raw_exact.round() as u32;

    let double_target = 2.0 * raw_rounded as f64;
    let double_window_support = if evidence.details.is_empty() {
        0.0
    } else {
        let supported = evidence
            .details
            .iter()
            .filter(|d| {
                d.double_evidence().any(|(bpm, ratio)| {
                    (bpm - double_target).abs() <= tol && ratio >= tunables.double_tempo_alpha
                })
            })
            .count();
        supported as f64 / evidence.details.len() as f64
    };

    let decision = select_reportable(
        &RawTempo {
            exact: raw_exact,
            rounded: raw_rounded,
            confidence: raw_confidence,
            stability,
            candidates: &scored,
            double_window_support,
        },
        tunables,
    );
    log::debug!(
        "BPM stage {:?}: raw {:.2}, reportable {:?}, timefeel {:?}",
        BpmStage::PolicySelected,
        raw_exact,
        decision.bpm,
        decision.timefeel
    );
    reason_codes.extend(decision.reason_codes.iter().copied());

    let value = decision.bpm.map(|value_rounded| BpmValue {
        value_exact: if decision.is_doubled() {
            round2(raw_exact * 2.0)
        } else {
            raw_exact
        },
        value_rounded,
    });
    log::debug!(
        "BPM stage {:?}",
        if value.is_some() {
            BpmStage::Emitted
        } else {
            BpmStage::Omitted
        }
    );

    let reference = raw_rounded as f64;
    let candidates = scored
        .iter()
        .zip(relations_to(&scored, reference, tol))
        .enumerate()
        .map(|(i, (s, family))| BpmCandidate {
            bpm: s.bpm,
            rank: i as u32 + 1,
            score: s.score,
            family,
            relation_to_base: s.bpm as f64 / reference,
        })
        .collect();

    Some(BpmResult {
        confidence: decision.confidence,
        value,
        bpm_raw: raw_exact,
        bpm_raw_confidence: raw_confidence,
        bpm_reportable: decision.bpm,
        bpm_reportable_confidence: decision.confidence,
        timefeel: decision.timefeel,
        reason_codes,
        candidates,
        evidence: Evidence {
            score_gap: gap,
            stability,
            windows: folded.len(),
        },
    })
}
