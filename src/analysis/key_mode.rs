//! Key/mode candidate engine
//!
//! Aggregates per-window votes at (tonic, mode) and tonic granularity and
//! decides whether to emit tonic and mode, tonic only, or nothing.

use super::confidence::confidence_level;
use super::result::{
    Confidence, Evidence, KeyCandidate, KeyCandidateFamily, KeyModeResult, KeyReasonCode,
};
use crate::config::Tunables;
use crate::features::key::aggregate::top_gap;
use crate::features::key::{aggregate_pairs, aggregate_tonics, parse_votes, KeyModeVote};

/// Collect votes from the available sources
///
/// Window labels take precedence; a single exact label is repeated as a
/// stand-in for windows. Unparseable labels are skipped.
pub fn assemble_votes<S: AsRef<str>>(
    hint_windows: &[S],
    exact_hint: Option<&str>,
    duration_seconds: f64,
    tunables: &Tunables,
) -> Vec<KeyModeVote> {
    if !hint_windows.is_empty() {
        return parse_votes(hint_windows);
    }
    match exact_hint {
        Some(label) => {
            let repeats = tunables.exact_hint_repeats_for(duration_seconds);
            parse_votes(&vec![label; repeats])
        }
        None => Vec::new(),
    }
}

fn pair_candidates(votes: &[KeyModeVote], top_n: usize) -> Vec<KeyCandidate> {
    aggregate_pairs(votes)
        .iter()
        .take(top_n)
        .enumerate()
        .map(|(i, e)| KeyCandidate {
            key: e.item.tonic,
            mode: Some(e.item.mode),
            score: e.score,
            family: KeyCandidateFamily::Direct,
            rank: i as u32 + 1,
        })
        .collect()
}

fn tonic_candidates(votes: &[KeyModeVote], top_n: usize) -> Vec<KeyCandidate> {
    aggregate_tonics(votes)
        .iter()
        .take(top_n)
        .enumerate()
        .map(|(i, e)| KeyCandidate {
            key: e.item,
            mode: None,
            score: e.score,
            family: KeyCandidateFamily::KeyAggregate,
            rank: i as u32 + 1,
        })
        .collect()
}

/// Estimate key and mode from votes
///
/// # Arguments
///
/// * `votes` - Parsed per-window votes
/// * `duration_seconds` - Clip duration
/// * `tunables` - Engine thresholds
///
/// # Returns
///
/// `None` when there are no votes; otherwise the key/mode result with reason
/// codes in canonical order
pub fn estimate_key_mode(
    votes: &[KeyModeVote],
    duration_seconds: f64,
    tunables: &Tunables,
) -> Option<KeyModeResult> {
    let tiers = &tunables.key_tiers;
    let top_n = tunables.key_top_n;

    let pairs = aggregate_pairs(votes);
    let tonics = aggregate_tonics(votes);
    let top_pair = pairs.first()?;
    let top_tonic = tonics.first()?;

    let tonic_gap = top_gap(&tonics);
    let tonic_stability = top_tonic.score;
    let pair_gap = top_gap(&pairs);
    let pair_stability = top_pair.score;

    let tonic_confidence = confidence_level(duration_seconds, tonic_gap, tonic_stability, tiers);
    let pair_confidence = confidence_level(duration_seconds, pair_gap, pair_stability, tiers);
    log::debug!(
        "Key votes: {}, tonic {} ({:?}, gap {:.3}), pair {} {} ({:?}, gap {:.3})",
        votes.len(),
        top_tonic.item,
        tonic_confidence,
        tonic_gap,
        top_pair.item.tonic,
        top_pair.item.mode,
        pair_confidence,
        pair_gap
    );

    let evidence = Evidence {
        score_gap: tonic_gap,
        stability: tonic_stability,
        windows: votes.len(),
    };

    let weak_but_consistent = duration_seconds < tiers.medium.min_duration_seconds
        && duration_seconds >= tunables.key_weak_min_duration_seconds
        && votes.len() >= tunables.key_weak_min_windows
        && tonic_stability >= tunables.key_weak_min_stability;

    let mut reason_codes = Vec::new();
    let mut result = if tonic_confidence != Confidence::Low && pair_confidence != Confidence::Low {
        reason_codes.push(KeyReasonCode::EmitConfident);
        KeyModeResult {
            value: Some(top_pair.item.tonic),
            mode: Some(top_pair.item.mode),
            confidence: tonic_confidence.min(pair_confidence),
            reason_codes,
            candidates: pair_candidates(votes, top_n),
            evidence,
        }
    } else if tonic_confidence != Confidence::Low {
        reason_codes.push(KeyReasonCode::ModeWithheldInsufficientEvidence);
        KeyModeResult {
            value: Some(top_tonic.item),
            mode: None,
            confidence: tonic_confidence,
            reason_codes,
            candidates: tonic_candidates(votes, top_n),
            evidence,
        }
    } else if weak_but_consistent {
        reason_codes.push(KeyReasonCode::EmitConsistentWeakEvidence);
        let mode_consistent = pair_stability >= tunables.key_weak_min_stability;
        if !mode_consistent {
            reason_codes.push(KeyReasonCode::ModeWithheldInsufficientEvidence);
        }
        KeyModeResult {
            value: Some(top_tonic.item),
            mode: mode_consistent.then_some(top_pair.item.mode),
            confidence: Confidence::Medium,
            reason_codes,
            candidates: if mode_consistent {
                pair_candidates(votes, top_n)
            } else {
                tonic_candidates(votes, top_n)
            },
            evidence,
        }
    } else {
        if tonics.len() > 1 && tonic_gap < tiers.medium.min_gap {
            reason_codes.push(KeyReasonCode::OmittedAmbiguousRunnerup);
        }
        reason_codes.push(KeyReasonCode::OmittedLowConfidence);
        KeyModeResult {
            value: None,
            mode: None,
            confidence: Confidence::Low,
            reason_codes,
            candidates: pair_candidates(votes, top_n),
            evidence,
        }
    };

    result.reason_codes.sort();
    result.reason_codes.dedup();
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::key::{Mode, PitchClass};
    use KeyReasonCode::*;

    fn run(labels: &[&str], duration: f64) -> Option<KeyModeResult> {
        let t = Tunables::default();
        let votes = assemble_votes(labels, None, duration, &t);
        estimate_key_mode(&votes, duration, &t)
    }

    #[test]
    fn test_unanimous_key_is_confident() {
        let r = run(&["F# minor"; 8], 60.0).unwrap();
        assert_eq!(r.value, Some(PitchClass::FSharp));
        assert_eq!(r.mode, Some(Mode::Minor));
        assert_eq!(r.confidence, Confidence::High);
        assert_eq!(r.reason_codes, vec![EmitConfident]);
        assert_eq!(r.candidates[0].family, KeyCandidateFamily::Direct);
    }

    #[test]
    fn test_even_split_is_omitted() {
        let mut labels = vec!["C major"; 4];
        labels.extend(vec!["F# minor"; 4]);
        let r = run(&labels, 60.0).unwrap();
        assert_eq!(r.value, None);
        assert_eq!(r.mode, None);
        assert_eq!(r.confidence, Confidence::Low);
        assert_eq!(r.reason_codes, vec![OmittedAmbiguousRunnerup, OmittedLowConfidence]);
        assert_eq!(r.candidates.len(), 2);
        // Ties rank by pitch class
        assert_eq!(r.candidates[0].key, PitchClass::C);
    }

    #[test]
    fn test_mode_withheld_when_pair_is_split() {
        let mut labels = vec!["A minor"; 5];
        labels.extend(vec!["A major"; 5]);
        let r = run(&labels, 60.0).unwrap();
        assert_eq!(r.value, Some(PitchClass::A));
        assert_eq!(r.mode, None);
        assert_eq!(r.reason_codes, vec![ModeWithheldInsufficientEvidence]);
        assert!(r.candidates.iter().all(|c| c.mode.is_none()));
        assert_eq!(r.candidates[0].family, KeyCandidateFamily::KeyAggregate);
    }

    #[test]
    fn test_short_consistent_clip_emits_medium() {
        let r = run(&["Eb minor", "D# min", "Ebm"], 3.0).unwrap();
        assert_eq!(r.value, Some(PitchClass::DSharp));
        assert_eq!(r.mode, Some(Mode::Minor));
        assert_eq!(r.confidence, Confidence::Medium);
        assert_eq!(r.reason_codes, vec![EmitConsistentWeakEvidence]);
    }

    #[test]
    fn test_short_clip_with_split_mode() {
        let r = run(&["G major", "G minor", "G major"], 3.0).unwrap();
        assert_eq!(r.value, Some(PitchClass::G));
        assert_eq!(r.mode, None);
        assert_eq!(
            r.reason_codes,
            vec![ModeWithheldInsufficientEvidence, EmitConsistentWeakEvidence]
        );
    }

    #[test]
    fn test_too_short_is_omitted() {
        let r = run(&["G major"; 3], 1.5).unwrap();
        assert_eq!(r.value, None);
        assert_eq!(r.reason_codes, vec![OmittedLowConfidence]);
        assert_eq!(r.candidates.len(), 1);
    }

    #[test]
    fn test_exact_hint_fallback() {
        let t = Tunables::default();
        let empty: [&str; 0] = [];
        let votes = assemble_votes(&empty, Some("Bb major"), 60.0, &t);
        assert_eq!(votes.len(), 3);
        let r = estimate_key_mode(&votes, 60.0, &t).unwrap();
        assert_eq!(r.value, Some(PitchClass::ASharp));
        assert_eq!(r.mode, Some(Mode::Major));
    }

    #[test]
    fn test_no_votes() {
        assert!(run(&["garbage", "F#"], 60.0).is_none());
        assert!(run(&[], 60.0).is_none());
    }
}
