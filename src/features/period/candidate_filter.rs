//! BPM candidate generation and scoring
//!
//! Folds window tempos into the working range, builds a candidate set from
//! the folded histogram (plus half/double and nearby padding), scores each
//! candidate against the windows, and applies the dotted-tempo promotion.

use super::family::TempoFamily;
use crate::config::Tunables;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};

/// Scores are compared on a 1e-9 grid so ranking is immune to float noise
const SCORE_QUANTUM: f64 = 1e9;

/// A scored tempo hypothesis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredTempo {
    /// Candidate tempo
    pub bpm: u32,
    /// Combined score (0.0-1.0)
    pub score: f64,
    /// Fraction of windows within tolerance of the candidate
    pub direct_support: f64,
    /// Direct support blended with 2/3-tempo windows
    pub support: f64,
}

impl ScoredTempo {
    fn rank_key(&self) -> (Reverse<i64>, u32) {
        (Reverse((self.score * SCORE_QUANTUM).round() as i64), self.bpm)
    }
}

/// Window tempos after folding
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FoldedWindows {
    /// Folded values
    pub exact: Vec<f64>,
    /// Folded values rounded to integers
    pub rounded: Vec<i64>,
}

impl FoldedWindows {
    /// Number of usable windows
    pub fn len(&self) -> usize {
        self.rounded.len()
    }

    /// Whether no window survived folding
    pub fn is_empty(&self) -> bool {
        self.rounded.is_empty()
    }
}

/// Fold a tempo into `[lo, hi]` by doubling or halving
///
/// Non-positive values are returned unchanged. At most `max_iterations`
/// steps are taken.
pub fn fold_into_range(bpm: f64, lo: f64, hi: f64, max_iterations: u32) -> f64 {
    let mut x = bpm;
    if x <= 0.0 {
        return x;
    }
    for _ in 0..max_iterations {
        if x < lo {
            x *= 2.0;
        } else if x > hi {
            x /= 2.0;
        } else {
            break;
        }
    }
    x
}

/// Fold every window and drop non-positive values
pub fn fold_windows(windows: &[f64], tunables: &Tunables) -> FoldedWindows {
    let mut folded = FoldedWindows::default();
    for &w in windows {
        let x = fold_into_range(
            w,
            tunables.bpm_min,
            tunables.bpm_max,
            tunables.bpm_fold_max_iterations,
        );
        if x > 0.0 && x.is_finite() {
            folded.exact.push(x);
            folded.rounded.push(x.round() as i64);
        }
    }
    folded
}

/// Histogram of rounded tempos ordered by count (desc) then tempo (asc)
pub fn ranked_histogram(rounded: &[i64]) -> Vec<(i64, usize)> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for &w in rounded {
        *counts.entry(w).or_insert(0) += 1;
    }
    let mut ranked: Vec<(i64, usize)> = counts.into_iter().collect();
    ranked.sort_by_key(|&(bpm, count)| (Reverse(count), bpm));
    ranked
}

/// Build the candidate tempo set
///
/// Observed tempos come first, then the base and its double and half, then
/// nearby tempos (±1, ±2, ±3, ±4) until `n` candidates exist. Values outside
/// the range and duplicates are skipped; the list is truncated to `n`.
pub fn candidate_set(observed: &[i64], base: i64, lo: f64, hi: f64, n: usize) -> Vec<u32> {
    let mut out: Vec<u32> = Vec::with_capacity(n + 8);
    let mut seen: HashSet<i64> = HashSet::new();
    let mut push = |v: i64, out: &mut Vec<u32>| {
        if (v as f64) < lo || (v as f64) > hi || v <= 0 || !seen.insert(v) {
            return;
        }
        out.push(v as u32);
    };

    for &v in observed {
        push(v, &mut out);
    }
    push(base, &mut out);
    push(base * 2, &mut out);
    push((base as f64 / 2.0).round() as i64, &mut out);

    for delta in [1, -1, 2, -2, 3, -3, 4, -4] {
        if out.len() >= n {
            break;
        }
        push(base + delta, &mut out);
    }

    out.truncate(n.max(1));
    out
}

/// Score one candidate against the rounded windows
///
/// `score = w_s·support + w_c·closeness` where support is the fraction of
/// windows within tolerance (blended with windows near 2/3 of the candidate
/// when both are present) and closeness is `1 − min(1, mean|c − w| / span)`.
pub fn score_candidate(bpm: u32, rounded: &[i64], tunables: &Tunables) -> ScoredTempo {
    if rounded.is_empty() {
        return ScoredTempo {
            bpm,
            score: 0.0,
            direct_support: 0.0,
            support: 0.0,
        };
    }

    let c = bpm as f64;
    let n = rounded.len() as f64;
    let tol = tunables.bpm_tolerance;

    let direct = rounded.iter().filter(|&&w| (w as f64 - c).abs() <= tol).count() as f64 / n;
    let triplet_target = c * 2.0 / 3.0;
    let triplet = rounded
        .iter()
        .filter(|&&w| (w as f64 - triplet_target).abs() <= tol)
        .count() as f64
        / n;

    let support = if direct > 0.0 && triplet > 0.0 {
        (direct + tunables.bpm_triplet_support_beta * triplet).min(1.0)
    } else {
        direct
    };

    let mean_abs = rounded.iter().map(|&w| (c - w as f64).abs()).sum::<f64>() / n;
    let closeness = 1.0 - (mean_abs / tunables.bpm_closeness_span).min(1.0);

    let score = (tunables.bpm_support_weight * support + tunables.bpm_closeness_weight * closeness)
        .clamp(0.0, 1.0);

    ScoredTempo {
        bpm,
        score,
        direct_support: direct,
        support,
    }
}

/// Score and rank candidates (score desc, tempo asc), keeping at most `n`
pub fn rank_candidates(
    candidates: &[u32],
    rounded: &[i64],
    tunables: &Tunables,
    n: usize,
) -> Vec<ScoredTempo> {
    let mut scored: Vec<ScoredTempo> = candidates
        .iter()
        .map(|&bpm| score_candidate(bpm, rounded, tunables))
        .collect();
    scored.sort_by_key(|s| s.rank_key());
    scored.truncate(n);
    scored
}

/// Promote the 3/2 (dotted) multiple of the top candidate to rank 0
///
/// Applies when that candidate ranks below the top, has at least the minimum
/// direct support, and scores within the allowed delta of the top. Returns
/// whether a promotion happened.
pub fn promote_dotted(scored: &mut Vec<ScoredTempo>, tunables: &Tunables) -> bool {
    let Some(top) = scored.first().copied() else {
        return false;
    };
    let target = top.bpm as f64 * 1.5;
    let tol = tunables.bpm_tolerance;

    let position = scored.iter().skip(1).position(|s| {
        (s.bpm as f64 - target).abs() <= tol
            && s.direct_support >= tunables.bpm_triplet_promotion_min_direct_support
            && s.score >= top.score - tunables.bpm_triplet_promotion_max_score_delta
    });

    match position {
        Some(offset) => {
            let promoted = scored.remove(offset + 1);
            log::debug!(
                "Promoting dotted tempo {} over {} (score {:.4} vs {:.4})",
                promoted.bpm,
                top.bpm,
                promoted.score,
                top.score
            );
            scored.insert(0, promoted);
            true
        }
        None => false,
    }
}

/// Relation of every candidate to a reference tempo
///
/// The reference is the raw tempo, not whichever candidate happens to rank
/// first: an unobserved neighbour can win a scoring tie.
pub fn relations_to(scored: &[ScoredTempo], reference: f64, tolerance: f64) -> Vec<TempoFamily> {
    scored
        .iter()
        .map(|s| TempoFamily::classify(s.bpm as f64, reference, tolerance))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rounded(values: &[f64]) -> Vec<i64> {
        fold_windows(values, &Tunables::default()).rounded
    }

    #[test]
    fn test_fold_into_range() {
        assert_eq!(fold_into_range(35.0, 60.0, 200.0, 16), 70.0);
        assert_eq!(fold_into_range(420.0, 60.0, 200.0, 16), 105.0);
        assert_eq!(fold_into_range(140.0, 60.0, 200.0, 16), 140.0);
        assert_eq!(fold_into_range(-5.0, 60.0, 200.0, 16), -5.0);
        assert_eq!(fold_into_range(1e-30, 60.0, 200.0, 16), 1e-30 * 65536.0);
    }

    #[test]
    fn test_fold_windows_drops_non_positive() {
        let folded = fold_windows(&[0.0, -3.0, 71.4], &Tunables::default());
        assert_eq!(folded.rounded, vec![71]);
        assert_eq!(folded.exact, vec![71.4]);
    }

    #[test]
    fn test_histogram_tie_prefers_smaller() {
        let ranked = ranked_histogram(&[140, 70, 140, 70, 120]);
        assert_eq!(ranked[0], (70, 2));
        assert_eq!(ranked[1], (140, 2));
        assert_eq!(ranked[2], (120, 1));
    }

    #[test]
    fn test_candidate_set_padding() {
        let set = candidate_set(&[120], 120, 60.0, 200.0, 5);
        assert_eq!(set, vec![120, 60, 121, 119, 122]);

        let set = candidate_set(&[70, 140], 70, 60.0, 200.0, 5);
        assert_eq!(set, vec![70, 140, 71, 69, 72]);
    }

    #[test]
    fn test_candidate_set_stays_in_range() {
        let set = candidate_set(&[199], 199, 60.0, 200.0, 5);
        assert!(set.iter().all(|&b| (60..=200).contains(&b)));
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn test_score_exact_match() {
        let t = Tunables::default();
        let s = score_candidate(140, &[140, 140, 140], &t);
        assert!((s.score - 1.0).abs() < 1e-12);
        assert_eq!(s.direct_support, 1.0);
    }

    #[test]
    fn test_score_triplet_blend() {
        let t = Tunables::default();
        let windows = rounded(&[&[102.0; 30][..], &[154.0; 6][..]].concat());
        let s = score_candidate(154, &windows, &t);
        assert!((s.direct_support - 6.0 / 36.0).abs() < 1e-12);
        assert!((s.support - (6.0 / 36.0 + 0.8 * 30.0 / 36.0)).abs() < 1e-12);
    }

    #[test]
    fn test_rank_is_deterministic_on_ties() {
        let t = Tunables::default();
        let windows = rounded(&[70.0, 70.0, 140.0, 140.0]);
        let set = candidate_set(&[70, 140], 70, 60.0, 200.0, 5);
        let scored = rank_candidates(&set, &windows, &t, 5);
        let order: Vec<u32> = scored.iter().map(|s| s.bpm).collect();
        assert_eq!(order, vec![69, 70, 71, 140, 72]);
    }

    #[test]
    fn test_promote_dotted() {
        let t = Tunables::default();
        let windows = rounded(&[&[102.0; 30][..], &[154.0; 6][..]].concat());
        let set = candidate_set(&[102, 154], 102, 60.0, 200.0, 5);
        let mut scored = rank_candidates(&set, &windows, &t, 5);
        assert_eq!(scored[0].bpm, 102);
        assert!(promote_dotted(&mut scored, &t));
        assert_eq!(scored[0].bpm, 154);
        assert_eq!(scored[1].bpm, 102);
    }

    #[test]
    fn test_no_promotion_without_candidate() {
        let t = Tunables::default();
        let windows = rounded(&[120.0; 12]);
        let set = candidate_set(&[120], 120, 60.0, 200.0, 5);
        let mut scored = rank_candidates(&set, &windows, &t, 5);
        assert!(!promote_dotted(&mut scored, &t));
        assert_eq!(scored[0].bpm, 120);
    }

    #[test]
    fn test_relations_follow_reference() {
        let t = Tunables::default();
        let windows = rounded(&[&[69.0; 16][..], &[138.0; 4][..]].concat());
        let set = candidate_set(&[69, 138], 69, 60.0, 200.0, 5);
        let scored = rank_candidates(&set, &windows, &t, 5);
        let relations = relations_to(&scored, 69.0, 1.0);
        for (s, family) in scored.iter().zip(relations.iter()) {
            match s.bpm {
                68..=70 => assert_eq!(*family, TempoFamily::Base),
                138 => assert_eq!(*family, TempoFamily::Double),
                _ => {}
            }
        }
        assert!(scored.iter().any(|s| s.bpm == 138));
        assert!(relations_to(&[], 69.0, 1.0).is_empty());
    }
}
