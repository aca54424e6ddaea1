//! Vote aggregation
//!
//! Counts votes per (tonic, mode) pair and per tonic. Lists are ranked by
//! vote fraction, ties broken by pitch class (C..B) and then mode
//! (major before minor), so identical inputs always rank identically.

use super::{KeyModeVote, PitchClass};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// One ranked aggregation entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedEntry<T> {
    /// The aggregated item
    pub item: T,
    /// Number of votes
    pub count: usize,
    /// Vote fraction (0.0-1.0)
    pub score: f64,
}

fn rank<T: Ord + Copy>(items: impl Iterator<Item = T>) -> Vec<RankedEntry<T>> {
    let mut counts: BTreeMap<T, usize> = BTreeMap::new();
    let mut total = 0usize;
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
        total += 1;
    }
    let mut ranked: Vec<RankedEntry<T>> = counts
        .into_iter()
        .map(|(item, count)| RankedEntry {
            item,
            count,
            score: count as f64 / total.max(1) as f64,
        })
        .collect();
    // Stable sort keeps BTreeMap key order for equal counts
    ranked.sort_by_key(|e| Reverse(e.count));
    ranked
}

/// Rank exact (tonic, mode) pairs
pub fn aggregate_pairs(votes: &[KeyModeVote]) -> Vec<RankedEntry<KeyModeVote>> {
    rank(votes.iter().copied())
}

/// Rank tonics regardless of mode
pub fn aggregate_tonics(votes: &[KeyModeVote]) -> Vec<RankedEntry<PitchClass>> {
    rank(votes.iter().map(|v| v.tonic))
}

/// Score gap between the first two entries (top score when alone)
pub fn top_gap<T>(ranked: &[RankedEntry<T>]) -> f64 {
    match ranked {
        [] => 0.0,
        [only] => only.score,
        [first, second, ..] => first.score - second.score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::key::{parse_votes, Mode};

    #[test]
    fn test_pairs_rank_by_count_then_pitch_then_mode() {
        let votes = parse_votes(&["A major", "F# minor", "F# minor", "A major", "C minor", "C major"]);
        let ranked = aggregate_pairs(&votes);
        let order: Vec<(PitchClass, Mode)> =
            ranked.iter().map(|e| (e.item.tonic, e.item.mode)).collect();
        assert_eq!(
            order,
            vec![
                (PitchClass::FSharp, Mode::Minor),
                (PitchClass::A, Mode::Major),
                (PitchClass::C, Mode::Major),
                (PitchClass::C, Mode::Minor),
            ]
        );
        assert!((ranked[0].score - 2.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_tonics_merge_modes() {
        let votes = parse_votes(&["A major", "A minor", "A minor", "C major"]);
        let ranked = aggregate_tonics(&votes);
        assert_eq!(ranked[0].item, PitchClass::A);
        assert_eq!(ranked[0].count, 3);
        assert!((top_gap(&ranked) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_top_gap_single_entry() {
        let votes = parse_votes(&["F# minor"; 4]);
        assert_eq!(top_gap(&aggregate_pairs(&votes)), 1.0);
        assert_eq!(top_gap::<PitchClass>(&[]), 0.0);
    }
}
