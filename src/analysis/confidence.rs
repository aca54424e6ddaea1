//! Confidence scoring module
//!
//! Maps evidence (clip duration, score gap, stability) onto the three-level
//! confidence scale. Each tier has three independent minimums and all three
//! must clear for that tier.
//!
//! # Example
//!
//! ```
//! use bnk_analysis_engine::analysis::confidence::confidence_level;
//! use bnk_analysis_engine::analysis::result::Confidence;
//! use bnk_analysis_engine::config::Tunables;
//!
//! let tiers = Tunables::default().bpm_tiers;
//! assert_eq!(confidence_level(60.0, 0.5, 1.0, &tiers), Confidence::High);
//! assert_eq!(confidence_level(3.0, 0.5, 1.0, &tiers), Confidence::Low);
//! ```

use super::result::Confidence;
use crate::config::{ConfidenceTiers, TierThresholds};
use crate::features::period::candidate_filter::ScoredTempo;
use crate::features::period::family::family_closure;

fn clears(tier: &TierThresholds, duration_seconds: f64, gap: f64, stability: f64) -> bool {
    duration_seconds >= tier.min_duration_seconds
        && gap >= tier.min_gap
        && stability >= tier.min_stability
}

/// Confidence level from duration, gap and stability
///
/// # Arguments
///
/// * `duration_seconds` - Clip duration
/// * `gap` - Score gap between the top candidate and its best competitor
/// * `stability` - Support fraction of the top candidate
/// * `tiers` - High and medium thresholds
///
/// # Returns
///
/// `High` when every high minimum clears, else `Medium` when every medium
/// minimum clears, else `Low`
pub fn confidence_level(
    duration_seconds: f64,
    gap: f64,
    stability: f64,
    tiers: &ConfidenceTiers,
) -> Confidence {
    if clears(&tiers.high, duration_seconds, gap, stability) {
        Confidence::High
    } else if clears(&tiers.medium, duration_seconds, gap, stability) {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

/// Score gap between the top tempo and the best tempo outside its family
///
/// The family is the transitive closure of ±tolerance, ×3/2 and ×2/3 links
/// starting from the top candidate (see [`family_closure`]), not a pairwise
/// check against the top: after a dotted promotion the integer neighbours of
/// the triplet member stay in the family. Half and double are not family, so
/// an octave competitor lowers the gap. When every candidate is family the gap
/// is the full top score.
pub fn tempo_gap(scored: &[ScoredTempo], tolerance: f64) -> f64 {
    let Some(top) = scored.first() else {
        return 0.0;
    };
    let bpms: Vec<f64> = scored.iter().map(|s| s.bpm as f64).collect();
    let family = family_closure(&bpms, 0, tolerance);
    let best_outside = scored
        .iter()
        .zip(family.iter())
        .filter(|(_, &member)| !member)
        .map(|(s, _)| s.score)
        .fold(None, |best: Option<f64>, score| {
            Some(best.map_or(score, |b| b.max(score)))
        });
    top.score - best_outside.unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tunables;

    fn scored(bpm: u32, score: f64) -> ScoredTempo {
        ScoredTempo {
            bpm,
            score,
            direct_support: 0.0,
            support: 0.0,
        }
    }

    #[test]
    fn test_tiers_require_all_three() {
        let tiers = Tunables::default().bpm_tiers;
        assert_eq!(confidence_level(60.0, 0.20, 0.75, &tiers), Confidence::High);
        assert_eq!(confidence_level(60.0, 0.19, 0.75, &tiers), Confidence::Medium);
        assert_eq!(confidence_level(5.0, 0.50, 1.0, &tiers), Confidence::Medium);
        assert_eq!(confidence_level(60.0, 0.50, 0.59, &tiers), Confidence::Low);
        assert_eq!(confidence_level(3.9, 0.50, 1.0, &tiers), Confidence::Low);
    }

    #[test]
    fn test_gap_excludes_dotted_family() {
        let list = vec![scored(154, 0.9), scored(102, 0.8), scored(120, 0.3)];
        assert!((tempo_gap(&list, 1.0) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_gap_counts_octave_competitor() {
        let list = vec![scored(70, 0.6), scored(140, 0.5)];
        assert!((tempo_gap(&list, 1.0) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_gap_keeps_triplet_neighbours_in_family() {
        let list = vec![
            scored(154, 0.58),
            scored(102, 0.62),
            scored(101, 0.59),
            scored(104, 0.1),
            scored(140, 0.3),
        ];
        assert!((tempo_gap(&list, 1.0) - 0.28).abs() < 1e-12);
    }

    #[test]
    fn test_gap_without_competitor() {
        let list = vec![scored(120, 0.95), scored(121, 0.9)];
        assert!((tempo_gap(&list, 1.0) - 0.95).abs() < 1e-12);
        assert_eq!(tempo_gap(&[], 1.0), 0.0);
    }
}
