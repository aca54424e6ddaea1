//! Multiband sanity checks
//!
//! The low and high bands estimate tempo independently. When they disagree,
//! when either band carries a strong unrelated runner-up, or when most windows
//! show strong half-lag correlation, the tempo is too ambiguous to report.

use super::candidate_filter::fold_into_range;
use super::family::same_family;
use super::WindowTempoHint;
use crate::config::Tunables;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Reason a multiband check forced low confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultibandFinding {
    /// Both bands have stable modes in different tempo families
    Disagreement,
    /// A band has a heavy runner-up outside its mode's family
    RunnerUp,
    /// Most windows show strong double-tempo correlation
    HalfDoubleAmbiguity,
}

/// Weighted tempo histogram of one band
#[derive(Debug, Clone, PartialEq)]
pub struct BandHistogram {
    /// `(bpm, weight)` bins, weights summing to 1, ordered by weight desc then bpm asc
    pub bins: Vec<(i64, f64)>,
}

impl BandHistogram {
    /// Build from `(bpm, score)` pairs; tempos are folded and rounded first
    ///
    /// Scores are the weights. When every score is zero the bins are weighted
    /// by count instead.
    pub fn build(pairs: impl IntoIterator<Item = (f64, f64)>, tunables: &Tunables) -> Self {
        let mut sums: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
        for (bpm, score) in pairs {
            let folded = fold_into_range(
                bpm,
                tunables.bpm_min,
                tunables.bpm_max,
                tunables.bpm_fold_max_iterations,
            );
            if folded <= 0.0 || !folded.is_finite() {
                continue;
            }
            let entry = sums.entry(folded.round() as i64).or_insert((0.0, 0));
            entry.0 += score.max(0.0);
            entry.1 += 1;
        }

        let total_score: f64 = sums.values().map(|(s, _)| s).sum();
        let total_count: usize = sums.values().map(|(_, c)| c).sum();
        let mut bins: Vec<(i64, f64)> = sums
            .into_iter()
            .map(|(bpm, (score, count))| {
                let weight = if total_score > 0.0 {
                    score / total_score
                } else {
                    count as f64 / total_count.max(1) as f64
                };
                (bpm, weight)
            })
            .collect();
        bins.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        Self { bins }
    }

    /// Highest-weight bin
    pub fn mode(&self) -> Option<(i64, f64)> {
        self.bins.first().copied()
    }

    /// Heaviest bin outside the mode's family
    pub fn unrelated_runner_up(&self, tolerance: f64) -> Option<(i64, f64)> {
        let (mode, _) = self.mode()?;
        self.bins
            .iter()
            .skip(1)
            .copied()
            .find(|&(bpm, _)| !related(bpm, mode, tolerance))
    }
}

fn related(a: i64, b: i64, tolerance: f64) -> bool {
    same_family(a as f64, b as f64, tolerance) || same_family(b as f64, a as f64, tolerance)
}

/// Run all multiband checks over window records
///
/// # Returns
///
/// Findings in check order (disagreement, runner-up, half/double). Empty when
/// the bands are consistent or no records were given.
pub fn check_multiband(details: &[WindowTempoHint], tunables: &Tunables) -> Vec<MultibandFinding> {
    let mut findings = Vec::new();
    if details.is_empty() {
        return findings;
    }
    let tol = tunables.bpm_tolerance;

    let low = BandHistogram::build(details.iter().map(|d| (d.best_bpm, d.best_score)), tunables);
    let high = BandHistogram::build(
        details
            .iter()
            .filter_map(|d| d.high())
            .map(|h| (h.best_bpm, h.best_score)),
        tunables,
    );

    let stable = |hist: &BandHistogram| {
        hist.mode()
            .filter(|&(_, weight)| weight >= tunables.bpm_multiband_stable_weight)
    };
    if let (Some((low_mode, _)), Some((high_mode, _))) = (stable(&low), stable(&high)) {
        if !related(low_mode, high_mode, tol) {
            log::debug!(
                "Multiband disagreement: low band {} vs high band {}",
                low_mode,
                high_mode
            );
            findings.push(MultibandFinding::Disagreement);
        }
    }

    let strong_runner_up = [&low, &high].iter().any(|hist| {
        hist.unrelated_runner_up(tol)
            .is_some_and(|(_, weight)| weight >= tunables.bpm_multiband_runnerup_weight)
    });
    if strong_runner_up {
        findings.push(MultibandFinding::RunnerUp);
    }

    let ambiguous = details
        .iter()
        .filter(|d| {
            d.double_evidence()
                .any(|(_, ratio)| ratio >= tunables.bpm_half_double_ratio)
        })
        .count();
    if ambiguous as f64 / details.len() as f64 >= tunables.bpm_half_double_fraction {
        findings.push(MultibandFinding::HalfDoubleAmbiguity);
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(low: f64, high: f64) -> WindowTempoHint {
        WindowTempoHint {
            best_bpm: low,
            best_score: 0.9,
            high_best_bpm: Some(high),
            high_best_score: Some(0.9),
            ..WindowTempoHint::default()
        }
    }

    #[test]
    fn test_consistent_bands_pass() {
        let details = vec![detail(120.0, 120.0); 10];
        assert!(check_multiband(&details, &Tunables::default()).is_empty());
    }

    #[test]
    fn test_disagreeing_bands() {
        let details = vec![detail(102.0, 140.0); 12];
        let findings = check_multiband(&details, &Tunables::default());
        assert_eq!(findings, vec![MultibandFinding::Disagreement]);
    }

    #[test]
    fn test_dotted_bands_agree() {
        let details = vec![detail(102.0, 153.0); 12];
        assert!(check_multiband(&details, &Tunables::default()).is_empty());
    }

    #[test]
    fn test_strong_runner_up() {
        let mut details = vec![detail(122.0, 122.0); 25];
        details.extend(vec![detail(92.0, 92.0); 15]);
        let findings = check_multiband(&details, &Tunables::default());
        assert_eq!(findings, vec![MultibandFinding::RunnerUp]);
    }

    #[test]
    fn test_half_double_ambiguity() {
        let mut details = vec![
            WindowTempoHint {
                best_bpm: 85.0,
                best_score: 0.8,
                double_bpm: Some(170.0),
                double_ratio: Some(0.6),
                ..WindowTempoHint::default()
            };
            6
        ];
        details.extend(vec![detail(85.0, 85.0); 4]);
        let findings = check_multiband(&details, &Tunables::default());
        assert_eq!(findings, vec![MultibandFinding::HalfDoubleAmbiguity]);
    }

    #[test]
    fn test_histogram_weights() {
        let hist = BandHistogram::build(
            [(120.0, 0.6), (60.0, 0.2), (240.0, 0.2)],
            &Tunables::default(),
        );
        // 60 stays, 240 folds to 120
        assert_eq!(hist.mode().unwrap().0, 120);
        assert!((hist.mode().unwrap().1 - 0.8).abs() < 1e-12);
    }
}
