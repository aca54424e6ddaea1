//! Tempo family relations
//!
//! Two tempos are in the same *family* when they agree within tolerance or one
//! is the 3/2 (dotted) or 2/3 (triplet) multiple of the other. Half and double
//! are deliberately not family: that ambiguity must lower confidence.
//! The *extended* family used by the reportable policy also admits ×2 and ÷2.

use serde::{Deserialize, Serialize};

/// Relation of a candidate tempo to a reference tempo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TempoFamily {
    /// Same tempo (within tolerance)
    Base,
    /// Twice the reference
    Double,
    /// Half the reference
    Half,
    /// Two thirds of the reference
    Triplet,
    /// Three halves of the reference
    Dotted,
    /// None of the above
    Unrelated,
}

impl TempoFamily {
    /// Classify `bpm` relative to `reference`
    ///
    /// A non-positive reference carries no relation, so everything is `Unrelated`.
    pub fn classify(bpm: f64, reference: f64, tolerance: f64) -> Self {
        if reference <= 0.0 {
            return TempoFamily::Unrelated;
        }
        if (bpm - reference).abs() <= tolerance {
            return TempoFamily::Base;
        }
        if (bpm - reference * 2.0).abs() <= tolerance {
            TempoFamily::Double
        } else if (bpm - reference / 2.0).abs() <= tolerance {
            TempoFamily::Half
        } else if (bpm - reference * 1.5).abs() <= tolerance {
            TempoFamily::Dotted
        } else if (bpm - reference * 2.0 / 3.0).abs() <= tolerance {
            TempoFamily::Triplet
        } else {
            TempoFamily::Unrelated
        }
    }
}

/// Same family: within tolerance, or related by 3/2 or 2/3
pub fn same_family(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
        || (a - b * 1.5).abs() <= tolerance
        || (a - b * 2.0 / 3.0).abs() <= tolerance
}

/// Extended family: [`same_family`] plus double and half
pub fn extended_family(a: f64, b: f64, tolerance: f64) -> bool {
    same_family(a, b, tolerance)
        || (a - b * 2.0).abs() <= tolerance
        || (a - b / 2.0).abs() <= tolerance
}

/// Indices of `bpms` reachable from `seed` through [`same_family`] links
///
/// Membership is transitive: a neighbour of a dotted or triplet member joins
/// even when it is outside tolerance of `seed` itself. Half and double links
/// are never followed. Returns a membership mask aligned with `bpms`.
pub fn family_closure(bpms: &[f64], seed: usize, tolerance: f64) -> Vec<bool> {
    let mut member = vec![false; bpms.len()];
    if seed >= bpms.len() {
        return member;
    }
    member[seed] = true;
    let mut stack = vec![seed];
    while let Some(current) = stack.pop() {
        for (i, &bpm) in bpms.iter().enumerate() {
            if member[i] {
                continue;
            }
            let a = bpms[current];
            if same_family(a, bpm, tolerance) || same_family(bpm, a, tolerance) {
                member[i] = true;
                stack.push(i);
            }
        }
    }
    member
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(TempoFamily::classify(140.0, 70.0, 1.0), TempoFamily::Double);
        assert_eq!(TempoFamily::classify(35.0, 70.0, 1.0), TempoFamily::Half);
        assert_eq!(TempoFamily::classify(153.0, 102.0, 1.0), TempoFamily::Dotted);
        assert_eq!(TempoFamily::classify(102.0, 154.0, 1.0), TempoFamily::Triplet);
        assert_eq!(TempoFamily::classify(71.0, 70.0, 1.0), TempoFamily::Base);
        assert_eq!(TempoFamily::classify(130.0, 70.0, 1.0), TempoFamily::Unrelated);
        assert_eq!(TempoFamily::classify(120.0, 0.0, 1.0), TempoFamily::Unrelated);
    }

    #[test]
    fn test_unrelated_serializes_distinctly() {
        assert_eq!(
            serde_json::to_value(TempoFamily::Unrelated).unwrap(),
            serde_json::json!("unrelated")
        );
        assert_ne!(
            TempoFamily::classify(130.0, 70.0, 1.0),
            TempoFamily::classify(70.5, 70.0, 1.0)
        );
    }

    #[test]
    fn test_half_double_is_not_family() {
        assert!(!same_family(140.0, 70.0, 1.0));
        assert!(!same_family(70.0, 140.0, 1.0));
        assert!(extended_family(140.0, 70.0, 1.0));
        assert!(same_family(153.0, 102.0, 1.0));
        assert!(same_family(102.0, 153.0, 1.0));
    }

    #[test]
    fn test_closure_is_transitive() {
        let bpms = [120.0, 121.0, 122.0, 60.0, 80.0];
        let member = family_closure(&bpms, 0, 1.0);
        assert_eq!(member, vec![true, true, true, false, true]);
    }

    #[test]
    fn test_closure_stops_at_octaves() {
        let bpms = [70.0, 105.0, 140.0, 158.0];
        let member = family_closure(&bpms, 0, 1.0);
        assert_eq!(member, vec![true, true, false, true]);
    }
}
