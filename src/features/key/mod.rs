//! Key/mode evidence
//!
//! Key detection works on per-window key/mode labels:
//! - Vote parsing and enharmonic normalization
//! - Aggregation at (tonic, mode) and tonic granularity

pub mod aggregate;
pub mod vote;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use aggregate::{aggregate_pairs, aggregate_tonics, RankedEntry};
pub use vote::{parse_votes, KeyModeVote};

/// Pitch class in sharp spelling, ordered C..B
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    /// C
    #[serde(rename = "C")]
    C,
    /// C♯ / D♭
    #[serde(rename = "C#")]
    CSharp,
    /// D
    #[serde(rename = "D")]
    D,
    /// D♯ / E♭
    #[serde(rename = "D#")]
    DSharp,
    /// E
    #[serde(rename = "E")]
    E,
    /// F
    #[serde(rename = "F")]
    F,
    /// F♯ / G♭
    #[serde(rename = "F#")]
    FSharp,
    /// G
    #[serde(rename = "G")]
    G,
    /// G♯ / A♭
    #[serde(rename = "G#")]
    GSharp,
    /// A
    #[serde(rename = "A")]
    A,
    /// A♯ / B♭
    #[serde(rename = "A#")]
    ASharp,
    /// B
    #[serde(rename = "B")]
    B,
}

impl PitchClass {
    /// All pitch classes in canonical order
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Pitch class from a semitone index (wraps modulo 12)
    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.rem_euclid(12) as usize]
    }

    /// Semitone index (C = 0)
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Sharp spelling, e.g. `"F#"`
    pub fn name(&self) -> &'static str {
        const NAMES: [&str; 12] = [
            "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
        ];
        NAMES[self.index()]
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Musical mode, ordered major before minor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Major
    Major,
    /// Minor
    Minor,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Major => f.write_str("major"),
            Mode::Minor => f.write_str("minor"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_class_names() {
        assert_eq!(PitchClass::FSharp.name(), "F#");
        assert_eq!(PitchClass::from_index(-1), PitchClass::B);
        assert_eq!(PitchClass::from_index(13), PitchClass::CSharp);
        assert_eq!(
            serde_json::to_value(PitchClass::ASharp).unwrap(),
            serde_json::json!("A#")
        );
    }

    #[test]
    fn test_ordering() {
        assert!(PitchClass::C < PitchClass::B);
        assert!(Mode::Major < Mode::Minor);
    }
}
