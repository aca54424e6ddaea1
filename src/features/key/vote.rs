//! Key/mode vote parsing
//!
//! Accepts labels such as `"F# minor"`, `"Gb major"`, `"F#m"`, `"Ebmin"` or
//! `"A maj"`. Flats and enharmonic spellings are normalized to sharps.

use super::{Mode, PitchClass};
use serde::{Deserialize, Serialize};

/// One window's (tonic, mode) vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeyModeVote {
    /// Tonic
    pub tonic: PitchClass,
    /// Mode
    pub mode: Mode,
}

impl KeyModeVote {
    /// Parse a key/mode label
    ///
    /// Returns `None` for labels without a recognizable tonic or mode.
    pub fn parse(label: &str) -> Option<Self> {
        let compact: String = label.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut chars = compact.chars().peekable();

        let letter = chars.next()?.to_ascii_uppercase();
        let natural: i32 = match letter {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return None,
        };

        let mut offset = 0;
        while let Some(&c) = chars.peek() {
            match c {
                '#' | '♯' => offset += 1,
                'b' | '♭' => offset -= 1,
                _ => break,
            }
            chars.next();
        }

        let rest: String = chars.collect::<String>().trim().to_lowercase();
        let mode = match rest.as_str() {
            "major" | "maj" => Mode::Major,
            "minor" | "min" | "m" => Mode::Minor,
            _ => return None,
        };

        Some(Self {
            tonic: PitchClass::from_index(natural + offset),
            mode,
        })
    }
}

/// Parse a list of labels, skipping entries that do not parse
pub fn parse_votes<S: AsRef<str>>(labels: &[S]) -> Vec<KeyModeVote> {
    labels
        .iter()
        .filter_map(|label| {
            let label = label.as_ref();
            let vote = KeyModeVote::parse(label);
            if vote.is_none() && !label.trim().is_empty() {
                log::debug!("Skipping unparseable key/mode vote: {:?}", label);
            }
            vote
        })
        .collect()
}
