//! Period estimation modules
//!
//! Turn onset envelopes into per-window tempo evidence and ranked BPM
//! candidates:
//! - Autocorrelation (per window, per band)
//! - Window scheduling and hint flattening
//! - Tempo folding, candidate generation and scoring
//! - Tempo family relations
//! - Multiband sanity checks

pub mod autocorrelation;
pub mod candidate_filter;
pub mod family;
pub mod multiband;
pub mod windows;

use serde::{Deserialize, Serialize};

pub use windows::{compute_window_hints, flatten_window_hints, AudioWindow};

/// Periodicity evidence of one band in one window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandHint {
    /// Tempo of the strongest autocorrelation lag
    pub best_bpm: f64,
    /// Normalized correlation at the best lag (0.0-1.0)
    pub best_score: f64,
    /// Tempo of the best half-lag, when within range
    pub double_bpm: Option<f64>,
    /// `|corr(half_lag)| / |corr(best_lag)|`
    pub double_ratio: Option<f64>,
}

/// Per-window tempo evidence for the low band and, optionally, the high band
///
/// Serialized flat, with high band fields prefixed `high_`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindowTempoHint {
    /// Low band best tempo
    pub best_bpm: f64,
    /// Low band best score
    #[serde(default)]
    pub best_score: f64,
    /// Low band double-tempo candidate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub double_bpm: Option<f64>,
    /// Low band double-tempo ratio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub double_ratio: Option<f64>,
    /// High band best tempo
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_best_bpm: Option<f64>,
    /// High band best score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_best_score: Option<f64>,
    /// High band double-tempo candidate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_double_bpm: Option<f64>,
    /// High band double-tempo ratio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_double_ratio: Option<f64>,
}

impl WindowTempoHint {
    /// Merge a low band record with an optional high band record
    pub fn from_bands(low: BandHint, high: Option<BandHint>) -> Self {
        Self {
            best_bpm: low.best_bpm,
            best_score: low.best_score,
            double_bpm: low.double_bpm,
            double_ratio: low.double_ratio,
            high_best_bpm: high.map(|h| h.best_bpm),
            high_best_score: high.map(|h| h.best_score),
            high_double_bpm: high.and_then(|h| h.double_bpm),
            high_double_ratio: high.and_then(|h| h.double_ratio),
        }
    }

    /// Low band view
    pub fn low(&self) -> BandHint {
        BandHint {
            best_bpm: self.best_bpm,
            best_score: self.best_score,
            double_bpm: self.double_bpm,
            double_ratio: self.double_ratio,
        }
    }

    /// High band view, when present
    pub fn high(&self) -> Option<BandHint> {
        self.high_best_bpm.map(|best_bpm| BandHint {
            best_bpm,
            best_score: self.high_best_score.unwrap_or(0.0),
            double_bpm: self.high_double_bpm,
            double_ratio: self.high_double_ratio,
        })
    }

    /// Double-tempo candidates of both bands as `(bpm, ratio)` pairs
    pub fn double_evidence(&self) -> impl Iterator<Item = (f64, f64)> {
        let low = self.double_bpm.zip(self.double_ratio);
        let high = self.high_double_bpm.zip(self.high_double_ratio);
        low.into_iter().chain(high)
    }
}
