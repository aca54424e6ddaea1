//! Configuration parameters for analysis
//!
//! All thresholds are named fields so they can be audited and serialized.
//! The configuration is read-only for the duration of a run.

use crate::error::{EngineError, Stage};
use serde::{Deserialize, Serialize};

/// Minimum duration, gap and stability needed for one confidence tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    /// Minimum clip duration in seconds
    pub min_duration_seconds: f64,
    /// Minimum score gap between the top candidate and the best unrelated one
    pub min_gap: f64,
    /// Minimum support fraction of the top candidate
    pub min_stability: f64,
}

/// High and medium tier thresholds; anything below medium is low
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceTiers {
    /// Thresholds for `high`
    pub high: TierThresholds,
    /// Thresholds for `medium`
    pub medium: TierThresholds,
}

/// Parameters of the onset/autocorrelation analyzer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerParams {
    /// Analysis window length in seconds
    pub window_seconds: f64,
    /// Hop between window starts in seconds
    pub hop_seconds: f64,
    /// Envelope frame length in seconds
    pub frame_seconds: f64,
    /// Minimum tempo considered
    pub bpm_min: f64,
    /// Maximum tempo considered
    pub bpm_max: f64,
    /// Clips shorter than this produce no hints
    pub min_audio_seconds: f64,
    /// Cutoff of the low band low-pass filter
    pub lowpass_hz: f64,
    /// Cutoff of the low-pass subtracted to form the high band
    pub highpass_hz: f64,
    /// Exponent of the lag bias applied when picking the best lag (0 = none)
    pub lag_bias_exponent: f64,
    /// Minimum ratio for a half-lag peak to count as double-tempo evidence
    pub double_tempo_alpha: f64,
}

impl Default for AnalyzerParams {
    fn default() -> Self {
        Tunables::default().analyzer_params()
    }
}

/// Every tunable threshold of the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tunables {
    // Tempo range and folding
    /// Lower bound of the tempo range (default: 60.0)
    pub bpm_min: f64,
    /// Upper bound of the tempo range (default: 200.0)
    pub bpm_max: f64,
    /// Maximum ×2/÷2 folding steps per value (default: 16)
    pub bpm_fold_max_iterations: u32,

    // Candidates and scoring
    /// Number of candidates kept, never fewer than 5 (default: 5)
    pub bpm_top_n: usize,
    /// Tolerance in BPM for support and relation checks (default: 1.0)
    pub bpm_tolerance: f64,
    /// Weight of window support in the candidate score (default: 0.7)
    pub bpm_support_weight: f64,
    /// Weight of closeness in the candidate score (default: 0.3)
    pub bpm_closeness_weight: f64,
    /// Mean distance (BPM) at which closeness reaches zero (default: 10.0)
    pub bpm_closeness_span: f64,
    /// Weight of 2/3-tempo windows blended into support (default: 0.8)
    pub bpm_triplet_support_beta: f64,
    /// Minimum direct support for the 3/2 candidate to be promoted (default: 0.10)
    pub bpm_triplet_promotion_min_direct_support: f64,
    /// Maximum score deficit of the 3/2 candidate against the top (default: 0.10)
    pub bpm_triplet_promotion_max_score_delta: f64,
    /// Window details scoring below this are ignored when others pass (default: 0.10)
    pub bpm_detail_min_score: f64,
    /// Confidence tiers for the raw tempo
    pub bpm_tiers: ConfidenceTiers,

    // Multiband sanity
    /// Band mode weight considered stable (default: 0.65)
    pub bpm_multiband_stable_weight: f64,
    /// Runner-up weight considered ambiguous (default: 0.30)
    pub bpm_multiband_runnerup_weight: f64,
    /// Double ratio marking a window as half/double ambiguous (default: 0.45)
    pub bpm_half_double_ratio: f64,
    /// Fraction of ambiguous windows that forces low confidence (default: 0.60)
    pub bpm_half_double_fraction: f64,

    // Reportable policy
    /// Raw tempo above which doubling is never considered (default: 95.0)
    pub bpm_raw_max: f64,
    /// Raw stability below which doubling is never considered (default: 0.75)
    pub bpm_raw_min_stability: f64,
    /// Lower bound of the doubled tempo (default: 120.0)
    pub bpm_reportable_min: f64,
    /// Upper bound of the doubled tempo (default: 190.0)
    pub bpm_reportable_max: f64,
    /// Unrelated runner-up score ratio that forces omission (default: 0.30)
    pub bpm_reportable_runnerup_ratio: f64,
    /// Candidate score at the doubled tempo that counts as direct evidence (default: 0.25)
    pub bpm_reportable_direct_double_min_score: f64,

    // Exact hint fallback
    /// Clips shorter than this repeat the exact hint fewer times (default: 6.0)
    pub exact_hint_short_seconds: f64,
    /// Repeats of the exact hint for short clips (default: 2)
    pub exact_hint_repeats_short: usize,
    /// Repeats of the exact hint otherwise (default: 3)
    pub exact_hint_repeats: usize,

    // Key/mode
    /// Number of key candidates kept (default: 5)
    pub key_top_n: usize,
    /// Confidence tiers for key and mode
    pub key_tiers: ConfidenceTiers,
    /// Minimum duration for the consistent weak-evidence path (default: 2.0)
    pub key_weak_min_duration_seconds: f64,
    /// Minimum number of votes for the weak-evidence path (default: 3)
    pub key_weak_min_windows: usize,
    /// Tonic stability required for the weak-evidence path (default: 1.0)
    pub key_weak_min_stability: f64,

    // Analyzer
    /// Analysis window length in seconds (default: 8.0)
    pub window_seconds: f64,
    /// Hop between windows in seconds (default: 4.0)
    pub hop_seconds: f64,
    /// Envelope frame length in seconds (default: 0.01)
    pub frame_seconds: f64,
    /// Minimum clip duration for the analyzer (default: 2.0)
    pub min_audio_seconds: f64,
    /// Low band cutoff in Hz (default: 200.0)
    pub lowpass_hz: f64,
    /// High band crossover in Hz (default: 900.0)
    pub highpass_hz: f64,
    /// Lag bias exponent (default: 0.0)
    pub lag_bias_exponent: f64,
    /// Half-lag ratio that counts as double-tempo evidence (default: 0.80)
    pub double_tempo_alpha: f64,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            bpm_min: 60.0,
            bpm_max: 200.0,
            bpm_fold_max_iterations: 16,
            bpm_top_n: 5,
            bpm_tolerance: 1.0,
            bpm_support_weight: 0.7,
            bpm_closeness_weight: 0.3,
            bpm_closeness_span: 10.0,
            bpm_triplet_support_beta: 0.8,
            bpm_triplet_promotion_min_direct_support: 0.10,
            bpm_triplet_promotion_max_score_delta: 0.10,
            bpm_detail_min_score: 0.10,
            bpm_tiers: ConfidenceTiers {
                high: TierThresholds {
                    min_duration_seconds: 6.0,
                    min_gap: 0.20,
                    min_stability: 0.75,
                },
                medium: TierThresholds {
                    min_duration_seconds: 4.0,
                    min_gap: 0.12,
                    min_stability: 0.60,
                },
            },
            bpm_multiband_stable_weight: 0.65,
            bpm_multiband_runnerup_weight: 0.30,
            bpm_half_double_ratio: 0.45,
            bpm_half_double_fraction: 0.60,
            bpm_raw_max: 95.0,
            bpm_raw_min_stability: 0.75,
            bpm_reportable_min: 120.0,
            bpm_reportable_max: 190.0,
            bpm_reportable_runnerup_ratio: 0.30,
            bpm_reportable_direct_double_min_score: 0.25,
            exact_hint_short_seconds: 6.0,
            exact_hint_repeats_short: 2,
            exact_hint_repeats: 3,
            key_top_n: 5,
            key_tiers: ConfidenceTiers {
                high: TierThresholds {
                    min_duration_seconds: 6.0,
                    min_gap: 0.30,
                    min_stability: 0.75,
                },
                medium: TierThresholds {
                    min_duration_seconds: 4.0,
                    min_gap: 0.20,
                    min_stability: 0.60,
                },
            },
            key_weak_min_duration_seconds: 2.0,
            key_weak_min_windows: 3,
            key_weak_min_stability: 1.0,
            window_seconds: 8.0,
            hop_seconds: 4.0,
            frame_seconds: 0.01,
            min_audio_seconds: 2.0,
            lowpass_hz: 200.0,
            highpass_hz: 900.0,
            lag_bias_exponent: 0.0,
            double_tempo_alpha: 0.80,
        }
    }
}

impl Tunables {
    /// Analyzer parameters derived from these tunables
    pub fn analyzer_params(&self) -> AnalyzerParams {
        AnalyzerParams {
            window_seconds: self.window_seconds,
            hop_seconds: self.hop_seconds,
            frame_seconds: self.frame_seconds,
            bpm_min: self.bpm_min,
            bpm_max: self.bpm_max,
            min_audio_seconds: self.min_audio_seconds,
            lowpass_hz: self.lowpass_hz,
            highpass_hz: self.highpass_hz,
            lag_bias_exponent: self.lag_bias_exponent,
            double_tempo_alpha: self.double_tempo_alpha,
        }
    }

    /// Number of candidates produced by the BPM engine
    pub fn candidate_count(&self) -> usize {
        self.bpm_top_n.max(5)
    }

    /// Repeats used when a single exact hint stands in for windows
    pub fn exact_hint_repeats_for(&self, duration_seconds: f64) -> usize {
        if duration_seconds > 0.0 && duration_seconds < self.exact_hint_short_seconds {
            self.exact_hint_repeats_short
        } else {
            self.exact_hint_repeats
        }
    }

    /// Check that thresholds are internally consistent
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidInput` (stage `validate`) naming the first
    /// offending field.
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |field: &str, why: &str| -> Result<(), EngineError> {
            Err(EngineError::invalid(
                Stage::Validate,
                format!("tunable {}: {}", field, why),
            ))
        };

        if !(self.bpm_min > 0.0 && self.bpm_min < self.bpm_max) {
            return invalid("bpm_min/bpm_max", "expected 0 < bpm_min < bpm_max");
        }
        if self.bpm_tolerance < 0.0 {
            return invalid("bpm_tolerance", "must be non-negative");
        }
        if self.bpm_closeness_span <= 0.0 {
            return invalid("bpm_closeness_span", "must be positive");
        }
        if self.window_seconds <= 0.0 || self.hop_seconds <= 0.0 || self.frame_seconds <= 0.0 {
            return invalid("window/hop/frame", "must be positive");
        }
        if self.lowpass_hz <= 0.0 || self.highpass_hz <= 0.0 {
            return invalid("lowpass_hz/highpass_hz", "must be positive");
        }
        if self.lag_bias_exponent < 0.0 {
            return invalid("lag_bias_exponent", "must be non-negative");
        }
        if self.key_top_n == 0 {
            return invalid("key_top_n", "must be at least 1");
        }
        if self.bpm_reportable_min > self.bpm_reportable_max {
            return invalid("bpm_reportable_min", "must not exceed bpm_reportable_max");
        }
        for (name, tiers) in [("bpm_tiers", &self.bpm_tiers), ("key_tiers", &self.key_tiers)] {
            if tiers.high.min_gap < tiers.medium.min_gap
                || tiers.high.min_stability < tiers.medium.min_stability
                || tiers.high.min_duration_seconds < tiers.medium.min_duration_seconds
            {
                return invalid(name, "high tier must be at least as strict as medium");
            }
        }
        Ok(())
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Thresholds for the analyzer and candidate engines
    pub tunables: Tunables,

    /// Reject decoded audio longer than this many seconds (default: no limit)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_audio_seconds: Option<f64>,
}

impl EngineConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidInput` if the JSON is malformed or the
    /// tunables fail validation.
    pub fn from_json(text: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = serde_json::from_str(text)
            .map_err(|e| EngineError::invalid(Stage::Validate, format!("config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), EngineError> {
        if let Some(max) = self.max_audio_seconds {
            if max <= 0.0 {
                return Err(EngineError::invalid(
                    Stage::Validate,
                    "max_audio_seconds must be positive",
                ));
            }
        }
        self.tunables.validate()
    }
}
