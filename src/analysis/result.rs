//! Analysis result types

use crate::features::key::{Mode, PitchClass};
use crate::features::period::family::TempoFamily;
use serde::{Deserialize, Serialize};

/// Confidence level of an estimate
///
/// Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Not reportable
    Low,
    /// Reportable with reservations
    Medium,
    /// Reportable
    High,
}

impl Confidence {
    /// Lower of two levels
    pub fn cap(self, ceiling: Confidence) -> Confidence {
        self.min(ceiling)
    }
}

/// How the reportable tempo relates to the raw tempo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timefeel {
    /// Reportable equals raw
    Normal,
    /// Reportable is twice the raw tempo
    DoubleTimePreferred,
    /// Reportable is half the raw tempo
    HalfTimePreferred,
    /// No reportable tempo
    Unknown,
}

/// Ordered reason codes explaining a BPM decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BpmReasonCode {
    /// Low and high band modes are in different tempo families
    MultibandDisagreement,
    /// A band has a strong unrelated runner-up
    MultibandRunnerupAmbiguity,
    /// Most windows correlate strongly at the half lag
    HalfDoubleAmbiguity,
    /// The 3/2 tempo was promoted over its 2/3 periodicity
    PromotedDottedFromTripletPeriodicity,
    /// Raw confidence too low to report anything
    OmittedLowConfidence,
    /// Unrelated runner-up too strong to report anything
    OmittedAmbiguousRunnerup,
    /// Reportable kept at raw
    PreferRaw,
    /// Raw above the slow-tempo ceiling
    CappedByRawMax,
    /// Raw stability below the doubling minimum
    RawStabilityBelowMin,
    /// Doubled tempo outside the reportable band
    CappedByReportableRange,
    /// Nothing directly supports the doubled tempo
    NoDirectDoubleEvidence,
    /// Windows or candidates directly support the doubled tempo
    HasDirectDoubleEvidence,
    /// Reportable doubled from raw
    PreferDoubleTimeFromRaw,
    /// Doubled tempo sits within one BPM of a scored candidate
    #[serde(rename = "prefer_emit_within_1")]
    PreferEmitWithin1,
    /// Doubled confidence capped at medium for lack of a scored candidate
    CappedConfidenceNoDirectScore,
}

/// Reported tempo value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BpmValue {
    /// Unrounded tempo
    pub value_exact: f64,
    /// Rounded tempo
    pub value_rounded: u32,
}

/// Ranked tempo hypothesis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BpmCandidate {
    /// Tempo, within the configured range
    pub bpm: u32,
    /// 1-based rank
    pub rank: u32,
    /// Score (0.0-1.0)
    pub score: f64,
    /// Relation to the top candidate
    pub family: TempoFamily,
    /// Ratio of this tempo to the top candidate
    pub relation_to_base: f64,
}

/// Evidence behind a confidence level
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Evidence {
    /// Score gap to the best unrelated candidate
    pub score_gap: f64,
    /// Support fraction of the top candidate
    pub stability: f64,
    /// Number of windows or votes considered
    pub windows: usize,
}

/// Final BPM metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BpmResult {
    /// Confidence of the reported value (equals reportable confidence)
    pub confidence: Confidence,
    /// Reported value, aligned with `bpm_reportable`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<BpmValue>,
    /// Grid estimate (2 decimals)
    pub bpm_raw: f64,
    /// Confidence of the grid estimate
    pub bpm_raw_confidence: Confidence,
    /// Human-facing tempo, omitted when unsafe
    pub bpm_reportable: Option<u32>,
    /// Confidence of the reportable tempo
    pub bpm_reportable_confidence: Confidence,
    /// Relation of reportable to raw
    pub timefeel: Timefeel,
    /// Ordered decision trail
    pub reason_codes: Vec<BpmReasonCode>,
    /// Ranked candidates
    pub candidates: Vec<BpmCandidate>,
    /// Gap and stability behind the raw confidence
    pub evidence: Evidence,
}

/// Key/mode reason codes, declared in canonical order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum KeyReasonCode {
    /// Tonic and mode are both separable
    EmitConfident,
    /// Tonic separable but mode is not
    ModeWithheldInsufficientEvidence,
    /// Short clip with unanimous evidence
    EmitConsistentWeakEvidence,
    /// A runner-up tonic is too close
    OmittedAmbiguousRunnerup,
    /// Confidence too low to report
    OmittedLowConfidence,
}

/// Aggregation level a key candidate was scored at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCandidateFamily {
    /// Exact (tonic, mode) pair
    Direct,
    /// Tonic aggregated over modes
    KeyAggregate,
}

/// Ranked key hypothesis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyCandidate {
    /// Tonic
    pub key: PitchClass,
    /// Mode, `None` for tonic-level candidates
    pub mode: Option<Mode>,
    /// Vote fraction (0.0-1.0)
    pub score: f64,
    /// Aggregation level
    pub family: KeyCandidateFamily,
    /// 1-based rank
    pub rank: u32,
}

/// Final key/mode metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyModeResult {
    /// Tonic, omitted when ambiguous
    pub value: Option<PitchClass>,
    /// Mode, omitted when ambiguous or withheld
    pub mode: Option<Mode>,
    /// Confidence of the reported value
    pub confidence: Confidence,
    /// Reason codes in canonical order
    pub reason_codes: Vec<KeyReasonCode>,
    /// Ranked candidates
    pub candidates: Vec<KeyCandidate>,
    /// Gap and stability behind the confidence
    pub evidence: Evidence,
}
