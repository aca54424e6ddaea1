//! Audio input modules
//!
//! Decoded-audio descriptors, analysis hints, and WAV ingest using hound.

pub mod decoder;

use crate::features::period::WindowTempoHint;
use serde::{Deserialize, Serialize};

pub use decoder::{decode_path, decode_wav};

/// Interleaved signed 16-bit PCM
#[derive(Debug, Clone, PartialEq)]
pub struct PcmAudio {
    /// Sample rate in Hz
    pub sample_rate_hz: u32,
    /// Channel count (1 or 2 are analysable)
    pub channels: u16,
    /// Interleaved samples
    pub samples: Vec<i16>,
}

impl PcmAudio {
    /// Number of frames (samples per channel)
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate_hz == 0 {
            0.0
        } else {
            self.frame_count() as f64 / self.sample_rate_hz as f64
        }
    }
}

/// Upstream evidence that can stand in for, or complement, raw PCM
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisHints {
    /// Per-window tempo values (BPM)
    pub bpm_hint_windows: Vec<f64>,
    /// Per-window analyzer records
    pub bpm_hint_window_details: Vec<WindowTempoHint>,
    /// A single known tempo, used only when no windows exist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm_hint_exact: Option<f64>,
    /// Per-window key/mode labels such as `"F# minor"` or `"Ebm"`
    pub key_mode_hint_windows: Vec<String>,
    /// A single key/mode label, used only when no windows exist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_mode_hint: Option<String>,
    /// `Some(false)` marks a clip without rhythmic content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_rhythm_evidence: Option<bool>,
    /// `Some(false)` marks a clip without tonal content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_tonal_evidence: Option<bool>,
}

/// Decoded audio descriptor handed to the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Sample rate in Hz
    pub sample_rate_hz: u32,
    /// Channel count
    pub channels: u16,
    /// Duration in seconds
    pub duration_seconds: f64,
    /// Source format label (e.g. `"wav"`)
    pub format: String,
    /// PCM payload, when available
    pub pcm: Option<PcmAudio>,
    /// Upstream hints
    pub hints: AnalysisHints,
}

impl DecodedAudio {
    /// Wrap PCM samples, deriving duration from the frame count
    pub fn from_pcm(pcm: PcmAudio, format: impl Into<String>) -> Self {
        Self {
            sample_rate_hz: pcm.sample_rate_hz,
            channels: pcm.channels,
            duration_seconds: pcm.duration_seconds(),
            format: format.into(),
            pcm: Some(pcm),
            hints: AnalysisHints::default(),
        }
    }

    /// Describe a clip known only through hints
    pub fn from_hints(
        sample_rate_hz: u32,
        channels: u16,
        duration_seconds: f64,
        hints: AnalysisHints,
    ) -> Self {
        Self {
            sample_rate_hz,
            channels,
            duration_seconds,
            format: "wav".to_string(),
            pcm: None,
            hints,
        }
    }

    /// Attach hints
    pub fn with_hints(mut self, hints: AnalysisHints) -> Self {
        self.hints = hints;
        self
    }

    /// Canonical track block for the output envelope
    pub fn track_info(&self) -> TrackInfo {
        TrackInfo {
            duration_seconds: self.duration_seconds,
            format: self.format.clone(),
            sample_rate_hz: self.sample_rate_hz,
            channels: self.channels,
            codec: if self.format == "wav" {
                Some("pcm_s16le".to_string())
            } else {
                None
            },
            container: Some(self.format.clone()),
        }
    }
}

/// Track metadata block of the output envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    /// Duration in seconds
    pub duration_seconds: f64,
    /// Source format label
    pub format: String,
    /// Sample rate in Hz
    pub sample_rate_hz: u32,
    /// Channel count
    pub channels: u16,
    /// Codec label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    /// Container label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
}
