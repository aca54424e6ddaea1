//! Full-detail analysis report
//!
//! The report is built once per analysis and never exposed directly; callers
//! see a role view produced by [`super::package`].

use crate::analysis::result::{BpmResult, KeyModeResult};
use crate::error::{EngineError, Stage};
use crate::io::TrackInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Time span of an event, in seconds from the start of the clip
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start of the range
    pub start_seconds: f64,
    /// End of the range
    pub end_seconds: f64,
}

/// Clipping event ranges
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClippingEvents {
    /// Ranges with clipped samples
    pub sample_clipping_ranges: Vec<TimeRange>,
    /// Ranges whose true peak exceeds the ceiling
    pub true_peak_exceedance_ranges: Vec<TimeRange>,
}

/// Stereo event ranges
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StereoEvents {
    /// Ranges with stereo image problems
    pub stereo_issue_ranges: Vec<TimeRange>,
}

/// Tonality event ranges
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TonalityEvents {
    /// Ranges where the tonal centre drifts
    pub tonal_drift_ranges: Vec<TimeRange>,
}

/// Noise event ranges
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseEvents {
    /// Ranges where the noise floor changes
    pub noise_change_ranges: Vec<TimeRange>,
}

/// Categorized events; every category is always present
///
/// Missing categories or range lists deserialize to empty lists, while
/// populated ranges are kept as given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Events {
    /// Clipping
    pub clipping: ClippingEvents,
    /// Stereo
    pub stereo: StereoEvents,
    /// Tonality
    pub tonality: TonalityEvents,
    /// Noise
    pub noise: NoiseEvents,
}

/// A metric withheld from the caller's tier
///
/// Only `{locked, unlock_hint, preview}` are ever serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockedMetric {
    locked: bool,
    unlock_hint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    preview: Option<Map<String, Value>>,
}

impl LockedMetric {
    /// Create a locked metric
    ///
    /// An empty preview is dropped.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidInput` (stage `packaging`) if the hint is
    /// blank.
    pub fn new(
        unlock_hint: impl Into<String>,
        preview: Option<Map<String, Value>>,
    ) -> Result<Self, EngineError> {
        let unlock_hint = unlock_hint.into();
        if unlock_hint.trim().is_empty() {
            return Err(EngineError::invalid(
                Stage::Packaging,
                "locked metric requires a non-empty unlock_hint",
            ));
        }
        Ok(Self {
            locked: true,
            unlock_hint,
            preview: preview.filter(|p| !p.is_empty()),
        })
    }

    /// Upgrade hint shown to the caller
    pub fn unlock_hint(&self) -> &str {
        &self.unlock_hint
    }

    /// Optional non-empty preview
    pub fn preview(&self) -> Option<&Map<String, Value>> {
        self.preview.as_ref()
    }

    /// Copy with the preview passed through `f`; an emptied preview is dropped
    pub(crate) fn map_preview(&self, f: impl Fn(&mut Value)) -> Self {
        let preview = self.preview.as_ref().and_then(|p| {
            let mut value = Value::Object(p.clone());
            f(&mut value);
            match value {
                Value::Object(map) if !map.is_empty() => Some(map),
                _ => None,
            }
        });
        Self {
            locked: true,
            unlock_hint: self.unlock_hint.clone(),
            preview,
        }
    }
}

/// Full-detail result of one analysis
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    /// Analysis identifier
    pub analysis_id: Uuid,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Track metadata
    pub track: TrackInfo,
    /// BPM metric, absent when there was no rhythmic evidence
    pub bpm: Option<BpmResult>,
    /// Key/mode metric, absent when there was no tonal evidence
    pub key_mode: Option<KeyModeResult>,
    /// Metrics withheld from the caller's tier, by name
    pub locked: BTreeMap<String, LockedMetric>,
    /// Categorized events
    pub events: Events,
    /// Non-fatal warnings
    pub warnings: Vec<String>,
}

impl AnalysisReport {
    /// Empty report for a track
    pub fn new(analysis_id: Uuid, created_at: DateTime<Utc>, track: TrackInfo) -> Self {
        Self {
            analysis_id,
            created_at,
            track,
            bpm: None,
            key_mode: None,
            locked: BTreeMap::new(),
            events: Events::default(),
            warnings: Vec::new(),
        }
    }

    /// Withhold a metric from the caller
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidInput` (stage `packaging`) for a blank
    /// name or hint, or for `bpm`/`key_mode`, which are omitted rather than
    /// locked.
    pub fn lock_metric(
        &mut self,
        name: impl Into<String>,
        unlock_hint: impl Into<String>,
        preview: Option<Map<String, Value>>,
    ) -> Result<(), EngineError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(EngineError::invalid(Stage::Packaging, "metric name is empty"));
        }
        if name == "bpm" || name == "key_mode" {
            return Err(EngineError::invalid(
                Stage::Packaging,
                format!("{} must be omitted, never locked", name),
            ));
        }
        let metric = LockedMetric::new(unlock_hint, preview)?;
        self.locked.insert(name, metric);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn track() -> TrackInfo {
        TrackInfo {
            duration_seconds: 30.0,
            format: "wav".to_string(),
            sample_rate_hz: 44100,
            channels: 2,
            codec: None,
            container: None,
        }
    }

    #[test]
    fn test_locked_metric_shape() {
        let metric = LockedMetric::new("Upgrade to see loudness", Some(Map::new())).unwrap();
        assert_eq!(
            serde_json::to_value(&metric).unwrap(),
            json!({"locked": true, "unlock_hint": "Upgrade to see loudness"})
        );
        assert!(LockedMetric::new("   ", None).is_err());
    }

    #[test]
    fn test_bpm_cannot_be_locked() {
        let mut report = AnalysisReport::new(Uuid::new_v4(), Utc::now(), track());
        assert!(report.lock_metric("bpm", "hint", None).is_err());
        assert!(report.lock_metric("key_mode", "hint", None).is_err());
        assert!(report.lock_metric("loudness", "hint", None).is_ok());
        assert_eq!(report.locked.len(), 1);
    }

    #[test]
    fn test_events_fill_missing_categories() {
        let events: Events = serde_json::from_value(json!({
            "clipping": {"sample_clipping_ranges": [{"start_seconds": 1.0, "end_seconds": 1.5}]}
        }))
        .unwrap();
        assert_eq!(events.clipping.sample_clipping_ranges.len(), 1);
        assert!(events.clipping.true_peak_exceedance_ranges.is_empty());
        let value = serde_json::to_value(&events).unwrap();
        assert_eq!(value["noise"], json!({"noise_change_ranges": []}));
        assert_eq!(value["stereo"], json!({"stereo_issue_ranges": []}));
    }
}
