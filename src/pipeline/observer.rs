//! Analysis observability events
//!
//! The pipeline reports progress through an injected [`AnalysisObserver`].
//! Observers only watch: they cannot fail the analysis or change its output.

use crate::error::Stage;
use crate::packaging::Role;
use serde::Serialize;
use std::sync::Mutex;
use uuid::Uuid;

/// Metric withheld from the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Tempo
    Bpm,
    /// Key and mode
    KeyMode,
}

/// Why a metric was withheld
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OmissionReason {
    /// Evidence existed but did not reach the reporting threshold
    ConfidenceBelowThreshold,
    /// Nothing to estimate from
    NoEvidence,
}

/// One observability event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AnalysisEvent {
    /// Analysis accepted
    AnalysisStarted {
        /// Analysis identifier
        analysis_id: Uuid,
        /// Caller tier
        role: Role,
    },
    /// A metric was omitted from the output
    FeatureOmitted {
        /// Analysis identifier
        analysis_id: Uuid,
        /// Omitted metric
        feature: Feature,
        /// Reason for the omission
        reason: OmissionReason,
        /// Stage that omitted it
        stage: Stage,
    },
    /// Output packaged and validated
    AnalysisCompleted {
        /// Analysis identifier
        analysis_id: Uuid,
    },
    /// Analysis failed
    AnalysisFailed {
        /// Analysis identifier
        analysis_id: Uuid,
        /// Stable error code
        error_code: String,
        /// Stage of the failure
        stage: Stage,
    },
}

impl AnalysisEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            AnalysisEvent::AnalysisStarted { .. } => "analysis_started",
            AnalysisEvent::FeatureOmitted { .. } => "feature_omitted",
            AnalysisEvent::AnalysisCompleted { .. } => "analysis_completed",
            AnalysisEvent::AnalysisFailed { .. } => "analysis_failed",
        }
    }
}

/// Receiver of analysis events
pub trait AnalysisObserver: Send + Sync {
    /// Handle one event
    fn on_event(&self, event: &AnalysisEvent);
}

/// Observer that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl AnalysisObserver for NoopObserver {
    fn on_event(&self, _event: &AnalysisEvent) {}
}

/// Observer that forwards events to the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl AnalysisObserver for LogObserver {
    fn on_event(&self, event: &AnalysisEvent) {
        match event {
            AnalysisEvent::AnalysisFailed {
                analysis_id,
                error_code,
                stage,
            } => log::warn!(
                "analysis_failed id={} code={} stage={}",
                analysis_id,
                error_code,
                stage
            ),
            AnalysisEvent::FeatureOmitted {
                analysis_id,
                feature,
                reason,
                stage,
            } => log::info!(
                "feature_omitted id={} feature={:?} reason={:?} stage={}",
                analysis_id,
                feature,
                reason,
                stage
            ),
            other => log::info!("{} {:?}", other.name(), other),
        }
    }
}

/// Observer that keeps every event, for tests and audits
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<AnalysisEvent>>,
}

impl RecordingObserver {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events
    pub fn events(&self) -> Vec<AnalysisEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Wire names of the recorded events, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(AnalysisEvent::name).collect()
    }
}

impl AnalysisObserver for RecordingObserver {
    fn on_event(&self, event: &AnalysisEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}
