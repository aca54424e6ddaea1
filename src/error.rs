//! Error types for the analysis engine
//!
//! Every failure is classified into one of four categories with a stable code.
//! Low confidence is never an error: omitted values are part of a successful
//! result.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Pipeline stage at which an error was raised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Input validation (channels, duration)
    #[serde(rename = "validate")]
    Validate,
    /// File ingest and decoding
    #[serde(rename = "ingest")]
    Ingest,
    /// PCM preprocessing and onset extraction
    #[serde(rename = "preprocess")]
    Preprocess,
    /// BPM candidate engine
    #[serde(rename = "feature:bpm")]
    FeatureBpm,
    /// Key/mode candidate engine
    #[serde(rename = "feature:key_mode")]
    FeatureKeyMode,
    /// Role-based output packaging
    #[serde(rename = "packaging")]
    Packaging,
    /// Output contract validation
    #[serde(rename = "contract")]
    Contract,
}

impl Stage {
    /// Wire name of the stage
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::Ingest => "ingest",
            Stage::Preprocess => "preprocess",
            Stage::FeatureBpm => "feature:bpm",
            Stage::FeatureKeyMode => "feature:key_mode",
            Stage::Packaging => "packaging",
            Stage::Contract => "contract",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during analysis
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Malformed or out-of-range input
    #[error("Invalid input ({stage}): {reason}")]
    InvalidInput {
        /// Stage that rejected the input
        stage: Stage,
        /// Human-readable reason
        reason: String,
    },

    /// Input that is well-formed but not supported (e.g. container type)
    #[error("Unsupported input ({stage}): {reason}")]
    UnsupportedInput {
        /// Stage that rejected the input
        stage: Stage,
        /// Human-readable reason
        reason: String,
    },

    /// Packaged output broke the output contract
    #[error("Contract violation at {path}: {message}")]
    ContractViolation {
        /// JSON path of the offending element
        path: String,
        /// What was wrong
        message: String,
    },

    /// Unexpected failure inside a stage
    #[error("Internal error ({stage}): {cause}")]
    Internal {
        /// Stage that failed
        stage: Stage,
        /// Cause description (never contains audio data)
        cause: String,
    },
}

impl EngineError {
    /// Build an `InvalidInput` error
    pub fn invalid(stage: Stage, reason: impl Into<String>) -> Self {
        EngineError::InvalidInput {
            stage,
            reason: reason.into(),
        }
    }

    /// Build an `UnsupportedInput` error
    pub fn unsupported(stage: Stage, reason: impl Into<String>) -> Self {
        EngineError::UnsupportedInput {
            stage,
            reason: reason.into(),
        }
    }

    /// Build a `ContractViolation` error
    pub fn contract(path: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::ContractViolation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Build an `Internal` error
    pub fn internal(stage: Stage, cause: impl Into<String>) -> Self {
        EngineError::Internal {
            stage,
            cause: cause.into(),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::InvalidInput { .. } => "INVALID_INPUT",
            EngineError::UnsupportedInput { .. } => "UNSUPPORTED_INPUT",
            EngineError::ContractViolation { .. } => "CONTRACT_VIOLATION",
            EngineError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Stage the error is attributed to
    pub fn stage(&self) -> Stage {
        match self {
            EngineError::InvalidInput { stage, .. }
            | EngineError::UnsupportedInput { stage, .. }
            | EngineError::Internal { stage, .. } => *stage,
            EngineError::ContractViolation { .. } => Stage::Contract,
        }
    }

    /// Log-safe context map (stage plus structured fields, no payloads)
    pub fn context(&self) -> Map<String, Value> {
        let mut ctx = Map::new();
        ctx.insert("stage".to_string(), json!(self.stage().as_str()));
        match self {
            EngineError::InvalidInput { reason, .. }
            | EngineError::UnsupportedInput { reason, .. } => {
                ctx.insert("reason".to_string(), json!(reason));
            }
            EngineError::ContractViolation { path, .. } => {
                ctx.insert("path".to_string(), json!(path));
            }
            EngineError::Internal { cause, .. } => {
                ctx.insert("cause".to_string(), json!(cause));
            }
        }
        ctx
    }

    /// Convert into the boundary error body returned by a service edge
    pub fn to_boundary(&self, request_id: Uuid) -> BoundaryError {
        BoundaryError {
            error: self.code().to_string(),
            message: self.to_string(),
            details: Value::Object(self.context()),
            request_id,
        }
    }
}

/// Error body exposed at an API boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoundaryError {
    /// Stable error code (`INVALID_INPUT`, ...)
    pub error: String,
    /// Human-readable message
    pub message: String,
    /// Structured, log-safe details
    pub details: Value,
    /// Request correlation id
    pub request_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            EngineError::invalid(Stage::Validate, "x").code(),
            "INVALID_INPUT"
        );
        assert_eq!(
            EngineError::unsupported(Stage::Ingest, "x").code(),
            "UNSUPPORTED_INPUT"
        );
        assert_eq!(EngineError::contract("$", "x").code(), "CONTRACT_VIOLATION");
        assert_eq!(
            EngineError::internal(Stage::FeatureBpm, "x").code(),
            "INTERNAL_ERROR"
        );
    }

    #[test]
    fn test_stage_wire_names() {
        assert_eq!(Stage::FeatureKeyMode.as_str(), "feature:key_mode");
        assert_eq!(
            serde_json::to_value(Stage::FeatureBpm).unwrap(),
            json!("feature:bpm")
        );
        assert_eq!(EngineError::contract("$.metrics", "bad").stage(), Stage::Contract);
    }

    #[test]
    fn test_context_is_log_safe() {
        let err = EngineError::invalid(Stage::Validate, "channels must be 1 or 2");
        let ctx = err.context();
        assert_eq!(ctx["stage"], json!("validate"));
        assert_eq!(ctx["reason"], json!("channels must be 1 or 2"));
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn test_boundary_error_shape() {
        let id = Uuid::new_v4();
        let body = EngineError::unsupported(Stage::Ingest, "mp3 not supported").to_boundary(id);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["error"], json!("UNSUPPORTED_INPUT"));
        assert_eq!(value["request_id"], json!(id.to_string()));

        let extra = json!({
            "error": "INVALID_INPUT",
            "message": "m",
            "details": {},
            "request_id": id.to_string(),
            "trace": "leak"
        });
        assert!(serde_json::from_value::<BoundaryError>(extra).is_err());
    }
}
