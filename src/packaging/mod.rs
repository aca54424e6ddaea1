//! Output packaging and contract layer
//!
//! The pipeline builds one maximally detailed [`AnalysisReport`]. Packaging
//! projects it into a role-specific [`PackagedOutput`] view without mutating
//! it, and the contract validator checks the serialized view as a last
//! safety net.

pub mod contract;
pub mod output;
pub mod views;

use crate::error::{EngineError, Stage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub use contract::validate_output;
pub use output::{AnalysisReport, Events, LockedMetric, TimeRange};
pub use views::{package, PackagedOutput};

/// Engine name written into every envelope
pub const ENGINE_NAME: &str = "bnk-analysis-engine";

/// Engine contract version
pub const ENGINE_VERSION: &str = "v1";

/// Keys never shown to guests, at any depth of the metrics tree
pub const GUEST_FORBIDDEN_KEYS: [&str; 7] = [
    "confidence",
    "evidence",
    "reason_codes",
    "ambiguity",
    "ambiguity_label",
    "score",
    "scores",
];

/// Caller tier controlling output detail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Anonymous caller: values and ranks only
    Guest,
    /// Registered caller: full detail
    Free,
    /// Paying caller: full detail
    Pro,
}

impl Role {
    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Free => "free",
            Role::Pro => "pro",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guest" => Ok(Role::Guest),
            "free" => Ok(Role::Free),
            "pro" => Ok(Role::Pro),
            other => Err(EngineError::invalid(
                Stage::Validate,
                format!("unknown role '{}'", other),
            )),
        }
    }
}

/// Recursively remove guest-forbidden keys and `value_exact` from a JSON tree
pub fn strip_guest_keys(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|key, _| !GUEST_FORBIDDEN_KEYS.contains(&key.as_str()) && key != "value_exact");
            for child in map.values_mut() {
                strip_guest_keys(child);
            }
        }
        Value::Array(items) => {
            for child in items.iter_mut() {
                strip_guest_keys(child);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_parse() {
        assert_eq!("Guest".parse::<Role>().unwrap(), Role::Guest);
        assert_eq!(" pro ".parse::<Role>().unwrap(), Role::Pro);
        let err = "admin".parse::<Role>().unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
        assert_eq!(serde_json::to_value(Role::Free).unwrap(), json!("free"));
    }

    #[test]
    fn test_strip_guest_keys_is_recursive() {
        let mut tree = json!({
            "loudness": {
                "value": {"value_exact": -9.3, "value_rounded": -9},
                "confidence": 0.8,
                "items": [{"score": 0.4, "label": "x"}],
                "nested": {"ambiguity_label": "a", "evidence": {}}
            }
        });
        strip_guest_keys(&mut tree);
        assert_eq!(
            tree,
            json!({
                "loudness": {
                    "value": {"value_rounded": -9},
                    "items": [{"label": "x"}],
                    "nested": {}
                }
            })
        );
    }
}
