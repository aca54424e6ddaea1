//! Output contract validator
//!
//! A strict-enough check of the serialized envelope: required keys, engine
//! identity, identifier shape, role gating of events and metrics, and locked
//! metric invariants. Packaging already enforces these; this is the safety
//! net that turns an engine defect into `ContractViolation`.

use super::{Role, ENGINE_NAME, ENGINE_VERSION, GUEST_FORBIDDEN_KEYS};
use crate::error::EngineError;
use serde_json::{Map, Value};
use uuid::Uuid;

const REQUIRED_KEYS: [&str; 7] = [
    "engine",
    "analysis_id",
    "created_at",
    "role",
    "track",
    "metrics",
    "warnings",
];

const LOCKED_ALLOWED_KEYS: [&str; 3] = ["locked", "unlock_hint", "preview"];

/// How guest `events` are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuestEventsPolicy {
    /// Guests must carry `events: {}`
    #[default]
    EmptyObject,
    /// Guests may omit `events` or carry `{}`
    OmitOk,
}

/// Validator options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidateOptions {
    /// Guest events policy
    pub guest_events_policy: GuestEventsPolicy,
}

fn violation(path: impl Into<String>, message: impl Into<String>) -> EngineError {
    let path = path.into();
    let message = message.into();
    log::warn!("Contract violation at {}: {}", path, message);
    EngineError::contract(path, message)
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, EngineError> {
    value
        .as_object()
        .ok_or_else(|| violation(path, "must be an object"))
}

fn is_hyphenated_uuid(value: &Value) -> bool {
    value
        .as_str()
        .is_some_and(|s| s.len() == 36 && Uuid::parse_str(s).is_ok())
}

/// Find the first forbidden key anywhere below `value`
fn find_forbidden(value: &Value, path: &str) -> Option<String> {
    match value {
        Value::Object(map) => map.iter().find_map(|(key, child)| {
            let child_path = format!("{}.{}", path, key);
            if GUEST_FORBIDDEN_KEYS.contains(&key.as_str()) || key == "value_exact" {
                Some(child_path)
            } else {
                find_forbidden(child, &child_path)
            }
        }),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, child)| find_forbidden(child, &format!("{}[{}]", path, i))),
        _ => None,
    }
}

/// Validate with default options
///
/// # Errors
///
/// Returns `EngineError::ContractViolation` naming the first offending path.
pub fn validate_output(output: &Value) -> Result<(), EngineError> {
    validate_output_with(output, ValidateOptions::default())
}

/// Validate a serialized envelope
///
/// # Arguments
///
/// * `output` - Serialized role view
/// * `opts` - Validator options
///
/// # Errors
///
/// Returns `EngineError::ContractViolation` naming the first offending path.
pub fn validate_output_with(output: &Value, opts: ValidateOptions) -> Result<(), EngineError> {
    let root = as_object(output, "$")?;

    for key in REQUIRED_KEYS {
        if !root.contains_key(key) {
            return Err(violation("$", format!("missing required key '{}'", key)));
        }
    }

    let engine = as_object(&root["engine"], "$.engine")?;
    if engine.get("name").and_then(Value::as_str) != Some(ENGINE_NAME) {
        return Err(violation("$.engine.name", format!("must be '{}'", ENGINE_NAME)));
    }
    if engine.get("version").and_then(Value::as_str) != Some(ENGINE_VERSION) {
        return Err(violation(
            "$.engine.version",
            format!("must be '{}'", ENGINE_VERSION),
        ));
    }

    if !is_hyphenated_uuid(&root["analysis_id"]) {
        return Err(violation("$.analysis_id", "must look like a UUID"));
    }

    let role: Role = serde_json::from_value(root["role"].clone())
        .map_err(|_| violation("$.role", "must be one of: guest, free, pro"))?;

    as_object(&root["track"], "$.track")?;
    let metrics = as_object(&root["metrics"], "$.metrics")?;
    if !root["warnings"].is_array() {
        return Err(violation("$.warnings", "must be an array"));
    }

    match (role, root.get("events")) {
        (Role::Guest, Some(events)) => {
            let events = as_object(events, "$.events")?;
            if opts.guest_events_policy == GuestEventsPolicy::EmptyObject && !events.is_empty() {
                return Err(violation("$.events", "guest events must be {}"));
            }
        }
        (Role::Guest, None) => {
            if opts.guest_events_policy == GuestEventsPolicy::EmptyObject {
                return Err(violation("$", "guest must include events: {}"));
            }
        }
        (_, Some(events)) => {
            as_object(events, "$.events")?;
        }
        (_, None) => {}
    }

    for (name, block) in metrics {
        let path = format!("$.metrics.{}", name);
        let block = as_object(block, &path)?;
        if block.contains_key("locked") {
            if name == "bpm" || name == "key_mode" {
                return Err(violation(
                    format!("{}.locked", path),
                    "bpm/key_mode must never be locked; omit instead",
                ));
            }
            validate_locked(block, &path)?;
        } else if role == Role::Guest {
            validate_guest_metric(name, block, &path)?;
        }
    }

    Ok(())
}

fn validate_locked(block: &Map<String, Value>, path: &str) -> Result<(), EngineError> {
    if block.get("locked") != Some(&Value::Bool(true)) {
        return Err(violation(format!("{}.locked", path), "if present, locked must be true"));
    }
    let hint_ok = block
        .get("unlock_hint")
        .and_then(Value::as_str)
        .is_some_and(|h| !h.trim().is_empty());
    if !hint_ok {
        return Err(violation(
            format!("{}.unlock_hint", path),
            "locked metrics must include non-empty unlock_hint",
        ));
    }
    let mut extra: Vec<&str> = block
        .keys()
        .map(String::as_str)
        .filter(|k| !LOCKED_ALLOWED_KEYS.contains(k))
        .collect();
    if !extra.is_empty() {
        extra.sort_unstable();
        return Err(violation(
            path,
            format!("locked metric must not include: {}", extra.join(", ")),
        ));
    }
    if let Some(preview) = block.get("preview") {
        let preview = as_object(preview, &format!("{}.preview", path))?;
        if preview.is_empty() {
            return Err(violation(
                format!("{}.preview", path),
                "empty preview must be omitted",
            ));
        }
    }
    Ok(())
}

fn validate_guest_metric(
    name: &str,
    block: &Map<String, Value>,
    path: &str,
) -> Result<(), EngineError> {
    let block_value = Value::Object(block.clone());
    if let Some(leak) = find_forbidden(&block_value, path) {
        return Err(violation(leak, "guest must not receive this field"));
    }

    if let Some(candidates) = block.get("candidates") {
        let cpath = format!("{}.candidates", path);
        if name != "bpm" {
            return Err(violation(cpath, "guest candidates only allowed for bpm"));
        }
        let items = candidates
            .as_array()
            .ok_or_else(|| violation(cpath.as_str(), "must be an array"))?;
        for (i, item) in items.iter().enumerate() {
            let ipath = format!("{}[{}]", cpath, i);
            let item = as_object(item, &ipath)?;
            let mut extra: Vec<&str> = item
                .keys()
                .map(String::as_str)
                .filter(|k| *k != "value" && *k != "rank")
                .collect();
            if !extra.is_empty() {
                extra.sort_unstable();
                return Err(violation(
                    ipath,
                    format!("guest candidates must not include: {}", extra.join(", ")),
                ));
            }
            if !item.get("rank").is_some_and(Value::is_u64) {
                return Err(violation(format!("{}.rank", ipath), "rank must be an int"));
            }
            if !item.contains_key("value") {
                return Err(violation(format!("{}.value", ipath), "value is required"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(role: &str) -> Value {
        json!({
            "engine": {"name": "bnk-analysis-engine", "version": "v1"},
            "analysis_id": "6f1c2a9e-3b4d-4c5e-8f70-91a2b3c4d5e6",
            "created_at": "2026-03-01T12:00:00Z",
            "role": role,
            "track": {"duration_seconds": 30.0, "format": "wav", "sample_rate_hz": 44100, "channels": 2},
            "metrics": {
                "bpm": {
                    "value": {"value_rounded": 120},
                    "candidates": [{"value": {"value_rounded": 120}, "rank": 1}],
                    "method": "tempo_candidates_v1",
                    "limits": "l"
                }
            },
            "events": {},
            "warnings": []
        })
    }

    fn path_of(result: Result<(), EngineError>) -> String {
        match result {
            Err(EngineError::ContractViolation { path, .. }) => path,
            other => panic!("expected contract violation, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_guest_envelope() {
        assert!(validate_output(&envelope("guest")).is_ok());
        assert!(validate_output(&envelope("pro")).is_ok());
    }

    #[test]
    fn test_missing_key_and_bad_identity() {
        let mut v = envelope("free");
        v.as_object_mut().unwrap().remove("warnings");
        assert_eq!(path_of(validate_output(&v)), "$");

        let mut v = envelope("free");
        v["engine"]["version"] = json!("v2");
        assert_eq!(path_of(validate_output(&v)), "$.engine.version");

        let mut v = envelope("free");
        v["analysis_id"] = json!("not-a-uuid");
        assert_eq!(path_of(validate_output(&v)), "$.analysis_id");

        let mut v = envelope("free");
        v["role"] = json!("admin");
        assert_eq!(path_of(validate_output(&v)), "$.role");
    }

    #[test]
    fn test_guest_events_policy() {
        let mut v = envelope("guest");
        v["events"] = json!({"clipping": {}});
        assert_eq!(path_of(validate_output(&v)), "$.events");

        let mut v = envelope("guest");
        v.as_object_mut().unwrap().remove("events");
        assert!(validate_output(&v).is_err());
        let opts = ValidateOptions {
            guest_events_policy: GuestEventsPolicy::OmitOk,
        };
        assert!(validate_output_with(&v, opts).is_ok());
    }

    #[test]
    fn test_guest_leaks_rejected() {
        let mut v = envelope("guest");
        v["metrics"]["bpm"]["confidence"] = json!("high");
        assert_eq!(path_of(validate_output(&v)), "$.metrics.bpm.confidence");

        let mut v = envelope("guest");
        v["metrics"]["bpm"]["value"]["value_exact"] = json!(120.2);
        assert_eq!(path_of(validate_output(&v)), "$.metrics.bpm.value.value_exact");

        let mut v = envelope("guest");
        v["metrics"]["bpm"]["candidates"][0]["relation"] = json!("normal");
        assert_eq!(path_of(validate_output(&v)), "$.metrics.bpm.candidates[0]");

        let mut v = envelope("guest");
        v["metrics"]["loudness"] = json!({"value": -9, "candidates": []});
        assert_eq!(path_of(validate_output(&v)), "$.metrics.loudness.candidates");

        let mut v = envelope("guest");
        v["metrics"]["key_mode"] = json!({
            "value": "F#",
            "mode": "minor",
            "candidates": [{"value": "F# minor", "rank": 1}],
            "method": "key_mode_candidates_v1",
            "limits": "l"
        });
        assert_eq!(path_of(validate_output(&v)), "$.metrics.key_mode.candidates");

        // The same detail is fine for paying roles
        let mut v = envelope("pro");
        v["metrics"]["bpm"]["confidence"] = json!("high");
        assert!(validate_output(&v).is_ok());
    }

    #[test]
    fn test_locked_invariants() {
        let mut v = envelope("free");
        v["metrics"]["loudness"] = json!({"locked": true, "unlock_hint": "Upgrade"});
        assert!(validate_output(&v).is_ok());

        v["metrics"]["loudness"] = json!({"locked": true, "unlock_hint": " "});
        assert_eq!(path_of(validate_output(&v)), "$.metrics.loudness.unlock_hint");

        v["metrics"]["loudness"] = json!({"locked": true, "unlock_hint": "u", "value": 1});
        assert_eq!(path_of(validate_output(&v)), "$.metrics.loudness");

        v["metrics"]["loudness"] = json!({"locked": true, "unlock_hint": "u", "preview": {}});
        assert_eq!(path_of(validate_output(&v)), "$.metrics.loudness.preview");

        v["metrics"]["loudness"] = json!({"locked": false, "unlock_hint": "u"});
        assert_eq!(path_of(validate_output(&v)), "$.metrics.loudness.locked");

        let mut v = envelope("free");
        v["metrics"]["bpm"] = json!({"locked": true, "unlock_hint": "u"});
        assert_eq!(path_of(validate_output(&v)), "$.metrics.bpm.locked");
    }
}
