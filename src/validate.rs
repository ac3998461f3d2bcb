// src/validate.rs

//! Parsing and advisory shape checks for backend payloads.

use serde_json::Value;
use strum::Display;
use tracing::warn;

/// Expected payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SchemaKind {
    Scan,
    Score,
    Dora,
    Nis2,
}

const SCORE_KEYS: &[&str] = &["overall", "technical", "behavioral", "organizational"];

/// Parses raw backend output. Never panics.
pub fn safe_parse(raw: &str) -> Result<Value, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("empty response".to_string());
    }
    serde_json::from_str(trimmed).map_err(|e| format!("invalid JSON: {}", e))
}

/// Returns whether `value` looks like `kind`. A mismatch is logged and
/// nothing else; callers still persist the payload.
pub fn validate_shape(value: &Value, kind: SchemaKind) -> bool {
    let ok = match kind {
        SchemaKind::Scan => value.is_object(),
        SchemaKind::Score => score_section(value).is_some(),
        SchemaKind::Dora | SchemaKind::Nis2 => compliance_section(value).is_some(),
    };
    if !ok {
        warn!(%kind, "Payload does not match the expected shape.");
    }
    ok
}

/// The object holding the score factors: the value itself or its
/// `score` / `data` member.
pub fn score_section(value: &Value) -> Option<&Value> {
    let has_factors = |v: &Value| v.is_object() && SCORE_KEYS.iter().any(|k| v.get(k).is_some());
    [Some(value), value.get("score"), value.get("data")]
        .into_iter()
        .flatten()
        .find(|v| has_factors(*v))
}

/// The object holding a compliance assessment: the value itself or its
/// `result` / `data` member.
pub fn compliance_section(value: &Value) -> Option<&Value> {
    let has_status = |v: &Value| v.get("complianceStatus").or_else(|| v.get("compliance_status")).is_some();
    [Some(value), value.get("result"), value.get("data")]
        .into_iter()
        .flatten()
        .find(|v| has_status(*v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn malformed_input_is_a_failure() {
        let err = safe_parse("{not json").unwrap_err();
        assert!(!err.is_empty());
        assert_eq!(safe_parse("   ").unwrap_err(), "empty response");
    }

    #[test]
    fn valid_input_parses() {
        assert_eq!(safe_parse(" {\"a\": 1}\n").unwrap(), json!({"a": 1}));
    }

    #[test]
    fn score_factors_may_be_nested() {
        assert!(validate_shape(&json!({"overall": 0.5}), SchemaKind::Score));
        assert!(validate_shape(&json!({"score": {"technical": 80}}), SchemaKind::Score));
        assert!(!validate_shape(&json!({"message": "ok"}), SchemaKind::Score));
    }

    #[test]
    fn compliance_needs_a_status() {
        assert!(validate_shape(&json!({"complianceStatus": "Compliant"}), SchemaKind::Dora));
        assert!(validate_shape(&json!({"data": {"compliance_status": "Unknown"}}), SchemaKind::Nis2));
        assert!(!validate_shape(&json!([1]), SchemaKind::Nis2));
        assert!(!validate_shape(&json!("text"), SchemaKind::Scan));
    }
}
