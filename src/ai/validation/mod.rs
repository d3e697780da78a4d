//! Structured Output Validation
//!
//! Turns a model's JSON reply into a typed value.
//! - JSON repair for fenced, wrapped or truncated replies
//! - Typed decoding whose failures surface as validation errors
//!
//! Fail fast on structural errors, repair on format issues.

mod json_repair;

pub use json_repair::{JsonRepairer, extract_json_from_response};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::types::{AnalystError, Result, ValidationError, ValidationErrorKind};

/// Decode a structured reply into `T`.
///
/// Replies that arrive as a JSON string are repaired and parsed first.
pub fn decode_structured<T: DeserializeOwned>(schema_name: &str, value: Value) -> Result<T> {
    let value = match value {
        Value::String(text) => extract_json_from_response(&text)?,
        other => other,
    };

    serde_json::from_value(value).map_err(|e| {
        AnalystError::Validation(
            ValidationError::new(
                ValidationErrorKind::Schema,
                format!("reply does not match schema: {}", e),
            )
            .with_field(schema_name),
        )
    })
}

/// Require a non-blank string field
pub fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AnalystError::invalid_output(
            ValidationErrorKind::MissingField,
            field,
            "must not be blank",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Verdict {
        is_special_case: bool,
        special_case_reason: String,
    }

    #[test]
    fn test_decode_object() {
        let verdict: Verdict = decode_structured(
            "verdict",
            json!({"is_special_case": true, "special_case_reason": "Sales halved"}),
        )
        .unwrap();
        assert!(verdict.is_special_case);
        assert_eq!(verdict.special_case_reason, "Sales halved");
    }

    #[test]
    fn test_decode_fenced_string() {
        let raw = "```json\n{\"is_special_case\": false, \"special_case_reason\": \"\"}\n```";
        let verdict: Verdict = decode_structured("verdict", Value::String(raw.into())).unwrap();
        assert!(!verdict.is_special_case);
    }

    #[test]
    fn test_schema_mismatch_is_validation_error() {
        let err = decode_structured::<Verdict>("verdict", json!({"is_special_case": "maybe"}))
            .unwrap_err();
        assert!(matches!(err, AnalystError::Validation(_)));
        assert!(err.to_string().contains("'verdict'"));
    }

    #[test]
    fn test_require_text() {
        assert!(require_text("reason", "because").is_ok());
        assert!(require_text("reason", "  ").is_err());
    }
}
