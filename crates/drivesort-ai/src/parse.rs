//! Turning model output into a verdict the rest of the system can trust.
//!
//! Two steps: [`parse_verdict`] reads `category`/`confidence` out of a JSON
//! object, and [`Verdict::sanitize`] maps the category onto the closed
//! [`Taxonomy`] and applies the confidence threshold.
//!
//! Local models do not reliably emit bare JSON, so [`extract_json_object`]
//! first cuts the JSON-looking span out of free text.

use std::sync::LazyLock;

use drivesort_core::{Category, Taxonomy};
use regex::Regex;
use serde_json::Value;

use crate::InferenceError;

// Greedy, dot matches newline: first `{` through last `}`.
static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid JSON object pattern"));

/// Find the JSON object embedded in a free-form model response.
///
/// Returns the span from the first `{` to the last `}`. Nested objects come
/// back whole. If the response holds two separate objects the span covers
/// both, plus whatever lies between them, and will usually fail to parse.
pub fn extract_json_object(text: &str) -> Option<&str> {
    JSON_OBJECT.find(text).map(|m| m.as_str())
}

/// A model's raw answer, before validation against the taxonomy.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    /// As the model spelled it. May not be a configured category.
    pub category: String,
    /// Clamped to 0–100.
    pub confidence: u8,
}

/// A verdict mapped onto the closed category set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    /// Configured category, or the fallback when the model named something else.
    pub category: Category,
    pub confidence: u8,
    /// Known category and confidence at or above the threshold.
    pub confident: bool,
}

impl Verdict {
    pub fn sanitize(&self, taxonomy: &Taxonomy, threshold: u8) -> Sanitized {
        let category = taxonomy.resolve(self.category.trim());
        let confident = !category.is_fallback() && self.confidence >= threshold;
        Sanitized {
            category,
            confidence: self.confidence,
            confident,
        }
    }
}

/// Parse a JSON object with `category` and `confidence` keys.
///
/// `confidence` may be an integer, a float (truncated), or a numeric string
/// with an optional `%` suffix. Values outside 0–100 are clamped. A
/// non-string `category` is kept in its JSON form and will not match any
/// configured category.
pub fn parse_verdict(json: &str) -> Result<Verdict, InferenceError> {
    let value: Value = serde_json::from_str(json)?;
    let obj = value
        .as_object()
        .ok_or(InferenceError::MissingField("category"))?;

    let category = match obj.get("category") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => return Err(InferenceError::MissingField("category")),
    };

    let confidence = match obj.get("confidence") {
        Some(v) => parse_confidence(v)?,
        None => return Err(InferenceError::MissingField("confidence")),
    };

    Ok(Verdict {
        category,
        confidence,
    })
}

fn parse_confidence(value: &Value) -> Result<u8, InferenceError> {
    let raw = match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| InferenceError::InvalidConfidence(n.to_string()))?,
        Value::String(s) => s
            .trim()
            .trim_end_matches('%')
            .trim()
            .parse::<f64>()
            .map_err(|_| InferenceError::InvalidConfidence(s.clone()))?,
        other => return Err(InferenceError::InvalidConfidence(other.to_string())),
    };
    if raw.is_nan() {
        return Err(InferenceError::InvalidConfidence(value.to_string()));
    }
    Ok(raw.clamp(0.0, 100.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_from_prose() {
        let text = r#"Sure! {"category": "Finance", "confidence": 95} Hope that helps."#;
        assert_eq!(
            extract_json_object(text),
            Some(r#"{"category": "Finance", "confidence": 95}"#)
        );
    }

    #[test]
    fn extract_bare_object() {
        let text = r#"{"category": "HR", "confidence": 80}"#;
        assert_eq!(extract_json_object(text), Some(text));
    }

    #[test]
    fn extract_spans_lines() {
        let text = "Here you go:\n{\n  \"category\": \"HR\",\n  \"confidence\": 80\n}\n";
        let obj = extract_json_object(text).unwrap();
        assert!(obj.starts_with('{') && obj.ends_with('}'));
        assert_eq!(parse_verdict(obj).unwrap().category, "HR");
    }

    #[test]
    fn extract_keeps_nested_braces() {
        let text = r#"x {"category": "HR", "meta": {"k": 1}, "confidence": 75} y"#;
        let obj = extract_json_object(text).unwrap();
        let v = parse_verdict(obj).unwrap();
        assert_eq!(v.category, "HR");
        assert_eq!(v.confidence, 75);
    }

    #[test]
    fn extract_over_captures_two_objects() {
        let text = r#"{"category": "HR", "confidence": 75} or {"category": "Finance", "confidence": 70}"#;
        let obj = extract_json_object(text).unwrap();
        assert_eq!(obj, text);
        assert!(parse_verdict(obj).is_err());
    }

    #[test]
    fn extract_none_without_braces() {
        assert_eq!(extract_json_object("Finance, 90% sure"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn parse_integer_confidence() {
        let v = parse_verdict(r#"{"category": "Finance", "confidence": 95}"#).unwrap();
        assert_eq!(
            v,
            Verdict {
                category: "Finance".into(),
                confidence: 95
            }
        );
    }

    #[test]
    fn parse_float_and_string_confidence() {
        let v = parse_verdict(r#"{"category": "HR", "confidence": 72.9}"#).unwrap();
        assert_eq!(v.confidence, 72);
        let v = parse_verdict(r#"{"category": "HR", "confidence": " 85% "}"#).unwrap();
        assert_eq!(v.confidence, 85);
    }

    #[test]
    fn parse_clamps_confidence() {
        let v = parse_verdict(r#"{"category": "HR", "confidence": 250}"#).unwrap();
        assert_eq!(v.confidence, 100);
        let v = parse_verdict(r#"{"category": "HR", "confidence": -5}"#).unwrap();
        assert_eq!(v.confidence, 0);
    }

    #[test]
    fn parse_rejects_missing_keys() {
        assert!(matches!(
            parse_verdict(r#"{"confidence": 90}"#),
            Err(InferenceError::MissingField("category"))
        ));
        assert!(matches!(
            parse_verdict(r#"{"category": "HR"}"#),
            Err(InferenceError::MissingField("confidence"))
        ));
    }

    #[test]
    fn parse_rejects_bad_confidence() {
        assert!(matches!(
            parse_verdict(r#"{"category": "HR", "confidence": "very"}"#),
            Err(InferenceError::InvalidConfidence(_))
        ));
        assert!(matches!(
            parse_verdict(r#"{"category": "HR", "confidence": null}"#),
            Err(InferenceError::InvalidConfidence(_))
        ));
    }

    #[test]
    fn parse_rejects_non_json() {
        assert!(matches!(parse_verdict("{category: HR}"), Err(InferenceError::Json(_))));
        assert!(parse_verdict("[1, 2]").is_err());
    }

    #[test]
    fn sanitize_unknown_category_is_fallback() {
        let tax = Taxonomy::default();
        let v = Verdict {
            category: "Bananas".into(),
            confidence: 99,
        };
        let s = v.sanitize(&tax, 70);
        assert!(s.category.is_fallback());
        assert!(!s.confident);
    }

    #[test]
    fn sanitize_non_string_category_is_fallback() {
        let tax = Taxonomy::default();
        let v = parse_verdict(r#"{"category": 3, "confidence": 99}"#).unwrap();
        assert!(v.sanitize(&tax, 70).category.is_fallback());
    }

    #[test]
    fn sanitize_threshold_is_inclusive() {
        let tax = Taxonomy::default();
        let at = Verdict {
            category: "Finance".into(),
            confidence: 70,
        };
        let below = Verdict {
            category: "Finance".into(),
            confidence: 69,
        };
        assert!(at.sanitize(&tax, 70).confident);
        assert!(!below.sanitize(&tax, 70).confident);
        assert_eq!(below.sanitize(&tax, 70).category.as_str(), "Finance");
    }
}
