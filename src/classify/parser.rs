// src/classify/parser.rs
// Tolerant extraction of structured decisions from raw model output
//
// Local models rarely return clean JSON: responses arrive wrapped in markdown
// fences, prefixed with chatter, or with keys missing. Every failure path
// here is a typed ParseError carrying the raw text for diagnostics; this
// function is total over arbitrary input.

use serde_json::Value;
use thiserror::Error;

/// Keys the output-format instruction demands from every model.
const REQUIRED_KEYS: [&str; 3] = ["category", "confidence", "reasoning"];

/// A model responded, but its text could not be coerced into a decision.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON in model response ({source}); raw: {raw}")]
    Json {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("model response is not a JSON object; raw: {raw}")]
    NotAnObject { raw: String },

    #[error("model response missing keys [{missing}] (found [{found}]); raw: {raw}")]
    MissingKeys {
        missing: String,
        found: String,
        raw: String,
    },

    #[error("confidence value {value} is not numeric; raw: {raw}")]
    Confidence { value: String, raw: String },
}

/// A structured decision extracted from one model response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDecision {
    pub category: String,
    /// As reported by the model, not clamped to [0, 1].
    pub confidence: f32,
    pub reasoning: String,
}

/// Extract the content of a fenced code block opened with `opener`, if any.
fn block_after<'a>(text: &'a str, opener: &str) -> Option<&'a str> {
    let start = text.find(opener)? + opener.len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

/// Pick the JSON candidate out of possibly-fenced text: a ```json block if
/// present, else the first fenced block of any language, else the text as-is.
fn json_candidate(text: &str) -> &str {
    for tag in ["```json", "```JSON"] {
        if let Some(block) = block_after(text, tag) {
            return block;
        }
    }
    block_after(text, "```").unwrap_or(text)
}

/// Parse a raw model response into a [`ParsedDecision`].
pub fn parse_decision(raw: &str) -> Result<ParsedDecision, ParseError> {
    let trimmed = raw.trim();
    let candidate = json_candidate(trimmed);

    let value: Value = serde_json::from_str(candidate).map_err(|source| ParseError::Json {
        raw: raw.to_string(),
        source,
    })?;

    let object = value.as_object().ok_or_else(|| ParseError::NotAnObject {
        raw: raw.to_string(),
    })?;

    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .filter(|k| !object.contains_key(**k))
        .copied()
        .collect();
    if !missing.is_empty() {
        let found: Vec<&str> = object.keys().map(String::as_str).collect();
        return Err(ParseError::MissingKeys {
            missing: missing.join(", "),
            found: found.join(", "),
            raw: raw.to_string(),
        });
    }

    let confidence = coerce_confidence(&object["confidence"]).ok_or_else(|| {
        ParseError::Confidence {
            value: object["confidence"].to_string(),
            raw: raw.to_string(),
        }
    })?;

    Ok(ParsedDecision {
        category: stringify(&object["category"]),
        confidence,
        reasoning: stringify(&object["reasoning"]),
    })
}

/// Coerce a JSON value to f32: numbers directly, numeric strings leniently.
/// Out-of-range values pass through unclamped, but non-finite values are
/// rejected; winner selection compares confidences and NaN does not order.
fn coerce_confidence(value: &Value) -> Option<f32> {
    let coerced = match value {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.trim().parse::<f32>().ok(),
        _ => None,
    };
    coerced.filter(|c| c.is_finite())
}

/// Render a JSON value as plain text, without quoting strings.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{"category": "Garnishments", "confidence": 0.9, "reasoning": "Wage levy notice."}"#;

    #[test]
    fn test_plain_json() {
        let decision = parse_decision(VALID).unwrap();
        assert_eq!(decision.category, "Garnishments");
        assert_eq!(decision.confidence, 0.9);
        assert_eq!(decision.reasoning, "Wage levy notice.");
    }

    #[test]
    fn test_json_fence() {
        let raw = format!("```json\n{VALID}\n```");
        assert_eq!(parse_decision(&raw).unwrap(), parse_decision(VALID).unwrap());
    }

    #[test]
    fn test_plain_fence() {
        let raw = format!("```\n{VALID}\n```");
        assert_eq!(parse_decision(&raw).unwrap(), parse_decision(VALID).unwrap());
    }

    #[test]
    fn test_fence_with_surrounding_chatter() {
        let raw = format!("Sure, here is my classification:\n```json\n{VALID}\n```\nLet me know!");
        let decision = parse_decision(&raw).unwrap();
        assert_eq!(decision.category, "Garnishments");
    }

    #[test]
    fn test_leading_and_trailing_whitespace() {
        let raw = format!("  \n{VALID}\n  ");
        assert!(parse_decision(&raw).is_ok());
    }

    #[test]
    fn test_missing_key_names_keys() {
        let raw = r#"{"category": "Service", "confidence": 0.4}"#;
        match parse_decision(raw) {
            Err(ParseError::MissingKeys { missing, found, .. }) => {
                assert_eq!(missing, "reasoning");
                assert!(found.contains("category"));
                assert!(found.contains("confidence"));
            }
            other => panic!("expected MissingKeys, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_json_keeps_raw_text() {
        let raw = "I think this is a garnishment notice.";
        match parse_decision(raw) {
            Err(ParseError::Json { raw: kept, .. }) => assert_eq!(kept, raw),
            other => panic!("expected Json error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_object_json() {
        assert!(matches!(
            parse_decision(r#"["Garnishments", 0.9]"#),
            Err(ParseError::NotAnObject { .. })
        ));
    }

    #[test]
    fn test_confidence_as_string() {
        let raw = r#"{"category": "A", "confidence": "0.75", "reasoning": "r"}"#;
        assert_eq!(parse_decision(raw).unwrap().confidence, 0.75);
    }

    #[test]
    fn test_confidence_out_of_range_not_clamped() {
        let raw = r#"{"category": "A", "confidence": 1.8, "reasoning": "r"}"#;
        assert_eq!(parse_decision(raw).unwrap().confidence, 1.8);

        let raw = r#"{"category": "A", "confidence": -0.5, "reasoning": "r"}"#;
        assert_eq!(parse_decision(raw).unwrap().confidence, -0.5);
    }

    #[test]
    fn test_non_finite_confidence_rejected() {
        for value in ["NaN", "nan", "inf", "-inf", "infinity"] {
            let raw = format!(r#"{{"category": "A", "confidence": "{value}", "reasoning": "r"}}"#);
            assert!(
                matches!(parse_decision(&raw), Err(ParseError::Confidence { .. })),
                "confidence {value:?} must not parse"
            );
        }
    }

    #[test]
    fn test_non_numeric_confidence() {
        let raw = r#"{"category": "A", "confidence": "very sure", "reasoning": "r"}"#;
        assert!(matches!(
            parse_decision(raw),
            Err(ParseError::Confidence { .. })
        ));
    }

    #[test]
    fn test_unclosed_fence_falls_back_to_raw() {
        // Opening fence with no close: the candidate is the whole text, which
        // is not valid JSON, so this is a Json error rather than a panic.
        let raw = format!("```json\n{VALID}");
        assert!(matches!(
            parse_decision(&raw),
            Err(ParseError::Json { .. })
        ));
    }

    #[test]
    fn test_arbitrary_input_never_panics() {
        for raw in [
            "",
            "```",
            "``````",
            "```json```",
            "{}",
            "null",
            "true",
            "42",
            "\u{0}\u{1}\u{FFFD}",
            "```python\nprint('hi')\n```",
        ] {
            // Either outcome is fine; crossing the boundary as a panic is not.
            let _ = parse_decision(raw);
        }
    }

    #[test]
    fn test_empty_fenced_object_missing_all_keys() {
        match parse_decision("```json\n{}\n```") {
            Err(ParseError::MissingKeys { missing, .. }) => {
                assert!(missing.contains("category"));
                assert!(missing.contains("confidence"));
                assert!(missing.contains("reasoning"));
            }
            other => panic!("expected MissingKeys, got {:?}", other),
        }
    }
}
