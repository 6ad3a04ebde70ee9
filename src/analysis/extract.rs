use serde_json::Value;

use crate::error::AiError;

/// Best-effort structured-output extractor: decode the substring between
/// the first `{` and the last `}` of the response text.
///
/// This is deliberately not a JSON-in-text parser. A literal brace inside
/// a string value before the object opens or after it closes will shift
/// the window and fail the decode; known limitation, kept as-is.
///
/// # Errors
/// [`AiError::Parse`] when the text is empty, contains no brace pair, or
/// the windowed substring is not valid JSON.
pub fn extract_first_json(text: &str) -> Result<Value, AiError> {
    if text.is_empty() {
        return Err(AiError::Parse("Empty model response".to_string()));
    }

    let first = text.find('{');
    let last = text.rfind('}');
    let (first, last) = match (first, last) {
        (Some(first), Some(last)) if last > first => (first, last),
        _ => {
            return Err(AiError::Parse(
                "Model response did not contain JSON".to_string(),
            ))
        }
    };

    let candidate = &text[first..=last];
    serde_json::from_str(candidate).map_err(|e| {
        let truncated: String = candidate.chars().take(200).collect();
        AiError::Parse(format!(
            "Failed to decode model response as JSON: {}. Candidate (first 200 chars): {}",
            e, truncated
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_bare_object() {
        let value = extract_first_json(r#"{"a": 1}"#).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_extracts_object_from_prose_and_fences() {
        let text = "Here is the analysis:\n```json\n{\"a\": {\"b\": 2}}\n```\n";
        let value = extract_first_json(text).unwrap();
        assert_eq!(value["a"]["b"], 2);
    }

    #[test]
    fn test_empty_text_is_a_parse_error() {
        let err = extract_first_json("").unwrap_err();
        assert!(matches!(err, AiError::Parse(_)));
        assert!(err.to_string().contains("Empty"));
    }

    #[test]
    fn test_no_braces_is_a_parse_error() {
        let err = extract_first_json("no json here").unwrap_err();
        assert!(err.to_string().contains("did not contain JSON"));
    }

    #[test]
    fn test_reversed_braces_are_a_parse_error() {
        let err = extract_first_json("} backwards {").unwrap_err();
        assert!(err.to_string().contains("did not contain JSON"));
    }

    #[test]
    fn test_invalid_candidate_is_a_parse_error() {
        let err = extract_first_json("{not valid json}").unwrap_err();
        assert!(err.to_string().contains("Failed to decode"));
    }

    // The documented limitation: a stray closing brace in trailing prose
    // widens the window past the real object.
    #[test]
    fn test_trailing_brace_in_prose_defeats_the_extractor() {
        let text = r#"{"a": 1} and a stray } here"#;
        assert!(extract_first_json(text).is_err());
    }

    #[test]
    fn test_nested_braces_inside_strings_within_object_are_fine() {
        let text = r#"prefix {"note": "uses {braces} inside"} "#;
        let value = extract_first_json(text).unwrap();
        assert_eq!(value["note"], "uses {braces} inside");
    }
}
