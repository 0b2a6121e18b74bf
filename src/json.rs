//! Tolerant extraction of a JSON object from generative-model output.
//!
//! Models asked for "strict JSON" still wrap it in prose or code fences now
//! and then. [`extract_json_object`] tries, in order:
//!
//! 1. the whole (trimmed) response as JSON;
//! 2. the first balanced top-level `{ … }` span, scanning with awareness of
//!    string literals and escapes so braces inside strings do not count;
//!
//! and otherwise fails with a [`JsonExtractError`] naming what went wrong.

use crate::error::JsonExtractError;
use serde_json::{Map, Value};

/// Parse the first JSON object out of `text`.
pub fn extract_json_object(text: &str) -> Result<Map<String, Value>, JsonExtractError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(JsonExtractError::Empty);
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return match value {
            Value::Object(map) => Ok(map),
            other => Err(JsonExtractError::NotAnObject(kind_of(&other))),
        };
    }

    let span = first_balanced_object(trimmed).ok_or(JsonExtractError::NoObject)?;
    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(JsonExtractError::NotAnObject(kind_of(&other))),
        Err(e) => Err(JsonExtractError::Malformed(e.to_string())),
    }
}

/// Byte span of the first `{` and its matching `}`.
///
/// Returns `None` when there is no `{`, or when the first one is never
/// closed.
pub fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }
    None
}

pub(crate) fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_strict_json() {
        let map = extract_json_object(r#"{"summary": "ok"}"#).unwrap();
        assert_eq!(map["summary"], "ok");
    }

    #[test]
    fn recovers_object_from_code_fence() {
        let raw = "```json\n{\"faq\": {}, \"schedule\": [], \"summary\": \"s\"}\n```";
        let map = extract_json_object(raw).unwrap();
        assert_eq!(map["summary"], "s");
    }

    #[test]
    fn recovers_first_object_when_prose_follows() {
        let raw = r#"Here you go: {"a": 1} and also {"b": 2}. Hope it helps!"#;
        let map = extract_json_object(raw).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["a"], 1);
    }

    #[test]
    fn braces_inside_strings_do_not_close_the_object() {
        let raw = r#"note: {"notes": "use } and { freely", "x": "say \"}\""} trailing"#;
        let span = first_balanced_object(raw).unwrap();
        assert!(span.ends_with("\"}"), "got: {span}");
        let map = extract_json_object(raw).unwrap();
        assert_eq!(map["notes"], "use } and { freely");
    }

    #[test]
    fn nested_objects_are_kept_whole() {
        let raw = r#"Result -> {"faq": {"late_work_policy": "none"}, "summary": "s"} <-"#;
        let map = extract_json_object(raw).unwrap();
        assert_eq!(map["faq"]["late_work_policy"], "none");
    }

    #[test]
    fn empty_response_is_named() {
        assert_eq!(extract_json_object("   \n"), Err(JsonExtractError::Empty));
    }

    #[test]
    fn prose_without_braces_is_no_object() {
        assert_eq!(
            extract_json_object("I could not read the syllabus."),
            Err(JsonExtractError::NoObject)
        );
    }

    #[test]
    fn unclosed_object_is_no_object() {
        assert_eq!(
            extract_json_object(r#"partial {"a": 1"#),
            Err(JsonExtractError::NoObject)
        );
    }

    #[test]
    fn balanced_but_invalid_is_malformed() {
        let err = extract_json_object("text {not: json} text").unwrap_err();
        assert!(matches!(err, JsonExtractError::Malformed(_)));
    }

    #[test]
    fn top_level_array_is_not_an_object() {
        assert_eq!(
            extract_json_object("[1, 2]"),
            Err(JsonExtractError::NotAnObject("an array"))
        );
    }
}
