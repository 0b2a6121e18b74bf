//! Structured extraction: OCR text → `{faq, schedule, summary}`.
//!
//! The generative service is asked for strict JSON, but responses regularly
//! arrive wrapped in prose or fences. [`parse_extraction`] locates the
//! object with [`extract_json_object`] and then coerces each part on its
//! own, so one bad schedule row costs that row only.

use crate::error::DashboardError;
use crate::json::{extract_json_object, kind_of};
use crate::pipeline::llm::Generator;
use crate::prompts::extraction_prompt;
use crate::schedule::{coerce_schedule, FaqMap, ScheduleEntry};
use serde_json::Value;
use tracing::{info, warn};

/// What the extraction step produced for one syllabus.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub faq: FaqMap,
    /// Sorted by week ascending.
    pub schedule: Vec<ScheduleEntry>,
    pub summary: String,
    /// Schedule items that could not be coerced and were skipped.
    pub dropped_rows: usize,
}

/// Ask the generative service to structure `ocr_text`.
pub async fn extract_structured(
    generator: &Generator,
    ocr_text: &str,
) -> Result<Extraction, DashboardError> {
    let raw = generator.complete(&extraction_prompt(ocr_text)).await?;
    let extraction = parse_extraction(&raw)?;
    info!(
        "Extraction: {} schedule rows, summary {} chars",
        extraction.schedule.len(),
        extraction.summary.len()
    );
    Ok(extraction)
}

/// Parse a raw generative response into an [`Extraction`].
///
/// Missing `faq` gives an empty map, missing `summary` gives `""` and a
/// `schedule` that is not an array gives no rows.
pub fn parse_extraction(raw: &str) -> Result<Extraction, DashboardError> {
    let object = extract_json_object(raw)?;

    let faq = match object.get("faq") {
        Some(Value::Object(map)) => FaqMap::from_json(map),
        _ => FaqMap::default(),
    };

    let (schedule, dropped_rows) = match object.get("schedule") {
        Some(Value::Array(items)) => coerce_schedule(items),
        Some(Value::Null) | None => (Vec::new(), 0),
        Some(other) => {
            warn!("Ignoring schedule that is {} instead of an array", kind_of(other));
            (Vec::new(), 0)
        }
    };
    if dropped_rows > 0 {
        warn!("Dropped {} schedule row(s) that could not be coerced", dropped_rows);
    }

    let summary = match object.get("summary") {
        Some(Value::String(s)) => s.trim().to_string(),
        _ => String::new(),
    };

    Ok(Extraction {
        faq,
        schedule,
        summary,
        dropped_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JsonExtractError;

    #[test]
    fn parses_fenced_response() {
        let raw = r#"Here you go:
```json
{
  "faq": {"late_work_policy": "10%/day", "attendance_policy": "Required", "course_structure": "Lectures"},
  "schedule": [
    {"week": 2, "assignments": 1, "weight_pct": 10, "notes": "HW1"},
    {"week": 1, "assignments": 0, "weight_pct": 0, "notes": " intro "}
  ],
  "summary": "  Short course.  "
}
```"#;
        let ex = parse_extraction(raw).unwrap();
        assert_eq!(ex.faq.get("late_work_policy"), "10%/day");
        assert_eq!(ex.schedule.len(), 2);
        assert_eq!(ex.schedule[0].week, 1);
        assert_eq!(ex.schedule[0].notes, "intro");
        assert_eq!(ex.summary, "Short course.");
        assert_eq!(ex.dropped_rows, 0);
    }

    #[test]
    fn bad_rows_are_dropped_and_counted() {
        let raw = r#"{"schedule": [
            {"week": 1, "assignments": 1, "weight_pct": 5},
            {"week": "soon", "assignments": 1},
            "not an object",
            {"assignments": 2}
        ]}"#;
        let ex = parse_extraction(raw).unwrap();
        assert_eq!(ex.schedule.len(), 1);
        assert_eq!(ex.dropped_rows, 3);
    }

    #[test]
    fn missing_parts_get_defaults() {
        let ex = parse_extraction("{}").unwrap();
        assert_eq!(ex, Extraction::default());
        assert_eq!(ex.faq.get("course_structure"), "—");
    }

    #[test]
    fn non_array_schedule_yields_no_rows() {
        let ex = parse_extraction(r#"{"schedule": {"week": 1}, "summary": "s"}"#).unwrap();
        assert!(ex.schedule.is_empty());
        assert_eq!(ex.dropped_rows, 0);
        assert_eq!(ex.summary, "s");
    }

    #[test]
    fn prose_without_object_is_invalid_json() {
        let err = parse_extraction("Sorry, I cannot help with that.").unwrap_err();
        assert!(matches!(
            err,
            DashboardError::InvalidJson(JsonExtractError::NoObject)
        ));
        assert!(err.to_string().contains("did not return valid JSON"));
    }
}
