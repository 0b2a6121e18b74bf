//! Prompts sent to the generative and vision services.
//!
//! Every prompt lives here so the adapters in [`crate::pipeline`] only deal
//! with transport and parsing, and tests can inspect the exact wording.

/// Instructions for turning OCR text into the `{faq, schedule, summary}` object.
pub const EXTRACTION_INSTRUCTIONS: &str = "You are extracting structured policy and schedule data from a course syllabus OCR text.
Return STRICT JSON with keys: faq, schedule, summary.
faq must include: late_work_policy, attendance_policy, course_structure (all strings).
schedule is an array of objects with keys: week (int), assignments (int), weight_pct (float), notes (string).
Interpret weights by week as the total percentage of final grade assessed that week (sum may be ~100%). \
If a week mentions multiple graded items, sum their percentages in that week and set assignments count accordingly. \
If an item is ungraded, weight_pct=0 but still increment assignments if it's an assignment.
summary: one-sentence overview.
Only output JSON. No markdown.";

/// Instructions for answering a question from the syllabus text alone.
pub const QA_INSTRUCTIONS: &str = "You are a helpful assistant answering questions ONLY from the provided syllabus text.
If the answer is not present, say you cannot find it. Keep responses concise.";

/// Returned when the generative service answers a question with nothing.
pub const QA_FALLBACK: &str = "I couldn't find that in the syllabus.";

/// System prompt for the `vlm` OCR backend: plain transcription, no markup.
pub const TRANSCRIBE_PAGE_PROMPT: &str = "You are an OCR engine. Transcribe ALL text visible in the page image exactly as written.
- Keep the reading order a human would use; keep line breaks between lines.
- Keep numbers, percentages and dates exactly as printed.
- Do NOT add commentary, headings, Markdown fences or formatting of your own.
- If the page has no text, output nothing.";

/// Full extraction prompt with the OCR text embedded.
pub fn extraction_prompt(ocr_text: &str) -> String {
    format!("{EXTRACTION_INSTRUCTIONS}\n\nOCR_TEXT_START\n{ocr_text}\nOCR_TEXT_END")
}

/// Full question-answering prompt with the syllabus and question embedded.
pub fn qa_prompt(ocr_text: &str, question: &str) -> String {
    format!(
        "{QA_INSTRUCTIONS}\nSYLLABUS_START\n{ocr_text}\nSYLLABUS_END\n\nQUESTION: {question}\nANSWER:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_prompt_fences_the_text() {
        let p = extraction_prompt("Week 1: intro");
        assert!(p.starts_with(EXTRACTION_INSTRUCTIONS));
        assert!(p.contains("OCR_TEXT_START\nWeek 1: intro\nOCR_TEXT_END"));
    }

    #[test]
    fn extraction_prompt_names_every_field() {
        for key in ["late_work_policy", "attendance_policy", "course_structure", "weight_pct", "summary"] {
            assert!(EXTRACTION_INSTRUCTIONS.contains(key), "missing {key}");
        }
    }

    #[test]
    fn qa_prompt_ends_with_answer_cue() {
        let p = qa_prompt("syllabus body", "Is attendance required?");
        assert!(p.contains("SYLLABUS_START\nsyllabus body\nSYLLABUS_END"));
        assert!(p.contains("QUESTION: Is attendance required?"));
        assert!(p.ends_with("ANSWER:"));
    }
}
