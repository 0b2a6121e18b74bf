//! Question answering over the stored OCR text.

use crate::error::DashboardError;
use crate::pipeline::llm::Generator;
use crate::prompts::{qa_prompt, QA_FALLBACK};
use tracing::info;

/// Ask the generative service `question` about `ocr_text`.
pub async fn answer_question(
    generator: &Generator,
    ocr_text: &str,
    question: &str,
) -> Result<String, DashboardError> {
    let raw = generator.complete(&qa_prompt(ocr_text, question)).await?;
    let answer = finalize_answer(&raw);
    info!("Answered question ({} chars)", answer.len());
    Ok(answer)
}

/// Trim the response; an empty one becomes [`QA_FALLBACK`].
pub fn finalize_answer(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        QA_FALLBACK.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_is_trimmed() {
        assert_eq!(finalize_answer("\n  Late work loses 10% per day.  \n"), "Late work loses 10% per day.");
    }

    #[test]
    fn blank_answer_falls_back() {
        assert_eq!(finalize_answer(""), QA_FALLBACK);
        assert_eq!(finalize_answer(" \n\t"), QA_FALLBACK);
    }
}
