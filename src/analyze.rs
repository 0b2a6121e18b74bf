//! Entry points the web layer calls: OCR, extraction and Q&A.
//!
//! [`SyllabusAnalyzer`] hides the mock/real split. In mock mode every call
//! returns the canned data in [`crate::mock`] without touching a PDF
//! library or network; otherwise the calls go through the adapters in
//! [`crate::pipeline`] with the probed [`Capabilities`].

use crate::capabilities::Capabilities;
use crate::config::DashboardConfig;
use crate::error::DashboardError;
use crate::mock;
use crate::pipeline::extract::{self, Extraction};
use crate::pipeline::{ocr, qa};
use std::time::Instant;
use tracing::info;

/// OCR, extraction and Q&A over one set of capabilities.
#[derive(Debug, Clone)]
pub struct SyllabusAnalyzer {
    mock: bool,
    caps: Capabilities,
}

impl SyllabusAnalyzer {
    /// Build from config: mock mode skips probing entirely.
    pub fn from_config(config: &DashboardConfig) -> Self {
        if config.mock {
            return Self::mock();
        }
        let caps = Capabilities::probe(config);
        caps.log_report();
        Self { mock: false, caps }
    }

    /// Analyzer that serves canned data only.
    pub fn mock() -> Self {
        Self {
            mock: true,
            caps: Capabilities::none("disabled in mock mode"),
        }
    }

    /// Analyzer over explicitly supplied capabilities.
    pub fn with_capabilities(caps: Capabilities) -> Self {
        Self { mock: false, caps }
    }

    pub fn is_mock(&self) -> bool {
        self.mock
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Extract the text of an uploaded PDF.
    pub async fn ocr_pdf(&self, pdf_bytes: Vec<u8>) -> Result<String, DashboardError> {
        if self.mock {
            return Ok(mock::OCR_TEXT.to_string());
        }
        info!("Starting OCR: {} bytes", pdf_bytes.len());
        ocr::recognize_pdf(&self.caps, pdf_bytes).await
    }

    /// Turn OCR text into FAQ, schedule and summary.
    pub async fn extract(&self, ocr_text: &str) -> Result<Extraction, DashboardError> {
        if self.mock {
            return Ok(Extraction {
                faq: mock::faq(),
                schedule: mock::schedule(),
                summary: mock::SUMMARY.to_string(),
                dropped_rows: 0,
            });
        }
        let generator = self.caps.generator.get()?;
        let start = Instant::now();
        let extraction = extract::extract_structured(generator, ocr_text).await?;
        info!("Extraction finished in {:?}", start.elapsed());
        Ok(extraction)
    }

    /// Answer a question from the OCR text.
    pub async fn answer(&self, ocr_text: &str, question: &str) -> Result<String, DashboardError> {
        if self.mock {
            return Ok(mock::answer(question));
        }
        let generator = self.caps.generator.get()?;
        qa::answer_question(generator, ocr_text, question).await
    }
}
