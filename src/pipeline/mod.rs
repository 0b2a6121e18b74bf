//! Pipeline stages from uploaded PDF to structured syllabus data.
//!
//! ## Data Flow
//!
//! ```text
//! render ──▶ encode ──▶ ocr ──▶ postprocess ──▶ extract
//! (pdfium)   (base64)   (Vision / VLM)  (cleanup)   (LLM → JSON)
//!                                                  qa
//!                                                  (LLM → text)
//! ```
//!
//! 1. [`render`]: rasterise every page; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 2. [`encode`]: PNG-encode and base64-wrap each page image
//! 3. [`ocr`]: one recognition call per page, fail fast on the first
//!    page error, join page texts with newlines
//! 4. [`postprocess`]: deterministic cleanup of recognised text
//! 5. [`extract`]: ask the generative service for `{faq, schedule, summary}`
//!    and coerce its answer
//! 6. [`qa`]: answer a free-text question from the stored text
//!
//! [`llm`] holds the generative-service client shared by `ocr` (VLM
//! backend), `extract` and `qa`.

pub mod encode;
pub mod extract;
pub mod llm;
pub mod ocr;
pub mod postprocess;
pub mod qa;
pub mod render;
