//! # syllabus-dash
//!
//! A single-user web dashboard for course syllabi: upload a PDF, get its
//! late-work and attendance policies, a week-by-week schedule with two
//! charts, a one-line summary and a question box that answers from the
//! syllabus text.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF upload
//!  │
//!  ├─ 1. Render   rasterise pages via pdfium (spawn_blocking)
//!  ├─ 2. OCR      Cloud Vision TEXT_DETECTION, or a vision LLM, page by page
//!  ├─ 3. Extract  LLM → tolerant JSON → FAQ + schedule + summary
//!  ├─ 4. Store    OCR text to a blob file, the rest to the session
//!  └─ 5. Serve    HTML page, PNG charts, Q&A over the stored text
//! ```
//!
//! With `mock` enabled every external step is replaced by canned data, so
//! the dashboard runs with no credentials and no pdfium.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use syllabus_dash::{web, DashboardConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DashboardConfig::builder().mock(true).port(8080).build()?;
//!     web::serve(&config).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `syllabus-dash` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod blob;
pub mod capabilities;
pub mod chart;
pub mod config;
pub mod error;
pub mod json;
pub mod mock;
pub mod pipeline;
pub mod prompts;
pub mod schedule;
pub mod session;
pub mod web;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::SyllabusAnalyzer;
pub use blob::{BlobHandle, BlobStore};
pub use capabilities::{Capabilities, Capability};
pub use config::{DashboardConfig, DashboardConfigBuilder, OcrBackend};
pub use error::{DashboardError, JsonExtractError};
pub use json::extract_json_object;
pub use pipeline::extract::Extraction;
pub use schedule::{
    assignments_by_week, cumulative_weights, total_weight, weight_looks_complete, FaqMap,
    ScheduleEntry,
};
pub use session::{Notice, NoticeKind, SessionId, SessionState, SessionStore};
pub use web::{router, AppState};
