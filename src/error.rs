//! Error types for the syllabus dashboard.
//!
//! Two error types reflect two different audiences:
//!
//! * [`DashboardError`]: everything an adapter or store can fail with. Route
//!   handlers never propagate it to the client as an HTTP error; they turn it
//!   into a notice on the next page render via its `Display` text, so every
//!   message here is written to be read by the person who uploaded the file.
//!
//! * [`JsonExtractError`]: the named failure kinds of
//!   [`crate::json::extract_json_object`]. Kept separate so the extraction
//!   function stays usable (and testable) without the rest of the crate.

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the syllabus-dash library.
#[derive(Debug, Error)]
pub enum DashboardError {
    // ── Capability errors ────────────────────────────────────────────────
    /// An external service (recognition, generative, PDF renderer) is not
    /// available in this process: missing credentials, missing library.
    #[error("{service} is not configured. {hint}")]
    NotConfigured { service: String, hint: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide, or run with USE_MOCK=1."
    )]
    PdfiumBindingFailed(String),

    // ── PDF errors ───────────────────────────────────────────────────────
    /// The uploaded bytes could not be opened as a PDF.
    #[error("Uploaded file is not a readable PDF: {detail}")]
    CorruptPdf { detail: String },

    /// The uploaded PDF is password protected.
    #[error("Uploaded PDF is encrypted and requires a password.")]
    PasswordRequired,

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── Recognition errors ───────────────────────────────────────────────
    /// The recognition service reported an error for one page.
    #[error("OCR error on page {page}: {message}")]
    RecognitionFailed { page: usize, message: String },

    /// Transport-level or protocol failure while recognising one page.
    #[error("OCR request failed on page {page}: {detail}")]
    RecognitionRequest { page: usize, detail: String },

    // ── Generative-service errors ────────────────────────────────────────
    /// The generative provider returned an error.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// The generative provider answered, but no JSON object could be found.
    #[error("Generative service did not return valid JSON ({0})")]
    InvalidJson(#[from] JsonExtractError),

    // ── Storage errors ───────────────────────────────────────────────────
    /// Filesystem failure while writing or reading a blob.
    #[error("Blob storage failed at '{path}': {source}")]
    Blob {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Filesystem failure while loading or saving a session.
    #[error("Session storage failed at '{path}': {source}")]
    SessionIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A session file exists but could not be (de)serialised.
    #[error("Session data is corrupt: {0}")]
    SessionFormat(#[from] serde_json::Error),

    // ── Rendering errors ─────────────────────────────────────────────────
    /// Encoding a chart or page image as PNG failed.
    #[error("Image encoding failed: {0}")]
    ImageEncoding(#[from] image::ImageError),

    // ── Server errors ────────────────────────────────────────────────────
    /// Binding or running the HTTP listener failed.
    #[error("HTTP server error on {addr}: {source}")]
    Server {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why [`crate::json::extract_json_object`] could not produce an object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsonExtractError {
    /// The response was blank.
    #[error("response was empty")]
    Empty,

    /// No `{` … `}` span exists anywhere in the response.
    #[error("no JSON object found in response")]
    NoObject,

    /// A balanced `{` … `}` span was found but it is not valid JSON.
    #[error("JSON object is malformed: {0}")]
    Malformed(String),

    /// The whole response parsed, but as an array, string, or number.
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognition_failed_display_names_page() {
        let e = DashboardError::RecognitionFailed {
            page: 3,
            message: "quota exceeded".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 3"), "got: {msg}");
        assert!(msg.contains("quota exceeded"));
    }

    #[test]
    fn invalid_json_display_mentions_valid_json() {
        let e = DashboardError::from(JsonExtractError::NoObject);
        assert!(e.to_string().contains("did not return valid JSON"));
    }

    #[test]
    fn not_configured_display() {
        let e = DashboardError::NotConfigured {
            service: "Generative service".into(),
            hint: "Set GEMINI_API_KEY.".into(),
        };
        assert_eq!(
            e.to_string(),
            "Generative service is not configured. Set GEMINI_API_KEY."
        );
    }
}
