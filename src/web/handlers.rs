//! Route handlers.
//!
//! Every handler that touches the dashboard loads the caller's session at
//! the start and saves it at the end. Failures from OCR, extraction or Q&A
//! never become HTTP errors: they are turned into notices (or the stored
//! answer) and the browser is redirected back to `/`.

use crate::blob::BlobHandle;
use crate::chart;
use crate::error::DashboardError;
use crate::pipeline::extract::Extraction;
use crate::schedule::{total_weight, weight_looks_complete, ScheduleEntry};
use crate::session::{Notice, SessionId, SessionState};
use crate::web::page::{self, PageView};
use crate::web::AppState;
use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Name of the cookie carrying the [`SessionId`].
pub const SESSION_COOKIE: &str = "syllabus_session";

/// Prefix of the blob files holding OCR text.
const OCR_BLOB_PREFIX: &str = "syllabus";

static RE_PDF_FILENAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf$").unwrap());

// ── Session plumbing ─────────────────────────────────────────────────────

/// One request's view of its session.
struct Visit {
    id: SessionId,
    fresh: bool,
    state: SessionState,
}

impl Visit {
    /// Load the session named by the cookie, or start a new one.
    async fn begin(app: &AppState, headers: &HeaderMap) -> Self {
        let Some(id) = session_id_from_headers(headers) else {
            return Self {
                id: SessionId::new(),
                fresh: true,
                state: SessionState::default(),
            };
        };
        let state = app.sessions.load(&id).await.unwrap_or_else(|e| {
            error!("Failed to load session {}: {}", id, e);
            SessionState::default()
        });
        Self {
            id,
            fresh: false,
            state,
        }
    }

    /// Save the session and attach the cookie when it is new.
    async fn finish(self, app: &AppState, response: impl IntoResponse) -> Response {
        if let Err(e) = app.sessions.save(&self.id, &self.state).await {
            error!("Failed to save session {}: {}", self.id, e);
        }
        self.release(response)
    }

    /// Respond without saving; for handlers that only read the session.
    fn release(self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        if self.fresh {
            match HeaderValue::from_str(&session_cookie(&self.id)) {
                Ok(value) => {
                    response.headers_mut().append(SET_COOKIE, value);
                }
                Err(e) => error!("Invalid session cookie value: {}", e),
            }
        }
        response
    }

    async fn ocr_text(&self, app: &AppState) -> String {
        app.blobs
            .read(&self.state.ocr_blob)
            .await
            .unwrap_or_else(|e| {
                warn!("Could not read OCR text for session {}: {}", self.id, e);
                String::new()
            })
    }
}

/// The first well-formed session id among the request's cookies.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name.trim() == SESSION_COOKIE).then_some(value)
        })
        .find_map(SessionId::parse)
}

/// `Set-Cookie` value for a new session.
pub fn session_cookie(id: &SessionId) -> String {
    format!("{SESSION_COOKIE}={id}; HttpOnly; SameSite=Lax; Path=/")
}

// ── Page ─────────────────────────────────────────────────────────────────

/// `GET /`: render the dashboard, consuming the last answer and notices.
pub async fn index(State(app): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let mut visit = Visit::begin(&app, &headers).await;
    let ocr_text = visit.ocr_text(&app).await;
    let notices = visit.state.take_notices();
    let answer = visit.state.take_answer();

    let html = page::render_page(&PageView {
        notices,
        faq: &visit.state.faq,
        schedule: &visit.state.schedule,
        summary: &visit.state.summary,
        ocr_text: &ocr_text,
        answer,
        mock: app.analyzer.is_mock(),
    });
    visit.finish(&app, Html(html)).await
}

// ── Upload ───────────────────────────────────────────────────────────────

struct UploadedFile {
    filename: String,
    bytes: Bytes,
}

/// `POST /upload`: OCR the PDF in field `pdf`, extract, store in session.
pub async fn upload(
    State(app): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut visit = Visit::begin(&app, &headers).await;

    let file = match read_pdf_field(&mut multipart).await {
        Ok(Some(file)) if !file.filename.is_empty() => file,
        Ok(_) => {
            visit.state.push_notice(Notice::error("Please choose a PDF file."));
            return visit.finish(&app, Redirect::to("/")).await;
        }
        Err(e) => {
            warn!("Unreadable upload: {}", e);
            visit
                .state
                .push_notice(Notice::error(format!("Upload could not be read: {e}")));
            return visit.finish(&app, Redirect::to("/")).await;
        }
    };

    if !is_pdf_filename(&file.filename) {
        visit
            .state
            .push_notice(Notice::error("Only PDF files are supported."));
        return visit.finish(&app, Redirect::to("/")).await;
    }

    info!("Processing upload '{}' ({} bytes)", file.filename, file.bytes.len());
    match process_upload(&app, file.bytes).await {
        Ok((handle, extraction)) => {
            let message =
                upload_success_message(total_weight(&extraction.schedule), extraction.dropped_rows);
            visit.state.store_upload(handle, extraction);
            visit.state.push_notice(Notice::success(message));
        }
        Err(e) => {
            error!("Upload processing failed: {}", e);
            visit
                .state
                .push_notice(Notice::error(format!("Processing failed: {e}")));
        }
    }
    visit.finish(&app, Redirect::to("/")).await
}

/// OCR, then extract, then persist the text. Nothing is stored in the
/// session unless all three succeed.
async fn process_upload(
    app: &AppState,
    bytes: Bytes,
) -> Result<(BlobHandle, Extraction), DashboardError> {
    let ocr_text = app.analyzer.ocr_pdf(bytes.to_vec()).await?;
    let extraction = app.analyzer.extract(&ocr_text).await?;
    let handle = app.blobs.save(OCR_BLOB_PREFIX, &ocr_text).await?;
    Ok((handle, extraction))
}

async fn read_pdf_field(multipart: &mut Multipart) -> Result<Option<UploadedFile>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("pdf") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        return Ok(Some(UploadedFile { filename, bytes }));
    }
    Ok(None)
}

/// Case-insensitive `.pdf` extension check.
pub fn is_pdf_filename(filename: &str) -> bool {
    RE_PDF_FILENAME.is_match(filename.trim())
}

/// Success notice for an upload with the given schedule total.
pub fn upload_success_message(total: f64, dropped_rows: usize) -> String {
    let mut message = format!("OCR + parsing complete. Detected total grading weight ≈ {total:.1}%");
    if weight_looks_complete(total) {
        message.push('.');
    } else {
        message.push_str(" (may be incomplete).");
    }
    if dropped_rows > 0 {
        message.push_str(&format!(
            " {dropped_rows} schedule row(s) could not be read and were skipped."
        ));
    }
    message
}

// ── Q&A ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub question: String,
}

/// `POST /ask`: answer from the stored OCR text; the answer shows once.
pub async fn ask(
    State(app): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<AskForm>,
) -> Response {
    let mut visit = Visit::begin(&app, &headers).await;

    let question = form.question.trim();
    if question.is_empty() {
        visit
            .state
            .push_notice(Notice::error("Please enter a question."));
        return visit.finish(&app, Redirect::to("/")).await;
    }

    let ocr_text = visit.ocr_text(&app).await;
    if ocr_text.is_empty() {
        visit
            .state
            .push_notice(Notice::error("Upload a syllabus first."));
        return visit.finish(&app, Redirect::to("/")).await;
    }

    let answer = match app.analyzer.answer(&ocr_text, question).await {
        Ok(answer) => answer,
        Err(e) => {
            error!("Q&A failed: {}", e);
            format!("Q&A failed: {e}")
        }
    };
    visit.state.set_answer(answer);
    visit.finish(&app, Redirect::to("/")).await
}

// ── Charts ───────────────────────────────────────────────────────────────

type ChartFn = fn(&[ScheduleEntry]) -> Result<Vec<u8>, DashboardError>;

/// `GET /chart/weights`: cumulative weight line chart.
pub async fn chart_weights(State(app): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    chart_response(&app, &headers, chart::weights_chart).await
}

/// `GET /chart/assignments`: assignments bar chart.
pub async fn chart_assignments(State(app): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    chart_response(&app, &headers, chart::assignments_chart).await
}

async fn chart_response(app: &AppState, headers: &HeaderMap, draw: ChartFn) -> Response {
    let visit = Visit::begin(app, headers).await;
    let schedule = visit.state.schedule.clone();

    let drawn = tokio::task::spawn_blocking(move || draw(&schedule))
        .await
        .map_err(|e| DashboardError::Internal(format!("Chart task panicked: {e}")))
        .and_then(|r| r);

    let response = match drawn {
        Ok(png) => (
            [(CONTENT_TYPE, "image/png"), (CACHE_CONTROL, "no-store")],
            png,
        )
            .into_response(),
        Err(e) => {
            error!("Chart rendering failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    };
    visit.release(response)
}

// ── Health ───────────────────────────────────────────────────────────────

/// `GET /healthz`: liveness probe.
pub async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_extension_check_ignores_case() {
        assert!(is_pdf_filename("syllabus.pdf"));
        assert!(is_pdf_filename("SYLLABUS.PDF"));
        assert!(is_pdf_filename("notes.v2.Pdf"));
        assert!(!is_pdf_filename("syllabus.docx"));
        assert!(!is_pdf_filename("pdf"));
        assert!(!is_pdf_filename("syllabus.pdf.exe"));
    }

    #[test]
    fn success_message_flags_incomplete_totals() {
        assert_eq!(
            upload_success_message(100.0, 0),
            "OCR + parsing complete. Detected total grading weight ≈ 100.0%."
        );
        assert_eq!(
            upload_success_message(62.5, 0),
            "OCR + parsing complete. Detected total grading weight ≈ 62.5% (may be incomplete)."
        );
    }

    #[test]
    fn success_message_reports_skipped_rows() {
        let msg = upload_success_message(95.0, 2);
        assert!(msg.ends_with("≈ 95.0%. 2 schedule row(s) could not be read and were skipped."));
    }

    #[test]
    fn session_cookie_is_found_among_others() {
        let id = SessionId::new();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {SESSION_COOKIE}={id}; other=1")).unwrap(),
        );
        assert_eq!(session_id_from_headers(&headers), Some(id));
    }

    #[test]
    fn malformed_session_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("syllabus_session=../../etc/passwd"),
        );
        assert_eq!(session_id_from_headers(&headers), None);
        assert_eq!(session_id_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn new_session_cookie_attributes() {
        let cookie = session_cookie(&SessionId::new());
        assert!(cookie.starts_with("syllabus_session="));
        assert!(cookie.ends_with("; HttpOnly; SameSite=Lax; Path=/"));
    }
}
