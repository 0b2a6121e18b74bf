//! OCR adapter: PDF bytes → page images → recognised text.
//!
//! Every page is rendered, encoded and sent to the recognition backend on
//! its own, strictly in page order. The first page whose call reports an
//! error aborts the whole document with a page-indexed
//! [`DashboardError::RecognitionFailed`]; nothing is retried.
//!
//! Two backends sit behind [`Recognizer`]:
//!
//! * **Cloud Vision**: `POST {endpoint}/v1/images:annotate` with a
//!   `TEXT_DETECTION` feature; the first text annotation is the full page.
//! * **VLM**: the generative provider with a transcription prompt and the
//!   page attached as an image.

use crate::capabilities::Capabilities;
use crate::config::DashboardConfig;
use crate::error::DashboardError;
use crate::pipeline::llm::Generator;
use crate::pipeline::{encode, postprocess};
use crate::prompts::TRANSCRIBE_PAGE_PROMPT;
use edgequake_llm::ImageData;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// A ready recognition backend.
#[derive(Debug, Clone)]
pub enum Recognizer {
    CloudVision(CloudVisionClient),
    Vlm(Generator),
}

impl Recognizer {
    /// Recognise one page (1-indexed `page` is used for error messages).
    pub async fn recognize_page(
        &self,
        page: usize,
        image: ImageData,
    ) -> Result<String, DashboardError> {
        match self {
            Recognizer::CloudVision(client) => client.annotate(page, &image.data).await,
            Recognizer::Vlm(generator) => generator
                .transcribe(TRANSCRIBE_PAGE_PROMPT, image)
                .await
                .map_err(|e| DashboardError::RecognitionFailed {
                    page,
                    message: e.to_string(),
                }),
        }
    }
}

/// Run OCR over every page of `pdf_bytes` and return the joined text.
///
/// # Errors
/// - `NotConfigured` when the recognition backend or the PDF renderer is
///   missing (checked in that order, before any work is done)
/// - `CorruptPdf` / `PasswordRequired` / `RasterisationFailed` from rendering
/// - `RecognitionFailed` for the first page the backend rejects
pub async fn recognize_pdf(
    caps: &Capabilities,
    pdf_bytes: Vec<u8>,
) -> Result<String, DashboardError> {
    let recognizer = caps.recognizer.get()?;
    let renderer = caps.pdf.get()?;

    let start = Instant::now();
    let rendered = renderer.render_pages(pdf_bytes).await?;
    info!("Rendered {} pages in {:?}", rendered.len(), start.elapsed());

    let texts: Vec<String> = stream::iter(&rendered)
        .then(|(idx, img)| async move {
            let page = idx + 1;
            let data =
                encode::encode_page(img).map_err(|e| DashboardError::RasterisationFailed {
                    page,
                    detail: format!("Image encoding failed: {e}"),
                })?;

            let raw = recognizer.recognize_page(page, data).await?;
            let text = postprocess::clean_page_text(&raw);
            debug!("Page {}: {} chars recognised", page, text.len());
            Ok::<_, DashboardError>(text)
        })
        .try_collect()
        .await?;

    let joined = postprocess::join_pages(&texts);
    info!(
        "OCR complete: {} pages, {} chars, {:?}",
        texts.len(),
        joined.len(),
        start.elapsed()
    );
    Ok(joined)
}

// ── Cloud Vision ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum VisionAuth {
    ApiKey(String),
    Bearer(String),
}

/// Minimal client for the Cloud Vision `images:annotate` REST method.
#[derive(Debug, Clone)]
pub struct CloudVisionClient {
    http: reqwest::Client,
    endpoint: String,
    auth: VisionAuth,
}

impl CloudVisionClient {
    /// Build a client from the configured credentials.
    ///
    /// An API key wins over an access token when both are set.
    pub fn from_config(config: &DashboardConfig) -> Result<Self, DashboardError> {
        let non_empty = |v: &Option<String>| v.as_ref().filter(|s| !s.trim().is_empty()).cloned();
        let auth = match (
            non_empty(&config.vision_api_key),
            non_empty(&config.vision_access_token),
        ) {
            (Some(key), _) => VisionAuth::ApiKey(key),
            (None, Some(token)) => VisionAuth::Bearer(token),
            (None, None) => {
                return Err(DashboardError::NotConfigured {
                    service: "Cloud Vision".to_string(),
                    hint: "Set GOOGLE_VISION_API_KEY or GOOGLE_VISION_ACCESS_TOKEN, \
use --ocr-backend vlm, or run with USE_MOCK=1."
                        .to_string(),
                });
            }
        };

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| DashboardError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.vision_endpoint.trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn annotate_url(&self) -> String {
        format!("{}/v1/images:annotate", self.endpoint)
    }

    /// Send one base64 PNG for `TEXT_DETECTION`.
    pub async fn annotate(&self, page: usize, content_b64: &str) -> Result<String, DashboardError> {
        let body = AnnotateRequest::text_detection(content_b64);
        let request = self.http.post(self.annotate_url()).json(&body);
        let request = match &self.auth {
            VisionAuth::ApiKey(key) => request.query(&[("key", key)]),
            VisionAuth::Bearer(token) => request.bearer_auth(token),
        };

        let request_failed = |e: reqwest::Error| DashboardError::RecognitionRequest {
            page,
            detail: e.to_string(),
        };
        let response = request.send().await.map_err(request_failed)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(request_failed)?;
        read_annotate_response(page, status, &bytes)
    }
}

/// Interpret the HTTP status and body of one `images:annotate` call.
fn read_annotate_response(
    page: usize,
    status: reqwest::StatusCode,
    body: &[u8],
) -> Result<String, DashboardError> {
    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorEnvelope>(body)
            .map(|env| env.error.message)
            .unwrap_or_else(|_| format!("HTTP {status}"));
        return Err(DashboardError::RecognitionFailed { page, message });
    }

    let parsed: BatchAnnotateResponse =
        serde_json::from_slice(body).map_err(|e| DashboardError::RecognitionRequest {
            page,
            detail: format!("unexpected Vision response: {e}"),
        })?;
    page_text(page, parsed)
}

/// Text of the single-image batch response, or the page's reported error.
fn page_text(page: usize, batch: BatchAnnotateResponse) -> Result<String, DashboardError> {
    let Some(first) = batch.responses.into_iter().next() else {
        return Ok(String::new());
    };
    if let Some(status) = first.error {
        if !status.message.is_empty() {
            return Err(DashboardError::RecognitionFailed {
                page,
                message: status.message,
            });
        }
    }
    Ok(first
        .text_annotations
        .into_iter()
        .next()
        .map(|a| a.description)
        .unwrap_or_default())
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnnotateRequest<'a> {
    requests: [AnnotateImageRequest<'a>; 1],
}

impl<'a> AnnotateRequest<'a> {
    fn text_detection(content: &'a str) -> Self {
        Self {
            requests: [AnnotateImageRequest {
                image: VisionImage { content },
                features: [Feature {
                    kind: "TEXT_DETECTION",
                }],
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct AnnotateImageRequest<'a> {
    image: VisionImage<'a>,
    features: [Feature; 1],
}

#[derive(Debug, Serialize)]
struct VisionImage<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct BatchAnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    error: Option<Status>,
}

#[derive(Debug, Default, Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct Status {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Status,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn batch(value: serde_json::Value) -> BatchAnnotateResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn request_body_matches_vision_schema() {
        let body = serde_json::to_value(AnnotateRequest::text_detection("QUJD")).unwrap();
        assert_eq!(
            body,
            json!({
                "requests": [{
                    "image": { "content": "QUJD" },
                    "features": [{ "type": "TEXT_DETECTION" }]
                }]
            })
        );
    }

    #[test]
    fn page_text_takes_first_annotation() {
        let resp = batch(json!({
            "responses": [{
                "textAnnotations": [
                    { "description": "Week 1: Intro\nWeek 2: HW1", "locale": "en" },
                    { "description": "Week" }
                ]
            }]
        }));
        assert_eq!(page_text(1, resp).unwrap(), "Week 1: Intro\nWeek 2: HW1");
    }

    #[test]
    fn page_text_of_blank_page_is_empty() {
        assert_eq!(page_text(2, batch(json!({ "responses": [{}] }))).unwrap(), "");
        assert_eq!(page_text(2, batch(json!({}))).unwrap(), "");
    }

    #[test]
    fn page_error_is_reported_with_page_number() {
        let resp = batch(json!({
            "responses": [{ "error": { "code": 3, "message": "Bad image data." } }]
        }));
        let err = page_text(4, resp).unwrap_err();
        assert!(matches!(err, DashboardError::RecognitionFailed { page: 4, .. }));
        assert_eq!(err.to_string(), "OCR error on page 4: Bad image data.");
    }

    #[test]
    fn client_requires_credentials() {
        let err = CloudVisionClient::from_config(&DashboardConfig::default()).unwrap_err();
        assert!(err.to_string().contains("GOOGLE_VISION_API_KEY"));

        let blank = DashboardConfig::builder().vision_api_key("  ").build().unwrap();
        assert!(CloudVisionClient::from_config(&blank).is_err());
    }

    #[test]
    fn api_key_wins_over_token() {
        let config = DashboardConfig::builder()
            .vision_api_key("k")
            .vision_access_token("t")
            .vision_endpoint("https://vision.example.test/")
            .build()
            .unwrap();
        let client = CloudVisionClient::from_config(&config).unwrap();
        assert!(matches!(client.auth, VisionAuth::ApiKey(ref k) if k == "k"));
        assert_eq!(
            client.annotate_url(),
            "https://vision.example.test/v1/images:annotate"
        );
    }

    #[test]
    fn http_error_uses_envelope_message() {
        let body = br#"{"error": {"code": 403, "message": "API key not valid."}}"#;
        let err = read_annotate_response(2, reqwest::StatusCode::FORBIDDEN, body).unwrap_err();
        assert_eq!(err.to_string(), "OCR error on page 2: API key not valid.");

        let err = read_annotate_response(2, reqwest::StatusCode::BAD_GATEWAY, b"<html>").unwrap_err();
        assert_eq!(err.to_string(), "OCR error on page 2: HTTP 502 Bad Gateway");
    }

    #[test]
    fn unreadable_response_names_page() {
        let err = read_annotate_response(5, reqwest::StatusCode::OK, b"not json").unwrap_err();
        assert!(matches!(err, DashboardError::RecognitionRequest { page: 5, .. }));
        assert!(err.to_string().starts_with("OCR request failed on page 5: unexpected Vision response"));
    }

    #[tokio::test]
    async fn transport_failure_names_page() {
        let config = DashboardConfig::builder()
            .vision_api_key("k")
            .vision_endpoint("http://127.0.0.1:1")
            .build()
            .unwrap();
        let client = CloudVisionClient::from_config(&config).unwrap();
        let err = client.annotate(3, "aGVsbG8=").await.unwrap_err();
        assert!(matches!(err, DashboardError::RecognitionRequest { page: 3, .. }), "{err}");
    }

    #[tokio::test]
    async fn recognize_pdf_without_recognizer_is_not_configured() {
        let caps = Capabilities::none("Set GOOGLE_VISION_API_KEY.");
        let err = recognize_pdf(&caps, b"%PDF-1.4".to_vec()).await.unwrap_err();
        assert!(matches!(err, DashboardError::NotConfigured { .. }));
        assert!(err.to_string().starts_with("Recognition service"));
    }
}
