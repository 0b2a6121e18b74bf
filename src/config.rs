//! Configuration for the dashboard server and its adapters.
//!
//! Every knob lives in [`DashboardConfig`], built via
//! [`DashboardConfigBuilder`]. The binary maps CLI flags and environment
//! variables onto the builder; tests construct it directly.

use crate::error::DashboardError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

/// Provider used when neither the config nor the environment names one.
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Model used when neither the config nor the environment names one.
pub const DEFAULT_MODEL: &str = "gemini-flash-latest";

/// Google Cloud Vision REST endpoint.
pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com";

/// Upload cap applied by the transport layer.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Configuration for the dashboard.
///
/// Built via [`DashboardConfig::builder()`] or [`DashboardConfig::default()`].
///
/// # Example
/// ```rust
/// use syllabus_dash::DashboardConfig;
///
/// let config = DashboardConfig::builder()
///     .mock(true)
///     .port(9000)
///     .build()
///     .unwrap();
/// assert!(config.mock);
/// ```
#[derive(Clone)]
pub struct DashboardConfig {
    /// Disable every external call and serve canned data. Default: false.
    pub mock: bool,

    /// Interface to bind. Default: 0.0.0.0.
    pub host: IpAddr,

    /// Port to bind. Default: 8080.
    pub port: u16,

    /// Request body cap in bytes. Default: 25 MB.
    pub max_upload_bytes: usize,

    /// Directory that receives OCR text blobs. Default: the OS temp dir.
    pub blob_dir: PathBuf,

    /// Directory that receives one JSON file per session.
    /// Default: `<temp>/syllabus_sessions`.
    pub session_dir: PathBuf,

    /// Generative model identifier. If None, [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// Generative provider name (e.g. "gemini", "openai").
    /// If None, resolved from the environment, then [`DEFAULT_PROVIDER`].
    pub provider_name: Option<String>,

    /// Pre-constructed provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens per generative response. Default: 4096.
    pub max_tokens: usize,

    /// Which service reads the rendered pages. Default: [`OcrBackend::Vision`].
    pub ocr_backend: OcrBackend,

    /// API key for Cloud Vision (`?key=`).
    pub vision_api_key: Option<String>,

    /// OAuth access token for Cloud Vision (`Authorization: Bearer`).
    pub vision_access_token: Option<String>,

    /// Cloud Vision base URL. Default: [`DEFAULT_VISION_ENDPOINT`].
    pub vision_endpoint: String,

    /// Rasterisation DPI. Range: 72–400. Default: 200.
    pub dpi: u32,

    /// Longest rendered edge in pixels, whatever the DPI. Default: 2400.
    pub max_rendered_pixels: u32,

    /// Explicit pdfium shared library. If None, the system library is used.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        let tmp = std::env::temp_dir();
        Self {
            mock: false,
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            session_dir: tmp.join("syllabus_sessions"),
            blob_dir: tmp,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 4096,
            ocr_backend: OcrBackend::default(),
            vision_api_key: None,
            vision_access_token: None,
            vision_endpoint: DEFAULT_VISION_ENDPOINT.to_string(),
            dpi: 200,
            max_rendered_pixels: 2400,
            pdfium_lib_path: None,
        }
    }
}

impl fmt::Debug for DashboardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DashboardConfig")
            .field("mock", &self.mock)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("blob_dir", &self.blob_dir)
            .field("session_dir", &self.session_dir)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("ocr_backend", &self.ocr_backend)
            .field("vision_api_key", &self.vision_api_key.as_ref().map(|_| "<redacted>"))
            .field(
                "vision_access_token",
                &self.vision_access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("vision_endpoint", &self.vision_endpoint)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .finish()
    }
}

impl DashboardConfig {
    /// Create a new builder for `DashboardConfig`.
    pub fn builder() -> DashboardConfigBuilder {
        DashboardConfigBuilder {
            config: Self::default(),
        }
    }

    /// Socket address the server binds to.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Model identifier with the default applied.
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`DashboardConfig`].
#[derive(Debug)]
pub struct DashboardConfigBuilder {
    config: DashboardConfig,
}

impl DashboardConfigBuilder {
    pub fn mock(mut self, v: bool) -> Self {
        self.config.mock = v;
        self
    }

    pub fn host(mut self, host: IpAddr) -> Self {
        self.config.host = host;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn blob_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.blob_dir = dir.into();
        self
    }

    pub fn session_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.session_dir = dir.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn ocr_backend(mut self, backend: OcrBackend) -> Self {
        self.config.ocr_backend = backend;
        self
    }

    pub fn vision_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.vision_api_key = Some(key.into());
        self
    }

    pub fn vision_access_token(mut self, token: impl Into<String>) -> Self {
        self.config.vision_access_token = Some(token.into());
        self
    }

    pub fn vision_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.vision_endpoint = url.into();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DashboardConfig, DashboardError> {
        let c = &self.config;
        if c.max_upload_bytes == 0 {
            return Err(DashboardError::InvalidConfig(
                "Upload limit must be ≥ 1 byte".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(DashboardError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if !c.vision_endpoint.starts_with("http://") && !c.vision_endpoint.starts_with("https://")
        {
            return Err(DashboardError::InvalidConfig(format!(
                "Vision endpoint must be an HTTP(S) URL, got '{}'",
                c.vision_endpoint
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which service turns rendered page images into text.
///
/// | Backend | Credentials |
/// |---------|-------------|
/// | `Vision` | `GOOGLE_VISION_API_KEY` or `GOOGLE_VISION_ACCESS_TOKEN` |
/// | `Vlm` | whatever the generative provider needs (e.g. `GEMINI_API_KEY`) |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackend {
    /// Google Cloud Vision `TEXT_DETECTION`. (default)
    #[default]
    Vision,
    /// The generative provider, asked to transcribe each page image.
    Vlm,
}

impl fmt::Display for OcrBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OcrBackend::Vision => f.write_str("vision"),
            OcrBackend::Vlm => f.write_str("vlm"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = DashboardConfig::default();
        assert!(!c.mock);
        assert_eq!(c.port, 8080);
        assert_eq!(c.max_upload_bytes, 25 * 1024 * 1024);
        assert_eq!(c.dpi, 200);
        assert_eq!(c.ocr_backend, OcrBackend::Vision);
        assert_eq!(c.model_or_default(), DEFAULT_MODEL);
        assert!(c.session_dir.ends_with("syllabus_sessions"));
    }

    #[test]
    fn builder_clamps_dpi_and_temperature() {
        let c = DashboardConfig::builder()
            .dpi(10)
            .temperature(9.0)
            .build()
            .unwrap();
        assert_eq!(c.dpi, 72);
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn builder_rejects_zero_upload_limit() {
        let err = DashboardConfig::builder()
            .max_upload_bytes(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, DashboardError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_non_http_vision_endpoint() {
        let err = DashboardConfig::builder()
            .vision_endpoint("vision.googleapis.com")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("HTTP(S)"));
    }

    #[test]
    fn debug_redacts_credentials() {
        let c = DashboardConfig::builder()
            .vision_api_key("secret-key")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret-key"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn bind_addr_combines_host_and_port() {
        let c = DashboardConfig::builder()
            .host(IpAddr::V4(Ipv4Addr::LOCALHOST))
            .port(9001)
            .build()
            .unwrap();
        assert_eq!(c.bind_addr().to_string(), "127.0.0.1:9001");
    }
}
