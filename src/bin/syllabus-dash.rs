//! CLI binary for syllabus-dash.
//!
//! A thin shim over the library crate that maps CLI flags and environment
//! variables to `DashboardConfig`, sets up logging and runs the server.

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::Parser;
use std::io;
use std::net::IpAddr;
use std::path::PathBuf;
use syllabus_dash::{web, DashboardConfig, OcrBackend};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Demo mode: no credentials, no pdfium, canned data
  USE_MOCK=1 syllabus-dash

  # Cloud Vision OCR + Gemini extraction on port 9000
  GEMINI_API_KEY=... GOOGLE_VISION_API_KEY=... syllabus-dash --port 9000

  # Let the language model read the pages too (no Vision credentials needed)
  GEMINI_API_KEY=... syllabus-dash --ocr-backend vlm

  # Another provider and model
  OPENAI_API_KEY=... syllabus-dash --provider openai --model gpt-4.1-mini --ocr-backend vlm

ENVIRONMENT:
  GEMINI_API_KEY               Key for the default generative provider
  GOOGLE_VISION_API_KEY        Cloud Vision API key
  GOOGLE_VISION_ACCESS_TOKEN   Cloud Vision OAuth token (alternative to the key)
  PDFIUM_LIB_PATH              pdfium shared library (file or directory)
  RUST_LOG                     Overrides -v / -q (e.g. syllabus_dash=debug,tower_http=debug)
"#;

/// Upload a PDF syllabus, get its policies, schedule charts and a Q&A box.
#[derive(Parser, Debug)]
#[command(
    name = "syllabus-dash",
    version,
    about = "Web dashboard that OCRs a PDF syllabus and extracts policies and a schedule with an LLM",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Serve canned data; no OCR, LLM or pdfium needed.
    #[arg(long, env = "USE_MOCK", value_parser = BoolishValueParser::new())]
    mock: bool,

    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to bind.
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Largest accepted upload, in megabytes.
    #[arg(long, env = "SYLLABUS_MAX_UPLOAD_MB", default_value_t = 25,
          value_parser = clap::value_parser!(u64).range(1..=1024))]
    max_upload_mb: u64,

    /// Directory for OCR text blobs (default: OS temp dir).
    #[arg(long, env = "SYLLABUS_BLOB_DIR")]
    blob_dir: Option<PathBuf>,

    /// Directory for session files (default: <temp>/syllabus_sessions).
    #[arg(long, env = "SYLLABUS_SESSION_DIR")]
    session_dir: Option<PathBuf>,

    /// LLM model ID (default: gemini-flash-latest).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "SYLLABUS_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max LLM output tokens per call.
    #[arg(long, env = "SYLLABUS_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Which service reads the rendered pages.
    #[arg(long, env = "SYLLABUS_OCR_BACKEND", value_enum, default_value = "vision")]
    ocr_backend: OcrBackendArg,

    /// Cloud Vision API key.
    #[arg(long, env = "GOOGLE_VISION_API_KEY", hide_env_values = true)]
    vision_api_key: Option<String>,

    /// Cloud Vision OAuth access token.
    #[arg(long, env = "GOOGLE_VISION_ACCESS_TOKEN", hide_env_values = true)]
    vision_access_token: Option<String>,

    /// Cloud Vision base URL.
    #[arg(long, env = "GOOGLE_VISION_ENDPOINT")]
    vision_endpoint: Option<String>,

    /// Rendering DPI (72–400).
    #[arg(long, env = "SYLLABUS_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// pdfium shared library, or the directory holding it.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SYLLABUS_VERBOSE", value_parser = BoolishValueParser::new())]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, env = "SYLLABUS_QUIET", value_parser = BoolishValueParser::new())]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OcrBackendArg {
    Vision,
    Vlm,
}

impl From<OcrBackendArg> for OcrBackend {
    fn from(v: OcrBackendArg) -> Self {
        match v {
            OcrBackendArg::Vision => OcrBackend::Vision,
            OcrBackendArg::Vlm => OcrBackend::Vlm,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    if config.mock {
        info!("Mock mode: serving canned data, no external calls");
    } else {
        warn_missing_credentials(&config);
    }

    web::serve(&config).await.context("Server failed")?;
    Ok(())
}

/// Map CLI args to `DashboardConfig`.
fn build_config(cli: &Cli) -> Result<DashboardConfig> {
    let max_upload_bytes = usize::try_from(cli.max_upload_mb * 1024 * 1024)
        .context("Upload limit does not fit in memory on this platform")?;

    let mut builder = DashboardConfig::builder()
        .mock(cli.mock)
        .host(cli.host)
        .port(cli.port)
        .max_upload_bytes(max_upload_bytes)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .ocr_backend(cli.ocr_backend.clone().into())
        .dpi(cli.dpi);

    if let Some(ref dir) = cli.blob_dir {
        builder = builder.blob_dir(dir);
    }
    if let Some(ref dir) = cli.session_dir {
        builder = builder.session_dir(dir);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref key) = cli.vision_api_key {
        builder = builder.vision_api_key(key);
    }
    if let Some(ref token) = cli.vision_access_token {
        builder = builder.vision_access_token(token);
    }
    if let Some(ref url) = cli.vision_endpoint {
        builder = builder.vision_endpoint(url);
    }
    if let Some(ref path) = cli.pdfium_lib_path {
        builder = builder.pdfium_lib_path(path);
    }

    builder.build().context("Invalid configuration")
}

/// Early hints for the most common misconfigurations. The capability probe
/// still decides what is usable; these only save a failed upload.
fn warn_missing_credentials(config: &DashboardConfig) {
    let using_default_provider = config.provider.is_none()
        && config.provider_name.is_none()
        && std::env::var("EDGEQUAKE_LLM_PROVIDER").map_or(true, |v| v.is_empty());
    if using_default_provider && std::env::var("GEMINI_API_KEY").map_or(true, |v| v.is_empty()) {
        warn!("GEMINI_API_KEY is not set; extraction and Q&A will fail (or run with USE_MOCK=1)");
    }
    if config.ocr_backend == OcrBackend::Vision
        && config.vision_api_key.is_none()
        && config.vision_access_token.is_none()
    {
        warn!(
            "No Cloud Vision credentials; set GOOGLE_VISION_API_KEY or GOOGLE_VISION_ACCESS_TOKEN, \
or use --ocr-backend vlm"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One test owns USE_MOCK so parallel tests never see each other's value.
    #[test]
    fn use_mock_env_accepts_boolish_values() {
        for (value, expected) in [("1", true), ("true", true), ("yes", true), ("0", false), ("false", false)] {
            std::env::set_var("USE_MOCK", value);
            let cli = Cli::try_parse_from(["syllabus-dash"]).unwrap();
            assert_eq!(cli.mock, expected, "USE_MOCK={value}");
        }

        std::env::remove_var("USE_MOCK");
        assert!(!Cli::try_parse_from(["syllabus-dash"]).unwrap().mock);
        assert!(Cli::try_parse_from(["syllabus-dash", "--mock"]).unwrap().mock);
    }

    #[test]
    fn mock_config_builds_from_flags() {
        let cli = Cli::try_parse_from(["syllabus-dash", "--mock", "--port", "9000"]).unwrap();
        let config = build_config(&cli).unwrap();
        assert!(config.mock);
        assert_eq!(config.port, 9000);
    }
}
