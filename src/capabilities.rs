//! Explicit capability objects for the external services.
//!
//! Each service the dashboard can use (PDF renderer, recognition service,
//! generative service) is probed once at startup and stored as a
//! [`Capability`]. Adapters receive the capability instead of checking for
//! credentials or libraries themselves; asking a missing capability for its
//! value yields [`DashboardError::NotConfigured`] with the probe's hint, so
//! a misconfigured deployment fails per request with a readable notice.

use crate::config::{DashboardConfig, OcrBackend};
use crate::error::DashboardError;
use crate::pipeline::llm::Generator;
use crate::pipeline::ocr::{CloudVisionClient, Recognizer};
use crate::pipeline::render::PdfRenderer;
use std::fmt;
use tracing::{info, warn};

pub const PDF_RENDERER: &str = "PDF renderer";
pub const RECOGNITION_SERVICE: &str = "Recognition service";
pub const GENERATIVE_SERVICE: &str = "Generative service";

/// A service that is either ready to use or missing for a known reason.
#[derive(Clone)]
pub enum Capability<T> {
    Ready(T),
    Missing { service: &'static str, hint: String },
}

impl<T> Capability<T> {
    /// Wrap a probe result, keeping the error text as the hint.
    ///
    /// A nested `NotConfigured` contributes only its hint so the message
    /// does not repeat "is not configured".
    pub fn from_probe(service: &'static str, probe: Result<T, DashboardError>) -> Self {
        match probe {
            Ok(v) => Capability::Ready(v),
            Err(DashboardError::NotConfigured { hint, .. }) => Capability::Missing { service, hint },
            Err(e) => Capability::Missing {
                service,
                hint: e.to_string(),
            },
        }
    }

    pub fn missing(service: &'static str, hint: impl Into<String>) -> Self {
        Capability::Missing {
            service,
            hint: hint.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Capability::Ready(_))
    }

    /// The ready value, or `NotConfigured` carrying the probe hint.
    pub fn get(&self) -> Result<&T, DashboardError> {
        match self {
            Capability::Ready(v) => Ok(v),
            Capability::Missing { service, hint } => Err(DashboardError::NotConfigured {
                service: (*service).to_string(),
                hint: hint.clone(),
            }),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Capability<U> {
        match self {
            Capability::Ready(v) => Capability::Ready(f(v)),
            Capability::Missing { service, hint } => Capability::Missing { service, hint },
        }
    }

    /// Why the capability is missing, if it is.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Capability::Ready(_) => None,
            Capability::Missing { hint, .. } => Some(hint),
        }
    }
}

impl<T> fmt::Debug for Capability<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Ready(_) => f.write_str("Ready"),
            Capability::Missing { service, hint } => f
                .debug_struct("Missing")
                .field("service", service)
                .field("hint", hint)
                .finish(),
        }
    }
}

/// Every external service the dashboard may call.
#[derive(Clone, Debug)]
pub struct Capabilities {
    pub pdf: Capability<PdfRenderer>,
    pub recognizer: Capability<Recognizer>,
    pub generator: Capability<Generator>,
}

impl Capabilities {
    /// Probe every service described by `config`.
    pub fn probe(config: &DashboardConfig) -> Self {
        let generator = Capability::from_probe(GENERATIVE_SERVICE, Generator::resolve(config));

        let recognizer = match config.ocr_backend {
            OcrBackend::Vision => Capability::from_probe(
                RECOGNITION_SERVICE,
                CloudVisionClient::from_config(config),
            )
            .map(Recognizer::CloudVision),
            OcrBackend::Vlm => match &generator {
                Capability::Ready(g) => Capability::Ready(Recognizer::Vlm(g.clone())),
                Capability::Missing { hint, .. } => Capability::missing(
                    RECOGNITION_SERVICE,
                    format!("The vlm OCR backend uses the generative provider. {hint}"),
                ),
            },
        };

        let pdf = Capability::from_probe(PDF_RENDERER, PdfRenderer::probe(config));

        Self {
            pdf,
            recognizer,
            generator,
        }
    }

    /// Nothing available; used in mock mode where no adapter calls out.
    pub fn none(reason: &str) -> Self {
        Self {
            pdf: Capability::missing(PDF_RENDERER, reason),
            recognizer: Capability::missing(RECOGNITION_SERVICE, reason),
            generator: Capability::missing(GENERATIVE_SERVICE, reason),
        }
    }

    /// `(service, available, hint)` for each capability, in pipeline order.
    pub fn report(&self) -> Vec<(&'static str, bool, Option<&str>)> {
        vec![
            (PDF_RENDERER, self.pdf.is_available(), self.pdf.hint()),
            (
                RECOGNITION_SERVICE,
                self.recognizer.is_available(),
                self.recognizer.hint(),
            ),
            (
                GENERATIVE_SERVICE,
                self.generator.is_available(),
                self.generator.hint(),
            ),
        ]
    }

    /// Log one line per capability; missing ones at `warn`.
    pub fn log_report(&self) {
        for (service, available, hint) in self.report() {
            if available {
                info!("{service}: ready");
            } else {
                warn!("{service}: unavailable ({})", hint.unwrap_or("unknown reason"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_capability_reports_not_configured() {
        let cap: Capability<u8> = Capability::missing(GENERATIVE_SERVICE, "Set GEMINI_API_KEY.");
        assert!(!cap.is_available());
        let err = cap.get().unwrap_err();
        assert!(matches!(err, DashboardError::NotConfigured { .. }));
        assert!(err.to_string().contains("Set GEMINI_API_KEY."));
    }

    #[test]
    fn from_probe_keeps_error_text_as_hint() {
        let cap: Capability<u8> = Capability::from_probe(
            PDF_RENDERER,
            Err(DashboardError::PdfiumBindingFailed("no libpdfium".into())),
        );
        assert!(cap.hint().unwrap().contains("no libpdfium"));
    }

    #[test]
    fn map_preserves_readiness() {
        let ready = Capability::Ready(2u8).map(|v| v * 10);
        assert_eq!(*ready.get().unwrap(), 20);

        let missing: Capability<u8> = Capability::missing(PDF_RENDERER, "x");
        assert!(!missing.map(|v| v * 10).is_available());
    }

    #[test]
    fn none_marks_everything_missing() {
        let caps = Capabilities::none("mock mode");
        assert!(caps.report().iter().all(|(_, ok, hint)| !ok && *hint == Some("mock mode")));
    }
}
