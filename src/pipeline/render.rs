//! PDF rasterisation: render every page of an uploaded PDF via pdfium.
//!
//! pdfium is a C++ library with thread-local state, so all work happens in
//! `tokio::task::spawn_blocking`. A fresh binding is made per upload; the
//! startup probe only proves that binding is possible.
//!
//! Pages are scaled by `dpi / 72` and capped at `max_rendered_pixels` on
//! the longest edge so a poster-sized page cannot exhaust memory.

use crate::config::DashboardConfig;
use crate::error::DashboardError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Handle to a pdfium library known to be loadable.
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    lib_path: Option<PathBuf>,
    dpi: u32,
    max_pixels: u32,
}

impl PdfRenderer {
    /// Bind pdfium once to prove the library is loadable.
    pub fn probe(config: &DashboardConfig) -> Result<Self, DashboardError> {
        let renderer = Self {
            lib_path: config.pdfium_lib_path.clone(),
            dpi: config.dpi,
            max_pixels: config.max_rendered_pixels,
        };
        bind_pdfium(renderer.lib_path.as_deref())?;
        Ok(renderer)
    }

    /// Rasterise every page of `pdf_bytes`, in page order.
    ///
    /// # Returns
    /// `(page_index_0based, DynamicImage)` tuples.
    pub async fn render_pages(
        &self,
        pdf_bytes: Vec<u8>,
    ) -> Result<Vec<(usize, DynamicImage)>, DashboardError> {
        let renderer = self.clone();
        tokio::task::spawn_blocking(move || renderer.render_pages_blocking(&pdf_bytes))
            .await
            .map_err(|e| DashboardError::Internal(format!("Render task panicked: {e}")))?
    }

    fn render_pages_blocking(
        &self,
        pdf_bytes: &[u8],
    ) -> Result<Vec<(usize, DynamicImage)>, DashboardError> {
        let pdfium = bind_pdfium(self.lib_path.as_deref())?;

        let document = pdfium.load_pdf_from_byte_slice(pdf_bytes, None).map_err(|e| {
            let err_str = format!("{e:?}");
            if err_str.contains("Password") || err_str.contains("password") {
                DashboardError::PasswordRequired
            } else {
                DashboardError::CorruptPdf { detail: err_str }
            }
        })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(self.dpi as f32 / 72.0)
            .set_maximum_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32);

        let mut results = Vec::with_capacity(total_pages);
        for idx in 0..total_pages {
            let page = pages
                .get(idx as u16)
                .map_err(|e| DashboardError::RasterisationFailed {
                    page: idx + 1,
                    detail: format!("{e:?}"),
                })?;

            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                DashboardError::RasterisationFailed {
                    page: idx + 1,
                    detail: format!("{e:?}"),
                }
            })?;

            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            results.push((idx, image));
        }

        Ok(results)
    }
}

/// Bind to an explicit pdfium library (file or directory) or the system one.
fn bind_pdfium(lib_path: Option<&Path>) -> Result<Pdfium, DashboardError> {
    let bindings = match lib_path {
        Some(path) if path.is_dir() => {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
        }
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| DashboardError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_with_bogus_library_path_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let config = DashboardConfig::builder()
            .pdfium_lib_path(dir.path().join("libpdfium-missing.so"))
            .build()
            .unwrap();
        let err = PdfRenderer::probe(&config).unwrap_err();
        assert!(matches!(err, DashboardError::PdfiumBindingFailed(_)));
        assert!(err.to_string().contains("PDFIUM_LIB_PATH"));
    }
}
