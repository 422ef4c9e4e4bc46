//! Page scanning: read a single-page artifact's text layer and, when OCR is
//! called for, rasterise it.
//!
//! ## Why spawn_blocking?
//!
//! pdfium keeps thread-local state and its calls are CPU-bound.
//! `tokio::task::spawn_blocking` keeps that work off the Tokio workers.
//!
//! ## Why cap pixels, not DPI?
//!
//! Page sizes vary wildly: an A0 poster at 150 DPI is a 12,000 × 17,000 px
//! image. `max_rendered_pixels` caps the longest edge whatever the physical
//! size, keeping memory bounded and staying in the size range vision models
//! handle best (around 1,024–2,048 px).

use crate::config::EngineConfig;
use crate::pipeline::engine::EngineError;
use crate::pipeline::pdf::bind_pdfium;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::debug;

/// A text layer with fewer non-whitespace characters than this is treated as
/// a scanned page.
pub const MIN_TEXT_LAYER_CHARS: usize = 16;

/// What a scan produced: either text good enough to use, or an image to OCR.
#[derive(Debug)]
pub enum PageScan {
    TextLayer(String),
    Image(DynamicImage),
}

/// Decides whether a page goes through OCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OcrPolicy {
    pub ocr_enabled: bool,
    pub force_full_page_ocr: bool,
}

impl From<&EngineConfig> for OcrPolicy {
    fn from(config: &EngineConfig) -> Self {
        Self {
            ocr_enabled: config.ocr_enabled,
            force_full_page_ocr: config.force_full_page_ocr,
        }
    }
}

impl OcrPolicy {
    /// `true` when the page must be rasterised and sent to the vision model.
    pub fn needs_ocr(&self, text_layer: &str) -> bool {
        if !self.ocr_enabled {
            return false;
        }
        if self.force_full_page_ocr {
            return true;
        }
        text_layer.chars().filter(|c| !c.is_whitespace()).count() < MIN_TEXT_LAYER_CHARS
    }
}

/// Scan the first page of the PDF at `artifact`.
pub async fn scan_page(
    artifact: &Path,
    policy: OcrPolicy,
    max_pixels: u32,
) -> Result<PageScan, EngineError> {
    let path = artifact.to_path_buf();
    tokio::task::spawn_blocking(move || scan_page_blocking(&path, policy, max_pixels))
        .await
        .map_err(|e| EngineError::Failed(format!("Scan task panicked: {}", e)))?
}

fn scan_page_blocking(
    path: &Path,
    policy: OcrPolicy,
    max_pixels: u32,
) -> Result<PageScan, EngineError> {
    let pdfium = bind_pdfium().map_err(|e| EngineError::Unavailable(e.to_string()))?;
    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| EngineError::Failed(format!("cannot open {}: {:?}", path.display(), e)))?;

    let pages = document.pages();
    let page = pages
        .get(0)
        .map_err(|e| EngineError::Failed(format!("artifact has no page: {:?}", e)))?;

    // Pages without a text object report an error here; treat them as empty.
    let text_layer = page.text().map(|t| t.all()).unwrap_or_default();
    if !policy.needs_ocr(&text_layer) {
        debug!("Using text layer ({} chars)", text_layer.len());
        return Ok(PageScan::TextLayer(text_layer));
    }

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);
    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| EngineError::Failed(format!("rasterisation failed: {:?}", e)))?;

    let image = bitmap.as_image();
    debug!("Rendered page → {}x{} px", image.width(), image.height());
    Ok(PageScan::Image(image))
}
