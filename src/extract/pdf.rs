//! PDF reader backed by `pdfium-render` (Chromium's PDF library).
//!
//! Pulls every text-layer character with its tight bounds, flipping pdfium's
//! bottom-up coordinates to the top-left origin used by [`Layout`]. Pages
//! without text are rendered for OCR.
//!
//! [`Layout`]: crate::layout::Layout

use std::path::PathBuf;

use pdfium_render::prelude::*;
use tracing::{debug, warn};

use crate::error::DocumentError;
use crate::layout::PageGeometry;

use super::{has_text, DocumentReader, Glyph, PageRaster, SourcePage};

/// Reads PDFs through pdfium.
///
/// Binds `FIELDLENS_PDFIUM_PATH` when set, the system library otherwise.
pub struct PdfiumReader {
    library_path: Option<PathBuf>,
}

impl PdfiumReader {
    pub fn new() -> Self {
        Self {
            library_path: std::env::var_os("FIELDLENS_PDFIUM_PATH").map(PathBuf::from),
        }
    }

    pub fn with_library_path(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, DocumentError> {
        let bindings = match &self.library_path {
            Some(path) => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| DocumentError::Unreadable(format!("pdfium unavailable: {e}")))?;
        Ok(Pdfium::new(bindings))
    }

    /// Text-layer characters of one page in reading order.
    #[allow(deprecated)] // PdfRect field access deprecated in 0.8.28, removed in 0.9.0
    fn page_glyphs(page: &PdfPage, page_height: f32) -> Result<Vec<Glyph>, PdfiumError> {
        let text = page.text()?;
        let mut glyphs = Vec::new();

        for ch in text.chars().iter() {
            let Some(unicode_ch) = ch.unicode_char() else {
                continue;
            };

            match unicode_ch {
                '\r' => continue,
                '\n' => {
                    glyphs.push(Glyph::line_break());
                    continue;
                }
                _ => {}
            }

            let Ok(rect) = ch.tight_bounds() else {
                continue;
            };
            glyphs.push(Glyph::new(
                unicode_ch,
                rect.left.value,
                page_height - rect.top.value,
                rect.right.value,
                page_height - rect.bottom.value,
            ));
        }

        Ok(glyphs)
    }

    fn rasterize(page: &PdfPage, page_width: f32, scale: f32) -> Result<PageRaster, PdfiumError> {
        let target_width = (page_width * scale).round().max(1.0) as i32;
        let config = PdfRenderConfig::new().set_target_width(target_width);
        let bitmap = page.render_with_config(&config)?;

        let width = bitmap.width().max(0) as u32;
        let height = bitmap.height().max(0) as u32;

        Ok(PageRaster {
            width,
            height,
            rgba: bitmap.as_rgba_bytes(),
            scale: width as f32 / page_width.max(1.0),
        })
    }
}

impl Default for PdfiumReader {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentReader for PdfiumReader {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    fn supports(&self, bytes: &[u8]) -> bool {
        bytes.starts_with(b"%PDF")
    }

    fn read(&self, bytes: &[u8], raster_scale: f32) -> Result<Vec<SourcePage>, DocumentError> {
        let pdfium = self.bind()?;
        let doc = pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| DocumentError::Unreadable(format!("failed to parse PDF: {e}")))?;

        let mut pages = Vec::with_capacity(doc.pages().len() as usize);

        for (page_idx, page) in doc.pages().iter().enumerate() {
            let geometry = PageGeometry {
                width: page.width().value,
                height: page.height().value,
            };

            let glyphs = Self::page_glyphs(&page, geometry.height).unwrap_or_else(|e| {
                warn!("Page {page_idx}: text layer unreadable, treating as image: {e}");
                Vec::new()
            });

            let raster = if has_text(&glyphs) {
                None
            } else {
                debug!("Page {page_idx}: no text layer, rendering at {raster_scale}x");
                Self::rasterize(&page, geometry.width, raster_scale)
                    .inspect_err(|e| warn!("Page {page_idx}: render failed: {e}"))
                    .ok()
            };

            pages.push(SourcePage {
                geometry,
                glyphs,
                raster,
            });
        }

        Ok(pages)
    }
}
