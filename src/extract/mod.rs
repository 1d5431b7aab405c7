//! Layout extraction: document bytes → `RawText` + [`Layout`].
//!
//! Each page is recovered from its vector text layer when it has one, and
//! from OCR over a rasterized image otherwise:
//!
//! ```text
//! bytes → DocumentReader (blocking) → per-page glyphs | raster
//!       → OcrEngine for raster-only pages (concurrent, timeout-bounded)
//!       → page-ordered assembly with synthetic line/page breaks
//! ```
//!
//! A page that fails OCR becomes an empty page; the document still succeeds.
//!
//! # Readers
//!
//! | Input | Reader | Feature Flag |
//! |-------|--------|-------------|
//! | `%PDF-` | [`pdf::PdfiumReader`] | `pdf` |
//! | UTF-8 text | [`plain::PlainTextReader`] | always |

pub mod ocr;
#[cfg(feature = "pdf")]
pub mod pdf;
pub mod plain;

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ExtractConfig;
use crate::error::DocumentError;
use crate::layout::{Character, Layout, PageGeometry};

pub use ocr::{OcrEngine, OcrToken, PageRaster, TesseractEngine};

/// One text-layer character in reading order, in page coordinates.
///
/// `'\n'` glyphs are explicit line breaks and carry no geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub ch: char,
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Glyph {
    pub fn new(ch: char, x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { ch, x0, y0, x1, y1 }
    }

    /// An explicit line break.
    pub fn line_break() -> Self {
        Self::new('\n', 0.0, 0.0, 0.0, 0.0)
    }

    fn width(&self) -> f32 {
        (self.x1 - self.x0).abs()
    }

    fn height(&self) -> f32 {
        (self.y1 - self.y0).abs()
    }
}

/// A page as delivered by a [`DocumentReader`].
#[derive(Debug, Clone, Default)]
pub struct SourcePage {
    pub geometry: PageGeometry,
    /// Text-layer characters; empty when the page has no embedded text.
    pub glyphs: Vec<Glyph>,
    /// Rendered image, present only for pages without text.
    pub raster: Option<PageRaster>,
}

/// A page "has text" when its text layer yields a non-whitespace character.
pub fn has_text(glyphs: &[Glyph]) -> bool {
    glyphs.iter().any(|g| !g.ch.is_whitespace())
}

/// Parses document bytes into pages.
///
/// Implementations are synchronous; [`LayoutExtractor`] runs them inside
/// `tokio::task::spawn_blocking` (pdfium is FFI and not `Send`).
pub trait DocumentReader: Send + Sync {
    /// Short lowercase reader name (e.g., `"pdfium"`, `"plain"`).
    fn name(&self) -> &'static str;

    /// Returns `true` if this reader recognizes the bytes.
    fn supports(&self, bytes: &[u8]) -> bool;

    /// Read every page. Pages without text should carry a raster rendered at
    /// `raster_scale` pixels per page unit.
    ///
    /// Only a document-level failure is an error; a page whose text layer
    /// cannot be read is returned empty.
    fn read(&self, bytes: &[u8], raster_scale: f32) -> Result<Vec<SourcePage>, DocumentError>;
}

/// Routes document bytes to the first [`DocumentReader`] that supports them.
pub struct ReaderRouter {
    readers: Vec<Arc<dyn DocumentReader>>,
}

impl ReaderRouter {
    /// Create a router with all available readers.
    ///
    /// The PDF reader is included only when the `pdf` feature flag is enabled.
    pub fn new() -> Self {
        #[cfg(feature = "pdf")]
        let readers: Vec<Arc<dyn DocumentReader>> = vec![
            Arc::new(pdf::PdfiumReader::new()),
            Arc::new(plain::PlainTextReader),
        ];

        #[cfg(not(feature = "pdf"))]
        let readers: Vec<Arc<dyn DocumentReader>> = vec![Arc::new(plain::PlainTextReader)];

        Self { readers }
    }

    /// Router over an explicit reader list, tried in order.
    pub fn with_readers(readers: Vec<Arc<dyn DocumentReader>>) -> Self {
        Self { readers }
    }

    /// Pick a reader for the bytes.
    pub fn select(&self, bytes: &[u8]) -> Result<Arc<dyn DocumentReader>, DocumentError> {
        if bytes.is_empty() {
            return Err(DocumentError::Empty);
        }

        if let Some(reader) = self.readers.iter().find(|r| r.supports(bytes)) {
            return Ok(Arc::clone(reader));
        }

        if bytes.starts_with(b"%PDF") {
            return Err(DocumentError::UnsupportedFormat(
                "PDF input requires the `pdf` feature".to_string(),
            ));
        }

        Err(DocumentError::UnsupportedFormat(
            "expected a PDF or UTF-8 text document".to_string(),
        ))
    }
}

impl Default for ReaderRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// How a page's characters were recovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSource {
    TextLayer,
    Ocr,
    /// No text layer and no OCR result (no engine, OCR failed, or timed out).
    Empty,
}

/// Per-page extraction summary.
#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    pub page: usize,
    pub source: PageSource,
    pub characters: usize,
}

/// Output of [`LayoutExtractor::extract`].
#[derive(Debug, Clone)]
pub struct Extraction {
    pub raw_text: String,
    pub layout: Layout,
    pub pages: Vec<PageReport>,
}

/// Hybrid text-layer + OCR extractor.
pub struct LayoutExtractor {
    reader: Arc<dyn DocumentReader>,
    ocr: Option<Arc<dyn OcrEngine>>,
    config: ExtractConfig,
}

impl LayoutExtractor {
    pub fn new(reader: Arc<dyn DocumentReader>, config: ExtractConfig) -> Self {
        Self {
            reader,
            ocr: None,
            config,
        }
    }

    /// Attach an OCR engine for pages without a text layer.
    #[must_use]
    pub fn with_ocr(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.ocr = Some(engine);
        self
    }

    /// Extract `RawText` and [`Layout`] from document bytes.
    ///
    /// Fails only when the document itself cannot be read.
    pub async fn extract(&self, bytes: Vec<u8>) -> Result<Extraction, DocumentError> {
        if bytes.is_empty() {
            return Err(DocumentError::Empty);
        }

        let reader = Arc::clone(&self.reader);
        let scale = self.config.raster_scale;
        let reader_name = reader.name();
        let pages = tokio::task::spawn_blocking(move || reader.read(&bytes, scale))
            .await
            .map_err(|e| DocumentError::Task(e.to_string()))??;

        info!("{reader_name} reader returned {} pages", pages.len());

        let parallelism = std::thread::available_parallelism().map_or(2, std::num::NonZero::get);

        // `buffered` keeps page order while OCR runs concurrently.
        let recovered: Vec<(PageGeometry, Vec<Glyph>, PageSource)> =
            stream::iter(pages.into_iter().enumerate())
                .map(|(index, page)| self.recover_page(index, page))
                .buffered(parallelism)
                .collect()
                .await;

        let mut assembler = Assembler::new(self.config.line_break_tolerance);
        let mut geometries = Vec::with_capacity(recovered.len());
        let mut reports = Vec::with_capacity(recovered.len());

        for (index, (geometry, glyphs, source)) in recovered.into_iter().enumerate() {
            if index > 0 {
                assembler.push_page_separator(index - 1);
            }
            let before = assembler.len();
            assembler.push_page(index, &glyphs);
            geometries.push(geometry);
            reports.push(PageReport {
                page: index,
                source,
                characters: assembler.len() - before,
            });
        }

        let layout = Layout {
            pages: geometries,
            characters: assembler.finish(),
        };
        let raw_text = layout.raw_text();

        info!(
            "Extracted {} characters from {} pages ({} via OCR)",
            layout.characters.len(),
            layout.pages.len(),
            reports.iter().filter(|r| r.source == PageSource::Ocr).count()
        );

        Ok(Extraction {
            raw_text,
            layout,
            pages: reports,
        })
    }

    /// Turn one source page into reading-order glyphs, running OCR if needed.
    async fn recover_page(
        &self,
        index: usize,
        page: SourcePage,
    ) -> (PageGeometry, Vec<Glyph>, PageSource) {
        let SourcePage {
            geometry,
            glyphs,
            raster,
        } = page;

        if has_text(&glyphs) {
            return (geometry, glyphs, PageSource::TextLayer);
        }

        let (Some(engine), Some(raster)) = (&self.ocr, raster) else {
            debug!("Page {index}: no text layer and no OCR input");
            return (geometry, Vec::new(), PageSource::Empty);
        };

        let timeout = self.config.ocr_timeout();
        match tokio::time::timeout(timeout, engine.recognize(&raster)).await {
            Ok(Ok(tokens)) => {
                debug!("Page {index}: {} OCR tokens from {}", tokens.len(), engine.name());
                let glyphs = tokens_to_glyphs(&tokens, self.config.line_break_tolerance);
                (geometry, glyphs, PageSource::Ocr)
            }
            Ok(Err(e)) => {
                warn!("Page {index}: OCR failed, continuing with empty page: {e}");
                (geometry, Vec::new(), PageSource::Empty)
            }
            Err(_) => {
                warn!("Page {index}: OCR timed out after {timeout:?}, continuing with empty page");
                (geometry, Vec::new(), PageSource::Empty)
            }
        }
    }
}

/// Expand OCR tokens into glyphs.
///
/// Sub-token geometry is unknown, so every character of a token gets the
/// full token box. Tokens on the same line are joined by a space spanning
/// the gap between them; line changes are left to the assembler.
pub fn tokens_to_glyphs(tokens: &[OcrToken], line_break_tolerance: f32) -> Vec<Glyph> {
    let mut glyphs = Vec::new();
    let mut previous: Option<&OcrToken> = None;

    for token in tokens {
        let text = token.text.trim();
        if text.is_empty() {
            continue;
        }

        if let Some(prev) = previous {
            let tolerance = line_break_tolerance * prev.height().max(token.height());
            if (token.y0 - prev.y0).abs() <= tolerance && token.x0 >= prev.x0 {
                glyphs.push(Glyph::new(
                    ' ',
                    prev.x1,
                    prev.y0,
                    token.x0.max(prev.x1),
                    prev.y1,
                ));
            }
        }

        for ch in text.chars() {
            glyphs.push(Glyph::new(ch, token.x0, token.y0, token.x1, token.y1));
        }
        previous = Some(token);
    }

    glyphs
}

/// Builds the contiguous character stream.
///
/// Offsets are assigned in push order, so every character (including the
/// synthetic breaks) owns exactly one offset.
struct Assembler {
    characters: Vec<Character>,
    line_break_tolerance: f32,
}

impl Assembler {
    fn new(line_break_tolerance: f32) -> Self {
        Self {
            characters: Vec::new(),
            line_break_tolerance,
        }
    }

    fn len(&self) -> usize {
        self.characters.len()
    }

    fn push(&mut self, glyph: &Glyph, page: usize) {
        let global_offset = self.characters.len();
        self.characters.push(Character {
            ch: glyph.ch,
            x0: glyph.x0,
            y0: glyph.y0,
            x1: glyph.x1,
            y1: glyph.y1,
            page,
            global_offset,
        });
    }

    /// Zero-area newline anchored at the end of the previous character.
    fn push_break(&mut self, page: usize) {
        let (x, y) = self
            .characters
            .last()
            .filter(|c| c.page == page)
            .map_or((0.0, 0.0), |c| (c.x1, c.y1));
        self.push(&Glyph::new('\n', x, y, x, y), page);
    }

    fn ends_with_break(&self) -> bool {
        self.characters.last().is_none_or(Character::is_line_break)
    }

    fn push_page_separator(&mut self, previous_page: usize) {
        self.push_break(previous_page);
    }

    /// Append one page, inserting a newline wherever the glyphs change line
    /// and a space at word gaps the text layer left implicit.
    fn push_page(&mut self, page: usize, glyphs: &[Glyph]) {
        let visible: Vec<&Glyph> = glyphs
            .iter()
            .filter(|g| !g.ch.is_whitespace())
            .collect();
        let avg_width = if visible.is_empty() {
            0.0
        } else {
            visible.iter().map(|g| g.width()).sum::<f32>() / visible.len() as f32
        };
        let space_threshold = avg_width * 0.3;

        let mut anchor: Option<Glyph> = None;
        let mut last_emitted: Option<char> = None;

        for glyph in glyphs {
            match glyph.ch {
                '\r' => continue,
                '\n' => {
                    self.push_break(page);
                    last_emitted = Some('\n');
                    anchor = None;
                    continue;
                }
                _ => {}
            }

            if glyph.ch.is_whitespace() {
                self.push(glyph, page);
                last_emitted = Some(glyph.ch);
                continue;
            }

            if let Some(prev) = anchor {
                let tolerance = self.line_break_tolerance * prev.height().max(glyph.height());
                let new_line = (glyph.y0 - prev.y0).abs() > tolerance;
                if new_line {
                    if !self.ends_with_break() {
                        self.push_break(page);
                    }
                } else if last_emitted.is_some_and(|c| !c.is_whitespace())
                    && glyph.x0 - prev.x1 > space_threshold
                    && space_threshold > 0.0
                {
                    self.push(&Glyph::new(' ', prev.x1, prev.y0, glyph.x0, prev.y1), page);
                }
            }

            self.push(glyph, page);
            last_emitted = Some(glyph.ch);
            anchor = Some(*glyph);
        }
    }

    fn finish(self) -> Vec<Character> {
        self.characters
    }
}
