//! Plain text reader.
//!
//! Lays UTF-8 text out on synthetic US-Letter pages in a fixed monospace
//! grid so text documents flow through the same pipeline as PDFs. Form
//! feeds (`\x0c`) separate pages.

use crate::error::DocumentError;
use crate::layout::PageGeometry;

use super::{DocumentReader, Glyph, SourcePage};

/// Left and top margin in points.
const MARGIN: f32 = 72.0;
/// Advance width of one character cell.
const CHAR_WIDTH: f32 = 6.0;
/// Glyph box height.
const FONT_HEIGHT: f32 = 10.0;
/// Baseline-to-baseline distance.
const LINE_HEIGHT: f32 = 14.0;

const LETTER_WIDTH: f32 = 612.0;
const LETTER_HEIGHT: f32 = 792.0;

/// Reads UTF-8 text documents.
pub struct PlainTextReader;

impl PlainTextReader {
    fn layout_page(text: &str) -> SourcePage {
        let text = text.trim_end_matches(['\n', '\r']);
        let mut glyphs = Vec::with_capacity(text.len());
        let mut max_cols = 0usize;
        let mut rows = 0usize;

        for (row, line) in text.split('\n').enumerate() {
            if row > 0 {
                glyphs.push(Glyph::line_break());
            }
            let y0 = MARGIN + row as f32 * LINE_HEIGHT;
            let mut cols = 0usize;
            for (col, ch) in line.trim_end_matches('\r').chars().enumerate() {
                let x0 = MARGIN + col as f32 * CHAR_WIDTH;
                glyphs.push(Glyph::new(ch, x0, y0, x0 + CHAR_WIDTH, y0 + FONT_HEIGHT));
                cols = col + 1;
            }
            max_cols = max_cols.max(cols);
            rows = row + 1;
        }

        SourcePage {
            geometry: PageGeometry {
                width: LETTER_WIDTH.max(2.0 * MARGIN + max_cols as f32 * CHAR_WIDTH),
                height: LETTER_HEIGHT.max(2.0 * MARGIN + rows as f32 * LINE_HEIGHT),
            },
            glyphs,
            raster: None,
        }
    }
}

impl DocumentReader for PlainTextReader {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn supports(&self, bytes: &[u8]) -> bool {
        !bytes.starts_with(b"%PDF") && !bytes.contains(&0) && std::str::from_utf8(bytes).is_ok()
    }

    fn read(&self, bytes: &[u8], _raster_scale: f32) -> Result<Vec<SourcePage>, DocumentError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| DocumentError::Unreadable(format!("invalid UTF-8: {e}")))?;
        Ok(text.split('\x0c').map(Self::layout_page).collect())
    }
}
