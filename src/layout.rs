//! Document data model shared by every pipeline stage.
//!
//! All types here are created once and never mutated afterwards:
//!
//! ```text
//! Extractor → (RawText, Layout) → Structurer → Vec<Field> → Mapper → Vec<MappedField>
//! ```
//!
//! Offsets are measured in Unicode scalar values (`char`s), not bytes, so
//! `raw_text.chars().nth(i)` is always `layout.characters[i].ch`.

use serde::{Deserialize, Serialize};

/// A single character of the document with its page-space bounding box.
///
/// Coordinates use a top-left origin: `y0` is the top edge, `y1` the bottom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    #[serde(rename = "char")]
    pub ch: char,
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    /// Page index (0-based).
    pub page: usize,
    pub global_offset: usize,
}

impl Character {
    /// Synthetic line/page breaks carry a zero-area box and no real geometry.
    pub fn is_line_break(&self) -> bool {
        self.ch == '\n'
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).abs()
    }
}

/// Page size in page units (PDF points for PDF input).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
        }
    }
}

/// Page geometries plus the flat, offset-ordered character stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub pages: Vec<PageGeometry>,
    pub characters: Vec<Character>,
}

impl Layout {
    /// Look up a page size, falling back to a unit page for unknown indices.
    pub fn page_geometry(&self, page: usize) -> PageGeometry {
        self.pages.get(page).copied().unwrap_or_default()
    }

    /// Character at a global offset.
    ///
    /// Offsets are contiguous from zero, so this is a direct index.
    pub fn character(&self, offset: usize) -> Option<&Character> {
        self.characters
            .get(offset)
            .filter(|c| c.global_offset == offset)
    }

    /// Concatenation of every character in offset order.
    pub fn raw_text(&self) -> String {
        self.characters.iter().map(|c| c.ch).collect()
    }

    /// Check the offset invariant: offsets are exactly `0..len` with no gaps.
    pub fn offsets_are_contiguous(&self) -> bool {
        self.characters
            .iter()
            .enumerate()
            .all(|(i, c)| c.global_offset == i)
    }
}

/// A labeled value identified by the language model.
///
/// `label` may use the `Group[index].Name` convention for repeating rows;
/// it is carried verbatim through every stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl Field {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            snippet: None,
        }
    }

    #[must_use]
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

/// A highlight rectangle on one page, with the page size it was measured against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub page: usize,
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    pub page_width: f32,
    pub page_height: f32,
}

impl Rect {
    /// Rescale into a render surface of `width` × `height`.
    #[must_use]
    pub fn scaled_to(&self, width: f32, height: f32) -> Self {
        let sx = width / self.page_width.max(f32::EPSILON);
        let sy = height / self.page_height.max(f32::EPSILON);
        Self {
            page: self.page,
            x0: self.x0 * sx,
            y0: self.y0 * sy,
            x1: self.x1 * sx,
            y1: self.y1 * sy,
            page_width: width,
            page_height: height,
        }
    }
}

/// A field together with every rectangle it was located at.
///
/// An empty `rects` list means "no location available", not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedField {
    #[serde(flatten)]
    pub field: Field,
    #[serde(default)]
    pub rects: Vec<Rect>,
}

impl MappedField {
    pub fn is_located(&self) -> bool {
        !self.rects.is_empty()
    }
}
