//! Character range → per-line bounding rectangles.
//!
//! A resolved range is partitioned by page, then into visual lines. A new
//! line starts at a synthetic line break or when a glyph's top edge moves by
//! more than `epsilon` from the previous glyph's. Whitespace contributes no
//! geometry, so rectangles hug the visible text.

use std::ops::Range;

use crate::layout::{Character, Layout, Rect};

/// Running union of one visual line.
struct LineGroup {
    page: usize,
    last_y0: f32,
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
}

impl LineGroup {
    fn start(c: &Character) -> Self {
        Self {
            page: c.page,
            last_y0: c.y0,
            x0: c.x0,
            y0: c.y0,
            x1: c.x1,
            y1: c.y1,
        }
    }

    fn continues_with(&self, c: &Character, epsilon: f32) -> bool {
        self.page == c.page && (c.y0 - self.last_y0).abs() <= epsilon
    }

    fn add(&mut self, c: &Character) {
        self.x0 = self.x0.min(c.x0);
        self.y0 = self.y0.min(c.y0);
        self.x1 = self.x1.max(c.x1);
        self.y1 = self.y1.max(c.y1);
        self.last_y0 = c.y0;
    }

    fn into_rect(self, layout: &Layout) -> Rect {
        let page = layout.page_geometry(self.page);
        Rect {
            page: self.page,
            x0: self.x0,
            y0: self.y0,
            x1: self.x1,
            y1: self.y1,
            page_width: page.width,
            page_height: page.height,
        }
    }
}

/// One [`Rect`] per (page, visual line) covered by `range`.
///
/// Offsets outside the layout are ignored.
pub fn rects_for_range(range: Range<usize>, layout: &Layout, epsilon: f32) -> Vec<Rect> {
    let mut rects = Vec::new();
    let mut current: Option<LineGroup> = None;

    for c in range.filter_map(|offset| layout.character(offset)) {
        if c.is_line_break() {
            if let Some(group) = current.take() {
                rects.push(group.into_rect(layout));
            }
            continue;
        }
        if c.ch.is_whitespace() {
            continue;
        }
        if let Some(group) = current.as_mut().filter(|g| g.continues_with(c, epsilon)) {
            group.add(c);
            continue;
        }
        if let Some(group) = current.replace(LineGroup::start(c)) {
            rects.push(group.into_rect(layout));
        }
    }

    if let Some(group) = current {
        rects.push(group.into_rect(layout));
    }
    rects
}
