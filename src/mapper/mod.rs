//! Coordinate Mapper: re-project fields onto the page.
//!
//! Each field is located in the raw text by an ordered cascade of
//! [`strategy`] functions; the first hit wins. The resolved character range
//! is then turned into per-line rectangles by [`geometry`].
//!
//! | Step | Strategy              | Needle            |
//! |------|-----------------------|-------------------|
//! | 1    | exact                 | snippet           |
//! | 2    | exact                 | value             |
//! | 3    | case-insensitive      | snippet           |
//! | 4    | case-insensitive      | value             |
//! | 5    | whitespace-normalized | snippet           |
//! | 6    | whitespace-normalized | value             |
//! | 7    | fuzzy (LCS)           | snippet or value  |
//!
//! A field that no step locates is still emitted, with no rectangles.

pub mod geometry;
pub mod strategy;

use std::fmt;
use std::ops::Range;

use tracing::{debug, info, warn};

use crate::config::MapperConfig;
use crate::layout::{Field, Layout, MappedField};

pub use geometry::rects_for_range;

/// How a step matches its needle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Exact,
    CaseInsensitive,
    WhitespaceNormalized,
    Fuzzy,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Exact => "exact",
            Self::CaseInsensitive => "case-insensitive",
            Self::WhitespaceNormalized => "whitespace-normalized",
            Self::Fuzzy => "fuzzy",
        };
        f.write_str(name)
    }
}

/// Which part of the field a step searches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Needle {
    Snippet,
    Value,
    /// The snippet when present, otherwise the value.
    SnippetOrValue,
}

impl Needle {
    fn pick(self, field: &Field) -> Option<&str> {
        let snippet = field.snippet.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let value = Some(field.value.trim()).filter(|v| !v.is_empty());
        match self {
            Self::Snippet => snippet,
            Self::Value => value,
            Self::SnippetOrValue => snippet.or(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub strategy: Strategy,
    pub needle: Needle,
}

const fn step(strategy: Strategy, needle: Needle) -> Step {
    Step { strategy, needle }
}

/// The fixed resolution order.
pub const CASCADE: [Step; 7] = [
    step(Strategy::Exact, Needle::Snippet),
    step(Strategy::Exact, Needle::Value),
    step(Strategy::CaseInsensitive, Needle::Snippet),
    step(Strategy::CaseInsensitive, Needle::Value),
    step(Strategy::WhitespaceNormalized, Needle::Snippet),
    step(Strategy::WhitespaceNormalized, Needle::Value),
    step(Strategy::Fuzzy, Needle::SnippetOrValue),
];

/// Where and how a field was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub step: Step,
    /// Character range in the raw text.
    pub range: Range<usize>,
}

pub struct CoordinateMapper {
    config: MapperConfig,
}

impl Default for CoordinateMapper {
    fn default() -> Self {
        Self::new(MapperConfig::default())
    }
}

impl CoordinateMapper {
    pub fn new(config: MapperConfig) -> Self {
        Self { config }
    }

    fn run(&self, step: Step, needle: &[char], haystack: &[char]) -> Option<Range<usize>> {
        match step.strategy {
            Strategy::Exact => strategy::exact(needle, haystack),
            Strategy::CaseInsensitive => strategy::case_insensitive(needle, haystack),
            Strategy::WhitespaceNormalized => strategy::whitespace_normalized(needle, haystack),
            Strategy::Fuzzy => strategy::fuzzy(needle, haystack, self.config.min_fuzzy_ratio),
        }
    }

    /// Run the cascade for one field against the raw text chars.
    pub fn resolve(&self, field: &Field, haystack: &[char]) -> Option<Resolution> {
        CASCADE.iter().find_map(|&step| {
            let needle: Vec<char> = step.needle.pick(field)?.chars().collect();
            let range = self.run(step, &needle, haystack)?;
            Some(Resolution { step, range })
        })
    }

    /// Locate every field. Output order and length match `fields`.
    pub fn map(&self, fields: &[Field], text: &str, layout: &Layout) -> Vec<MappedField> {
        let haystack: Vec<char> = text.chars().collect();
        if haystack.len() != layout.characters.len() {
            warn!(
                "Text has {} chars but layout has {}; offsets beyond the layout get no geometry",
                haystack.len(),
                layout.characters.len()
            );
        }

        let mapped: Vec<MappedField> = fields
            .iter()
            .map(|field| self.map_field(field, &haystack, layout))
            .collect();

        let located = mapped.iter().filter(|m| m.is_located()).count();
        info!("Located {located}/{} fields", mapped.len());
        mapped
    }

    fn map_field(&self, field: &Field, haystack: &[char], layout: &Layout) -> MappedField {
        let rects = match self.resolve(field, haystack) {
            Some(Resolution { step, range }) => {
                debug!(
                    "{:?}: {} match on {:?} at {:?}",
                    field.label, step.strategy, step.needle, range
                );
                rects_for_range(range, layout, self.config.line_epsilon)
            }
            None => {
                warn!("{:?}: no location found", field.label);
                Vec::new()
            }
        };
        MappedField {
            field: field.clone(),
            rects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Character, PageGeometry};

    /// Monospace layout of `text` on one page; `\n` is a zero-area break.
    fn layout_for(text: &str) -> Layout {
        let mut characters = Vec::new();
        let (mut col, mut row) = (0.0f32, 0.0f32);
        for (offset, ch) in text.chars().enumerate() {
            let (x0, y0) = (col * 6.0, row * 14.0);
            if ch == '\n' {
                characters.push(Character {
                    ch,
                    x0,
                    y0: y0 + 10.0,
                    x1: x0,
                    y1: y0 + 10.0,
                    page: 0,
                    global_offset: offset,
                });
                col = 0.0;
                row += 1.0;
                continue;
            }
            characters.push(Character {
                ch,
                x0,
                y0,
                x1: x0 + 6.0,
                y1: y0 + 10.0,
                page: 0,
                global_offset: offset,
            });
            col += 1.0;
        }
        Layout {
            pages: vec![PageGeometry {
                width: 612.0,
                height: 792.0,
            }],
            characters,
        }
    }

    fn resolve_step(field: &Field, text: &str) -> Option<(usize, Range<usize>)> {
        let haystack: Vec<char> = text.chars().collect();
        CoordinateMapper::default().resolve(field, &haystack).map(|r| {
            let index = CASCADE.iter().position(|s| *s == r.step).unwrap_or(usize::MAX);
            (index + 1, r.range)
        })
    }

    #[test]
    fn cascade_order_is_fixed() {
        assert_eq!(CASCADE[0], step(Strategy::Exact, Needle::Snippet));
        assert_eq!(CASCADE[6], step(Strategy::Fuzzy, Needle::SnippetOrValue));
    }

    #[test]
    fn each_step_is_reachable() {
        let text = "Policy Number: POL-123\nInsured:   Jane Doe";
        let cases = [
            (Field::new("P", "x").with_snippet("POL-123"), 1),
            (Field::new("P", "POL-123").with_snippet("missing"), 2),
            (Field::new("P", "x").with_snippet("policy number"), 3),
            (Field::new("P", "pol-123"), 4),
            (Field::new("I", "x").with_snippet("Insured: Jane Doe"), 5),
            (Field::new("I", "insured:\tjane doe"), 6),
            (Field::new("P", "Policy Numbr"), 7),
        ];
        for (field, expected) in cases {
            let (step, _) = resolve_step(&field, text).unwrap();
            assert_eq!(step, expected, "{field:?}");
        }
    }

    #[test]
    fn exact_snippet_beats_earlier_fuzzy_match() {
        let text = "Amount Paid: $50\nAmount Paid: $500";
        let field = Field::new("Paid", "$500").with_snippet("Amount Paid: $500");

        // The first line alone is close enough for the fuzzy step.
        let needle: Vec<char> = "Amount Paid: $500".chars().collect();
        let first_line: Vec<char> = text.chars().take(16).collect();
        assert_eq!(strategy::fuzzy(&needle, &first_line, 0.6), Some(0..16));

        let (step, range) = resolve_step(&field, text).unwrap();
        assert_eq!(step, 1);
        assert_eq!(range, 17..34);
    }

    #[test]
    fn fuzzy_below_threshold_leaves_field_unlocated() {
        let text = "Policy Number: POL-123";
        let field = Field::new("Ref", "ZZZZZZZZ-Pol");
        let mapped = CoordinateMapper::default().map(&[field], text, &layout_for(text));
        assert_eq!(mapped.len(), 1);
        assert!(mapped[0].rects.is_empty());
    }

    #[test]
    fn unlocated_fields_are_never_dropped() {
        let text = "abc";
        let fields = vec![Field::new("A", "abc"), Field::new("B", "   "), Field::new("C", "xyz")];
        let mapped = CoordinateMapper::default().map(&fields, text, &layout_for(text));
        let labels: Vec<&str> = mapped.iter().map(|m| m.field.label.as_str()).collect();
        assert_eq!(labels, ["A", "B", "C"]);
        assert!(mapped[0].is_located());
        assert!(!mapped[1].is_located());
    }

    #[test]
    fn multi_line_snippet_yields_rect_per_line() {
        let text = "Insured:\nJane Doe\nPremium";
        let field = Field::new("Insured", "Jane Doe").with_snippet("Insured:\nJane Doe");
        let mapped = CoordinateMapper::default().map(&[field], text, &layout_for(text));
        let rects = &mapped[0].rects;
        assert_eq!(rects.len(), 2);
        assert!(rects.iter().all(|r| r.page == 0));
        assert!(rects[0].y0 < rects[1].y0);
    }

    #[test]
    fn mapping_is_idempotent() {
        let text = "Total: $1,250.00\nDue: 2024-03-01";
        let layout = layout_for(text);
        let fields = vec![
            Field::new("Total", "$1,250.00"),
            Field::new("Due", "2024-03-01").with_snippet("Due:  2024-03-01"),
        ];
        let mapper = CoordinateMapper::default();
        assert_eq!(mapper.map(&fields, text, &layout), mapper.map(&fields, text, &layout));
    }

    #[test]
    fn end_to_end_claims_scenario() {
        let text = "Policy Number: POL-123\nClaims[0].Amount: $500\nClaims[1].Amount: $750";
        let fields = vec![
            Field::new("Policy Number", "POL-123").with_snippet("Policy Number: POL-123"),
            Field::new("Claims[0].Amount", "$500").with_snippet("Claims[0].Amount: $500"),
            Field::new("Claims[1].Amount", "$750").with_snippet("Claims[1].Amount: $750"),
        ];
        let mapped = CoordinateMapper::default().map(&fields, text, &layout_for(text));

        assert_eq!(mapped.len(), 3);
        let tops: Vec<f32> = mapped
            .iter()
            .map(|m| {
                assert_eq!(m.rects.len(), 1, "{}", m.field.label);
                assert_eq!(m.rects[0].page, 0);
                m.rects[0].y0
            })
            .collect();
        assert!(tops.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(mapped[1].field.label, "Claims[0].Amount");
    }

    #[test]
    fn rects_carry_page_size() {
        let text = "abc";
        let mapped = CoordinateMapper::default().map(&[Field::new("A", "b")], text, &layout_for(text));
        let rect = mapped[0].rects[0];
        assert_eq!((rect.page_width, rect.page_height), (612.0, 792.0));
        assert_eq!((rect.x0, rect.x1), (6.0, 12.0));
    }
}
