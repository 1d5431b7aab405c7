//! Cross-chunk merge and field-label grammar.
//!
//! Chunk results are folded in chunk order through a [`FieldAccumulator`];
//! the first occurrence of a `(label, value)` pair wins. Comparison ignores
//! case and whitespace runs.

use std::collections::{BTreeMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::layout::{Field, MappedField};

static GROUPED_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<group>[^\[\]]+)\[(?P<row>\d+)\]\.(?P<name>.+)$").expect("valid regex")
});

/// A parsed field label.
///
/// `Claims[1].Amount` → group `Claims`, row 1, name `Amount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLabel<'a> {
    pub group: Option<(&'a str, usize)>,
    pub name: &'a str,
}

impl<'a> FieldLabel<'a> {
    /// Parse a label. Labels without valid grouping syntax are plain names.
    pub fn parse(label: &'a str) -> Self {
        GROUPED_LABEL
            .captures(label)
            .and_then(|caps| {
                let group = caps.name("group")?.as_str().trim();
                let row = caps.name("row")?.as_str().parse().ok()?;
                let name = caps.name("name")?.as_str();
                (!group.is_empty()).then_some(Self {
                    group: Some((group, row)),
                    name,
                })
            })
            .unwrap_or(Self { group: None, name: label })
    }

    /// Whether the label looks like it attempted grouping but is malformed.
    pub fn is_malformed_group(label: &str) -> bool {
        label.contains('[') && FieldLabel::parse(label).group.is_none()
    }
}

/// Lowercase and collapse whitespace runs to single spaces.
pub fn normalize_key(s: &str) -> String {
    s.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Ordered, deduplicating fold over chunk results.
#[derive(Debug, Default)]
pub struct FieldAccumulator {
    seen: HashSet<(String, String)>,
    fields: Vec<Field>,
    duplicates: usize,
}

impl FieldAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one chunk's fields, keeping only unseen `(label, value)` pairs.
    pub fn extend(&mut self, fields: impl IntoIterator<Item = Field>) {
        for field in fields {
            let key = (normalize_key(&field.label), normalize_key(&field.value));
            if self.seen.insert(key) {
                self.fields.push(field);
            } else {
                self.duplicates += 1;
            }
        }
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn finish(self) -> Vec<Field> {
        self.fields
    }
}

/// Merge chunk results in order; first occurrence wins.
pub fn merge_chunks<I>(chunks: I) -> Vec<Field>
where
    I: IntoIterator<Item = Vec<Field>>,
{
    chunks
        .into_iter()
        .fold(FieldAccumulator::new(), |mut acc, fields| {
            acc.extend(fields);
            acc
        })
        .finish()
}

/// Grouped rows: group name → row index → fields in that row.
pub type GroupedRows<'a> = BTreeMap<&'a str, BTreeMap<usize, Vec<&'a MappedField>>>;

/// Rebuild tables from `Group[row].Name` labels. Ungrouped fields are skipped.
pub fn group_rows(fields: &[MappedField]) -> GroupedRows<'_> {
    let mut groups: GroupedRows<'_> = BTreeMap::new();
    for mapped in fields {
        if let Some((group, row)) = FieldLabel::parse(&mapped.field.label).group {
            groups
                .entry(group)
                .or_default()
                .entry(row)
                .or_default()
                .push(mapped);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_grouped_label() {
        let label = FieldLabel::parse("Claims[12].Amount");
        assert_eq!(label.group, Some(("Claims", 12)));
        assert_eq!(label.name, "Amount");
    }

    #[test]
    fn nested_path_stays_in_name() {
        let label = FieldLabel::parse("Claims[0].Lines[2].Code");
        assert_eq!(label.group, Some(("Claims", 0)));
        assert_eq!(label.name, "Lines[2].Code");
    }

    #[test]
    fn plain_and_malformed_labels() {
        assert_eq!(FieldLabel::parse("Policy Number").group, None);
        assert_eq!(FieldLabel::parse("Policy Number").name, "Policy Number");
        assert!(FieldLabel::is_malformed_group("Claims[x].Amount"));
        assert!(FieldLabel::is_malformed_group("Claims[0]Amount"));
        assert!(!FieldLabel::is_malformed_group("Claims[0].Amount"));
        assert!(!FieldLabel::is_malformed_group("Total"));
    }

    #[test]
    fn malformed_check_accepts_short_lived_labels() {
        let owned = format!("{}[{}].Amount", "Claims", "first");
        assert!(FieldLabel::is_malformed_group(owned.trim()));
        let owned = String::from("Claims[3].Amount");
        assert!(!FieldLabel::is_malformed_group(&owned));
    }

    #[test]
    fn duplicates_merge_across_case_and_spacing() {
        let merged = merge_chunks(vec![
            vec![
                Field::new("Policy Number", "POL-123"),
                Field::new("Insured", "Jane Doe"),
            ],
            vec![
                Field::new("policy  number", " pol-123 "),
                Field::new("Premium", "$900"),
            ],
        ]);
        let labels: Vec<&str> = merged.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, ["Policy Number", "Insured", "Premium"]);
    }

    #[test]
    fn first_occurrence_keeps_its_snippet() {
        let merged = merge_chunks(vec![
            vec![Field::new("A", "1").with_snippet("A: 1")],
            vec![Field::new("a", "1").with_snippet("a = 1")],
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].snippet.as_deref(), Some("A: 1"));
    }

    #[test]
    fn same_label_different_value_is_kept() {
        let mut acc = FieldAccumulator::new();
        acc.extend(vec![Field::new("Amount", "$500"), Field::new("Amount", "$750")]);
        acc.extend(vec![Field::new("AMOUNT", "$500")]);
        assert_eq!(acc.duplicates(), 1);
        assert_eq!(acc.finish().len(), 2);
    }

    #[test]
    fn groups_rows_by_label() {
        let mapped = |label: &str| MappedField {
            field: Field::new(label, "v"),
            rects: vec![],
        };
        let fields = vec![
            mapped("Claims[1].Amount"),
            mapped("Policy Number"),
            mapped("Claims[0].Amount"),
            mapped("Claims[0].Date"),
        ];
        let groups = group_rows(&fields);
        let claims = &groups["Claims"];
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[&0].len(), 2);
        assert_eq!(claims[&1][0].field.label, "Claims[1].Amount");
        assert!(!groups.contains_key("Policy Number"));
    }
}
