//! Pure text-location strategies.
//!
//! Every strategy has the shape `(needle, haystack) -> Option<Range<usize>>`
//! over `char` slices, so returned ranges are global character offsets when
//! the haystack is the full raw text. The earliest match in the haystack wins.

use std::ops::Range;

/// Signature shared by the parameterless strategies.
pub type StrategyFn = fn(&[char], &[char]) -> Option<Range<usize>>;

/// Simple one-to-one lowercase fold. Characters whose lowercase form expands
/// to several chars are left as-is so offsets never shift.
fn fold(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

fn find_by(needle: &[char], haystack: &[char], eq: impl Fn(char, char) -> bool) -> Option<Range<usize>> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window.iter().zip(needle).all(|(&h, &n)| eq(h, n)))
        .map(|start| start..start + needle.len())
}

/// Case-sensitive, char-for-char match.
pub fn exact(needle: &[char], haystack: &[char]) -> Option<Range<usize>> {
    find_by(needle, haystack, |h, n| h == n)
}

pub fn case_insensitive(needle: &[char], haystack: &[char]) -> Option<Range<usize>> {
    find_by(needle, haystack, |h, n| h == n || fold(h) == fold(n))
}

/// Text with whitespace runs collapsed to one space, remembering where every
/// collapsed char came from.
struct Collapsed {
    chars: Vec<char>,
    /// Original offset of each collapsed char.
    starts: Vec<usize>,
    /// Original end offset (exclusive) of each collapsed char.
    ends: Vec<usize>,
}

impl Collapsed {
    fn new(text: &[char]) -> Self {
        let mut out = Self {
            chars: Vec::with_capacity(text.len()),
            starts: Vec::with_capacity(text.len()),
            ends: Vec::with_capacity(text.len()),
        };
        for (i, &c) in text.iter().enumerate() {
            if c.is_whitespace() {
                if out.chars.last() == Some(&' ') {
                    if let Some(end) = out.ends.last_mut() {
                        *end = i + 1;
                    }
                    continue;
                }
                out.chars.push(' ');
            } else {
                out.chars.push(fold(c));
            }
            out.starts.push(i);
            out.ends.push(i + 1);
        }
        out
    }
}

/// Match after collapsing whitespace runs (newlines included) on both sides.
///
/// Case is folded as well, so this step is a superset of
/// [`case_insensitive`].
pub fn whitespace_normalized(needle: &[char], haystack: &[char]) -> Option<Range<usize>> {
    let needle = Collapsed::new(needle);
    let trimmed = trim_spaces(&needle.chars);
    if trimmed.is_empty() {
        return None;
    }
    let hay = Collapsed::new(haystack);
    let found = exact(trimmed, &hay.chars)?;
    Some(hay.starts[found.start]..hay.ends[found.end - 1])
}

fn trim_spaces(chars: &[char]) -> &[char] {
    let start = chars.iter().position(|&c| c != ' ').unwrap_or(chars.len());
    let end = chars.iter().rposition(|&c| c != ' ').map_or(start, |i| i + 1);
    &chars[start..end]
}

/// Longest contiguous run shared by `needle` and `haystack`, case-folded.
///
/// Returns the haystack range of the earliest longest run.
pub fn longest_common_substring(needle: &[char], haystack: &[char]) -> Option<Range<usize>> {
    if needle.is_empty() || haystack.is_empty() {
        return None;
    }
    let needle: Vec<char> = needle.iter().map(|&c| fold(c)).collect();

    // Rolling DP rows indexed by needle position.
    let mut prev = vec![0usize; needle.len() + 1];
    let mut cur = vec![0usize; needle.len() + 1];
    let mut best_len = 0;
    let mut best_end = 0;

    for (i, &h) in haystack.iter().enumerate() {
        let h = fold(h);
        for (j, &n) in needle.iter().enumerate() {
            cur[j + 1] = if h == n { prev[j] + 1 } else { 0 };
            if cur[j + 1] > best_len {
                best_len = cur[j + 1];
                best_end = i + 1;
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    (best_len > 0).then(|| best_end - best_len..best_end)
}

/// Fuzzy fallback: accept the longest common substring only when it covers
/// at least `min_ratio` of the needle.
pub fn fuzzy(needle: &[char], haystack: &[char], min_ratio: f32) -> Option<Range<usize>> {
    let found = longest_common_substring(needle, haystack)?;
    let required = min_ratio * needle.len() as f32;
    (found.len() as f32 >= required).then_some(found)
}
