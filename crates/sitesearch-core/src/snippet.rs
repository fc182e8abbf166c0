//! Highlighted excerpts around search matches.
//!
//! A snippet is a window of at most `size` characters cut from a text field,
//! centered on the first match, with both edges nudged onto nearby word
//! boundaries. The window is then split into alternating literal and
//! highlighted segments. Offsets everywhere in this module count characters,
//! not bytes, so multi-byte text is windowed the same way as ASCII.
//!
//! ```rust
//! use sitesearch_core::snippet::{build_snippet, SnippetOptions};
//! use sitesearch_core::types::MatchSpan;
//!
//! let snippet = build_snippet(
//!     "hello world foo bar baz",
//!     &[MatchSpan::new(12, 3)],
//!     SnippetOptions { size: 12, margin: 3 },
//! );
//! assert_eq!(snippet.parts, vec!["…world ", "foo", " bar…"]);
//! ```

use crate::types::MatchSpan;
use serde::{Deserialize, Serialize};

/// Marker added where the window cuts text off.
pub const ELLIPSIS: char = '…';

/// Window edge being snapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Left edge; the boundary must be followed by a non-space character.
    Start,
    /// Right edge; the boundary must be preceded by a non-space character.
    End,
}

/// Window geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnippetOptions {
    /// Target window width in characters.
    pub size: usize,
    /// How far each edge may move to reach a word boundary.
    pub margin: usize,
}

impl Default for SnippetOptions {
    fn default() -> Self {
        Self {
            size: 100,
            margin: 10,
        }
    }
}

/// A highlighted excerpt.
///
/// `parts` alternates literal and highlighted text, starting and ending with a
/// literal: even indices are literal, odd indices highlighted. Truncation
/// markers are already folded into the first and last literal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// Alternating literal/highlighted segments.
    pub parts: Vec<String>,
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn char_at(chars: &[char], position: i64) -> Option<char> {
    usize::try_from(position)
        .ok()
        .and_then(|index| chars.get(index))
        .copied()
}

fn is_boundary(chars: &[char], position: i64, edge: Edge) -> bool {
    let before = char_at(chars, position - 1);
    let after = char_at(chars, position);

    let word_before = before.is_some_and(is_word);
    let word_after = after.is_some_and(is_word);
    if word_before == word_after {
        return false;
    }

    let facing = match edge {
        Edge::Start => after,
        Edge::End => before,
    };
    facing.is_some_and(|c| !c.is_whitespace())
}

fn snap_chars(chars: &[char], position: i64, margin: usize, edge: Edge) -> i64 {
    let margin = i64::try_from(margin).unwrap_or(i64::MAX);
    (0..=margin)
        .flat_map(|i| [position - i, position + i])
        .find(|&candidate| is_boundary(chars, candidate, edge))
        .unwrap_or(position)
}

/// Move `position` to the nearest word boundary within `margin` characters.
///
/// Offsets `position - i` and `position + i` are tried for `i` in
/// `0..=margin`, in that order. A boundary has a word character on exactly
/// one side, with the ends of the string counting as non-word. For
/// [`Edge::Start`] the character after the boundary must exist and not be
/// whitespace; for [`Edge::End`] the character before it. Returns `position`
/// unchanged when no offset qualifies. `position` may lie outside the text.
pub fn snap(text: &str, position: i64, margin: usize, edge: Edge) -> i64 {
    let chars: Vec<char> = text.chars().collect();
    snap_chars(&chars, position, margin, edge)
}

/// Cut a highlighted excerpt out of `text`.
///
/// `highlights` are character spans, usually from
/// [`merge_text_positions`](crate::highlight::merge_text_positions). The
/// window is centered on the start of the first span as given, so callers
/// pass the span they care about most first. Spans not entirely inside the
/// final window are dropped; overlapping spans are united.
pub fn build_snippet(text: &str, highlights: &[MatchSpan], options: SnippetOptions) -> Snippet {
    let chars: Vec<char> = text.chars().collect();
    let len = to_i64(chars.len());

    let pivot = highlights.first().map_or(0, |span| to_i64(span.start));
    let (start, end) = window(&chars, pivot, options);

    let mut spans = highlights.to_vec();
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.length.cmp(&a.length)));

    let truncated_start = start > 0;
    let truncated_end = end < len;
    let start = clamp(start, chars.len());
    let end = clamp(end, chars.len()).max(start);

    let mut merged: Vec<(usize, usize)> = Vec::new();
    for span in spans
        .iter()
        .filter(|span| span.start >= start && span.end() <= end)
    {
        match merged.last_mut() {
            Some(last) if span.start < last.1 => last.1 = last.1.max(span.end()),
            _ => merged.push((span.start, span.end())),
        }
    }

    let slice = |from: usize, to: usize| chars[from..to].iter().collect::<String>();
    let mut parts = Vec::with_capacity(merged.len() * 2 + 1);
    let mut cursor = start;
    for (from, to) in merged {
        parts.push(slice(cursor, from));
        parts.push(slice(from, to));
        cursor = to;
    }
    parts.push(slice(cursor, end));

    if truncated_start {
        if let Some(first) = parts.first_mut() {
            first.insert(0, ELLIPSIS);
        }
    }
    if truncated_end {
        if let Some(last) = parts.last_mut() {
            last.push(ELLIPSIS);
        }
    }

    Snippet { parts }
}

/// Snapped window edges around `pivot`, before clamping to the text.
fn window(chars: &[char], pivot: i64, options: SnippetOptions) -> (i64, i64) {
    let len = to_i64(chars.len());
    let size = to_i64(options.size);

    let mut start = pivot - size / 2;
    let mut end = start + size;
    if start < 0 {
        end -= start;
        start = 0;
    } else if end > len {
        start -= end - len;
        end = len;
    }

    (
        snap_chars(chars, start, options.margin, Edge::Start),
        snap_chars(chars, end, options.margin, Edge::End),
    )
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn clamp(position: i64, len: usize) -> usize {
    usize::try_from(position).map_or(0, |p| p.min(len))
}
