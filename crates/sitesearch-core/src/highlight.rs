//! Flattening per-term match metadata into snippet highlights.

use crate::index::TEXT_FIELD;
use crate::types::{MatchData, MatchSpan};

/// Collect every body-text span of a hit into one ordered list.
///
/// Spans under fields other than the body text are ignored. The result is
/// sorted by start offset, longer spans first on ties, which is the order
/// [`build_snippet`](crate::snippet::build_snippet) expects.
pub fn merge_text_positions(matches: &MatchData) -> Vec<MatchSpan> {
    let mut spans: Vec<MatchSpan> = matches
        .values()
        .filter_map(|fields| fields.get(TEXT_FIELD))
        .flatten()
        .copied()
        .collect();
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.length.cmp(&a.length)));
    spans
}
