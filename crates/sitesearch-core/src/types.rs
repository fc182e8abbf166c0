use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A CSS selector plus the value used when nothing on the page filled its level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSelector {
    /// CSS selector matched against each visited element.
    pub selector: String,
    /// Fallback for a hierarchy level no heading ever populated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ContentSelector {
    /// Selector without a default value.
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            default: None,
        }
    }

    /// Set the fallback value for this level.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Extraction rule applied to every page whose path matches `test`.
///
/// Rules without `test` act as catch-alls. `hierarchy` is ordered from the
/// outermost heading level (page title) to the innermost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRule {
    /// Regular expression tested against the page path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    /// Heading selectors, outermost first.
    pub hierarchy: Vec<ContentSelector>,
    /// Selector for body text elements.
    pub text: ContentSelector,
}

/// One extracted unit of body text with its heading path and anchor.
///
/// `text` is never empty for an emitted record. `hierarchy` always has one
/// slot per configured heading level; a slot is `None` only when neither a
/// heading nor a default ever filled it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedRecord {
    /// Heading values, one per configured level.
    pub hierarchy: Vec<Option<String>>,
    /// Newline-joined body text.
    pub text: String,
    /// In-page identifier of the heading that started this record.
    pub anchor: Option<String>,
}

/// An [`IndexedRecord`] tagged with the page path it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedDocument {
    /// Normalized page path (no query string, no fragment).
    pub path: String,
    /// Heading values, one per configured level.
    pub hierarchy: Vec<Option<String>>,
    /// Newline-joined body text.
    pub text: String,
    /// In-page identifier of the heading that started this record.
    pub anchor: Option<String>,
}

impl IndexedDocument {
    /// Tag a record with the path of the page it was extracted from.
    pub fn from_record(path: impl Into<String>, record: IndexedRecord) -> Self {
        Self {
            path: path.into(),
            hierarchy: record.hierarchy,
            text: record.text,
            anchor: record.anchor,
        }
    }
}

/// Documents in crawl order.
pub type Corpus = Vec<IndexedDocument>;

/// A match location inside one text field, in characters.
///
/// Serialized as the pair `[start, length]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(usize, usize)", into = "(usize, usize)")]
pub struct MatchSpan {
    /// Character offset of the first matched character.
    pub start: usize,
    /// Number of matched characters.
    pub length: usize,
}

impl MatchSpan {
    /// Create a span from a start offset and length.
    pub const fn new(start: usize, length: usize) -> Self {
        Self { start, length }
    }

    /// Offset one past the last matched character.
    pub const fn end(&self) -> usize {
        self.start + self.length
    }
}

impl From<(usize, usize)> for MatchSpan {
    fn from((start, length): (usize, usize)) -> Self {
        Self { start, length }
    }
}

impl From<MatchSpan> for (usize, usize) {
    fn from(span: MatchSpan) -> Self {
        (span.start, span.length)
    }
}

/// Match spans of one term, keyed by field name.
pub type FieldMatches = BTreeMap<String, Vec<MatchSpan>>;

/// Match spans of a hit, keyed by matched term, then by field name.
pub type MatchData = BTreeMap<String, FieldMatches>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_match_span_serializes_as_pair() {
        let span = MatchSpan::new(12, 3);
        assert_eq!(serde_json::to_string(&span).unwrap(), "[12,3]");

        let back: MatchSpan = serde_json::from_str("[16,3]").unwrap();
        assert_eq!(back, MatchSpan::new(16, 3));
        assert_eq!(back.end(), 19);
    }

    #[test]
    fn test_document_keeps_record_fields() {
        let record = IndexedRecord {
            hierarchy: vec![Some("Guide".to_string()), None],
            text: "Install the CLI".to_string(),
            anchor: Some("install".to_string()),
        };

        let doc = IndexedDocument::from_record("/docs/", record.clone());
        assert_eq!(doc.path, "/docs/");
        assert_eq!(doc.hierarchy, record.hierarchy);
        assert_eq!(doc.text, record.text);
        assert_eq!(doc.anchor, record.anchor);

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["hierarchy"], serde_json::json!(["Guide", null]));
        assert_eq!(json["anchor"], "install");
    }

    #[test]
    fn test_rule_deserializes_without_test_or_defaults() {
        let rule: ContentRule = toml::from_str(
            r#"
            hierarchy = [{ selector = "h1", default = "Docs" }, { selector = "h2" }]
            text = { selector = "p, li" }
            "#,
        )
        .unwrap();

        assert!(rule.test.is_none());
        assert_eq!(rule.hierarchy[0].default.as_deref(), Some("Docs"));
        assert_eq!(rule.hierarchy[1], ContentSelector::new("h2"));
        assert_eq!(rule.text.selector, "p, li");
    }
}
