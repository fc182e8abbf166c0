//! Hierarchical content extraction.
//!
//! Turns an arbitrary DOM subtree into an ordered list of [`IndexedRecord`]s,
//! each pairing a run of body text with the heading path it falls under.
//!
//! The extractor never builds a tree of headings. It performs one pre-order
//! walk and keeps a single record under construction. Headings close the
//! current record and open a new one whose hierarchy inherits the shallower
//! levels; text elements append to the open record. Matched elements are not
//! descended into, so a heading's inline markup is never classified twice.
//!
//! ## Example
//!
//! ```rust
//! use sitesearch_core::dom::Page;
//! use sitesearch_core::extract::extract;
//! use sitesearch_core::rules::CompiledRule;
//!
//! let page = Page::parse(
//!     "http://localhost/".parse().unwrap(),
//!     "<h1>Guide</h1><h2 id=\"setup\">Setup</h2><p>Run the installer.</p>",
//! );
//! let rule = CompiledRule::parse(&["h1", "h2"], "p").unwrap();
//!
//! let records = extract(page.body(), &rule);
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].hierarchy, vec![Some("Guide".into()), Some("Setup".into())]);
//! assert_eq!(records[0].anchor.as_deref(), Some("setup"));
//! assert_eq!(records[0].text, "Run the installer.");
//! ```

use crate::dom;
use crate::rules::CompiledRule;
use crate::types::IndexedRecord;
use scraper::ElementRef;

/// Extract records from `root` using `rule`.
///
/// Every returned record has non-empty text. Running the extractor twice on
/// the same DOM yields identical output.
pub fn extract(root: ElementRef<'_>, rule: &CompiledRule) -> Vec<IndexedRecord> {
    let mut acc = RecordAccumulator::new(rule);
    walk(root, &mut |element| acc.visit(element));
    acc.finish()
}

/// Pre-order walk over element children; `visitor` returns whether to descend.
fn walk<'a, F>(element: ElementRef<'a>, visitor: &mut F)
where
    F: FnMut(ElementRef<'a>) -> bool,
{
    if visitor(element) {
        for child in element.children().filter_map(ElementRef::wrap) {
            walk(child, visitor);
        }
    }
}

/// How a visited element is classified.
#[derive(Debug, PartialEq, Eq)]
enum Visit {
    /// Nothing to record here; keep looking underneath.
    Descend,
    /// Body text for the open record.
    Text(String),
    /// Heading starting a new record at this level.
    Heading { level: usize, content: String },
}

fn classify(element: ElementRef<'_>, rule: &CompiledRule) -> Visit {
    let content = dom::inner_text(element);
    let content = content.trim();
    if content.is_empty() {
        return Visit::Descend;
    }

    if rule.text.selector.matches(&element) {
        return Visit::Text(content.to_string());
    }

    rule.hierarchy
        .iter()
        .position(|level| level.selector.matches(&element))
        .map_or(Visit::Descend, |level| Visit::Heading {
            level,
            content: content.to_string(),
        })
}

/// The record under construction plus everything already emitted.
struct RecordAccumulator<'r> {
    rule: &'r CompiledRule,
    hierarchy: Vec<Option<String>>,
    text: String,
    anchor: Option<String>,
    heading_seen: bool,
    records: Vec<IndexedRecord>,
}

impl<'r> RecordAccumulator<'r> {
    fn new(rule: &'r CompiledRule) -> Self {
        Self {
            rule,
            hierarchy: rule.hierarchy.iter().map(|level| level.default.clone()).collect(),
            text: String::new(),
            anchor: None,
            heading_seen: false,
            records: Vec::new(),
        }
    }

    fn visit(&mut self, element: ElementRef<'_>) -> bool {
        match classify(element, self.rule) {
            Visit::Descend => true,
            Visit::Text(content) => {
                self.push_text(&content);
                false
            },
            Visit::Heading { level, content } => {
                self.start_heading(level, content, dom::anchor(element));
                false
            },
        }
    }

    fn push_text(&mut self, content: &str) {
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(content);
    }

    /// Text gathered before the first heading is kept and joins that
    /// heading's record.
    fn start_heading(&mut self, level: usize, content: String, anchor: Option<&str>) {
        if self.heading_seen && !self.text.is_empty() {
            self.flush();
        }

        let previous = std::mem::take(&mut self.hierarchy);
        self.hierarchy = self
            .rule
            .hierarchy
            .iter()
            .zip(previous)
            .enumerate()
            .map(|(i, (selector, value))| match i.cmp(&level) {
                std::cmp::Ordering::Less => value.or_else(|| selector.default.clone()),
                std::cmp::Ordering::Equal => Some(content.clone()),
                std::cmp::Ordering::Greater => None,
            })
            .collect();
        self.anchor = anchor.map(str::to_string);
        self.heading_seen = true;
    }

    fn flush(&mut self) {
        self.records.push(IndexedRecord {
            hierarchy: self.hierarchy.clone(),
            text: std::mem::take(&mut self.text),
            anchor: self.anchor.clone(),
        });
    }

    fn finish(mut self) -> Vec<IndexedRecord> {
        if !self.text.is_empty() {
            self.flush();
        }
        self.records
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dom::Page;
    use crate::types::{ContentRule, ContentSelector};
    use proptest::prelude::*;

    fn page(source: &str) -> Page {
        Page::parse("http://localhost:3000/".parse().unwrap(), source)
    }

    fn rule(hierarchy: &[&str], text: &str) -> CompiledRule {
        CompiledRule::parse(hierarchy, text).unwrap()
    }

    fn record(hierarchy: &[Option<&str>], text: &str, anchor: Option<&str>) -> IndexedRecord {
        IndexedRecord {
            hierarchy: hierarchy.iter().map(|h| h.map(str::to_string)).collect(),
            text: text.to_string(),
            anchor: anchor.map(str::to_string),
        }
    }

    #[test]
    fn test_basic_outline() {
        let page = page(
            r"
            <section>
              <h1>Main Title</h1>
              <h2>Some Subtitle</h2>
              <p>Some content</p>
              <p>Some content as well</p>
              <h2>Some other Subtitle</h2>
              <p>Some more content</p>
              <h3>Such a deep title</h3>
              <p>And such deep content</p>
              <h2>Back up again</h2>
              <p>The end</p>
            </section>",
        );

        let records = extract(
            page.body(),
            &rule(&["section h1", "section h2", "section h3"], "section p"),
        );

        assert_eq!(
            records,
            vec![
                record(
                    &[Some("Main Title"), Some("Some Subtitle"), None],
                    "Some content\nSome content as well",
                    None,
                ),
                record(
                    &[Some("Main Title"), Some("Some other Subtitle"), None],
                    "Some more content",
                    None,
                ),
                record(
                    &[
                        Some("Main Title"),
                        Some("Some other Subtitle"),
                        Some("Such a deep title"),
                    ],
                    "And such deep content",
                    None,
                ),
                record(
                    &[Some("Main Title"), Some("Back up again"), None],
                    "The end",
                    None,
                ),
            ]
        );
    }

    #[test]
    fn test_ignores_content_outside_selectors() {
        let page = page(
            r"
            <h1>Ignore this</h1>
            <p>And this</p>
            <section>
              <h1>Some Title</h1>
              <p>Some content</p>
            </section>
            <h2>Ignore also this</h2>
            <p>And this too</p>",
        );

        let records = extract(page.body(), &rule(&["section h1", "section h2"], "section p"));

        assert_eq!(records, vec![record(&[Some("Some Title"), None], "Some content", None)]);
    }

    #[test]
    fn test_anchors_from_heading_or_descendant() {
        let page = page(
            r#"
            <section>
              <h1>Main Title</h1>
              <h2 id="anchor1">Some Subtitle</h2>
              <p>Some content</p>
              <h2>Some other Subtitle<span id="anchor2"></span></h2>
              <p>Some more content</p>
              <h2>Some Subtitle without anchor</h2>
              <p>Even more content</p>
            </section>"#,
        );

        let records = extract(page.body(), &rule(&["section h1", "section h2"], "section p"));

        assert_eq!(
            records,
            vec![
                record(
                    &[Some("Main Title"), Some("Some Subtitle")],
                    "Some content",
                    Some("anchor1"),
                ),
                record(
                    &[Some("Main Title"), Some("Some other Subtitle")],
                    "Some more content",
                    Some("anchor2"),
                ),
                record(
                    &[Some("Main Title"), Some("Some Subtitle without anchor")],
                    "Even more content",
                    None,
                ),
            ]
        );
    }

    #[test]
    fn test_default_fills_unvisited_level() {
        let page = page("<h2>Some Title</h2><p>Some content</p>");
        let compiled = CompiledRule::compile(
            &ContentRule {
                test: None,
                hierarchy: vec![
                    ContentSelector::new("h1").with_default("Default"),
                    ContentSelector::new("h2"),
                ],
                text: ContentSelector::new("p"),
            },
            "rule",
        )
        .unwrap();

        let records = extract(page.body(), &compiled);
        assert_eq!(
            records,
            vec![record(&[Some("Default"), Some("Some Title")], "Some content", None)]
        );
    }

    #[test]
    fn test_leading_text_uses_defaults_when_no_heading_follows() {
        let page = page("<p>Intro paragraph</p>");
        let compiled = CompiledRule::compile(
            &ContentRule {
                test: None,
                hierarchy: vec![
                    ContentSelector::new("h1").with_default("Home"),
                    ContentSelector::new("h2"),
                ],
                text: ContentSelector::new("p"),
            },
            "rule",
        )
        .unwrap();

        let records = extract(page.body(), &compiled);
        assert_eq!(records, vec![record(&[Some("Home"), None], "Intro paragraph", None)]);
    }

    #[test]
    fn test_leading_text_joins_first_heading_record() {
        let page = page("<p>Intro</p><h1>T</h1><p>Body</p><h1>U</h1><p>More</p>");

        let records = extract(page.body(), &rule(&["h1"], "p"));
        assert_eq!(
            records,
            vec![
                record(&[Some("T")], "Intro\nBody", None),
                record(&[Some("U")], "More", None),
            ]
        );
    }

    #[test]
    fn test_heading_without_text_emits_nothing() {
        let page = page(
            r"<h1>Title</h1>
              <h2>Empty section</h2>
              <h2>Filled section</h2>
              <p>Body</p>
              <h2>Trailing empty</h2>",
        );

        let records = extract(page.body(), &rule(&["h1", "h2"], "p"));
        assert_eq!(
            records,
            vec![record(&[Some("Title"), Some("Filled section")], "Body", None)]
        );
    }

    #[test]
    fn test_matched_elements_are_not_descended() {
        let page = page(
            r#"<h1>Guide <a href="/x">link</a></h1>
               <p>Outer <span class="p">inner</span> text</p>
               <div><p>Nested in div</p></div>"#,
        );

        let records = extract(page.body(), &rule(&["h1"], "p, .p"));
        assert_eq!(
            records,
            vec![record(
                &[Some("Guide link")],
                "Outer inner text\nNested in div",
                None
            )]
        );
    }

    #[test]
    fn test_script_text_is_not_content() {
        let page = page(
            r"<h1>Title<script>console.log('x')</script></h1>
              <p><script>alert(1)</script></p>
              <p>Visible</p>",
        );

        let records = extract(page.body(), &rule(&["h1"], "p"));
        assert_eq!(records, vec![record(&[Some("Title")], "Visible", None)]);
    }

    #[test]
    fn test_deeper_heading_inherits_shallower_levels() {
        let page = page(
            r"<h1>A</h1><h2>B</h2><p>one</p>
              <h3>C</h3><p>two</p>
              <h2>D</h2><h3>E</h3><p>three</p>",
        );

        let records = extract(page.body(), &rule(&["h1", "h2", "h3"], "p"));
        let paths: Vec<Vec<Option<String>>> = records.into_iter().map(|r| r.hierarchy).collect();
        assert_eq!(
            paths,
            vec![
                vec![Some("A".into()), Some("B".into()), None],
                vec![Some("A".into()), Some("B".into()), Some("C".into())],
                vec![Some("A".into()), Some("D".into()), Some("E".into())],
            ]
        );
    }

    fn html_fragment() -> impl Strategy<Value = String> {
        let element = prop_oneof![
            "[a-z ]{0,12}".prop_map(|t| format!("<h1>{t}</h1>")),
            "[a-z ]{0,12}".prop_map(|t| format!("<h2>{t}</h2>")),
            "[a-z ]{0,12}".prop_map(|t| format!("<p>{t}</p>")),
            "[a-z ]{0,12}".prop_map(|t| format!("<div><p>{t}</p></div>")),
            "[a-z ]{0,12}".prop_map(|t| format!("<span>{t}</span>")),
        ];
        prop::collection::vec(element, 0..24).prop_map(|parts| parts.concat())
    }

    proptest! {
        #[test]
        fn prop_records_have_text_and_full_hierarchy(source in html_fragment()) {
            let page = page(&source);
            let compiled = rule(&["h1", "h2"], "p");
            let records = extract(page.body(), &compiled);

            for record in &records {
                prop_assert!(!record.text.is_empty());
                prop_assert_eq!(record.hierarchy.len(), 2);
            }

            let again = extract(page.body(), &compiled);
            prop_assert_eq!(records, again);
        }
    }
}
