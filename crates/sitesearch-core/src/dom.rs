//! Thin DOM helpers over `scraper`.
//!
//! The extractor and crawler only need a handful of operations from a parsed
//! page: the `<body>` element, visible text of an element, identifier
//! attributes, and the resolved targets of `<a href>` links.

use ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node};
use url::Url;

/// Elements whose text is never rendered.
const HIDDEN_CONTAINERS: &[&str] = &["script", "style"];

/// A fetched page parsed into a DOM, together with the URL it was loaded from.
///
/// `Html` is not `Send`; parse, extract and drop a `Page` without crossing an
/// `.await`.
pub struct Page {
    url: Url,
    html: Html,
}

impl Page {
    /// Parse a full HTML document loaded from `url`.
    pub fn parse(url: Url, source: &str) -> Self {
        Self {
            url,
            html: Html::parse_document(source),
        }
    }

    /// URL the page was loaded from.
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// The `<body>` element, or the document root when the parser produced none.
    pub fn body(&self) -> ElementRef<'_> {
        let root = self.html.root_element();
        root.children()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "body")
            .unwrap_or(root)
    }

    /// Absolute targets of every `<a href>` on the page, in document order.
    ///
    /// Relative references are resolved against the page URL; hrefs that do
    /// not form a valid URL are skipped.
    pub fn links(&self) -> Vec<Url> {
        self.html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "a")
            .filter_map(|el| el.value().attr("href"))
            .filter_map(|href| self.url.join(href.trim()).ok())
            .collect()
    }
}

/// Text of all descendant text nodes, skipping script and style subtrees.
///
/// The result is not trimmed.
pub fn inner_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    collect_text(*element, &mut text);
    text
}

fn collect_text(node: NodeRef<'_, Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if HIDDEN_CONTAINERS.contains(&el.name()) => {},
            Node::Element(_) => collect_text(child, out),
            _ => {},
        }
    }
}

/// The element's own `id`, falling back to its `name` attribute.
pub fn own_anchor<'a>(element: ElementRef<'a>) -> Option<&'a str> {
    let value = element.value();
    value
        .id()
        .filter(|id| !id.is_empty())
        .or_else(|| value.attr("name").filter(|name| !name.is_empty()))
}

/// The element's own anchor, or that of its first descendant carrying one.
pub fn anchor<'a>(element: ElementRef<'a>) -> Option<&'a str> {
    own_anchor(element).or_else(|| {
        element
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .find_map(own_anchor)
    })
}
