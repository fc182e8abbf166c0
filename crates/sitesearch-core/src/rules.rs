//! Compiled content rules and path routing.
//!
//! [`ContentRule`]s arrive as plain strings from configuration. Before a crawl
//! starts every rule is compiled once: the `test` pattern into a
//! [`regex::Regex`] and each selector into a [`scraper::Selector`]. Compilation
//! reports every problem it finds so configuration validation can surface them
//! together.

use crate::types::{ContentRule, ContentSelector};
use regex::Regex;
use scraper::Selector;

/// A compiled [`ContentSelector`].
#[derive(Debug, Clone)]
pub struct CompiledSelector {
    /// Parsed CSS selector.
    pub selector: Selector,
    /// Fallback value for the level.
    pub default: Option<String>,
}

impl CompiledSelector {
    fn compile(source: &ContentSelector, field: &str, problems: &mut Vec<String>) -> Option<Self> {
        match Selector::parse(&source.selector) {
            Ok(selector) => Some(Self {
                selector,
                default: source.default.clone(),
            }),
            Err(err) => {
                problems.push(format!(
                    "{field}: invalid selector '{}': {err}",
                    source.selector
                ));
                None
            },
        }
    }
}

/// A [`ContentRule`] ready for matching.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// Path pattern; `None` matches every path.
    pub test: Option<Regex>,
    /// Heading selectors, outermost first.
    pub hierarchy: Vec<CompiledSelector>,
    /// Body text selector.
    pub text: CompiledSelector,
}

impl CompiledRule {
    /// Compile a rule, collecting every problem under the `field` prefix.
    pub fn compile(rule: &ContentRule, field: &str) -> std::result::Result<Self, Vec<String>> {
        let mut problems = Vec::new();

        let test = rule.test.as_deref().and_then(|pattern| match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(err) => {
                problems.push(format!("{field}.test: invalid pattern '{pattern}': {err}"));
                None
            },
        });

        if rule.hierarchy.is_empty() {
            problems.push(format!("{field}.hierarchy: must contain at least one selector"));
        }

        let hierarchy: Vec<CompiledSelector> = rule
            .hierarchy
            .iter()
            .enumerate()
            .filter_map(|(level, selector)| {
                CompiledSelector::compile(
                    selector,
                    &format!("{field}.hierarchy[{level}]"),
                    &mut problems,
                )
            })
            .collect();

        let text = CompiledSelector::compile(&rule.text, &format!("{field}.text"), &mut problems);

        match text {
            Some(text) if problems.is_empty() => Ok(Self {
                test,
                hierarchy,
                text,
            }),
            _ => Err(problems),
        }
    }

    /// Build a rule directly from selector strings. Intended for tests and
    /// embedding; invalid input yields the collected problems.
    pub fn parse(
        hierarchy: &[&str],
        text: &str,
    ) -> std::result::Result<Self, Vec<String>> {
        let rule = ContentRule {
            test: None,
            hierarchy: hierarchy.iter().map(|s| ContentSelector::new(*s)).collect(),
            text: ContentSelector::new(text),
        };
        Self::compile(&rule, "rule")
    }

    /// Number of heading levels this rule produces.
    pub fn depth(&self) -> usize {
        self.hierarchy.len()
    }

    /// Whether this rule has no `test` pattern.
    pub const fn is_catch_all(&self) -> bool {
        self.test.is_none()
    }

    fn matches_path(&self, path: &str) -> bool {
        self.test.as_ref().is_some_and(|regex| regex.is_match(path))
    }
}

/// Position in `rules` of the rule for `path`.
///
/// Patterned rules are tried in declaration order first; when none matches,
/// the first catch-all rule is used. `None` means the path is not indexed.
pub fn select_rule_index(rules: &[CompiledRule], path: &str) -> Option<usize> {
    rules
        .iter()
        .position(|rule| rule.matches_path(path))
        .or_else(|| rules.iter().position(CompiledRule::is_catch_all))
}
