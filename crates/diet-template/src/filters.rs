/*
 * filters.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Named text filters (`:css`, `:markdown`, ...).
//!
//! A filter maps `(content, indent)` to output text, where `indent` is the
//! nesting level of the filter line. [`FilterRegistry`] is built by the host
//! and shared read-only by compilations and renders.

use crate::error::{TemplateError, TemplateResult};
use crate::runtime::escape_html;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A text filter.
pub type Filter = Arc<dyn Fn(&str, usize) -> String + Send + Sync>;

/// Mapping from filter name to filter.
#[derive(Clone)]
pub struct FilterRegistry {
    filters: HashMap<String, Filter>,
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.names();
        names.sort_unstable();
        f.debug_struct("FilterRegistry")
            .field("filters", &names)
            .finish()
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterRegistry {
    /// A registry seeded with `css`, `javascript`, `markdown` and `htmlescape`.
    ///
    /// `css` and `javascript` indent their output with tabs.
    pub fn new() -> Self {
        Self::with_output_indent("\t")
    }

    /// A registry with the built-in filters, where `css` and `javascript`
    /// indent their output by `indent` per level.
    pub fn with_output_indent(indent: &str) -> Self {
        let mut registry = Self::empty();
        let css_indent = indent.to_string();
        registry.register("css", move |text, level| css_block(text, level, &css_indent));
        let js_indent = indent.to_string();
        registry.register("javascript", move |text, level| {
            javascript_block(text, level, &js_indent)
        });
        registry.register("markdown", filter_markdown);
        registry.register("htmlescape", filter_htmlescape);
        registry
    }

    /// A registry without built-in filters.
    pub fn empty() -> Self {
        Self {
            filters: HashMap::new(),
        }
    }

    /// Register `filter` under `name`, replacing any existing filter.
    pub fn register<F>(&mut self, name: impl Into<String>, filter: F) -> &mut Self
    where
        F: Fn(&str, usize) -> String + Send + Sync + 'static,
    {
        self.filters.insert(name.into(), Arc::new(filter));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.filters.keys().map(String::as_str).collect()
    }

    /// Apply one filter, or `None` if it isn't registered.
    pub fn apply(&self, name: &str, content: &str, indent: usize) -> Option<String> {
        self.filters.get(name).map(|filter| filter(content, indent))
    }

    /// Apply `names` right to left, as written in `:a:b content`.
    pub fn apply_chain<S: AsRef<str>>(
        &self,
        names: &[S],
        content: &str,
        indent: usize,
    ) -> TemplateResult<String> {
        let mut text = content.to_string();
        for name in names.iter().rev() {
            let name = name.as_ref();
            text = self
                .apply(name, &text, indent)
                .ok_or_else(|| TemplateError::render(format!("unknown filter '{}'", name)))?;
        }
        Ok(text)
    }
}

fn line_prefix(unit: &str, level: usize) -> String {
    format!("\n{}", unit.repeat(level))
}

/// Wrap content in a `<style>` element at `indent`, indenting with tabs.
pub fn filter_css(text: &str, indent: usize) -> String {
    css_block(text, indent, "\t")
}

fn css_block(text: &str, level: usize, unit: &str) -> String {
    let outer = line_prefix(unit, level);
    let inner = line_prefix(unit, level + 1);
    let mut out = format!("{}<style type=\"text/css\"><!--", outer);
    for line in text.lines() {
        out.push_str(&inner);
        out.push_str(line);
    }
    out.push_str(&outer);
    out.push_str("--></style>");
    out
}

/// Wrap content in a CDATA-guarded `<script>` element at `indent`,
/// indenting with tabs.
pub fn filter_javascript(text: &str, indent: usize) -> String {
    javascript_block(text, indent, "\t")
}

fn javascript_block(text: &str, level: usize, unit: &str) -> String {
    let outer = line_prefix(unit, level);
    let inner = line_prefix(unit, level + 1);
    let mut out = format!("{}<script type=\"application/javascript\">", outer);
    out.push_str(&inner);
    out.push_str("//<![CDATA[");
    for line in text.lines() {
        out.push_str(&inner);
        out.push_str(line);
    }
    out.push_str(&inner);
    out.push_str("//]]>");
    out.push_str(&outer);
    out.push_str("</script>");
    out
}

/// Render CommonMark to HTML.
pub fn filter_markdown(text: &str, _indent: usize) -> String {
    let html = comrak::markdown_to_html(text, &comrak::Options::default());
    html.trim_end_matches('\n').to_string()
}

pub fn filter_htmlescape(text: &str, _indent: usize) -> String {
    escape_html(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtins_registered() {
        let registry = FilterRegistry::new();
        for name in ["css", "javascript", "markdown", "htmlescape"] {
            assert!(registry.contains(name), "{}", name);
        }
        assert!(FilterRegistry::empty().names().is_empty());
    }

    #[test]
    fn test_css() {
        assert_eq!(
            filter_css("p { color: red }", 1),
            "\n\t<style type=\"text/css\"><!--\n\t\tp { color: red }\n\t--></style>"
        );
    }

    #[test]
    fn test_javascript() {
        assert_eq!(
            filter_javascript("run();", 0),
            "\n<script type=\"application/javascript\">\n\t//<![CDATA[\n\trun();\n\t//]]>\n</script>"
        );
    }

    #[test]
    fn test_output_indent() {
        let registry = FilterRegistry::with_output_indent("  ");
        assert_eq!(
            registry.apply("css", "p {}", 1).unwrap(),
            "\n  <style type=\"text/css\"><!--\n    p {}\n  --></style>"
        );
        assert_eq!(
            registry.apply("javascript", "run();", 0).unwrap(),
            "\n<script type=\"application/javascript\">\n  //<![CDATA[\n  run();\n  //]]>\n</script>"
        );
    }

    #[test]
    fn test_markdown() {
        assert_eq!(filter_markdown("# Title", 0), "<h1>Title</h1>");
        assert_eq!(filter_markdown("*a*", 0), "<p><em>a</em></p>");
    }

    #[test]
    fn test_htmlescape() {
        assert_eq!(filter_htmlescape("<b>&", 0), "&lt;b&gt;&amp;");
    }

    #[test]
    fn test_register_and_chain() {
        let mut registry = FilterRegistry::new();
        registry.register("upper", |text, _| text.to_uppercase());
        registry.register("bracket", |text, indent| format!("[{}:{}]", indent, text));

        // rightmost filter applies first
        assert_eq!(registry.apply_chain(&["bracket", "upper"], "a", 2).unwrap(), "[2:A]");
        assert_eq!(registry.apply_chain(&["upper", "bracket"], "a", 2).unwrap(), "[2:A]");
        assert_eq!(registry.apply_chain(&["htmlescape", "bracket"], "<", 0).unwrap(), "[0:&lt;]");
    }

    #[test]
    fn test_chain_unknown_filter() {
        let registry = FilterRegistry::new();
        let err = registry.apply_chain(&["nope"], "a", 0).unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }));
        assert!(err.to_string().contains("unknown filter 'nope'"));
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FilterRegistry>();
    }
}
