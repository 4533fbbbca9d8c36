/*
 * resolver.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template loading and dependency resolution.
//!
//! This module provides the [`TemplateLoader`] trait with filesystem and
//! in-memory implementations, and [`resolve_dependencies`], which follows
//! `extends` and `include` directives to load every file a compile touches.

use crate::blocks::TemplateBlock;
use crate::error::{TemplateError, TemplateResult};
use crate::parser::opens_raw_text;
use crate::source::{Line, indent_level, load_lines};
use diet_error_reporting::SourceLocation;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// Default file extension of template dependencies.
pub const DEFAULT_EXTENSION: &str = "dt";

/// Trait for loading template sources by name.
///
/// Implementations must return byte-identical content for repeated calls
/// with the same name during one compilation.
pub trait TemplateLoader {
    /// Load a template by name (e.g., `"layout.dt"`).
    ///
    /// Returns `None` if the template does not exist.
    fn load(&self, name: &str) -> Option<String>;
}

/// Loader that reads templates from a directory.
///
/// Each call opens, reads and closes the file; nothing stays open across a
/// compilation.
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
    root: PathBuf,
}

impl FileSystemLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl TemplateLoader for FileSystemLoader {
    fn load(&self, name: &str) -> Option<String> {
        let path = self.root.join(name);
        match std::fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "template not readable");
                None
            }
        }
    }
}

/// Loader that returns nothing (for templates without dependencies).
#[derive(Debug, Clone, Default)]
pub struct NullLoader;

impl TemplateLoader for NullLoader {
    fn load(&self, _name: &str) -> Option<String> {
        None
    }
}

/// Loader backed by an in-memory map.
///
/// Useful for testing and for templates bundled into the application.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    templates: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Add a template under its full name (e.g., `"layout.dt"`).
    pub fn add(&mut self, name: impl Into<String>, content: impl Into<String>) -> &mut Self {
        self.templates.insert(name.into(), content.into());
        self
    }

    /// Create a loader with the given templates.
    pub fn with_templates(
        templates: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        let mut loader = Self::new();
        for (name, content) in templates {
            loader.add(name, content);
        }
        loader
    }
}

impl TemplateLoader for MemoryLoader {
    fn load(&self, name: &str) -> Option<String> {
        self.templates.get(name).cloned()
    }
}

/// Append `.extension` to `name` unless it already ends with it.
pub fn template_file_name(name: &str, extension: &str) -> String {
    let suffix = format!(".{}", extension);
    if name.ends_with(&suffix) {
        name.to_string()
    } else {
        format!("{}{}", name, suffix)
    }
}

/// The target of an `extends` or `include` directive on `line`, if any.
pub(crate) fn directive_target<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = text.trim_start().strip_prefix(keyword)?;
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let target = rest.trim();
    if target.is_empty() { None } else { Some(target) }
}

/// Load `root` and every template it depends on.
///
/// Follows `extends` (first line only) and `include` (any line) directives,
/// appending `.extension` to names that lack it. Each file is loaded once;
/// names already in `visited` are skipped silently, which also terminates
/// circular chains. The result is in discovery order with the root at
/// index 0 (empty if the root itself was already visited).
pub fn resolve_dependencies(
    root: &str,
    loader: &dyn TemplateLoader,
    extension: &str,
    visited: &mut HashSet<String>,
) -> TemplateResult<Vec<TemplateBlock>> {
    let root = template_file_name(root, extension);
    let mut resolved = Vec::new();
    if !visited.insert(root.clone()) {
        return Ok(resolved);
    }
    let content = loader.load(&root).ok_or_else(|| {
        TemplateError::unresolved(
            format!("template '{}' not found", root),
            &SourceLocation::new(root.clone(), 0),
        )
    })?;
    resolve_file(root, &content, loader, extension, visited, &mut resolved)?;
    Ok(resolved)
}

fn resolve_file(
    name: String,
    content: &str,
    loader: &dyn TemplateLoader,
    extension: &str,
    visited: &mut HashSet<String>,
    resolved: &mut Vec<TemplateBlock>,
) -> TemplateResult<()> {
    tracing::debug!(template = %name, "loaded template");
    let lines = load_lines(&name, content);
    let block = TemplateBlock::file(name, lines);
    let dependencies = dependency_names(&block, extension);
    resolved.push(block);

    for (dependency, line) in dependencies {
        if !visited.insert(dependency.clone()) {
            tracing::debug!(template = %dependency, "dependency already loaded");
            continue;
        }
        let content = loader.load(&dependency).ok_or_else(|| {
            TemplateError::unresolved(
                format!("template '{}' not found", dependency),
                &line.location(),
            )
        })?;
        resolve_file(dependency, &content, loader, extension, visited, resolved)?;
    }
    Ok(())
}

fn dependency_names(block: &TemplateBlock, extension: &str) -> Vec<(String, Line)> {
    let unit = block.indent_unit.as_str();
    let mut names = Vec::new();
    // level of the line whose children are raw text
    let mut raw_text: Option<usize> = None;
    for (index, line) in block.lines.iter().enumerate() {
        let level = indent_level(&line.text, unit);
        match raw_text {
            Some(raw) if level > raw => continue,
            _ => raw_text = None,
        }
        if opens_raw_text(&line.text[level * unit.len()..]) {
            raw_text = Some(level);
            continue;
        }

        let target = if index == 0 {
            directive_target(&line.text, "extends")
                .or_else(|| directive_target(&line.text, "include"))
        } else {
            directive_target(&line.text, "include")
        };
        if let Some(target) = target {
            names.push((template_file_name(target, extension), line.clone()));
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(blocks: &[TemplateBlock]) -> Vec<&str> {
        blocks.iter().map(|b| b.name.as_str()).collect()
    }

    #[test]
    fn test_template_file_name() {
        assert_eq!(template_file_name("layout", "dt"), "layout.dt");
        assert_eq!(template_file_name("layout.dt", "dt"), "layout.dt");
        assert_eq!(template_file_name("inc/nav", "dt"), "inc/nav.dt");
    }

    #[test]
    fn test_directive_target() {
        assert_eq!(directive_target("extends layout", "extends"), Some("layout"));
        assert_eq!(directive_target("\tinclude  nav ", "include"), Some("nav"));
        assert_eq!(directive_target("includes", "include"), None);
        assert_eq!(directive_target("include", "include"), None);
    }

    #[test]
    fn test_memory_loader() {
        let mut loader = MemoryLoader::new();
        loader.add("a.dt", "p A");
        assert_eq!(loader.load("a.dt"), Some("p A".to_string()));
        assert!(loader.load("b.dt").is_none());
        assert!(NullLoader.load("a.dt").is_none());
    }

    #[test]
    fn test_resolve_extends_and_includes() {
        let loader = MemoryLoader::with_templates([
            ("index.dt", "extends layout\nblock body\n\tinclude nav"),
            ("layout.dt", "html\n\tinclude head\n\tblock body"),
            ("nav.dt", "nav"),
            ("head.dt", "head"),
        ]);
        let mut visited = HashSet::new();
        let blocks = resolve_dependencies("index", &loader, "dt", &mut visited).unwrap();
        assert_eq!(names(&blocks), vec!["index.dt", "layout.dt", "head.dt", "nav.dt"]);
        assert_eq!(visited.len(), 4);
    }

    #[test]
    fn test_resolve_cycle_terminates() {
        let loader = MemoryLoader::with_templates([
            ("a.dt", "extends b\nblock x\n\tp"),
            ("b.dt", "extends a\nblock y\n\tp"),
        ]);
        let mut visited = HashSet::new();
        let blocks = resolve_dependencies("a.dt", &loader, "dt", &mut visited).unwrap();
        assert_eq!(names(&blocks), vec!["a.dt", "b.dt"]);
    }

    #[test]
    fn test_resolve_extends_only_on_first_line() {
        let loader = MemoryLoader::with_templates([("a.dt", "p\nextends b")]);
        let mut visited = HashSet::new();
        let blocks = resolve_dependencies("a", &loader, "dt", &mut visited).unwrap();
        assert_eq!(names(&blocks), vec!["a.dt"]);
    }

    #[test]
    fn test_resolve_missing_dependency() {
        let loader = MemoryLoader::with_templates([("a.dt", "div\n\tinclude missing")]);
        let mut visited = HashSet::new();
        let err = resolve_dependencies("a", &loader, "dt", &mut visited).unwrap_err();
        assert!(matches!(err, TemplateError::UnresolvedReference { .. }));
        assert_eq!(err.location(), Some(&SourceLocation::new("a.dt", 2)));
    }

    #[test]
    fn test_resolve_skips_raw_text_children() {
        let loader = MemoryLoader::with_templates([
            (
                "a.dt",
                ":markdown\n\tinclude the following steps\np.\n\tinclude this text\n//\n\tinclude nothing\n//-\n\tinclude hidden\nscript\n\tinclude legacy\ndiv\n\tinclude nav",
            ),
            ("nav.dt", "nav"),
        ]);
        let mut visited = HashSet::new();
        let blocks = resolve_dependencies("a", &loader, "dt", &mut visited).unwrap();
        assert_eq!(names(&blocks), vec!["a.dt", "nav.dt"]);
    }

    #[test]
    fn test_resolve_conditional_comment_children() {
        let loader = MemoryLoader::with_templates([
            ("a.dt", "//if IE
  include shim"),
            ("shim.dt", "script(src=\"shim.js\")"),
        ]);
        let mut visited = HashSet::new();
        let blocks = resolve_dependencies("a", &loader, "dt", &mut visited).unwrap();
        assert_eq!(names(&blocks), vec!["a.dt", "shim.dt"]);
    }

    #[test]
    fn test_resolve_missing_root() {
        let mut visited = HashSet::new();
        let err = resolve_dependencies("a", &NullLoader, "dt", &mut visited).unwrap_err();
        assert!(matches!(err, TemplateError::UnresolvedReference { .. }));
    }

    #[test]
    fn test_resolve_visited_root_is_skipped() {
        let loader = MemoryLoader::with_templates([("a.dt", "p")]);
        let mut visited: HashSet<String> = ["a.dt".to_string()].into_iter().collect();
        let blocks = resolve_dependencies("a", &loader, "dt", &mut visited).unwrap();
        assert!(blocks.is_empty());
    }
}
