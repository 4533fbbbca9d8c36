/*
 * options.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Compiler configuration.
//!
//! Options can be built in code or read from TOML:
//!
//! ```toml
//! output-indent = "  "
//! runtime-filters = true
//! translation-filter = "translate"
//! strict = false
//! extension = "dt"
//! ```

use crate::error::TemplateResult;
use crate::resolver::DEFAULT_EXTENSION;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct CompileOptions {
    /// String written once per nesting level before each output line.
    pub output_indent: String,

    /// Defer filters missing from the registry to render time instead of
    /// failing the compile.
    pub runtime_filters: bool,

    /// Filter applied to text marked with the `&` sigil.
    pub translation_filter: Option<String>,

    /// Treat warnings as errors.
    pub strict: bool,

    /// Extension appended to `extends`/`include` names that lack it.
    pub extension: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            output_indent: "\t".to_string(),
            runtime_filters: false,
            translation_filter: None,
            strict: false,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(source: &str) -> TemplateResult<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_toml_file(path: &Path) -> TemplateResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn with_output_indent(mut self, indent: impl Into<String>) -> Self {
        self.output_indent = indent.into();
        self
    }

    pub fn with_runtime_filters(mut self, enabled: bool) -> Self {
        self.runtime_filters = enabled;
        self
    }

    pub fn with_translation_filter(mut self, name: impl Into<String>) -> Self {
        self.translation_filter = Some(name.into());
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }
}
