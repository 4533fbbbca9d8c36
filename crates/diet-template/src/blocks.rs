/*
 * blocks.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template units and the per-compile block store.
//!
//! A [`TemplateBlock`] is either a whole loaded file or the body of a
//! `block`/`append`/`prepend` declaration collected from an extending
//! template. Both live in one [`BlockStore`] owned by a single compilation.

use crate::source::{Line, detect_indent_style};
use std::collections::HashMap;
use std::rc::Rc;

/// How an inheritance block combines with the placeholder's default body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockMode {
    /// Emit the override instead of the default body.
    Replace,
    /// Emit the default body followed by the override.
    Append,
    /// Emit the override followed by the default body.
    Prepend,
}

impl BlockMode {
    /// Parse a declaration keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "block" => Some(BlockMode::Replace),
            "append" => Some(BlockMode::Append),
            "prepend" => Some(BlockMode::Prepend),
            _ => None,
        }
    }
}

/// A named sequence of template lines with its indentation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateBlock {
    /// File name, or the inheritance block name.
    pub name: String,
    pub mode: BlockMode,
    /// Indentation unit of the file the lines came from.
    pub indent_unit: String,
    pub lines: Vec<Line>,
}

impl TemplateBlock {
    /// A whole file, with its indentation unit detected from its lines.
    pub fn file(name: impl Into<String>, lines: Vec<Line>) -> Self {
        let indent_unit = detect_indent_style(&lines);
        Self {
            name: name.into(),
            mode: BlockMode::Replace,
            indent_unit,
            lines,
        }
    }

    /// An inheritance block body declared in an extending template.
    pub fn declaration(
        name: impl Into<String>,
        mode: BlockMode,
        indent_unit: impl Into<String>,
        lines: Vec<Line>,
    ) -> Self {
        Self {
            name: name.into(),
            mode,
            indent_unit: indent_unit.into(),
            lines,
        }
    }
}

/// Per-compile store of loaded files and declared inheritance blocks.
///
/// Files are keyed by name. Inheritance blocks are kept in declaration order
/// and looked up first-match, so a declaration from a more derived template
/// shadows one from its parent.
#[derive(Debug, Default)]
pub struct BlockStore {
    files: HashMap<String, Rc<TemplateBlock>>,
    blocks: Vec<Rc<TemplateBlock>>,
}

impl BlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from resolved file units.
    pub fn with_files(files: impl IntoIterator<Item = TemplateBlock>) -> Self {
        let mut store = Self::new();
        for file in files {
            store.add_file(file);
        }
        store
    }

    pub fn add_file(&mut self, file: TemplateBlock) {
        self.files.insert(file.name.clone(), Rc::new(file));
    }

    pub fn file(&self, name: &str) -> Option<Rc<TemplateBlock>> {
        self.files.get(name).cloned()
    }

    pub fn declare(&mut self, block: TemplateBlock) {
        self.blocks.push(Rc::new(block));
    }

    /// The most derived declaration of block `name`.
    pub fn block(&self, name: &str) -> Option<Rc<TemplateBlock>> {
        self.blocks.iter().find(|b| b.name == name).cloned()
    }
}
