/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template compilation.
//!
//! Lines are processed in order against a stack of open constructs. Each
//! line's indentation level decides which open constructs are closed before
//! it; constructs that have children push a stack entry whose closing text is
//! emitted when indentation returns to their level.

use crate::blocks::{BlockMode, BlockStore, TemplateBlock};
use crate::diagnostics::DiagnosticCollector;
use crate::error::{TemplateError, TemplateResult};
use crate::filters::FilterRegistry;
use crate::interpolation::{Fragment, dstring_unescape, scan};
use crate::ir::{Emitter, Escape, Program};
use crate::options::CompileOptions;
use crate::resolver::{
    FileSystemLoader, MemoryLoader, TemplateLoader, directive_target, resolve_dependencies,
    template_file_name,
};
use crate::runtime::escape_attribute;
use crate::source::{Line, indent_level, strict_indent_level, unindent};
use crate::tag::{AttrValue, EXTRA_CLASS_KEY, ParsedTag, TagText, parse_tag};
use diet_error_reporting::{DiagnosticMessage, SourceLocation};
use std::collections::HashSet;
use std::path::Path;
use std::rc::Rc;

/// A compiled template ready for rendering.
#[derive(Debug, Clone)]
pub struct Template {
    pub(crate) program: Program,
    pub(crate) warnings: Vec<DiagnosticMessage>,
    pub(crate) filters: FilterRegistry,
    pub(crate) html5: bool,
}

impl Template {
    /// Compile a template from source text.
    ///
    /// The template may not reference other templates.
    pub fn compile(source: &str) -> TemplateResult<Self> {
        Self::compile_with_filename(source, "template")
    }

    /// Compile a template from source text with a filename for error reporting.
    pub fn compile_with_filename(source: &str, filename: &str) -> TemplateResult<Self> {
        let options = CompileOptions::default();
        let name = template_file_name(filename, &options.extension);
        let loader = MemoryLoader::with_templates([(name.clone(), source)]);
        TemplateCompiler::new(&loader).with_options(options).compile(&name)
    }

    /// Compile a template file, loading its dependencies from the same
    /// directory.
    pub fn compile_from_file(path: &Path) -> TemplateResult<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                TemplateError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("'{}' is not a file path", path.display()),
                ))
            })?;
        let directory = path.parent().unwrap_or(Path::new("."));
        let loader = FileSystemLoader::new(directory);
        TemplateCompiler::new(&loader).compile(&name)
    }

    /// The compiled instruction stream.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Warnings recorded while compiling.
    pub fn warnings(&self) -> &[DiagnosticMessage] {
        &self.warnings
    }

    /// Whether an HTML5 doctype was seen.
    pub fn html5(&self) -> bool {
        self.html5
    }

    /// The filters deferred filters are resolved against by default.
    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }
}

/// Compiles templates from a [`TemplateLoader`].
///
/// ```
/// use diet_template::{MemoryLoader, TemplateCompiler, TemplateContext};
///
/// let loader = MemoryLoader::with_templates([
///     ("base.dt", "body\n\tblock content\n\t\tp Default"),
///     ("page.dt", "extends base\nblock content\n\tp Hello"),
/// ]);
/// let template = TemplateCompiler::new(&loader).compile("page").unwrap();
/// let html = template.render_context(&TemplateContext::new()).unwrap();
/// assert_eq!(html, "<body>\n\t<p>Hello</p>\n</body>");
/// ```
pub struct TemplateCompiler<'a> {
    loader: &'a dyn TemplateLoader,
    /// Defaults to the built-in filters indented by `output_indent`.
    filters: Option<FilterRegistry>,
    options: CompileOptions,
}

impl<'a> TemplateCompiler<'a> {
    pub fn new(loader: &'a dyn TemplateLoader) -> Self {
        Self {
            loader,
            filters: None,
            options: CompileOptions::default(),
        }
    }

    pub fn with_filters(mut self, filters: FilterRegistry) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Compile `root` and everything it extends or includes.
    pub fn compile(&self, root: &str) -> TemplateResult<Template> {
        let mut visited = HashSet::new();
        let units = resolve_dependencies(root, self.loader, &self.options.extension, &mut visited)?;
        let root_name = template_file_name(root, &self.options.extension);
        tracing::debug!(root = %root_name, units = units.len(), "resolved template dependencies");

        let filters = self
            .filters
            .clone()
            .unwrap_or_else(|| FilterRegistry::with_output_indent(&self.options.output_indent));
        let mut compiler = Compiler::new(BlockStore::with_files(units), &filters, &self.options);
        compiler.compile_unit(&root_name, 0, None)?;
        Ok(compiler.finish())
    }
}

/// An open construct awaiting its closing output.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeStackEntry {
    /// Closing text; unused for raw code blocks.
    marker: String,
    /// False for raw code blocks, which close with a block end instead.
    closes_as_text: bool,
    /// Line break before the closing text.
    inner_whitespace: bool,
    /// Line break before the next sibling.
    outer_whitespace: bool,
    /// Output nesting level of the construct.
    level: usize,
}

impl NodeStackEntry {
    fn text(marker: impl Into<String>, level: usize) -> Self {
        Self {
            marker: marker.into(),
            closes_as_text: true,
            inner_whitespace: true,
            outer_whitespace: true,
            level,
        }
    }

    fn code(level: usize) -> Self {
        Self {
            marker: String::new(),
            closes_as_text: false,
            inner_whitespace: true,
            outer_whitespace: true,
            level,
        }
    }
}

/// Classification of an unindented template line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LineKind<'a> {
    /// `- code`
    Code(&'a str),
    /// `| text`
    Text(&'a str),
    /// `<tag ...>` raw HTML
    Html(&'a str),
    /// `= expr` / `!= expr`
    Expression { code: &'a str, escaped: bool },
    /// `:filter text`
    Filter(&'a str),
    /// `// text`, `//- text`, `//if cond`
    Comment(Comment<'a>),
    /// `doctype value` / `!!! value`
    Doctype(&'a str),
    /// `block name`
    Block(&'a str),
    /// `append name` / `prepend name`
    Declaration(&'a str),
    /// `include name`
    Include(&'a str),
    /// `extends name`
    Extends,
    /// `each`, `for`, `if`, `unless`, `mixin`
    Keyword(&'a str),
    Tag(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comment<'a> {
    Silent,
    Conditional(&'a str),
    Html(&'a str),
}

const UNSUPPORTED_KEYWORDS: &[&str] = &["each", "for", "if", "unless", "mixin"];

/// Split a leading keyword off `text`.
///
/// Returns the word and the text after it when the word is followed by
/// whitespace or the end of the line.
fn leading_word(text: &str) -> (&str, Option<&str>) {
    let end = text
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(text.len());
    let (word, rest) = text.split_at(end);
    if rest.is_empty() || rest.starts_with([' ', '\t']) {
        (word, Some(rest.trim()))
    } else {
        (word, None)
    }
}

fn classify(text: &str) -> LineKind<'_> {
    if let Some(rest) = text.strip_prefix("//") {
        if rest.starts_with('-') {
            return LineKind::Comment(Comment::Silent);
        }
        let trimmed = rest.trim_start();
        if let Some(cond) = trimmed.strip_prefix("if ") {
            return LineKind::Comment(Comment::Conditional(cond.trim()));
        }
        return LineKind::Comment(Comment::Html(rest));
    }
    if let Some(code) = text.strip_prefix('-') {
        return LineKind::Code(code.trim());
    }
    if let Some(rest) = text.strip_prefix('|') {
        return LineKind::Text(rest.strip_prefix(' ').unwrap_or(rest));
    }
    if text.starts_with('<') {
        return LineKind::Html(text);
    }
    if let Some(code) = text.strip_prefix("!=") {
        return LineKind::Expression {
            code: code.trim(),
            escaped: false,
        };
    }
    if let Some(rest) = text.strip_prefix("!!!") {
        return LineKind::Doctype(rest.trim());
    }
    if let Some(code) = text.strip_prefix('=') {
        return LineKind::Expression {
            code: code.trim(),
            escaped: true,
        };
    }
    if let Some(rest) = text.strip_prefix(':') {
        return LineKind::Filter(rest);
    }

    let (word, rest) = leading_word(text);
    match (word, rest) {
        ("doctype", Some(rest)) => LineKind::Doctype(rest),
        ("block", Some(rest)) => LineKind::Block(rest),
        ("append" | "prepend", Some(_)) => LineKind::Declaration(word),
        ("include", Some(rest)) => LineKind::Include(rest),
        ("extends", Some(_)) => LineKind::Extends,
        (word, rest)
            if UNSUPPORTED_KEYWORDS.contains(&word)
                && (rest.is_some() || text[word.len()..].starts_with('(')) =>
        {
            LineKind::Keyword(word)
        }
        _ => LineKind::Tag(text),
    }
}

/// Whether the children of an unindented line are raw text rather than
/// template lines.
pub(crate) fn opens_raw_text(text: &str) -> bool {
    match classify(text) {
        LineKind::Filter(_) => true,
        LineKind::Comment(Comment::Silent | Comment::Html(_)) => true,
        LineKind::Tag(text) => parse_tag(text, &SourceLocation::new("", 0)).is_ok_and(|tag| {
            tag.block_text || matches!(tag.name.as_str(), "script" | "style")
        }),
        _ => false,
    }
}

/// Map a doctype value to its declaration and whether it is HTML5.
fn doctype_declaration(value: &str) -> (String, bool) {
    let declaration = match value {
        "" | "html" | "5" => return ("<!DOCTYPE html>".to_string(), true),
        "xml" => "<?xml version=\"1.0\" encoding=\"utf-8\" ?>",
        "transitional" => {
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Transitional//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd\">"
        }
        "strict" => {
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Strict//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd\">"
        }
        "frameset" => {
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Frameset//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-frameset.dtd\">"
        }
        "1.1" => {
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.1//EN\" \"http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd\">"
        }
        "basic" => {
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML Basic 1.1//EN\" \"http://www.w3.org/TR/xhtml-basic/xhtml-basic11.dtd\">"
        }
        "mobile" => {
            "<!DOCTYPE html PUBLIC \"-//WAPFORUM//DTD XHTML Mobile 1.2//EN\" \"http://www.openmobilealliance.org/tech/DTD/xhtml-mobile12.dtd\">"
        }
        other => return (format!("<!DOCTYPE {}>", other), false),
    };
    (declaration.to_string(), false)
}

/// Position of the line being compiled within its unit.
struct LineScope<'l> {
    lines: &'l [Line],
    index: usize,
    unit: &'l str,
    /// Absolute indentation of the line in units.
    absolute: usize,
    /// Output nesting level.
    out_level: usize,
    has_children: bool,
}

impl<'l> LineScope<'l> {
    fn line(&self) -> &'l Line {
        &self.lines[self.index]
    }

    fn text(&self) -> &'l str {
        let line = self.line();
        &line.text[self.absolute * self.unit.len()..]
    }

    fn location(&self) -> SourceLocation {
        self.line().location()
    }

    /// Index of the first line after this line's children.
    fn children_end(&self) -> usize {
        let mut end = self.index + 1;
        while end < self.lines.len() && indent_level(&self.lines[end].text, self.unit) > self.absolute {
            end += 1;
        }
        end
    }

    /// Child lines as raw text, unindented one level below this line and
    /// with dropped blank lines restored.
    fn raw_children(&self) -> (Vec<String>, usize) {
        let end = self.children_end();
        let mut text = Vec::new();
        let mut previous: Option<usize> = None;
        for line in &self.lines[self.index + 1..end] {
            if let Some(previous) = previous {
                for _ in previous + 1..line.number {
                    text.push(String::new());
                }
            }
            text.push(unindent(&line.text, self.unit, self.absolute + 1));
            previous = Some(line.number);
        }
        (text, end)
    }
}

/// State of one compilation.
struct Compiler<'a> {
    store: BlockStore,
    filters: &'a FilterRegistry,
    options: &'a CompileOptions,
    emitter: Emitter,
    diagnostics: DiagnosticCollector,
    html5: bool,
    /// Files currently being compiled, outermost first.
    active_units: Vec<String>,
    /// Inheritance blocks currently being expanded.
    active_blocks: Vec<String>,
}

impl<'a> Compiler<'a> {
    fn new(store: BlockStore, filters: &'a FilterRegistry, options: &'a CompileOptions) -> Self {
        Self {
            store,
            filters,
            options,
            emitter: Emitter::new(options.output_indent.clone()),
            diagnostics: DiagnosticCollector::new(),
            html5: false,
            active_units: Vec::new(),
            active_blocks: Vec::new(),
        }
    }

    fn finish(self) -> Template {
        Template {
            program: self.emitter.finish(),
            warnings: self.diagnostics.into_diagnostics(),
            filters: self.filters.clone(),
            html5: self.html5,
        }
    }

    fn warn(
        &mut self,
        code: &str,
        problem: String,
        hint: &str,
        location: &SourceLocation,
        strict_error: impl FnOnce(String, &SourceLocation) -> TemplateError,
    ) -> TemplateResult<()> {
        if self.options.strict {
            return Err(strict_error(problem, location));
        }
        self.diagnostics
            .warn_with_code(code, problem, Some(hint), location);
        Ok(())
    }

    /// Compile the file `name` at output level `output_base`, following its
    /// `extends` chain.
    fn compile_unit(
        &mut self,
        name: &str,
        output_base: usize,
        reference: Option<&Line>,
    ) -> TemplateResult<()> {
        let location = reference
            .map(Line::location)
            .unwrap_or_else(|| SourceLocation::new(name, 0));
        let unit = self.store.file(name).ok_or_else(|| {
            TemplateError::unresolved(format!("template '{}' was not loaded", name), &location)
        })?;

        let depth = self.active_units.len();
        let result = self.compile_extends_chain(unit, output_base);
        self.active_units.truncate(depth);
        result
    }

    fn compile_extends_chain(
        &mut self,
        mut unit: Rc<TemplateBlock>,
        output_base: usize,
    ) -> TemplateResult<()> {
        loop {
            if self.active_units.contains(&unit.name) {
                tracing::debug!(template = %unit.name, "skipping recursive template reference");
                return Ok(());
            }
            self.active_units.push(unit.name.clone());

            let Some(first) = unit.lines.first() else {
                return Ok(());
            };
            let parent = match directive_target(&first.text, "extends") {
                Some(parent) if !first.text.starts_with([' ', '\t']) => {
                    template_file_name(parent, &self.options.extension)
                }
                _ => {
                    let base = strict_indent_level(first, &unit.indent_unit)?;
                    return self.compile_lines(&unit.lines, &unit.indent_unit, base, output_base);
                }
            };

            self.collect_declarations(&unit)?;
            tracing::debug!(template = %unit.name, parent = %parent, "switching to parent template");
            unit = self.store.file(&parent).ok_or_else(|| {
                TemplateError::unresolved(
                    format!("template '{}' was not loaded", parent),
                    &first.location(),
                )
            })?;
        }
    }

    /// Store the `block`/`append`/`prepend` declarations of an extending
    /// template.
    fn collect_declarations(&mut self, unit: &TemplateBlock) -> TemplateResult<()> {
        let lines = &unit.lines[1..];
        let indent = unit.indent_unit.as_str();
        let mut index = 0;
        while index < lines.len() {
            let line = &lines[index];
            let level = strict_indent_level(line, indent)?;
            let (keyword, name) = leading_word(&line.text);
            let mode = BlockMode::from_keyword(keyword)
                .filter(|_| level == 0)
                .zip(name.filter(|n| !n.is_empty()));
            let Some((mode, name)) = mode else {
                return Err(TemplateError::syntax(
                    format!(
                        "expected block/append/prepend in a template that extends another, found '{}'",
                        line.text.trim()
                    ),
                    &line.location(),
                ));
            };

            let mut end = index + 1;
            while end < lines.len() && indent_level(&lines[end].text, indent) > 0 {
                end += 1;
            }
            tracing::debug!(block = name, mode = ?mode, template = %unit.name, "declared block");
            self.store.declare(TemplateBlock::declaration(
                name,
                mode,
                indent,
                lines[index + 1..end].to_vec(),
            ));
            index = end;
        }
        Ok(())
    }

    /// Compile a sequence of lines at indentation level `base`; output
    /// starts at level `output_base`.
    fn compile_lines(
        &mut self,
        lines: &[Line],
        unit: &str,
        base: usize,
        output_base: usize,
    ) -> TemplateResult<()> {
        let mut stack: Vec<NodeStackEntry> = Vec::new();

        let mut index = 0;
        while index < lines.len() {
            let line = &lines[index];
            let absolute = strict_indent_level(line, unit)?;
            if absolute < base {
                return Err(TemplateError::indentation(
                    "line is indented less than its enclosing block",
                    &line.location(),
                ));
            }
            let level = absolute - base;
            self.close_nodes(&mut stack, level);
            if stack.len() < level {
                return Err(TemplateError::indentation(
                    "line is indented by more than one level",
                    &line.location(),
                ));
            }
            // raw code blocks don't nest the output
            let out_level = output_base + stack.iter().filter(|e| e.closes_as_text).count();

            let has_children = lines
                .get(index + 1)
                .is_some_and(|next| indent_level(&next.text, unit) > absolute);
            let scope = LineScope {
                lines,
                index,
                unit,
                absolute,
                out_level,
                has_children,
            };
            index = self.compile_line(&scope, &mut stack)?;
        }

        self.close_nodes(&mut stack, 0);
        debug_assert!(stack.is_empty());
        Ok(())
    }

    fn close_nodes(&mut self, stack: &mut Vec<NodeStackEntry>, level: usize) {
        while stack.len() > level {
            let Some(entry) = stack.pop() else { break };
            if !entry.closes_as_text {
                self.emitter.block_end();
                continue;
            }
            if entry.inner_whitespace {
                self.emitter.line_break(entry.level);
            } else {
                self.emitter.allow_break();
            }
            self.emitter.literal(&entry.marker);
            if !entry.outer_whitespace {
                self.emitter.suppress_next_break();
            }
        }
    }

    /// Compile one line; returns the index of the next line to process.
    fn compile_line(
        &mut self,
        scope: &LineScope<'_>,
        stack: &mut Vec<NodeStackEntry>,
    ) -> TemplateResult<usize> {
        let text = scope.text();
        let location = scope.location();
        let kind = classify(text);
        tracing::trace!(location = %location, kind = ?kind, "compiling line");
        let next = scope.index + 1;

        match kind {
            LineKind::Code(code) => {
                if code.is_empty() {
                    return Err(TemplateError::syntax("expected code after '-'", &location));
                }
                if code.ends_with('{') {
                    return Err(TemplateError::syntax(
                        "raw code lines can't end with '{'; nest the body by indentation instead",
                        &location,
                    ));
                }
                if scope.has_children {
                    self.emitter.block_start(code, &location);
                    stack.push(NodeStackEntry::code(scope.out_level));
                } else {
                    self.emitter.statement(code, &location);
                }
                Ok(next)
            }
            LineKind::Text(text) => {
                self.no_children(scope, "text lines")?;
                self.emitter.line_break(scope.out_level);
                self.emit_text(text, &location)?;
                Ok(next)
            }
            LineKind::Html(html) => {
                self.no_children(scope, "inline HTML lines")?;
                self.emitter.line_break(scope.out_level);
                self.emit_text(html, &location)?;
                Ok(next)
            }
            LineKind::Expression { code, escaped } => {
                self.no_children(scope, "expression lines")?;
                if code.is_empty() {
                    return Err(TemplateError::syntax("expected an expression after '='", &location));
                }
                self.emitter.line_break(scope.out_level);
                let escape = if escaped { Escape::Html } else { Escape::Raw };
                self.emitter.expression(code, escape, &location);
                Ok(next)
            }
            LineKind::Filter(header) => self.compile_filter(scope, header),
            LineKind::Comment(comment) => self.compile_comment(scope, comment, stack),
            LineKind::Doctype(value) => {
                self.no_children(scope, "doctype lines")?;
                if scope.out_level != 0 {
                    return Err(TemplateError::syntax(
                        "doctype is only allowed at the top level",
                        &location,
                    ));
                }
                let (declaration, html5) = doctype_declaration(value);
                self.html5 = html5;
                self.emitter.line_break(0);
                self.emitter.literal(&declaration);
                Ok(next)
            }
            LineKind::Block(name) => self.compile_block_placeholder(scope, name),
            LineKind::Declaration(keyword) => Err(TemplateError::syntax(
                format!(
                    "'{}' is only allowed at the top level of a template that extends another",
                    keyword
                ),
                &location,
            )),
            LineKind::Include(name) => {
                self.no_children(scope, "include lines")?;
                if name.is_empty() {
                    return Err(TemplateError::syntax("expected a template name after 'include'", &location));
                }
                let file = template_file_name(name, &self.options.extension);
                tracing::debug!(template = %file, location = %location, "including template");
                self.compile_unit(&file, scope.out_level, Some(scope.line()))?;
                Ok(next)
            }
            LineKind::Extends => Err(TemplateError::syntax(
                "'extends' must be the first line of a template",
                &location,
            )),
            LineKind::Keyword(keyword) => Err(TemplateError::syntax(
                format!(
                    "'{}' is not supported; use a raw code line ('- {} ...') instead",
                    keyword, keyword
                ),
                &location,
            )),
            LineKind::Tag(text) => self.compile_tag(scope, text, stack),
        }
    }

    fn no_children(&self, scope: &LineScope<'_>, what: &str) -> TemplateResult<()> {
        if scope.has_children {
            Err(TemplateError::syntax(
                format!("{} can't have children", what),
                &scope.location(),
            ))
        } else {
            Ok(())
        }
    }

    /// Emit element text: literal pieces verbatim, interpolations as
    /// expressions.
    fn emit_text(&mut self, text: &str, location: &SourceLocation) -> TemplateResult<()> {
        for fragment in scan(text) {
            match fragment.map_err(|e| TemplateError::syntax(e.to_string(), location))? {
                Fragment::Literal(literal) => self.emitter.literal(literal),
                Fragment::Expr { code, escaped } => {
                    let escape = if escaped { Escape::Html } else { Escape::Raw };
                    self.emitter.expression(code, escape, location);
                }
            }
        }
        Ok(())
    }

    /// Emit the contents of a quoted attribute value.
    fn emit_attribute_text(&mut self, value: &str, location: &SourceLocation) -> TemplateResult<()> {
        for fragment in scan(value) {
            match fragment.map_err(|e| TemplateError::syntax(e.to_string(), location))? {
                Fragment::Literal(literal) => {
                    self.emitter
                        .literal(&escape_attribute(&dstring_unescape(literal)));
                }
                Fragment::Expr { code, escaped } => {
                    let escape = if escaped { Escape::Attribute } else { Escape::Raw };
                    self.emitter.expression(code, escape, location);
                }
            }
        }
        Ok(())
    }

    fn emit_attributes(&mut self, tag: &ParsedTag, location: &SourceLocation) -> TemplateResult<()> {
        let extra_classes = match tag.attribute(EXTRA_CLASS_KEY) {
            Some(AttrValue::Literal(classes)) => Some(dstring_unescape(classes)),
            Some(AttrValue::Expr(classes)) => Some(classes.clone()),
            None => None,
        };

        for attribute in &tag.attributes {
            let key = attribute.key.as_str();
            if key == EXTRA_CLASS_KEY {
                continue;
            }
            let extra = if key == "class" {
                extra_classes.as_deref()
            } else {
                None
            };

            match &attribute.value {
                AttrValue::Expr(code) if code == "true" && extra.is_none() => {
                    if self.html5 {
                        self.emitter.literal(&format!(" {}", key));
                    } else {
                        self.emitter.literal(&format!(" {}=\"{}\"", key, key));
                    }
                }
                AttrValue::Expr(code) if code == "false" => {
                    if let Some(extra) = extra {
                        self.emitter
                            .literal(&format!(" {}=\"{}\"", key, escape_attribute(extra)));
                    }
                }
                AttrValue::Expr(code) => {
                    self.emitter.attribute(
                        key,
                        code.clone(),
                        extra.map(str::to_string),
                        self.html5,
                        location,
                    );
                }
                AttrValue::Literal(value) => {
                    self.emitter.literal(&format!(" {}=\"", key));
                    self.emit_attribute_text(value, location)?;
                    if let Some(extra) = extra {
                        self.emitter.literal(&format!(" {}", escape_attribute(extra)));
                    }
                    self.emitter.literal("\"");
                }
            }
        }
        Ok(())
    }

    /// Translate text marked with `&`, or warn if no translation filter is
    /// configured.
    fn translate(
        &mut self,
        text: TagText,
        scope: &LineScope<'_>,
    ) -> TemplateResult<TagText> {
        let TagText::Literal(literal) = text else {
            return Ok(text);
        };
        let location = scope.location();
        match &self.options.translation_filter {
            Some(filter) => {
                let translated = self
                    .filters
                    .apply(filter, &literal, scope.out_level)
                    .ok_or_else(|| {
                        TemplateError::unresolved(
                            format!("unknown translation filter '{}'", filter),
                            &location,
                        )
                    })?;
                Ok(TagText::Literal(translated))
            }
            None => {
                self.warn(
                    "D-7-1",
                    "text is marked for translation but no translation filter is configured".to_string(),
                    "Set `translation-filter` in the compile options?",
                    &location,
                    |message, location| TemplateError::unsupported(message, location),
                )?;
                Ok(TagText::Literal(literal))
            }
        }
    }

    fn compile_tag(
        &mut self,
        scope: &LineScope<'_>,
        text: &str,
        stack: &mut Vec<NodeStackEntry>,
    ) -> TemplateResult<usize> {
        let location = scope.location();
        let tag = parse_tag(text, &location)?;
        let name = tag.name.clone();

        if tag.is_singular() {
            if scope.has_children {
                return Err(TemplateError::syntax(
                    format!("singular tag '{}' can't have children", name),
                    &location,
                ));
            }
            if tag.text != TagText::None {
                return Err(TemplateError::syntax(
                    format!("singular tag '{}' can't have text content", name),
                    &location,
                ));
            }
        }

        let legacy_text_block =
            !tag.block_text && scope.has_children && matches!(name.as_str(), "script" | "style");
        if legacy_text_block {
            self.warn(
                "D-7-2",
                format!("'{}' content without a trailing dot is deprecated", name),
                &format!("Write `{}.` instead of `{}`?", name, name),
                &location,
                |message, location| TemplateError::syntax(message, location),
            )?;
        }

        if !tag.suppress_outer {
            self.emitter.line_break(scope.out_level);
        }
        self.emitter.literal(&format!("<{}", name));
        self.emit_attributes(&tag, &location)?;

        if tag.is_singular() {
            self.emitter.literal("/>");
            if tag.suppress_outer {
                self.emitter.suppress_next_break();
            }
            return Ok(scope.index + 1);
        }
        self.emitter.literal(">");

        let inline = if tag.translate {
            self.translate(tag.text.clone(), scope)?
        } else {
            tag.text.clone()
        };
        match &inline {
            TagText::None => {}
            TagText::Literal(text) => self.emit_text(text, &location)?,
            TagText::Escaped(code) => self.emitter.expression(code.clone(), Escape::Html, &location),
            TagText::Raw(code) => self.emitter.expression(code.clone(), Escape::Raw, &location),
        }

        let closing = format!("</{}>", name);
        if tag.block_text || legacy_text_block {
            let (children, end) = scope.raw_children();
            for child in &children {
                self.emitter.literal("\n");
                self.emit_text(child, &location)?;
            }
            if !children.is_empty() && !tag.suppress_inner {
                self.emitter.line_break(scope.out_level);
            }
            self.emitter.literal(&closing);
            if tag.suppress_outer {
                self.emitter.suppress_next_break();
            }
            return Ok(end);
        }

        if scope.has_children {
            if tag.suppress_inner {
                self.emitter.suppress_next_break();
            }
            stack.push(NodeStackEntry {
                marker: closing,
                closes_as_text: true,
                inner_whitespace: !tag.suppress_inner,
                outer_whitespace: !tag.suppress_outer,
                level: scope.out_level,
            });
        } else {
            self.emitter.literal(&closing);
            if tag.suppress_outer {
                self.emitter.suppress_next_break();
            }
        }
        Ok(scope.index + 1)
    }

    fn compile_comment(
        &mut self,
        scope: &LineScope<'_>,
        comment: Comment<'_>,
        stack: &mut Vec<NodeStackEntry>,
    ) -> TemplateResult<usize> {
        match comment {
            Comment::Silent => Ok(scope.children_end()),
            Comment::Conditional(condition) => {
                self.emitter.line_break(scope.out_level);
                self.emitter.literal(&format!("<!--[if {}]>", condition));
                if scope.has_children {
                    stack.push(NodeStackEntry::text("<![endif]-->", scope.out_level));
                } else {
                    self.emitter.literal("<![endif]-->");
                }
                Ok(scope.index + 1)
            }
            Comment::Html(text) => {
                self.emitter.line_break(scope.out_level);
                self.emitter.literal("<!--");
                self.emitter.literal(text);
                let (children, end) = scope.raw_children();
                if children.is_empty() {
                    self.emitter.literal(" -->");
                } else {
                    for child in &children {
                        self.emitter.literal("\n");
                        self.emitter.literal(child);
                    }
                    self.emitter.line_break(scope.out_level);
                    self.emitter.literal("-->");
                }
                Ok(end)
            }
        }
    }

    fn compile_filter(&mut self, scope: &LineScope<'_>, header: &str) -> TemplateResult<usize> {
        let location = scope.location();
        let (names, inline) = match header.find([' ', '\t']) {
            Some(split) => (&header[..split], header[split..].trim_start()),
            None => (header, ""),
        };
        let names: Vec<&str> = names.split(':').collect();
        if names.iter().any(|n| n.is_empty()) {
            return Err(TemplateError::syntax("expected a filter name after ':'", &location));
        }

        let (children, end) = scope.raw_children();
        let mut content = inline.to_string();
        if !children.is_empty() {
            if !content.is_empty() {
                content.push('\n');
            }
            content.push_str(&children.join("\n"));
        }

        let mut remaining = names.len();
        while remaining > 0 {
            match self.filters.apply(names[remaining - 1], &content, scope.out_level) {
                Some(output) => {
                    content = output;
                    remaining -= 1;
                }
                None => break,
            }
        }

        if remaining == 0 {
            if !content.starts_with('\n') {
                self.emitter.line_break(scope.out_level);
            }
            self.emitter.literal_after_break(&content);
        } else if self.options.runtime_filters {
            let deferred = names[..remaining].iter().map(|n| n.to_string()).collect();
            tracing::debug!(filters = ?&names[..remaining], location = %location, "deferring filters to render time");
            self.emitter.line_break(scope.out_level);
            self.emitter.filter(deferred, content, scope.out_level, &location);
        } else {
            return Err(TemplateError::unresolved(
                format!("unknown filter '{}'", names[remaining - 1]),
                &location,
            ));
        }
        Ok(end)
    }

    fn compile_block_placeholder(&mut self, scope: &LineScope<'_>, name: &str) -> TemplateResult<usize> {
        let location = scope.location();
        if name.is_empty() {
            return Err(TemplateError::syntax("expected a block name after 'block'", &location));
        }
        let end = scope.children_end();
        let default = &scope.lines[scope.index + 1..end];
        let body_base = scope.absolute + 1;

        let declaration = if self.active_blocks.iter().any(|b| b == name) {
            None
        } else {
            self.store.block(name)
        };
        let Some(declaration) = declaration else {
            tracing::debug!(block = name, "using default block content");
            self.compile_lines(default, scope.unit, body_base, scope.out_level)?;
            return Ok(end);
        };

        tracing::debug!(block = name, mode = ?declaration.mode, "resolving block");
        self.active_blocks.push(name.to_string());
        let result = match declaration.mode {
            BlockMode::Replace => {
                self.compile_lines(&declaration.lines, &declaration.indent_unit, 1, scope.out_level)
            }
            BlockMode::Prepend => self
                .compile_lines(&declaration.lines, &declaration.indent_unit, 1, scope.out_level)
                .and_then(|_| self.compile_lines(default, scope.unit, body_base, scope.out_level)),
            BlockMode::Append if default.is_empty() => {
                self.compile_lines(&declaration.lines, &declaration.indent_unit, 1, scope.out_level)
            }
            BlockMode::Append => Err(TemplateError::unsupported(
                format!("appending to block '{}' with default content is not supported", name),
                &location,
            )),
        };
        self.active_blocks.pop();
        result.map(|_| end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn compile(source: &str) -> TemplateResult<Template> {
        Template::compile(source)
    }

    fn html(source: &str) -> String {
        compile(source)
            .unwrap()
            .program()
            .static_output()
            .expect("template should be static")
    }

    fn compile_files(files: &[(&str, &str)], root: &str) -> TemplateResult<Template> {
        let loader = MemoryLoader::with_templates(files.iter().copied());
        TemplateCompiler::new(&loader).compile(root)
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("- let x = 1"), LineKind::Code("let x = 1"));
        assert_eq!(classify("| hello"), LineKind::Text("hello"));
        assert_eq!(classify("<br>"), LineKind::Html("<br>"));
        assert_eq!(
            classify("!= body"),
            LineKind::Expression {
                code: "body",
                escaped: false
            }
        );
        assert_eq!(
            classify("= name"),
            LineKind::Expression {
                code: "name",
                escaped: true
            }
        );
        assert_eq!(classify(":css"), LineKind::Filter("css"));
        assert_eq!(classify("//- hidden"), LineKind::Comment(Comment::Silent));
        assert_eq!(classify("//if IE 8"), LineKind::Comment(Comment::Conditional("IE 8")));
        assert_eq!(classify("// if IE"), LineKind::Comment(Comment::Conditional("IE")));
        assert_eq!(classify("// note"), LineKind::Comment(Comment::Html(" note")));
        assert_eq!(classify("doctype html"), LineKind::Doctype("html"));
        assert_eq!(classify("!!! 5"), LineKind::Doctype("5"));
        assert_eq!(classify("block content"), LineKind::Block("content"));
        assert_eq!(classify("append content"), LineKind::Declaration("append"));
        assert_eq!(classify("include nav"), LineKind::Include("nav"));
        assert_eq!(classify("extends base"), LineKind::Extends);
        assert_eq!(classify("each x in xs"), LineKind::Keyword("each"));
        assert_eq!(classify("if(x)"), LineKind::Keyword("if"));
        assert_eq!(classify("blockquote"), LineKind::Tag("blockquote"));
        assert_eq!(classify("iframe(src=\"x\")"), LineKind::Tag("iframe(src=\"x\")"));
        assert_eq!(classify("form.each"), LineKind::Tag("form.each"));
    }

    #[test]
    fn test_nested_tags() {
        assert_eq!(
            html("html\n\tbody\n\t\tp Hello\n\t\tp World"),
            "<html>\n\t<body>\n\t\t<p>Hello</p>\n\t\t<p>World</p>\n\t</body>\n</html>"
        );
    }

    #[test]
    fn test_space_indentation() {
        assert_eq!(html("ul\n  li a\n  li b"), "<ul>\n\t<li>a</li>\n\t<li>b</li>\n</ul>");
    }

    #[test]
    fn test_output_indent_option() {
        let loader = MemoryLoader::with_templates([("a.dt", "ul\n\tli a")]);
        let template = TemplateCompiler::new(&loader)
            .with_options(CompileOptions::default().with_output_indent("  "))
            .compile("a")
            .unwrap();
        assert_eq!(template.program().static_output().unwrap(), "<ul>\n  <li>a</li>\n</ul>");
    }

    #[test]
    fn test_attributes_and_class_merge() {
        assert_eq!(html("div.foo(class=\"bar\")"), "<div class=\"bar foo\"></div>");
        assert_eq!(
            html("a#home.nav(href=\"/\", title='It\\'s \"home\"') Home"),
            "<a id=\"home\" href=\"/\" title=\"It's &quot;home&quot;\" class=\"nav\">Home</a>"
        );
    }

    #[test]
    fn test_boolean_attributes() {
        assert_eq!(
            html("input(type=\"checkbox\", checked, disabled=false)"),
            "<input type=\"checkbox\" checked=\"checked\"/>"
        );
        assert_eq!(
            html("doctype html\ninput(checked)"),
            "<!DOCTYPE html>\n<input checked/>"
        );
    }

    #[test]
    fn test_doctypes() {
        assert_eq!(html("doctype html"), "<!DOCTYPE html>");
        assert_eq!(html("doctype 5"), "<!DOCTYPE html>");
        assert_eq!(html("!!! 5"), "<!DOCTYPE html>");
        assert_eq!(html("!!!"), "<!DOCTYPE html>");
        assert_eq!(html("doctype xml"), "<?xml version=\"1.0\" encoding=\"utf-8\" ?>");
        assert_eq!(html("doctype foo"), "<!DOCTYPE foo>");
        assert!(html("doctype strict").contains("XHTML 1.0 Strict"));
        assert!(compile("doctype html").unwrap().html5());
        assert!(!compile("doctype xml").unwrap().html5());
    }

    #[test]
    fn test_doctype_only_at_top_level() {
        let err = compile("html\n\tdoctype html").unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { .. }));
    }

    #[test]
    fn test_singular_tag_with_children() {
        let err = compile("img\n\tdiv").unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { .. }));
        assert!(err.to_string().contains("singular tag 'img' can't have children"));
        assert_eq!(err.location(), Some(&SourceLocation::new("template.dt", 1)));
    }

    #[test]
    fn test_singular_tag() {
        assert_eq!(html("div\n\tbr\n\timg(src=\"a.png\")"), "<div>\n\t<br/>\n\t<img src=\"a.png\"/>\n</div>");
    }

    #[test]
    fn test_indentation_errors() {
        let err = compile("div\n\t\tp").unwrap_err();
        assert!(matches!(err, TemplateError::MalformedIndentation { .. }));
        assert_eq!(err.location().map(|l| l.line), Some(2));

        let err = compile("div\n  p\n   span").unwrap_err();
        assert!(matches!(err, TemplateError::MalformedIndentation { .. }));
    }

    #[test]
    fn test_text_and_expressions() {
        let program = compile("p\n\t| Hello #{name}!\n\t= greeting\n\t!= raw").unwrap().program;
        let instructions = program.instructions();
        assert_eq!(instructions.len(), 7);
        assert_eq!(instructions[0], crate::ir::Instruction::Literal("<p>\n\tHello ".to_string()));
    }

    #[test]
    fn test_leaf_with_children() {
        let err = compile("| text\n\tp").unwrap_err();
        assert!(err.to_string().contains("text lines can't have children"));
    }

    #[test]
    fn test_unsupported_keywords() {
        for keyword in ["each x in xs", "for x in xs", "if x", "unless x", "mixin foo"] {
            let err = compile(keyword).unwrap_err();
            assert!(matches!(err, TemplateError::Syntax { .. }), "{}", keyword);
            assert!(err.to_string().contains("not supported"), "{}", keyword);
        }
    }

    #[test]
    fn test_raw_code() {
        let template = compile("- let x = 1\n- if x\n\tp Yes").unwrap();
        let instructions = template.program().instructions();
        assert!(matches!(&instructions[0], crate::ir::Instruction::Statement { code, .. } if code == "let x = 1"));
        assert!(matches!(&instructions[1], crate::ir::Instruction::BlockStart { code, .. } if code == "if x"));
        assert!(matches!(instructions.last(), Some(crate::ir::Instruction::BlockEnd)));

        let err = compile("- if x {\n\tp").unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { .. }));
    }

    #[test]
    fn test_comments() {
        assert_eq!(html("// note\np"), "<!-- note -->\n<p></p>");
        assert_eq!(html("//- hidden\n\tchild\np"), "<p></p>");
        assert_eq!(
            html("head\n\t//if lt IE 9\n\t\tscript(src=\"x.js\")"),
            "<head>\n\t<!--[if lt IE 9]>\n\t\t<script src=\"x.js\"></script>\n\t<![endif]-->\n</head>"
        );
        assert_eq!(html("//\n\tline one\n\tline two"), "<!--\nline one\nline two\n-->");
    }

    #[test]
    fn test_block_text() {
        assert_eq!(
            html("script.\n\tif (a < b)\n\n\t\trun();"),
            "<script>\nif (a < b)\n\n\trun();\n</script>"
        );
    }

    #[test]
    fn test_legacy_script_warning() {
        let template = compile("script\n\talert(1)").unwrap();
        assert_eq!(template.program().static_output().unwrap(), "<script>\nalert(1)\n</script>");
        assert_eq!(template.warnings().len(), 1);
        assert_eq!(template.warnings()[0].code.as_deref(), Some("D-7-2"));

        let loader = MemoryLoader::with_templates([("a.dt", "style\n\tp {}")]);
        let err = TemplateCompiler::new(&loader)
            .with_options(CompileOptions::default().with_strict(true))
            .compile("a")
            .unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { .. }));
    }

    #[test]
    fn test_include_word_in_raw_text() {
        let template = compile(":markdown\n\tinclude the following steps").unwrap();
        assert_eq!(
            template.program().static_output().unwrap().trim_end(),
            "<p>include the following steps</p>"
        );
        assert_eq!(html("p.\n\tinclude this text"), "<p>\ninclude this text\n</p>");
        assert_eq!(html("//\n\tinclude nothing"), "<!--\ninclude nothing\n-->");
        assert_eq!(html("//- hidden\n\tinclude nothing\np"), "<p></p>");
    }

    #[test]
    fn test_opens_raw_text() {
        assert!(opens_raw_text(":markdown"));
        assert!(opens_raw_text("// note"));
        assert!(opens_raw_text("//- hidden"));
        assert!(opens_raw_text("p."));
        assert!(opens_raw_text("script"));
        assert!(!opens_raw_text("//if IE"));
        assert!(!opens_raw_text("div"));
        assert!(!opens_raw_text("- for x in xs"));
        assert!(!opens_raw_text("include nav"));
    }

    #[test]
    fn test_whitespace_control() {
        assert_eq!(html("p\n\ta> x\n\tb y"), "<p><a>x</a><b>y</b>\n</p>");
        assert_eq!(html("p<\n\tb y"), "<p><b>y</b></p>");
    }

    #[test]
    fn test_filters() {
        assert_eq!(
            html("div\n\t:css\n\t\tp { color: red }"),
            "<div>\n\t<style type=\"text/css\"><!--\n\t\tp { color: red }\n\t--></style>\n</div>"
        );
        assert_eq!(html(":htmlescape <b>"), "&lt;b&gt;");
        assert_eq!(html(":markdown:htmlescape *a*"), "<p><em>a</em></p>");
    }

    #[test]
    fn test_filters_follow_output_indent() {
        let loader = MemoryLoader::with_templates([("a.dt", "div\n\t:css\n\t\tp {}")]);
        let template = TemplateCompiler::new(&loader)
            .with_options(CompileOptions::default().with_output_indent("  "))
            .compile("a")
            .unwrap();
        assert_eq!(
            template.program().static_output().unwrap(),
            "<div>\n  <style type=\"text/css\"><!--\n    p {}\n  --></style>\n</div>"
        );
    }

    #[test]
    fn test_unknown_filter() {
        let err = compile(":nope text").unwrap_err();
        assert!(matches!(err, TemplateError::UnresolvedReference { .. }));

        let loader = MemoryLoader::with_templates([("a.dt", ":nope:htmlescape <b>")]);
        let template = TemplateCompiler::new(&loader)
            .with_options(CompileOptions::default().with_runtime_filters(true))
            .compile("a")
            .unwrap();
        assert_eq!(
            template.program().instructions(),
            &[crate::ir::Instruction::Filter {
                names: vec!["nope".to_string()],
                content: "&lt;b&gt;".to_string(),
                indent: 0,
                location: SourceLocation::new("a.dt", 1),
            }]
        );
    }

    #[test]
    fn test_translation() {
        let template = compile("p& Hello").unwrap();
        assert_eq!(template.program().static_output().unwrap(), "<p>Hello</p>");
        assert_eq!(template.warnings()[0].code.as_deref(), Some("D-7-1"));

        let mut filters = FilterRegistry::new();
        filters.register("tr", |text, _| format!("Hallo ({})", text));
        let loader = MemoryLoader::with_templates([("a.dt", "p& Hello")]);
        let template = TemplateCompiler::new(&loader)
            .with_filters(filters)
            .with_options(CompileOptions::default().with_translation_filter("tr"))
            .compile("a")
            .unwrap();
        assert_eq!(template.program().static_output().unwrap(), "<p>Hallo (Hello)</p>");
        assert!(template.warnings().is_empty());
    }

    #[test]
    fn test_block_replace() {
        let template = compile_files(
            &[
                ("base.dt", "body\n\tblock test\n\t\tp Default"),
                ("child.dt", "extends base\nblock test\n\tp Hello"),
            ],
            "child",
        )
        .unwrap();
        assert_eq!(template.program().static_output().unwrap(), "<body>\n\t<p>Hello</p>\n</body>");
    }

    #[test]
    fn test_block_default() {
        let template = compile_files(
            &[
                ("base.dt", "body\n\tblock test\n\t\tp Default"),
                ("child.dt", "extends base"),
            ],
            "child",
        )
        .unwrap();
        assert_eq!(template.program().static_output().unwrap(), "<body>\n\t<p>Default</p>\n</body>");
    }

    #[test]
    fn test_block_prepend() {
        let template = compile_files(
            &[
                ("base.dt", "body\n\tblock test\n\t\tp Default"),
                ("child.dt", "extends base\nprepend test\n\tp Hello"),
            ],
            "child",
        )
        .unwrap();
        assert_eq!(
            template.program().static_output().unwrap(),
            "<body>\n\t<p>Hello</p>\n\t<p>Default</p>\n</body>"
        );
    }

    #[test]
    fn test_block_append() {
        let err = compile_files(
            &[
                ("base.dt", "body\n\tblock test\n\t\tp Default"),
                ("child.dt", "extends base\nappend test\n\tp Hello"),
            ],
            "child",
        )
        .unwrap_err();
        assert!(matches!(err, TemplateError::UnsupportedFeature { .. }));

        let template = compile_files(
            &[
                ("base.dt", "body\n\tblock test"),
                ("child.dt", "extends base\nappend test\n\tp Hello"),
            ],
            "child",
        )
        .unwrap();
        assert_eq!(template.program().static_output().unwrap(), "<body>\n\t<p>Hello</p>\n</body>");
    }

    #[test]
    fn test_block_override_indented_too_deep() {
        let err = compile_files(
            &[
                ("base.dt", "body\n\tblock test"),
                ("child.dt", "extends base\nblock test\n\t\t\tp Hello"),
            ],
            "child",
        )
        .unwrap_err();
        assert!(matches!(err, TemplateError::MalformedIndentation { .. }));
        assert_eq!(err.location(), Some(&SourceLocation::new("child.dt", 3)));
    }

    #[test]
    fn test_block_default_indented_too_deep() {
        let err = compile_files(
            &[
                ("base.dt", "body\n\tblock test\n\t\t\t\tp Default"),
                ("child.dt", "extends base"),
            ],
            "child",
        )
        .unwrap_err();
        assert!(matches!(err, TemplateError::MalformedIndentation { .. }));
        assert_eq!(err.location(), Some(&SourceLocation::new("base.dt", 3)));
        assert!(err.to_string().contains("indented by more than one level"));
    }

    #[test]
    fn test_multi_level_extends() {
        let template = compile_files(
            &[
                ("base.dt", "html\n\tblock body"),
                ("layout.dt", "extends base\nblock body\n\tmain\n\t\tblock content\n\t\t\tp Layout"),
                ("page.dt", "extends layout\nblock content\n\tp Page"),
            ],
            "page",
        )
        .unwrap();
        assert_eq!(
            template.program().static_output().unwrap(),
            "<html>\n\t<main>\n\t\t<p>Page</p>\n\t</main>\n</html>"
        );
    }

    #[test]
    fn test_extends_requires_declarations() {
        let err = compile_files(
            &[("base.dt", "body"), ("child.dt", "extends base\np Hello")],
            "child",
        )
        .unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { .. }));
        assert_eq!(err.location(), Some(&SourceLocation::new("child.dt", 2)));
    }

    #[test]
    fn test_include() {
        let template = compile_files(
            &[
                ("page.dt", "body\n\tinclude nav\n\tp Main"),
                ("nav.dt", "nav\n\ta Home"),
            ],
            "page",
        )
        .unwrap();
        assert_eq!(
            template.program().static_output().unwrap(),
            "<body>\n\t<nav>\n\t\t<a>Home</a>\n\t</nav>\n\t<p>Main</p>\n</body>"
        );
    }

    #[test]
    fn test_include_cycle_stops() {
        let template = compile_files(
            &[("a.dt", "p A\ninclude b"), ("b.dt", "p B\ninclude a")],
            "a",
        )
        .unwrap();
        assert_eq!(template.program().static_output().unwrap(), "<p>A</p>\n<p>B</p>");
    }

    #[test]
    fn test_misplaced_directives() {
        let err = compile("p\nextends base").unwrap_err();
        assert!(err.to_string().contains("must be the first line"));

        let err = compile("append content\n\tp").unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { .. }));
    }

    #[test]
    fn test_unterminated_interpolation() {
        let err = compile("p Hello #{name").unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { .. }));
    }
}
