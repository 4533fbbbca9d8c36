/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Rendering compiled templates.
//!
//! The template language treats host code as opaque. A [`RenderHost`] gives
//! that code meaning at render time: it evaluates expressions, executes
//! statements and decides how often the body of a code block runs.
//! [`ContextHost`] is a small host over a [`TemplateContext`].

use crate::context::{TemplateContext, TemplateValue};
use crate::error::{TemplateError, TemplateResult};
use crate::filters::FilterRegistry;
use crate::interpolation::dstring_unescape;
use crate::ir::{Escape, Instruction, Program};
use crate::parser::Template;
use crate::runtime::{escape_attribute, write_attribute, write_escaped, write_raw};
use std::collections::HashMap;
use std::ops::Range;

/// Gives meaning to the host code embedded in a template.
pub trait RenderHost {
    /// Evaluate an expression from `= expr`, `#{expr}` or an attribute.
    fn evaluate(&mut self, code: &str) -> TemplateResult<TemplateValue>;

    /// Execute a `- code` line that has no children.
    fn execute(&mut self, code: &str) -> TemplateResult<()>;

    /// Run a `- code` line with children, calling `body` once per
    /// execution of the nested lines.
    fn run_block(
        &mut self,
        code: &str,
        body: &mut dyn FnMut(&mut Self) -> TemplateResult<()>,
    ) -> TemplateResult<()>;
}

impl Template {
    /// Render with `host`, resolving deferred filters against the filters
    /// the template was compiled with.
    pub fn render<H: RenderHost>(&self, host: &mut H) -> TemplateResult<String> {
        self.render_with_filters(host, &self.filters)
    }

    /// Render with `host` and an explicit filter registry.
    pub fn render_with_filters<H: RenderHost>(
        &self,
        host: &mut H,
        filters: &FilterRegistry,
    ) -> TemplateResult<String> {
        let mut out = String::new();
        let range = 0..self.program.instructions().len();
        run_range(&self.program, filters, range, host, &mut out)?;
        Ok(out)
    }

    /// Render against a context with the built-in [`ContextHost`].
    pub fn render_context(&self, context: &TemplateContext) -> TemplateResult<String> {
        self.render(&mut ContextHost::new(context))
    }
}

fn run_range<H: RenderHost>(
    program: &Program,
    filters: &FilterRegistry,
    range: Range<usize>,
    host: &mut H,
    out: &mut String,
) -> TemplateResult<()> {
    let instructions = program.instructions();
    let mut index = range.start;
    while index < range.end {
        match &instructions[index] {
            Instruction::Literal(text) => out.push_str(text),
            Instruction::Break(text) => {
                if !out.is_empty() {
                    out.push_str(text);
                }
            }
            Instruction::Expression {
                code,
                escape,
                location,
            } => {
                let value = host.evaluate(code).map_err(|e| e.with_location(location))?;
                match escape {
                    Escape::Html => write_escaped(out, &value),
                    Escape::Attribute => out.push_str(&escape_attribute(&value.render())),
                    Escape::Raw => write_raw(out, &value),
                }
            }
            Instruction::Attribute {
                name,
                code,
                extra_classes,
                html5,
                location,
            } => {
                let value = host.evaluate(code).map_err(|e| e.with_location(location))?;
                write_attribute(out, name, &value, extra_classes.as_deref(), *html5);
            }
            Instruction::Statement { code, location } => {
                host.execute(code).map_err(|e| e.with_location(location))?;
            }
            Instruction::BlockStart { code, location } => {
                let end = program.block_end(index).ok_or_else(|| {
                    TemplateError::render("code block has no end").with_location(location)
                })?;
                let body = index + 1..end;
                host.run_block(code, &mut |host: &mut H| {
                    run_range(program, filters, body.clone(), host, out)
                })
                .map_err(|e| e.with_location(location))?;
                index = end;
            }
            Instruction::BlockEnd => {}
            Instruction::Filter {
                names,
                content,
                indent,
                location,
            } => {
                let text = filters
                    .apply_chain(names, content, *indent)
                    .map_err(|e| e.with_location(location))?;
                out.push_str(&text);
            }
        }
        index += 1;
    }
    Ok(())
}

/// A [`RenderHost`] over a [`TemplateContext`].
///
/// Expressions are string literals (`"..."`, `'...'`), numbers, `true`,
/// `false`, or dotted variable paths such as `user.name`, optionally negated
/// with `!`. Missing variables evaluate to null and render as nothing.
///
/// Statements bind variables with `let name = expr`. Code blocks support
/// `if expr`, `unless expr`, `else`, `else if expr` and
/// `for name in expr` (also spelled `each`).
pub struct ContextHost<'a> {
    context: &'a TemplateContext,
    /// Local scopes, innermost last.
    frames: Vec<HashMap<String, TemplateValue>>,
    /// Outcome of the most recent conditional or loop, for `else`.
    last_condition: Option<bool>,
}

impl<'a> ContextHost<'a> {
    pub fn new(context: &'a TemplateContext) -> Self {
        Self {
            context,
            frames: vec![HashMap::new()],
            last_condition: None,
        }
    }

    fn lookup(&self, path: &str) -> TemplateValue {
        let segments: Vec<&str> = path.split('.').collect();
        let local = self
            .frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(segments[0]))
            .and_then(|value| value.get_path(&segments[1..]));
        local
            .or_else(|| self.context.get_path(&segments))
            .cloned()
            .unwrap_or_default()
    }

    fn scoped(
        &mut self,
        bindings: HashMap<String, TemplateValue>,
        body: &mut dyn FnMut(&mut Self) -> TemplateResult<()>,
    ) -> TemplateResult<()> {
        self.frames.push(bindings);
        let result = body(self);
        self.frames.pop();
        result
    }

    fn run_conditional(
        &mut self,
        condition: bool,
        body: &mut dyn FnMut(&mut Self) -> TemplateResult<()>,
    ) -> TemplateResult<()> {
        if condition {
            self.scoped(HashMap::new(), body)?;
        }
        self.last_condition = Some(condition);
        Ok(())
    }

    fn run_loop(
        &mut self,
        clause: &str,
        body: &mut dyn FnMut(&mut Self) -> TemplateResult<()>,
    ) -> TemplateResult<()> {
        let (name, collection) = clause
            .split_once(" in ")
            .map(|(name, collection)| (name.trim(), collection.trim()))
            .filter(|(name, _)| is_identifier(name))
            .ok_or_else(|| {
                TemplateError::render(format!("expected 'name in expression', found '{}'", clause))
            })?;

        let items = match self.evaluate(collection)? {
            TemplateValue::List(items) => items,
            TemplateValue::Map(map) => {
                let mut entries: Vec<_> = map.into_iter().collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0));
                entries.into_iter().map(|(_, value)| value).collect()
            }
            TemplateValue::Null => Vec::new(),
            other => vec![other],
        };

        let ran = !items.is_empty();
        for item in items {
            let bindings = HashMap::from([(name.to_string(), item)]);
            self.scoped(bindings, body)?;
        }
        self.last_condition = Some(ran);
        Ok(())
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_path(text: &str) -> bool {
    !text.is_empty() && text.split('.').all(is_identifier)
}

/// Split a leading keyword followed by whitespace.
fn keyword<'c>(code: &'c str, word: &str) -> Option<&'c str> {
    let rest = code.strip_prefix(word)?;
    if rest.is_empty() {
        Some(rest)
    } else if rest.starts_with([' ', '\t']) {
        Some(rest.trim())
    } else {
        None
    }
}

impl RenderHost for ContextHost<'_> {
    fn evaluate(&mut self, code: &str) -> TemplateResult<TemplateValue> {
        let code = code.trim();
        if let Some(negated) = code.strip_prefix('!') {
            return Ok(TemplateValue::Bool(!self.evaluate(negated)?.is_truthy()));
        }
        for quote in ['"', '\''] {
            if code.len() >= 2 && code.starts_with(quote) && code.ends_with(quote) {
                return Ok(TemplateValue::String(dstring_unescape(&code[1..code.len() - 1])));
            }
        }
        match code {
            "true" => return Ok(TemplateValue::Bool(true)),
            "false" => return Ok(TemplateValue::Bool(false)),
            _ => {}
        }
        if code.starts_with(|c: char| c.is_ascii_digit() || c == '-') && code.parse::<f64>().is_ok() {
            return Ok(TemplateValue::String(code.to_string()));
        }
        if is_path(code) {
            return Ok(self.lookup(code));
        }
        Err(TemplateError::render(format!("unsupported expression '{}'", code)))
    }

    fn execute(&mut self, code: &str) -> TemplateResult<()> {
        let binding = keyword(code.trim(), "let").and_then(|rest| rest.split_once('='));
        let Some((name, expression)) = binding else {
            return Err(TemplateError::render(format!("unsupported statement '{}'", code)));
        };
        let name = name.trim();
        if !is_identifier(name) {
            return Err(TemplateError::render(format!("invalid variable name '{}'", name)));
        }
        let value = self.evaluate(expression.trim_end_matches(';'))?;
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), value);
        }
        Ok(())
    }

    fn run_block(
        &mut self,
        code: &str,
        body: &mut dyn FnMut(&mut Self) -> TemplateResult<()>,
    ) -> TemplateResult<()> {
        let code = code.trim();
        if let Some(rest) = keyword(code, "else") {
            let previous = self.last_condition.take().ok_or_else(|| {
                TemplateError::render("'else' without a preceding 'if', 'unless' or loop")
            })?;
            if previous {
                self.last_condition = Some(true);
                return Ok(());
            }
            return if rest.is_empty() {
                self.run_conditional(true, body)
            } else {
                self.run_block(rest, body)
            };
        }
        if let Some(condition) = keyword(code, "if") {
            let value = self.evaluate(condition)?.is_truthy();
            return self.run_conditional(value, body);
        }
        if let Some(condition) = keyword(code, "unless") {
            let value = !self.evaluate(condition)?.is_truthy();
            return self.run_conditional(value, body);
        }
        if let Some(clause) = keyword(code, "for").or_else(|| keyword(code, "each")) {
            return self.run_loop(clause, body);
        }
        Err(TemplateError::render(format!("unsupported code block '{}'", code)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CompileOptions;
    use crate::parser::TemplateCompiler;
    use crate::resolver::MemoryLoader;
    use diet_error_reporting::SourceLocation;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn render(source: &str, data: serde_json::Value) -> TemplateResult<String> {
        Template::compile(source)?.render_context(&TemplateContext::from_json(data))
    }

    #[test]
    fn test_interpolation_escaping() {
        let html = render(
            "p Hello #{name}, !{raw}\np= name\np!= raw",
            json!({"name": "<Ada>", "raw": "<b>x</b>"}),
        )
        .unwrap();
        assert_eq!(
            html,
            "<p>Hello &lt;Ada&gt;, <b>x</b></p>\n<p>&lt;Ada&gt;</p>\n<p><b>x</b></p>"
        );
    }

    #[test]
    fn test_attribute_values() {
        let html = render(
            "a(href=url, title=\"Go to #{name}\", hidden=flag)\ndiv.item(class=classes)",
            json!({"url": "/a?b=1&c=2", "name": "\"home\"", "flag": false, "classes": ["x", "y"]}),
        )
        .unwrap();
        assert_eq!(
            html,
            "<a href=\"/a?b=1&amp;c=2\" title=\"Go to &quot;home&quot;\"></a>\n<div class=\"x y item\"></div>"
        );
    }

    #[test]
    fn test_missing_values_render_empty() {
        assert_eq!(render("p= missing.value", json!({})).unwrap(), "<p></p>");
    }

    #[test]
    fn test_conditionals() {
        let source = "- if user.admin\n\tp Admin\n- else\n\tp Guest\n- unless user.admin\n\tp Limited";
        assert_eq!(
            render(source, json!({"user": {"admin": true}})).unwrap(),
            "<p>Admin</p>"
        );
        assert_eq!(
            render(source, json!({"user": {"admin": false}})).unwrap(),
            "<p>Guest</p>\n<p>Limited</p>"
        );
    }

    #[test]
    fn test_leading_newline_in_value_is_kept() {
        assert_eq!(render("= x", json!({"x": "\nhi"})).unwrap(), "\nhi");
        assert_eq!(render("!= x\np", json!({"x": "\n"})).unwrap(), "\n\n<p></p>");
        assert_eq!(render("= x\np", json!({"x": ""})).unwrap(), "<p></p>");
    }

    #[test]
    fn test_break_after_skipped_block() {
        let source = "- if show\n\tp A\np B";
        assert_eq!(render(source, json!({"show": false})).unwrap(), "<p>B</p>");
        assert_eq!(render(source, json!({"show": true})).unwrap(), "<p>A</p>\n<p>B</p>");
    }

    #[test]
    fn test_else_if() {
        let source = "- if a\n\tp A\n- else if b\n\tp B\n- else\n\tp C";
        assert_eq!(render(source, json!({"a": false, "b": true})).unwrap(), "<p>B</p>");
        assert_eq!(render(source, json!({"a": false, "b": false})).unwrap(), "<p>C</p>");
        assert_eq!(render(source, json!({"a": true, "b": true})).unwrap(), "<p>A</p>");
    }

    #[test]
    fn test_loops() {
        let source = "ul\n\t- for item in items\n\t\tli= item.name\n\t- else\n\t\tli Nothing";
        assert_eq!(
            render(source, json!({"items": [{"name": "a"}, {"name": "b"}]})).unwrap(),
            "<ul>\n\t<li>a</li>\n\t<li>b</li>\n</ul>"
        );
        assert_eq!(
            render(source, json!({"items": []})).unwrap(),
            "<ul>\n\t<li>Nothing</li>\n</ul>"
        );
    }

    #[test]
    fn test_let_binding_scope() {
        let source = "- let greeting = \"Hi\"\n- each name in names\n\t- let last = name\n\tp #{greeting} #{name}\np= last";
        assert_eq!(
            render(source, json!({"names": ["a", "b"]})).unwrap(),
            "<p>Hi a</p>\n<p>Hi b</p>\n<p></p>"
        );
    }

    #[test]
    fn test_render_error_location() {
        let err = render("div\n\tp= 1 + 2", json!({})).unwrap_err();
        assert!(matches!(
            &err,
            TemplateError::Render { location: Some(location), .. }
                if *location == SourceLocation::new("template.dt", 2)
        ));
        assert!(err.to_string().contains("unsupported expression '1 + 2'"));
    }

    #[test]
    fn test_else_without_if() {
        let err = render("- else\n\tp x", json!({})).unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }));
    }

    #[test]
    fn test_runtime_filters() {
        let loader = MemoryLoader::with_templates([("a.dt", "div\n\t:shout:htmlescape <hi>")]);
        let template = TemplateCompiler::new(&loader)
            .with_options(CompileOptions::default().with_runtime_filters(true))
            .compile("a")
            .unwrap();

        let context = TemplateContext::new();
        let err = template.render_context(&context).unwrap_err();
        assert!(err.to_string().contains("unknown filter 'shout'"));

        let mut filters = FilterRegistry::new();
        filters.register("shout", |text, _| text.to_uppercase());
        let html = template
            .render_with_filters(&mut ContextHost::new(&context), &filters)
            .unwrap();
        assert_eq!(html, "<div>\n\t&LT;HI&GT;\n</div>");
    }

    /// A host that records what it is asked to do.
    #[derive(Default)]
    struct RecordingHost {
        calls: Vec<String>,
        repeat: usize,
    }

    impl RenderHost for RecordingHost {
        fn evaluate(&mut self, code: &str) -> TemplateResult<TemplateValue> {
            self.calls.push(format!("evaluate {}", code));
            Ok(TemplateValue::from(code.to_uppercase()))
        }

        fn execute(&mut self, code: &str) -> TemplateResult<()> {
            self.calls.push(format!("execute {}", code));
            Ok(())
        }

        fn run_block(
            &mut self,
            code: &str,
            body: &mut dyn FnMut(&mut Self) -> TemplateResult<()>,
        ) -> TemplateResult<()> {
            self.calls.push(format!("block {}", code));
            for _ in 0..self.repeat {
                body(self)?;
            }
            Ok(())
        }
    }

    #[test]
    fn test_custom_host() {
        let template = Template::compile("- setup()\n- repeat\n\tli= x").unwrap();
        let mut host = RecordingHost {
            repeat: 2,
            ..Default::default()
        };
        let html = template.render(&mut host).unwrap();
        assert_eq!(html, "<li>X</li>\n<li>X</li>");
        assert_eq!(
            host.calls,
            vec!["execute setup()", "block repeat", "evaluate x", "evaluate x"]
        );
    }
}
