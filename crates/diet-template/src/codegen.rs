/*
 * codegen.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Rust source generation.
//!
//! [`RustBackend`] turns a [`Program`] into the source of a Rust function
//! that appends the template output to a `String`. Host code is spliced in
//! verbatim, so expressions and code lines must be valid Rust: `- for item
//! in &items` opens a loop whose body is the indented lines below it.

use crate::interpolation::dstring_escape;
use crate::ir::{Escape, Instruction, Program};
use crate::parser::Template;

/// Generates a Rust render function from a compiled template.
///
/// ```
/// use diet_template::{RustBackend, Template};
///
/// let template = Template::compile("p= title").unwrap();
/// let source = RustBackend::new("render_page")
///     .with_parameter("title: &str")
///     .generate(template.program());
/// assert!(source.starts_with("fn render_page(__out: &mut String"));
/// assert!(source.contains("::diet_template::runtime::write_escaped(__out, &(title));"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RustBackend {
    function_name: String,
    parameters: Vec<String>,
}

impl RustBackend {
    pub fn new(function_name: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            parameters: Vec::new(),
        }
    }

    /// Add a parameter declaration such as `"items: &[Item]"`.
    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameters.push(parameter.into());
        self
    }

    pub fn generate(&self, program: &Program) -> String {
        let mut parameters = vec![
            "__out: &mut String".to_string(),
            "__filters: &::diet_template::FilterRegistry".to_string(),
        ];
        parameters.extend(self.parameters.iter().cloned());

        let mut source = format!(
            "fn {}({}) -> ::diet_template::TemplateResult<()> {{\n",
            self.function_name,
            parameters.join(", ")
        );
        let mut writer = SourceWriter {
            source: &mut source,
            depth: 1,
        };
        let has_breaks = program
            .instructions()
            .iter()
            .any(|i| matches!(i, Instruction::Break(_)));
        if has_breaks {
            writer.line("let __start = __out.len();");
        }
        for instruction in program.instructions() {
            writer.instruction(instruction);
        }
        writer.line("Ok(())");
        source.push_str("}\n");
        source
    }
}

struct SourceWriter<'a> {
    source: &'a mut String,
    depth: usize,
}

impl SourceWriter<'_> {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.source.push_str("    ");
        }
        self.source.push_str(text);
        self.source.push('\n');
    }

    fn instruction(&mut self, instruction: &Instruction) {
        match instruction {
            Instruction::Literal(text) => {
                self.line(&format!("__out.push_str(\"{}\");", dstring_escape(text)));
            }
            Instruction::Break(text) => {
                self.line(&format!(
                    "if __out.len() > __start {{ __out.push_str(\"{}\"); }}",
                    dstring_escape(text)
                ));
            }
            Instruction::Expression { code, escape, .. } => {
                let line = match escape {
                    Escape::Html => {
                        format!("::diet_template::runtime::write_escaped(__out, &({}));", code)
                    }
                    Escape::Attribute => format!(
                        "__out.push_str(&::diet_template::runtime::escape_attribute(&({}).to_string()));",
                        code
                    ),
                    Escape::Raw => {
                        format!("::diet_template::runtime::write_raw(__out, &({}));", code)
                    }
                };
                self.line(&line);
            }
            Instruction::Attribute {
                name,
                code,
                extra_classes,
                html5,
                ..
            } => {
                let extra = match extra_classes {
                    Some(extra) => format!("Some(\"{}\")", dstring_escape(extra)),
                    None => "None".to_string(),
                };
                self.line(&format!(
                    "::diet_template::runtime::write_attribute(__out, \"{}\", &({}), {}, {});",
                    dstring_escape(name),
                    code,
                    extra,
                    html5
                ));
            }
            Instruction::Statement { code, .. } => {
                if code.ends_with(';') || code.ends_with('}') {
                    self.line(code);
                } else {
                    self.line(&format!("{};", code));
                }
            }
            Instruction::BlockStart { code, .. } => {
                self.line(&format!("{} {{", code));
                self.depth += 1;
            }
            Instruction::BlockEnd => {
                self.depth = self.depth.saturating_sub(1);
                self.line("}");
            }
            Instruction::Filter {
                names,
                content,
                indent,
                ..
            } => {
                let names: Vec<String> = names
                    .iter()
                    .map(|name| format!("\"{}\"", dstring_escape(name)))
                    .collect();
                self.line(&format!(
                    "__out.push_str(&__filters.apply_chain(&[{}], \"{}\", {})?);",
                    names.join(", "),
                    dstring_escape(content),
                    indent
                ));
            }
        }
    }
}

impl Template {
    /// Generate a Rust render function for this template.
    pub fn to_rust(&self, backend: &RustBackend) -> String {
        backend.generate(&self.program)
    }
}
