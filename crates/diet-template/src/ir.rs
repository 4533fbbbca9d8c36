/*
 * ir.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Intermediate representation shared by the render backends.
//!
//! The compiler produces a flat [`Program`] of [`Instruction`]s through an
//! [`Emitter`]. Adjacent literal text is batched into a single
//! [`Instruction::Literal`].

use diet_error_reporting::SourceLocation;
use std::collections::HashMap;

/// How an expression's value is written to the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    /// HTML text escaping (`& < >`).
    Html,
    /// Attribute value escaping (adds `"`).
    Attribute,
    /// Written unescaped.
    Raw,
}

/// One step of a compiled template.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Literal output text.
    Literal(String),
    /// A line break that is written only if output precedes it.
    Break(String),
    /// Evaluate `code` and write the result.
    Expression {
        code: String,
        escape: Escape,
        location: SourceLocation,
    },
    /// Evaluate `code` and write it as attribute `name`, typed at render time.
    Attribute {
        name: String,
        code: String,
        /// Shorthand classes appended to a `class` value.
        extra_classes: Option<String>,
        html5: bool,
        location: SourceLocation,
    },
    /// A raw code line without children.
    Statement {
        code: String,
        location: SourceLocation,
    },
    /// A raw code line whose children run under its control.
    BlockStart {
        code: String,
        location: SourceLocation,
    },
    /// End of the innermost open [`Instruction::BlockStart`].
    BlockEnd,
    /// Apply filters unresolved at compile time, right to left.
    Filter {
        names: Vec<String>,
        content: String,
        indent: usize,
        location: SourceLocation,
    },
}

/// A compiled template.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    instructions: Vec<Instruction>,
    /// `BlockStart` index to the index of its `BlockEnd`.
    block_ends: HashMap<usize, usize>,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        let mut block_ends = HashMap::new();
        let mut open = Vec::new();
        for (index, instruction) in instructions.iter().enumerate() {
            match instruction {
                Instruction::BlockStart { .. } => open.push(index),
                Instruction::BlockEnd => {
                    if let Some(start) = open.pop() {
                        block_ends.insert(start, index);
                    }
                }
                _ => {}
            }
        }
        Self {
            instructions,
            block_ends,
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Index of the `BlockEnd` matching the `BlockStart` at `start`.
    pub fn block_end(&self, start: usize) -> Option<usize> {
        self.block_ends.get(&start).copied()
    }

    /// True if the program contains no dynamic instructions.
    pub fn is_static(&self) -> bool {
        self.instructions
            .iter()
            .all(|i| matches!(i, Instruction::Literal(_)))
    }

    /// The output of a static program, or `None` if it needs a render host.
    pub fn static_output(&self) -> Option<String> {
        if !self.is_static() {
            return None;
        }
        let mut out = String::new();
        for instruction in &self.instructions {
            if let Instruction::Literal(text) = instruction {
                out.push_str(text);
            }
        }
        Some(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EmitState {
    Code,
    String,
}

/// Builds a [`Program`], batching literal text and tracking line breaks.
#[derive(Debug)]
pub struct Emitter {
    instructions: Vec<Instruction>,
    pending: String,
    state: EmitState,
    output_indent: String,
    suppress_break: bool,
    /// Open `BlockStart`s.
    open_blocks: usize,
    /// Literal text has been written outside any code block.
    started: bool,
}

impl Emitter {
    pub fn new(output_indent: impl Into<String>) -> Self {
        Self {
            instructions: Vec::new(),
            pending: String::new(),
            state: EmitState::Code,
            output_indent: output_indent.into(),
            suppress_break: false,
            open_blocks: 0,
            started: false,
        }
    }

    pub fn literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.pending.push_str(text);
        self.state = EmitState::String;
        if self.open_blocks == 0 {
            self.started = true;
        }
    }

    fn flush(&mut self) {
        if self.state == EmitState::String {
            self.instructions
                .push(Instruction::Literal(std::mem::take(&mut self.pending)));
            self.state = EmitState::Code;
        }
    }

    fn push(&mut self, instruction: Instruction) {
        self.flush();
        self.instructions.push(instruction);
    }

    pub fn expression(&mut self, code: impl Into<String>, escape: Escape, location: &SourceLocation) {
        self.push(Instruction::Expression {
            code: code.into(),
            escape,
            location: location.clone(),
        });
    }

    pub fn attribute(
        &mut self,
        name: impl Into<String>,
        code: impl Into<String>,
        extra_classes: Option<String>,
        html5: bool,
        location: &SourceLocation,
    ) {
        self.push(Instruction::Attribute {
            name: name.into(),
            code: code.into(),
            extra_classes,
            html5,
            location: location.clone(),
        });
    }

    pub fn statement(&mut self, code: impl Into<String>, location: &SourceLocation) {
        self.push(Instruction::Statement {
            code: code.into(),
            location: location.clone(),
        });
    }

    pub fn block_start(&mut self, code: impl Into<String>, location: &SourceLocation) {
        self.push(Instruction::BlockStart {
            code: code.into(),
            location: location.clone(),
        });
        self.open_blocks += 1;
    }

    pub fn block_end(&mut self) {
        self.push(Instruction::BlockEnd);
        self.open_blocks = self.open_blocks.saturating_sub(1);
    }

    pub fn filter(
        &mut self,
        names: Vec<String>,
        content: impl Into<String>,
        indent: usize,
        location: &SourceLocation,
    ) {
        self.push(Instruction::Filter {
            names,
            content: content.into(),
            indent,
            location: location.clone(),
        });
    }

    /// Write a newline and `level` output indents.
    ///
    /// Nothing is written directly after a construct that suppressed its
    /// outer whitespace, or at the start of the output.
    pub fn line_break(&mut self, level: usize) {
        if std::mem::take(&mut self.suppress_break) {
            return;
        }
        let text = format!("\n{}", self.output_indent.repeat(level));
        self.write_break(text);
    }

    /// Write `text`, treating a leading newline as a line break.
    pub fn literal_after_break(&mut self, text: &str) {
        match text.strip_prefix('\n') {
            Some(rest) => {
                self.write_break("\n".to_string());
                self.literal(rest);
            }
            None => self.literal(text),
        }
    }

    fn write_break(&mut self, text: String) {
        if self.started {
            self.literal(&text);
        } else if !self.instructions.is_empty() || !self.pending.is_empty() {
            // earlier output is conditional or may render empty
            self.push(Instruction::Break(text));
        }
    }

    /// Skip the next [`Emitter::line_break`].
    pub fn suppress_next_break(&mut self) {
        self.suppress_break = true;
    }

    /// Cancel a pending [`Emitter::suppress_next_break`].
    pub fn allow_break(&mut self) {
        self.suppress_break = false;
    }

    pub fn finish(mut self) -> Program {
        self.flush();
        Program::new(self.instructions)
    }
}
