/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Compiler for Diet, an indentation-sensitive HTML template language.
//!
//! A Diet template describes HTML by nesting:
//!
//! - Tags with shorthand ids and classes: `a#home.nav(href="/") Home`
//! - Interpolation: `#{expr}` (escaped) and `!{expr}` (raw)
//! - Expression lines: `= expr` and `!= expr`
//! - Raw host code: `- code`, whose indented children form its body
//! - Text lines `| text`, inline HTML `<br>`, block text `script.`
//! - Comments: `// shown`, `//- hidden`, `//if IE` conditional comments
//! - Filters: `:markdown`, `:css`, chained as `:markdown:htmlescape`
//! - Composition: `extends`, `block`/`append`/`prepend` and `include`
//! - Doctypes: `doctype html`, `!!! 5`
//!
//! # Architecture
//!
//! Compilation resolves all referenced files through a [`TemplateLoader`],
//! then turns the lines into a flat [`Program`] of instructions. Host code is
//! opaque to the compiler. A program is either interpreted against a
//! [`RenderHost`] (such as the built-in [`ContextHost`]) or turned into Rust
//! source by [`RustBackend`].
//!
//! # Example
//!
//! ```
//! use diet_template::{Template, TemplateContext};
//!
//! let template = Template::compile("ul\n\t- for item in items\n\t\tli= item").unwrap();
//!
//! let mut ctx = TemplateContext::new();
//! ctx.insert("items", diet_template::TemplateValue::List(vec!["a".into(), "<b>".into()]));
//!
//! let html = template.render_context(&ctx).unwrap();
//! assert_eq!(html, "<ul>\n\t<li>a</li>\n\t<li>&lt;b&gt;</li>\n</ul>");
//! ```

pub mod blocks;
pub mod codegen;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod filters;
pub mod interpolation;
pub mod ir;
pub mod options;
pub mod parser;
pub mod render;
pub mod resolver;
pub mod runtime;
pub mod source;
pub mod tag;

// Re-export main types at crate root
pub use codegen::RustBackend;
pub use context::{TemplateContext, TemplateValue};
pub use diagnostics::DiagnosticCollector;
pub use error::{TemplateError, TemplateResult};
pub use filters::{Filter, FilterRegistry};
pub use ir::{Escape, Instruction, Program};
pub use options::CompileOptions;
pub use parser::{Template, TemplateCompiler};
pub use render::{ContextHost, RenderHost};
pub use resolver::{FileSystemLoader, MemoryLoader, NullLoader, TemplateLoader};
