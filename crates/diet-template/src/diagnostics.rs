/*
 * diagnostics.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Collection of non-fatal compiler diagnostics.

use diet_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder, SourceLocation};

/// Collector for warnings recorded while compiling a template.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<DiagnosticMessage>,
}

impl DiagnosticCollector {
    /// Create a new empty diagnostic collector.
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    /// Add a diagnostic message.
    pub fn add(&mut self, diagnostic: DiagnosticMessage) {
        self.diagnostics.push(diagnostic);
    }

    /// Add a warning with an error code, problem statement and hint.
    ///
    /// The title comes from the error catalog entry for `code`.
    pub fn warn_with_code(
        &mut self,
        code: &str,
        problem: impl Into<String>,
        hint: Option<&str>,
        location: &SourceLocation,
    ) {
        let problem = problem.into();
        tracing::warn!(code, location = %location, "{}", problem);

        let title = diet_error_reporting::get_error_info(code)
            .map(|info| info.title.clone())
            .unwrap_or_else(|| "Warning".to_string());
        let mut builder = DiagnosticMessageBuilder::warning(title)
            .with_code(code)
            .problem(problem)
            .with_location(location.clone());
        if let Some(hint) = hint {
            builder = builder.add_hint(hint);
        }
        self.add(builder.build());
    }

    /// Consume the collector and return the diagnostics in recording order.
    pub fn into_diagnostics(self) -> Vec<DiagnosticMessage> {
        self.diagnostics
    }
}
