/*
 * builder.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Builder API for diagnostic messages.
//!
//! The builder encodes the tidyverse message structure (title, problem,
//! details, hints) so compiler errors and warnings read the same way.

use crate::diagnostic::{DetailItem, DetailKind, DiagnosticKind, DiagnosticMessage, MessageContent};
use crate::location::SourceLocation;

/// Builder for creating diagnostic messages following tidyverse guidelines.
///
/// # Example
///
/// ```
/// use diet_error_reporting::{DiagnosticMessageBuilder, SourceLocation};
///
/// let error = DiagnosticMessageBuilder::error("Malformed indentation")
///     .with_code("D-1-1")
///     .problem("Lines can't be indented by more than one level")
///     .add_detail("Line 4 is indented by two levels")
///     .with_location(SourceLocation::new("index.dt", 4))
///     .add_hint("Remove one level of indentation?")
///     .build();
///
/// assert_eq!(error.title, "Malformed indentation");
/// assert_eq!(error.code, Some("D-1-1".to_string()));
/// assert!(error.problem.is_some());
/// assert_eq!(error.details.len(), 1);
/// assert_eq!(error.hints.len(), 1);
/// assert_eq!(error.location.unwrap().line, 4);
/// ```
#[derive(Debug, Clone)]
pub struct DiagnosticMessageBuilder {
    kind: DiagnosticKind,
    title: String,
    code: Option<String>,
    problem: Option<MessageContent>,
    details: Vec<DetailItem>,
    hints: Vec<MessageContent>,
    location: Option<SourceLocation>,
}

impl DiagnosticMessageBuilder {
    /// Create a new builder with the specified kind and title.
    ///
    /// Most code should use `.error()`, `.warning()`, or `.info()` instead.
    pub fn new(kind: DiagnosticKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            code: None,
            problem: None,
            details: Vec::new(),
            hints: Vec::new(),
            location: None,
        }
    }

    /// Create an error diagnostic builder.
    pub fn error(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Error, title)
    }

    /// Create a warning diagnostic builder.
    pub fn warning(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Warning, title)
    }

    /// Create an info diagnostic builder.
    pub fn info(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Info, title)
    }

    /// Set the error code (`D-<subsystem>-<number>`).
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Set the template location the message refers to.
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Set the problem statement.
    ///
    /// Use "must" for requirements or "can't" for impossibilities.
    pub fn problem(mut self, stmt: impl Into<MessageContent>) -> Self {
        self.problem = Some(stmt.into());
        self
    }

    /// Add an error detail (displayed with a cross bullet).
    pub fn add_detail(mut self, detail: impl Into<MessageContent>) -> Self {
        self.details.push(DetailItem {
            kind: DetailKind::Error,
            content: detail.into(),
        });
        self
    }

    /// Add an info detail (displayed with an info bullet).
    pub fn add_info(mut self, info: impl Into<MessageContent>) -> Self {
        self.details.push(DetailItem {
            kind: DetailKind::Info,
            content: info.into(),
        });
        self
    }

    /// Add a note detail (displayed with a plain bullet).
    pub fn add_note(mut self, note: impl Into<MessageContent>) -> Self {
        self.details.push(DetailItem {
            kind: DetailKind::Note,
            content: note.into(),
        });
        self
    }

    /// Add a hint for fixing the problem. Hints suggesting an action end with `?`.
    pub fn add_hint(mut self, hint: impl Into<MessageContent>) -> Self {
        self.hints.push(hint.into());
        self
    }

    /// Build the diagnostic message.
    pub fn build(self) -> DiagnosticMessage {
        DiagnosticMessage {
            code: self.code,
            title: self.title,
            kind: self.kind,
            problem: self.problem,
            details: self.details,
            hints: self.hints,
            location: self.location,
        }
    }

    /// Build, returning structural warnings alongside the message.
    ///
    /// Warns when the problem statement is missing or there are more than
    /// five details. An empty Vec means validation passed.
    ///
    /// ```
    /// use diet_error_reporting::DiagnosticMessageBuilder;
    ///
    /// let (_error, warnings) = DiagnosticMessageBuilder::error("Test error")
    ///     .build_with_validation();
    /// assert!(!warnings.is_empty());
    /// ```
    pub fn build_with_validation(self) -> (DiagnosticMessage, Vec<String>) {
        let mut warnings = Vec::new();

        if self.problem.is_none() {
            warnings.push(
                "Error message missing problem statement. \
                Consider adding .problem() to explain what went wrong."
                    .to_string(),
            );
        }

        if self.details.len() > 5 {
            warnings.push(format!(
                "Error message has {} details. Tidyverse guidelines recommend max 5 to avoid \
                overwhelming users.",
                self.details.len()
            ));
        }

        (self.build(), warnings)
    }
}
