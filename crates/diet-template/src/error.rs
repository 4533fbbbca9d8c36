/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template compilation and rendering.

use diet_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder, SourceLocation};
use thiserror::Error;

/// Errors that can occur during template operations.
///
/// Compilation is fail-fast: the first error aborts the compile and no
/// partial output is produced.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Inconsistent indentation, or a line indented more than one level.
    #[error("{location}: malformed indentation: {message}")]
    MalformedIndentation {
        message: String,
        location: SourceLocation,
    },

    /// Malformed tag, attribute or interpolation syntax.
    #[error("{location}: syntax error: {message}")]
    Syntax {
        message: String,
        location: SourceLocation,
    },

    /// A template, block or filter that could not be found.
    #[error("{location}: unresolved reference: {message}")]
    UnresolvedReference {
        message: String,
        location: SourceLocation,
    },

    /// A recognized construct this compiler does not implement.
    #[error("{location}: unsupported: {message}")]
    UnsupportedFeature {
        message: String,
        location: SourceLocation,
    },

    /// Failure while rendering a compiled template.
    #[error("render error{}: {message}", format_location(.location))]
    Render {
        message: String,
        location: Option<SourceLocation>,
    },

    /// Invalid compiler configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O error (e.g., reading a template file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_location(location: &Option<SourceLocation>) -> String {
    match location {
        Some(location) => format!(" at {}", location),
        None => String::new(),
    }
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

impl TemplateError {
    pub(crate) fn indentation(message: impl Into<String>, location: &SourceLocation) -> Self {
        TemplateError::MalformedIndentation {
            message: message.into(),
            location: location.clone(),
        }
    }

    pub(crate) fn syntax(message: impl Into<String>, location: &SourceLocation) -> Self {
        TemplateError::Syntax {
            message: message.into(),
            location: location.clone(),
        }
    }

    pub(crate) fn unresolved(message: impl Into<String>, location: &SourceLocation) -> Self {
        TemplateError::UnresolvedReference {
            message: message.into(),
            location: location.clone(),
        }
    }

    pub(crate) fn unsupported(message: impl Into<String>, location: &SourceLocation) -> Self {
        TemplateError::UnsupportedFeature {
            message: message.into(),
            location: location.clone(),
        }
    }

    /// Create a render error without a location.
    pub fn render(message: impl Into<String>) -> Self {
        TemplateError::Render {
            message: message.into(),
            location: None,
        }
    }

    /// Attach a location to a render error that has none.
    ///
    /// Other variants are returned unchanged.
    pub fn with_location(self, location: &SourceLocation) -> Self {
        match self {
            TemplateError::Render {
                message,
                location: None,
            } => TemplateError::Render {
                message,
                location: Some(location.clone()),
            },
            other => other,
        }
    }

    /// The template location this error refers to, if any.
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            TemplateError::MalformedIndentation { location, .. }
            | TemplateError::Syntax { location, .. }
            | TemplateError::UnresolvedReference { location, .. }
            | TemplateError::UnsupportedFeature { location, .. } => Some(location),
            TemplateError::Render { location, .. } => location.as_ref(),
            TemplateError::Config(_) | TemplateError::Io(_) => None,
        }
    }

    /// Stable catalog code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            TemplateError::MalformedIndentation { .. } => "D-1-1",
            TemplateError::Syntax { .. } => "D-2-1",
            TemplateError::UnresolvedReference { .. } => "D-3-1",
            TemplateError::UnsupportedFeature { .. } => "D-4-1",
            TemplateError::Render { .. } => "D-5-1",
            TemplateError::Config(_) => "D-6-1",
            TemplateError::Io(_) => "D-6-2",
        }
    }

    /// Convert this error into a structured diagnostic.
    pub fn to_diagnostic(&self) -> DiagnosticMessage {
        let code = self.code();
        let title = diet_error_reporting::get_error_info(code)
            .map(|info| info.title.clone())
            .unwrap_or_else(|| "Template Error".to_string());

        let problem = match self {
            TemplateError::MalformedIndentation { message, .. }
            | TemplateError::Syntax { message, .. }
            | TemplateError::UnresolvedReference { message, .. }
            | TemplateError::UnsupportedFeature { message, .. }
            | TemplateError::Render { message, .. } => message.clone(),
            TemplateError::Config(e) => e.to_string(),
            TemplateError::Io(e) => e.to_string(),
        };

        let mut builder = DiagnosticMessageBuilder::error(title)
            .with_code(code)
            .problem(problem);
        if let Some(location) = self.location() {
            builder = builder.with_location(location.clone());
        }
        builder.build()
    }
}
