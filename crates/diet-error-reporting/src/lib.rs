/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error reporting and diagnostic messages for the Diet template compiler.
//!
//! The compiler reports fatal errors and collects non-fatal warnings. Both end
//! up as [`DiagnosticMessage`] values so a host can print them uniformly:
//!
//! - [`DiagnosticMessage`]: the message structure (title, problem, details, hints)
//! - [`DiagnosticMessageBuilder`]: tidyverse-style builder for messages
//! - [`SourceLocation`]: the `(file, line)` pair every template diagnostic carries
//! - [`catalog`]: stable error codes (`D-<subsystem>-<n>`) with their metadata
//!
//! # Example
//!
//! ```
//! use diet_error_reporting::{DiagnosticMessageBuilder, SourceLocation};
//!
//! let warning = DiagnosticMessageBuilder::warning("Deprecated script block")
//!     .with_code("D-7-2")
//!     .problem("Inline script content must use a trailing dot")
//!     .with_location(SourceLocation::new("layout.dt", 4))
//!     .add_hint("Write `script.` instead of `script`?")
//!     .build();
//!
//! let text = warning.to_text(None);
//! assert!(text.contains("Warning [D-7-2]: Deprecated script block"));
//! assert!(text.contains("layout.dt:4"));
//! ```

pub mod builder;
pub mod catalog;
pub mod diagnostic;
pub mod location;

pub use builder::DiagnosticMessageBuilder;
pub use catalog::{ERROR_CATALOG, ErrorCodeInfo, get_error_info, get_subsystem};
pub use diagnostic::{DetailItem, DetailKind, DiagnosticKind, DiagnosticMessage, MessageContent};
pub use location::SourceLocation;
