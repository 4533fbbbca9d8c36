/*
 * location.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Source locations for template diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// A position in a template source file.
///
/// Template diagnostics are line-oriented: the compiler works on whole lines,
/// so a location is the file name plus a 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// File name as given to the loader (e.g. `"layout.dt"`).
    pub file: String,
    /// 1-based line number.
    pub line: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Byte range of this location's line within `source`, excluding the
    /// line terminator.
    ///
    /// Returns `None` if the file has fewer lines than `self.line`.
    pub fn line_span(&self, source: &str) -> Option<Range<usize>> {
        if self.line == 0 {
            return None;
        }
        let mut offset = 0;
        for (index, chunk) in source.split_inclusive('\n').enumerate() {
            if index + 1 == self.line {
                let text = chunk.trim_end_matches('\n').trim_end_matches('\r');
                return Some(offset..offset + text.len());
            }
            offset += chunk.len();
        }
        None
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let loc = SourceLocation::new("index.dt", 12);
        assert_eq!(loc.to_string(), "index.dt:12");
    }

    #[test]
    fn test_line_span() {
        let source = "html\n\tbody\r\n\t\tp Hello\n";
        let loc = SourceLocation::new("index.dt", 2);
        let span = loc.line_span(source).unwrap();
        assert_eq!(&source[span], "\tbody");

        let loc = SourceLocation::new("index.dt", 3);
        let span = loc.line_span(source).unwrap();
        assert_eq!(&source[span], "\t\tp Hello");
    }

    #[test]
    fn test_line_span_out_of_range() {
        assert!(SourceLocation::new("a.dt", 5).line_span("one\ntwo").is_none());
        assert!(SourceLocation::new("a.dt", 0).line_span("one").is_none());
    }
}
