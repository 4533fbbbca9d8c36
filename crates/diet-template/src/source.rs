/*
 * source.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Source loading and line normalization.
//!
//! Template files are split into non-blank [`Line`] records. Blank lines are
//! dropped entirely, so line numbers are not contiguous.

use crate::error::{TemplateError, TemplateResult};
use diet_error_reporting::SourceLocation;

/// A single non-blank template line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Name of the file the line came from.
    pub file: String,
    /// 1-based line number within the file.
    pub number: usize,
    /// Line text without its terminator.
    pub text: String,
}

impl Line {
    pub fn new(file: impl Into<String>, number: usize, text: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            number,
            text: text.into(),
        }
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.file.clone(), self.number)
    }
}

/// Split `content` into non-blank lines, stripping a UTF-8 BOM.
pub fn load_lines(file: &str, content: &str) -> Vec<Line> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    content
        .split('\n')
        .enumerate()
        .filter_map(|(index, raw)| {
            let text = raw.strip_suffix('\r').unwrap_or(raw);
            if text.trim().is_empty() {
                None
            } else {
                Some(Line::new(file, index + 1, text))
            }
        })
        .collect()
}

/// Detect the indentation unit from the first indented line.
///
/// Returns `"\t"` if that line starts with a tab (or no line is indented),
/// otherwise the exact run of leading spaces.
pub fn detect_indent_style(lines: &[Line]) -> String {
    for line in lines {
        if line.text.starts_with('\t') {
            return "\t".to_string();
        }
        let spaces = line.text.len() - line.text.trim_start_matches(' ').len();
        if spaces > 0 {
            return " ".repeat(spaces);
        }
    }
    "\t".to_string()
}

/// Number of whole indentation units at the start of `text`.
///
/// Trailing partial units are ignored; this is used for raw text content
/// where extra leading whitespace is part of the content.
pub fn indent_level(text: &str, unit: &str) -> usize {
    if unit.is_empty() {
        return 0;
    }
    let mut level = 0;
    let mut rest = text;
    while let Some(stripped) = rest.strip_prefix(unit) {
        level += 1;
        rest = stripped;
    }
    level
}

/// Indentation level of `line`, failing if its leading whitespace is not an
/// exact multiple of `unit`.
pub fn strict_indent_level(line: &Line, unit: &str) -> TemplateResult<usize> {
    let level = indent_level(&line.text, unit);
    let rest = &line.text[level * unit.len()..];
    match rest.chars().next() {
        Some(c) if c == ' ' || c == '\t' => {
            let expected = if unit == "\t" {
                "a tab".to_string()
            } else {
                format!("{} spaces", unit.len())
            };
            Err(TemplateError::indentation(
                format!(
                    "leading whitespace is not a multiple of the file's indentation unit ({})",
                    expected
                ),
                &line.location(),
            ))
        }
        _ => Ok(level),
    }
}

/// Strip `levels` indentation units from the start of `text`.
///
/// Stops early if the text has fewer units.
pub fn unindent(text: &str, unit: &str, levels: usize) -> String {
    let mut rest = text;
    for _ in 0..levels {
        match rest.strip_prefix(unit) {
            Some(stripped) => rest = stripped,
            None => break,
        }
    }
    rest.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(content: &str) -> Vec<Line> {
        load_lines("test.dt", content)
    }

    #[test]
    fn test_load_lines_drops_blank_lines() {
        let result = lines("html\n\n  \n\tbody\r\n");
        assert_eq!(
            result,
            vec![Line::new("test.dt", 1, "html"), Line::new("test.dt", 4, "\tbody")]
        );
    }

    #[test]
    fn test_load_lines_strips_bom() {
        let result = lines("\u{feff}p Hello");
        assert_eq!(result[0].text, "p Hello");
        assert_eq!(result[0].number, 1);
    }

    #[test]
    fn test_detect_indent_tab() {
        assert_eq!(detect_indent_style(&lines("html\n\tbody\n    p")), "\t");
    }

    #[test]
    fn test_detect_indent_spaces() {
        assert_eq!(detect_indent_style(&lines("html\n  body\n    p")), "  ");
        assert_eq!(detect_indent_style(&lines("html\n    body")), "    ");
    }

    #[test]
    fn test_detect_indent_default() {
        assert_eq!(detect_indent_style(&lines("html\nbody")), "\t");
        assert_eq!(detect_indent_style(&[]), "\t");
    }

    #[test]
    fn test_indent_level() {
        assert_eq!(indent_level("\t\tp", "\t"), 2);
        assert_eq!(indent_level("     p", "  "), 2);
        assert_eq!(indent_level("p", "  "), 0);
    }

    #[test]
    fn test_strict_indent_level() {
        let unit = "  ";
        assert_eq!(strict_indent_level(&Line::new("a.dt", 1, "    p"), unit).unwrap(), 2);

        let err = strict_indent_level(&Line::new("a.dt", 2, "   p"), unit).unwrap_err();
        assert!(matches!(err, TemplateError::MalformedIndentation { .. }));
        assert_eq!(err.location().map(|l| l.line), Some(2));

        let err = strict_indent_level(&Line::new("a.dt", 3, "\tp"), unit).unwrap_err();
        assert!(matches!(err, TemplateError::MalformedIndentation { .. }));
    }

    #[test]
    fn test_unindent() {
        assert_eq!(unindent("\t\t\tcode", "\t", 2), "\tcode");
        assert_eq!(unindent("\tcode", "\t", 3), "code");
    }
}
