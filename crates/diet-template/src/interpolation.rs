/*
 * interpolation.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Text interpolation and string-literal escaping.
//!
//! Literal text may embed expressions as `#{expr}` (HTML-escaped) or
//! `!{expr}` (inserted raw). [`scan`] splits a text span into [`Fragment`]s
//! lazily, borrowing from the input.

use thiserror::Error;

/// One piece of an interpolated text span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment<'a> {
    /// Literal text, emitted as-is.
    Literal(&'a str),
    /// Host expression; `escaped` is true for `#{}` and false for `!{}`.
    Expr { code: &'a str, escaped: bool },
}

/// An `#{`/`!{` span without a matching close brace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unterminated interpolation starting at byte {offset}")]
pub struct UnterminatedInterpolation {
    /// Byte offset of the `#` or `!` that opened the span.
    pub offset: usize,
}

/// Cheap check for whether `text` may contain interpolations.
pub fn has_interpolation(text: &str) -> bool {
    text.contains("#{") || text.contains("!{")
}

/// Split `text` into literal and expression fragments.
///
/// `\#` and `\!` produce a literal `#`/`!`; other backslash pairs are kept
/// literally. Expression spans are matched by brace depth. After an
/// unterminated span is reported the iterator is exhausted.
pub fn scan(text: &str) -> Fragments<'_> {
    Fragments { text, pos: 0 }
}

/// Iterator returned by [`scan`].
#[derive(Debug, Clone)]
pub struct Fragments<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Iterator for Fragments<'a> {
    type Item = Result<Fragment<'a>, UnterminatedInterpolation>;

    fn next(&mut self) -> Option<Self::Item> {
        let text = self.text;
        let bytes = text.as_bytes();
        let len = bytes.len();
        if self.pos >= len {
            return None;
        }

        let mut start = self.pos;
        let mut i = self.pos;
        while i < len {
            let next = bytes.get(i + 1).copied();
            match bytes[i] {
                b'\\' if matches!(next, Some(b'#') | Some(b'!')) => {
                    if i > start {
                        self.pos = i;
                        return Some(Ok(Fragment::Literal(&text[start..i])));
                    }
                    // drop the backslash, keep the sigil as literal text
                    start = i + 1;
                    i += 2;
                }
                b'\\' if next.is_some() => i += 2,
                b'#' | b'!' if next == Some(b'{') => {
                    if i > start {
                        self.pos = i;
                        return Some(Ok(Fragment::Literal(&text[start..i])));
                    }
                    let escaped = bytes[i] == b'#';
                    return match matching_brace(bytes, i + 2) {
                        Some(close) => {
                            self.pos = close + 1;
                            Some(Ok(Fragment::Expr {
                                code: &text[i + 2..close],
                                escaped,
                            }))
                        }
                        None => {
                            self.pos = len;
                            Some(Err(UnterminatedInterpolation { offset: i }))
                        }
                    };
                }
                _ => i += 1,
            }
        }

        self.pos = len;
        Some(Ok(Fragment::Literal(&text[start..len])))
    }
}

/// Index of the `}` closing a span whose content starts at `from`.
fn matching_brace(bytes: &[u8], from: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (offset, &b) in bytes.iter().enumerate().skip(from) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Escape `text` for use inside a double-quoted string literal.
///
/// Covers `\r`, `\n`, `\t`, backslash and double quote.
pub fn dstring_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out
}

/// Decode the escapes produced by [`dstring_escape`].
///
/// An unrecognized escape yields the escaped character; a trailing lone
/// backslash is kept.
pub fn dstring_unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
