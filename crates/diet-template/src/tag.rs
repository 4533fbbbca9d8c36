/*
 * tag.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Tag and attribute grammar.
//!
//! Parses the `tag#id.class(attr=value, ...)<>& text` form of an HTML tag
//! line into a [`ParsedTag`].

use crate::error::{TemplateError, TemplateResult};
use diet_error_reporting::SourceLocation;

/// Elements that never have content and render as `<tag .../>`.
pub const SINGULAR_TAGS: &[&str] = &[
    "area", "base", "basefont", "br", "col", "embed", "frame", "hr", "img", "input", "keygen",
    "link", "meta", "param", "source", "track", "wbr",
];

/// Pseudo-attribute carrying `.class` shorthand classes that must be merged
/// after an explicit `class=` value.
pub const EXTRA_CLASS_KEY: &str = "$class";

pub fn is_singular(name: &str) -> bool {
    SINGULAR_TAGS.contains(&name)
}

/// The value side of an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// Contents of a quoted literal, still in escaped string-literal form.
    Literal(String),
    /// Opaque host expression.
    Expr(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlAttribute {
    pub key: String,
    pub value: AttrValue,
}

impl HtmlAttribute {
    pub fn literal(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: AttrValue::Literal(value.into()),
        }
    }

    pub fn expr(key: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: AttrValue::Expr(code.into()),
        }
    }
}

/// Content following the tag on the same line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagText {
    None,
    /// Literal text, possibly with interpolations.
    Literal(String),
    /// `= expr`: HTML-escaped expression.
    Escaped(String),
    /// `!= expr`: raw expression.
    Raw(String),
}

/// A parsed tag line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTag {
    pub name: String,
    pub attributes: Vec<HtmlAttribute>,
    pub text: TagText,
    /// `<`: no line breaks between the tag and its content.
    pub suppress_inner: bool,
    /// `>`: no line breaks around the tag.
    pub suppress_outer: bool,
    /// Trailing `.`: child lines are literal text.
    pub block_text: bool,
    /// `&`: trailing text is subject to translation.
    pub translate: bool,
}

impl ParsedTag {
    pub fn is_singular(&self) -> bool {
        is_singular(&self.name)
    }

    pub fn attribute(&self, key: &str) -> Option<&AttrValue> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| &a.value)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ':' | '-' | '_')
}

/// Parse a tag line (without its indentation).
pub fn parse_tag(line: &str, location: &SourceLocation) -> TemplateResult<ParsedTag> {
    let mut cursor = Cursor::new(line);

    let name = if cursor.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
        cursor.take_while(is_name_char).to_string()
    } else {
        "div".to_string()
    };

    let mut attributes: Vec<HtmlAttribute> = Vec::new();
    let mut classes: Vec<String> = Vec::new();
    let mut has_shorthand_id = false;
    let mut block_text = false;

    loop {
        match cursor.peek() {
            Some('#') => {
                cursor.bump();
                let id = cursor.take_while(is_name_char);
                if id.is_empty() {
                    return Err(TemplateError::syntax("expected an id after '#'", location));
                }
                if has_shorthand_id || attributes.iter().any(|a| a.key == "id") {
                    return Err(TemplateError::syntax(
                        format!("tag '{}' has more than one id", name),
                        location,
                    ));
                }
                has_shorthand_id = true;
                attributes.push(HtmlAttribute::literal("id", id));
            }
            Some('.') => {
                cursor.bump();
                match cursor.peek() {
                    None | Some(' ') | Some('\t') => {
                        block_text = true;
                        break;
                    }
                    _ => {
                        let class = cursor.take_while(is_name_char);
                        if class.is_empty() {
                            return Err(TemplateError::syntax(
                                "expected a class name after '.'",
                                location,
                            ));
                        }
                        classes.push(class.to_string());
                    }
                }
            }
            Some('(') => {
                cursor.bump();
                for attribute in parse_attribute_list(&mut cursor, location)? {
                    if attribute.key == "id"
                        && (has_shorthand_id || attributes.iter().any(|a| a.key == "id"))
                    {
                        return Err(TemplateError::syntax(
                            format!("tag '{}' has more than one id", name),
                            location,
                        ));
                    }
                    if attribute.key == "class" && attribute.value == AttrValue::Literal(String::new()) {
                        continue;
                    }
                    attributes.push(attribute);
                }
            }
            _ => break,
        }
    }

    if !classes.is_empty() {
        let joined = classes.join(" ");
        if attributes.iter().any(|a| a.key == "class") {
            attributes.push(HtmlAttribute::literal(EXTRA_CLASS_KEY, joined));
        } else {
            attributes.push(HtmlAttribute::literal("class", joined));
        }
    }

    let mut suppress_inner = false;
    let mut suppress_outer = false;
    let mut translate = false;
    loop {
        match cursor.peek() {
            Some('<') => suppress_inner = true,
            Some('>') => suppress_outer = true,
            Some('&') => translate = true,
            _ => break,
        }
        cursor.bump();
    }

    let rest = cursor.rest();
    let text = if rest.is_empty() {
        TagText::None
    } else if let Some(code) = rest.strip_prefix("!=") {
        TagText::Raw(expression_text(code, location)?)
    } else if let Some(code) = rest.strip_prefix('=') {
        TagText::Escaped(expression_text(code, location)?)
    } else if let Some(text) = rest.strip_prefix(' ') {
        if block_text {
            if text.trim().is_empty() {
                TagText::None
            } else {
                return Err(TemplateError::syntax(
                    format!("block tag '{}.' can't have text on the same line", name),
                    location,
                ));
            }
        } else {
            TagText::Literal(text.to_string())
        }
    } else {
        return Err(TemplateError::syntax(
            format!("unexpected '{}' after tag '{}'", rest, name),
            location,
        ));
    };

    Ok(ParsedTag {
        name,
        attributes,
        text,
        suppress_inner,
        suppress_outer,
        block_text,
        translate,
    })
}

fn expression_text(code: &str, location: &SourceLocation) -> TemplateResult<String> {
    let code = code.trim();
    if code.is_empty() {
        Err(TemplateError::syntax("expected an expression after '='", location))
    } else {
        Ok(code.to_string())
    }
}

/// Parse `name[=value], ...)` with the cursor just past the `(`.
fn parse_attribute_list(
    cursor: &mut Cursor<'_>,
    location: &SourceLocation,
) -> TemplateResult<Vec<HtmlAttribute>> {
    let unterminated = || TemplateError::syntax("unterminated attribute list", location);
    let mut attributes = Vec::new();

    loop {
        cursor.skip_whitespace();
        match cursor.peek() {
            None => return Err(unterminated()),
            Some(')') => {
                cursor.bump();
                return Ok(attributes);
            }
            Some(',') => {
                cursor.bump();
                continue;
            }
            _ => {}
        }

        let key = cursor
            .take_while(|c| !matches!(c, '=' | ',' | ')' | ' ' | '\t'))
            .to_string();
        if key.is_empty() {
            return Err(TemplateError::syntax("expected an attribute name", location));
        }

        cursor.skip_whitespace();
        if cursor.peek() != Some('=') {
            attributes.push(HtmlAttribute::expr(key, "true"));
            continue;
        }
        cursor.bump();
        cursor.skip_whitespace();

        let value = match cursor.peek() {
            Some(quote @ ('"' | '\'')) => {
                cursor.bump();
                let inner = cursor.take_quoted(quote).ok_or_else(unterminated)?;
                AttrValue::Literal(if quote == '\'' {
                    normalize_single_quoted(inner)
                } else {
                    inner.to_string()
                })
            }
            Some(_) => {
                let code = cursor.take_expression().ok_or_else(unterminated)?.trim();
                if code.is_empty() {
                    return Err(TemplateError::syntax(
                        format!("attribute '{}' has an empty value", key),
                        location,
                    ));
                }
                AttrValue::Expr(code.to_string())
            }
            None => return Err(unterminated()),
        };
        attributes.push(HtmlAttribute { key, value });
    }
}

/// Rewrite the contents of a single-quoted literal as double-quoted contents.
fn normalize_single_quoted(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\'') => out.push('\''),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            },
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.text[start..self.pos]
    }

    fn skip_whitespace(&mut self) {
        self.take_while(|c| c == ' ' || c == '\t');
    }

    /// Read up to the closing `quote`, honoring backslash escapes, and
    /// consume the quote. The cursor is just past the opening quote.
    fn take_quoted(&mut self, quote: char) -> Option<&'a str> {
        let start = self.pos;
        let mut escaped = false;
        while let Some(c) = self.peek() {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                let inner = &self.text[start..self.pos];
                self.bump();
                return Some(inner);
            }
            self.bump();
        }
        None
    }

    /// Read an expression up to the next top-level `,` or `)`, balancing
    /// brackets and skipping quoted strings. The terminator is not consumed.
    fn take_expression(&mut self) -> Option<&'a str> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            match c {
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' if depth > 0 => depth -= 1,
                ',' | ')' if depth == 0 => return Some(&self.text[start..self.pos]),
                '"' | '\'' | '`' => {
                    self.bump();
                    self.take_quoted(c)?;
                    continue;
                }
                _ => {}
            }
            self.bump();
        }
        None
    }
}
