/*
 * runtime.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Helpers used while rendering, by both the interpreter and generated code.

use crate::context::TemplateValue;
use std::fmt::Display;

/// Escape `&`, `<` and `>` for HTML text content.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

/// Escape text for a double-quoted attribute value.
pub fn escape_attribute(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

/// How a dynamic attribute value is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    /// `true` renders the bare attribute, `false` omits it.
    Bool(bool),
    Text(String),
    /// Space-separated list, typically CSS classes.
    List(Vec<String>),
}

/// Values usable as dynamic attribute values.
pub trait AttributeValue {
    fn to_attribute(&self) -> AttributeKind;
}

impl AttributeValue for bool {
    fn to_attribute(&self) -> AttributeKind {
        AttributeKind::Bool(*self)
    }
}

impl AttributeValue for str {
    fn to_attribute(&self) -> AttributeKind {
        AttributeKind::Text(self.to_string())
    }
}

impl AttributeValue for String {
    fn to_attribute(&self) -> AttributeKind {
        AttributeKind::Text(self.clone())
    }
}

impl AttributeValue for [String] {
    fn to_attribute(&self) -> AttributeKind {
        AttributeKind::List(self.to_vec())
    }
}

impl AttributeValue for Vec<String> {
    fn to_attribute(&self) -> AttributeKind {
        AttributeKind::List(self.clone())
    }
}

impl AttributeValue for [&str] {
    fn to_attribute(&self) -> AttributeKind {
        AttributeKind::List(self.iter().map(|s| s.to_string()).collect())
    }
}

macro_rules! numeric_attribute_value {
    ($($t:ty),*) => {
        $(
            impl AttributeValue for $t {
                fn to_attribute(&self) -> AttributeKind {
                    AttributeKind::Text(self.to_string())
                }
            }
        )*
    };
}

numeric_attribute_value!(i32, i64, u32, u64, usize, f32, f64);

impl<T: AttributeValue> AttributeValue for Option<T> {
    fn to_attribute(&self) -> AttributeKind {
        match self {
            Some(value) => value.to_attribute(),
            None => AttributeKind::Bool(false),
        }
    }
}

impl<T: AttributeValue + ?Sized> AttributeValue for &T {
    fn to_attribute(&self) -> AttributeKind {
        (**self).to_attribute()
    }
}

impl AttributeValue for TemplateValue {
    fn to_attribute(&self) -> AttributeKind {
        match self {
            TemplateValue::Bool(b) => AttributeKind::Bool(*b),
            TemplateValue::Null => AttributeKind::Bool(false),
            TemplateValue::List(items) => {
                AttributeKind::List(items.iter().map(|v| v.render()).collect())
            }
            other => AttributeKind::Text(other.render()),
        }
    }
}

/// Append `value` HTML-escaped.
pub fn write_escaped(out: &mut String, value: impl Display) {
    out.push_str(&escape_html(&value.to_string()));
}

/// Append `value` unescaped.
pub fn write_raw(out: &mut String, value: impl Display) {
    out.push_str(&value.to_string());
}

/// Append ` name="value"` for a dynamic attribute.
///
/// `extra_classes` are shorthand `.class` names appended after the value of
/// a `class` attribute. Booleans follow HTML rules: `false` omits the
/// attribute, `true` renders ` name` in HTML5 mode and ` name="name"`
/// otherwise.
pub fn write_attribute<V: AttributeValue + ?Sized>(
    out: &mut String,
    name: &str,
    value: &V,
    extra_classes: Option<&str>,
    html5: bool,
) {
    let text = match value.to_attribute() {
        AttributeKind::Bool(false) => match extra_classes {
            Some(extra) => extra.to_string(),
            None => return,
        },
        AttributeKind::Bool(true) if extra_classes.is_none() => {
            out.push(' ');
            out.push_str(name);
            if !html5 {
                out.push_str("=\"");
                out.push_str(name);
                out.push('"');
            }
            return;
        }
        AttributeKind::Bool(true) => join_classes(name, extra_classes),
        AttributeKind::Text(text) => join_classes(&text, extra_classes),
        AttributeKind::List(items) => join_classes(&items.join(" "), extra_classes),
    };
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape_attribute(&text));
    out.push('"');
}

fn join_classes(value: &str, extra_classes: Option<&str>) -> String {
    match extra_classes {
        Some(extra) if value.is_empty() => extra.to_string(),
        Some(extra) => format!("{} {}", value, extra),
        None => value.to_string(),
    }
}
