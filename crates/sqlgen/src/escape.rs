//! SQL literal and identifier escaping (MySQL dialect).
//!
//! - Strings are single-quoted; `NUL`, `\`, `\n`, `\r`, `Ctrl-Z`, `'` and `"` are
//!   backslash-escaped.
//! - Identifiers are wrapped in backticks, with embedded backticks doubled.

use crate::error::{GenError, GenResult};
use crate::value::Value;
use std::fmt::Write as _;

/// Render a value as a SQL literal.
pub fn escape(value: &Value) -> String {
    let mut out = String::new();
    write_escaped(&mut out, value);
    out
}

/// Append the SQL literal for `value` to `out`.
pub fn write_escaped(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("NULL"),
        Value::Int(v) => {
            let _ = write!(out, "{v}");
        }
        Value::Str(s) => {
            out.reserve(s.len() + 2);
            out.push('\'');
            escape_str_into(out, s);
            out.push('\'');
        }
    }
}

fn escape_str_into(out: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '\0' => out.push_str("\\0"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{1a}' => out.push_str("\\Z"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
}

/// Quote an identifier with backticks.
pub fn quote_ident(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    write_ident(&mut out, name);
    out
}

pub(crate) fn write_ident(out: &mut String, name: &str) {
    out.push('`');
    for ch in name.chars() {
        if ch == '`' {
            out.push_str("``");
        } else {
            out.push(ch);
        }
    }
    out.push('`');
}

/// Reject identifiers that cannot be quoted.
pub(crate) fn validate_ident(name: &str) -> GenResult<()> {
    if name.is_empty() {
        return Err(GenError::config("Identifier cannot be empty"));
    }
    if name.contains('\0') {
        return Err(GenError::config(
            "Identifier cannot contain NUL character",
        ));
    }
    Ok(())
}
