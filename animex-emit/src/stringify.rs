//! Compact structural stringification
//!
//! Produces JSON-like text with identifier keys left unquoted, so the result
//! can be pasted straight into a script.

use animex_core::frame::format_number;
use serde_json::Value;

/// Stringifies a value without whitespace, leaving safe object keys unquoted
pub fn stringify_simple(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => match n.as_f64() {
            Some(f) => out.push_str(&format_number(f)),
            None => out.push_str(&n.to_string()),
        },
        Value::String(s) => out.push_str(&quote(s)),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                if is_bare_key(key) {
                    out.push_str(key);
                } else {
                    out.push_str(&quote(key));
                }
                out.push(':');
                write_value(out, item);
            }
            out.push('}');
        }
    }
}

/// Quotes a string the way JSON does
pub fn quote(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

fn is_bare_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => key.bytes().all(|b| b.is_ascii_digit()),
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    }
}
