//! Order-independent text encoding of JSON-like values.
//!
//! The encoding is the checksum input used by multisig transaction-builder
//! tooling. It is deliberately not JSON: every object is written as the JSON
//! array of its sorted keys followed by each value and a trailing comma, so
//! `{"b":1,"a":2}` encodes as `{["a","b"]2,1,}` regardless of how the map was
//! populated.
//!
//! Scalars are written exactly as a JavaScript `JSON.stringify` would write
//! them, because the other side of the checksum is a JavaScript verifier:
//!
//! * numbers follow the ECMAScript Number-to-String rules (`1.0` is `1`,
//!   `1e21` is `1e+21`), and integers beyond 2^53 are written as the double a
//!   JavaScript engine would hold;
//! * object keys are ordered by UTF-16 code units, the default ordering of
//!   `Array.prototype.sort`;
//! * absent values inside a present field (`Option::None` serialized without
//!   `skip_serializing_if`) surface as `null`, the same as an explicit null.

use crate::error::{IncentiveError, Result};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;

/// Deepest nesting accepted before the value is rejected as non-encodable.
pub const MAX_DEPTH: usize = 128;

const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Encodes `value` canonically.
pub fn canonical_string(value: &Value) -> Result<String> {
    let mut out = String::new();
    write_value(&mut out, value, 0)?;
    Ok(out)
}

/// Converts any serializable value into a [`Value`] and encodes it canonically.
///
/// Fails with [`IncentiveError::Serialization`] when the value has no JSON
/// form (for instance a map keyed by something other than strings).
pub fn canonicalize<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let value =
        serde_json::to_value(value).map_err(|err| IncentiveError::Serialization(err.to_string()))?;
    canonical_string(&value)
}

fn write_value(out: &mut String, value: &Value, depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(IncentiveError::Serialization(format!(
            "value nested deeper than {MAX_DEPTH} levels"
        )));
    }
    match value {
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_value(out, item, depth + 1)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let entries = sorted_entries(map);
            out.push_str("{[");
            for (idx, (key, _)) in entries.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_string(out, key);
            }
            out.push(']');
            for (_, item) in entries {
                write_value(out, item, depth + 1)?;
                out.push(',');
            }
            out.push('}');
        }
        Value::String(s) => write_string(out, s),
        Value::Number(n) => write_number(out, n),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Null => out.push_str("null"),
    }
    Ok(())
}

fn sorted_entries(map: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries = map.iter().collect::<Vec<_>>();
    entries.sort_by(|a, b| utf16_cmp(a.0, b.0));
    entries
}

fn utf16_cmp(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn write_number(out: &mut String, n: &Number) {
    if let Some(u) = n.as_u64() {
        if u <= MAX_SAFE_INTEGER {
            out.push_str(&u.to_string());
            return;
        }
    }
    if let Some(i) = n.as_i64() {
        if i.unsigned_abs() <= MAX_SAFE_INTEGER {
            out.push_str(&i.to_string());
            return;
        }
    }
    match n.as_f64() {
        Some(f) => out.push_str(&js_number(f)),
        None => out.push_str("null"),
    }
}

/// Formats a double the way ECMAScript `Number.prototype.toString` does.
fn js_number(value: f64) -> String {
    // JSON.stringify writes non-finite numbers as null.
    if !value.is_finite() {
        return "null".to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    // `{:e}` yields the shortest round-tripping digits, e.g. "1.2345e3".
    let sci = format!("{:e}", value.abs());
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits = mantissa.chars().filter(|c| *c != '.').collect::<String>();
    let exponent = exponent.parse::<i32>().unwrap_or(0);
    let k = digits.len() as i32;
    let n = exponent + 1;

    let body = if k <= n && n <= 21 {
        format!("{digits}{}", "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        format!("{int}.{frac}")
    } else if -6 < n && n <= 0 {
        format!("0.{}{digits}", "0".repeat((-n) as usize))
    } else {
        let e = n - 1;
        let exp_sign = if e >= 0 { '+' } else { '-' };
        let (head, tail) = digits.split_at(1);
        if tail.is_empty() {
            format!("{head}e{exp_sign}{}", e.abs())
        } else {
            format!("{head}.{tail}e{exp_sign}{}", e.abs())
        }
    };
    format!("{sign}{body}")
}
