//! Shared text formatting for the Lua backend.
//!
//! Everything here is pure string-in string-out: identifier and operator
//! sanitization, literal formatting by pin kind, variable-default
//! rendering, indentation, and the label/name allocators the generator
//! leans on. Behaviors reach these through their context rather than
//! importing them directly.

use std::collections::HashSet;

use serde_json::Value;

use crate::graph::types::PinKind;

/// Table defaults longer than this render multi-line.
const SINGLE_LINE_LIMIT: usize = 60;

/// Two spaces per indent level.
pub fn indent(level: usize) -> String {
    "  ".repeat(level)
}

/// Reduce arbitrary display text to a valid bare Lua identifier.
///
/// Trims, collapses every run of non-alphanumeric characters to a single
/// underscore, lower-cases, substitutes `var` for an empty result, and
/// prefixes an underscore when the result would start with a digit.
pub fn sanitize_identifier(raw: &str) -> String {
    let mut out = String::new();
    let mut in_gap = false;
    for ch in raw.trim().chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch.to_ascii_lowercase());
            in_gap = false;
        } else if !in_gap {
            out.push('_');
            in_gap = true;
        }
    }
    if out.is_empty() {
        return "var".to_string();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Restrict a comparison operator to the Lua set.
///
/// `!=` is respelled as `~=`; anything unrecognized collapses to `==`.
pub fn sanitize_operator(raw: &str) -> &'static str {
    match raw.trim() {
        "==" => "==",
        "~=" | "!=" => "~=",
        "<" => "<",
        "<=" => "<=",
        ">" => ">",
        ">=" => ">=",
        _ => "==",
    }
}

/// Format a stored JSON value as a Lua literal of the given pin kind.
pub fn format_literal(value: &Value, kind: PinKind) -> String {
    match kind {
        PinKind::Number => format_number(coerce_number(value)),
        PinKind::Boolean => {
            if coerce_boolean(value) {
                "true".to_string()
            } else {
                "false".to_string()
            }
        }
        PinKind::Table => format_table_literal(value),
        PinKind::String => quote_string(&coerce_string(value)),
        PinKind::Any | PinKind::Exec => format_untyped(value),
    }
}

/// Format a global variable's default value per its declared type.
///
/// Scalars go through [`format_literal`]; tables additionally accept a
/// structured JSON default, rendered as a `{key = value, ...}`
/// constructor (or bare values for arrays), single-line while it fits
/// and multi-line otherwise.
pub fn format_variable_default(value: &Value, kind: PinKind) -> String {
    if kind != PinKind::Table {
        return format_literal(value, kind);
    }
    match value {
        Value::Object(map) => {
            let fragments: Vec<String> = map
                .iter()
                .map(|(key, v)| format!("{} = {}", key, format_fragment(v)))
                .collect();
            wrap_table(&fragments)
        }
        Value::Array(items) => {
            let fragments: Vec<String> = items.iter().map(format_fragment).collect();
            wrap_table(&fragments)
        }
        _ => format_table_literal(value),
    }
}

fn wrap_table(fragments: &[String]) -> String {
    if fragments.is_empty() {
        return "{}".to_string();
    }
    let single = format!("{{{}}}", fragments.join(", "));
    if single.len() <= SINGLE_LINE_LIMIT {
        return single;
    }
    let mut out = String::from("{\n");
    for (i, fragment) in fragments.iter().enumerate() {
        out.push_str("  ");
        out.push_str(fragment);
        if i + 1 < fragments.len() {
            out.push(',');
        }
        out.push('\n');
    }
    out.push('}');
    out
}

fn format_fragment(value: &Value) -> String {
    match value {
        Value::Null => "nil".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(_) => format_number(coerce_number(value)),
        Value::String(s) => quote_string(s),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(format_fragment).collect();
            format!("{{{}}}", inner.join(", "))
        }
        Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(key, v)| format!("{} = {}", key, format_fragment(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

fn coerce_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

fn format_number(n: f64) -> String {
    if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn coerce_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty() && s != "false",
        Value::Number(n) => n.as_f64().unwrap_or(0.0) != 0.0,
        Value::Null => false,
        _ => true,
    }
}

fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(_) => format_number(coerce_number(value)),
        other => other.to_string(),
    }
}

fn format_table_literal(value: &Value) -> String {
    if let Value::String(s) = value {
        let trimmed = s.trim();
        if trimmed.starts_with('{') && trimmed.ends_with('}') {
            return trimmed.to_string();
        }
    }
    "{}".to_string()
}

fn format_untyped(value: &Value) -> String {
    match value {
        Value::Null => "nil".to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "nil".to_string()),
    }
}

fn quote_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Positional label for sequence branches: A, B, ... Z, AA, AB, ...
pub fn sequence_label(index: usize) -> String {
    let mut n = index;
    let mut label = String::new();
    loop {
        label.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    label
}

/// Claim `base` if free, else the first free `base_2`, `base_3`, ...
pub fn allocate_unique(base: &str, used: &mut HashSet<String>) -> String {
    if used.insert(base.to_string()) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}_{}", base, n);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
