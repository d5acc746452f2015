//! Class and style value normalisation for interpolated attributes.

use crate::value::Value;

/// Reduce a class value to a space separated list.
///
/// Strings pass through, arrays are flattened keeping truthy entries, and
/// objects contribute the keys whose values are truthy.
pub fn normalize_class(value: &Value) -> String {
    let mut names = Vec::new();
    collect_classes(value, &mut names);
    names.join(" ")
}

fn collect_classes(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            if !s.trim().is_empty() {
                out.push(s.trim().to_string());
            }
        }
        Value::Array(items) => {
            for item in items.to_vec().iter().filter(|v| v.truthy()) {
                collect_classes(item, out);
            }
        }
        Value::Object(obj) => {
            out.extend(
                obj.entries()
                    .into_iter()
                    .filter(|(_, v)| v.truthy())
                    .map(|(k, _)| k),
            );
        }
        Value::Number(_) => out.push(value.to_display()),
        _ => {}
    }
}

/// Reduce a style value to `name:value` declarations joined by `;`.
///
/// Object keys in camelCase are written in kebab-case; nullish and `false`
/// values are dropped.
pub fn normalize_style(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_string(),
        Value::Object(obj) => obj
            .entries()
            .into_iter()
            .filter(|(_, v)| !v.is_nullish() && !matches!(v, Value::Bool(false)))
            .map(|(k, v)| format!("{}:{}", kebab_case(&k), v.to_display()))
            .collect::<Vec<_>>()
            .join(";"),
        Value::Array(items) => items
            .to_vec()
            .iter()
            .map(normalize_style)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(";"),
        _ => String::new(),
    }
}

/// Collapse whitespace runs in a rendered class list
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop surrounding whitespace and trailing separators from a rendered style
pub fn trim_style(text: &str) -> &str {
    text.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace())
}

fn kebab_case(name: &str) -> String {
    if name.starts_with("--") {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
