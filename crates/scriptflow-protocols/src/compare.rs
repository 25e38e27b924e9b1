//! Cross-type semantic comparison shared by every equality and containment
//! pipe.
//!
//! - Strings compare case-, diacritic- and whitespace-insensitively.
//! - Objects compare by deep key/value equality, arrays element-wise in order.
//! - Other scalars are coerced to strings and compared by the string rule.

use std::borrow::Cow;

use serde_json::Value;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercase, strip diacritics and drop all whitespace.
pub fn normalize_str(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c) && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn str_equals(a: &str, b: &str) -> bool {
    normalize_str(a) == normalize_str(b)
}

pub fn str_contains(haystack: &str, needle: &str) -> bool {
    normalize_str(haystack).contains(&normalize_str(needle))
}

/// Semantic equality of two JSON values. Symmetric.
pub fn any_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| any_equals(v, w)))
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(v, w)| any_equals(v, w))
        }
        (Value::Object(_) | Value::Array(_), _) | (_, Value::Object(_) | Value::Array(_)) => false,
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => str_equals(&coerce_str(a), &coerce_str(b)),
    }
}

/// Whether `haystack` contains `needle`.
///
/// Arrays contain any equal item; objects contain a sub-object whose keys all
/// match, or any equal property value; scalars use substring containment.
pub fn any_contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Array(items) => items.iter().any(|item| any_equals(item, needle)),
        Value::Object(map) => match needle {
            Value::Object(sub) => sub
                .iter()
                .all(|(k, v)| map.get(k).is_some_and(|w| any_equals(w, v))),
            _ => map.values().any(|w| any_equals(w, needle)),
        },
        _ => match needle {
            Value::Object(_) | Value::Array(_) => false,
            _ => str_contains(&coerce_str(haystack), &coerce_str(needle)),
        },
    }
}

/// String form of a scalar. Integral floats print without a fraction so
/// that `1.0` and `"1"` compare equal.
pub fn coerce_str(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        Value::Null => Cow::Borrowed(""),
        Value::Bool(b) => Cow::Owned(b.to_string()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
                Cow::Owned((f as i64).to_string())
            }
            _ => Cow::Owned(n.to_string()),
        },
        other => Cow::Owned(other.to_string()),
    }
}

#[cfg(test)]
#[path = "compare_tests.rs"]
mod tests;
