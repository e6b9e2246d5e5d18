//! Request payload preprocessing
//!
//! Text typed on different platforms can reach us in different Unicode
//! normalization forms (macOS input methods commonly emit decomposed Hangul,
//! Windows composed). Every string leaving the client is converted to NFC so
//! equal text compares and stores identically on the server.

use serde_json::{Map, Value};
use unicode_normalization::UnicodeNormalization;

/// NFC-normalize every string in `value`, recursing through arrays and objects.
///
/// Object keys are left as they are.
pub fn normalize_payload(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.nfc().collect()),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_payload).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, normalize_payload(value)))
                .collect(),
        ),
        other => other,
    }
}

/// True for the empty string and strings made only of whitespace
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Map blank strings to `None`
pub fn empty_string_to_null(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !is_blank(s))
}

/// Replace blank direct string fields of `object` with `null`.
///
/// Nested objects and arrays are not visited.
pub fn empty_string_to_null_in_object(mut object: Map<String, Value>) -> Map<String, Value> {
    for value in object.values_mut() {
        if matches!(value, Value::String(s) if is_blank(s)) {
            *value = Value::Null;
        }
    }
    object
}

/// Prepare an outgoing JSON body: normalize all strings, then null out blank
/// top-level fields when the body is an object.
pub fn preprocess_body(body: Value) -> Value {
    match normalize_payload(body) {
        Value::Object(map) => Value::Object(empty_string_to_null_in_object(map)),
        other => other,
    }
}

/// Render a query parameter value; `None` means the parameter is omitted.
pub fn query_value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.nfc().collect()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| query_value_to_string(item).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}
