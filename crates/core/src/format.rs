//! Small formatting helpers used by form handling and display code

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;

/// Insert thousands separators into the integer part of a number.
///
/// `commaize_number(13209802)` gives `"13,209,802"`; a fractional part is
/// left untouched.
pub fn commaize_number(value: impl Display) -> String {
    let text = value.to_string();
    let (sign, rest) = text
        .strip_prefix('-')
        .map_or(("", text.as_str()), |rest| ("-", rest));
    let (int_part, frac_part) = rest.find('.').map_or((rest, ""), |i| rest.split_at(i));

    if !int_part.chars().all(|c| c.is_ascii_digit()) {
        return text;
    }

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{sign}{grouped}{frac_part}")
}

/// Round `value` down to a multiple of `unit`
pub fn floor_to_unit(value: f64, unit: f64) -> f64 {
    (value / unit).floor() * unit
}

/// Round `value` up to a multiple of `unit`
pub fn ceil_to_unit(value: f64, unit: f64) -> f64 {
    (value / unit).ceil() * unit
}

/// Strip hyphens from a phone number
pub fn format_phone_without_hyphen(phone: &str) -> String {
    phone.trim().replace('-', "")
}

/// Hyphenate 9, 10 and 11 digit phone numbers; anything else is returned trimmed.
///
/// 11 digits: 3-4-4, 10 digits: 2-4-4, 9 digits: 2-3-4.
pub fn format_phone_with_hyphen(phone: &str) -> String {
    let trimmed = phone.trim();
    if !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return trimmed.to_string();
    }

    let groups: &[usize] = match trimmed.len() {
        11 => &[3, 4, 4],
        10 => &[2, 4, 4],
        9 => &[2, 3, 4],
        _ => return trimmed.to_string(),
    };

    let mut parts = Vec::with_capacity(groups.len());
    let mut start = 0;
    for len in groups {
        parts.push(&trimmed[start..start + len]);
        start += len;
    }
    parts.join("-")
}

/// Keep the first item for every distinct key, preserving order
pub fn uniq_by<T, K, F>(items: impl IntoIterator<Item = T>, mut key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(key(item)))
        .collect()
}

/// Replace empty-string parameters with the matching default
pub fn sanitize_query_params(
    mut params: Map<String, Value>,
    defaults: &Map<String, Value>,
) -> Map<String, Value> {
    for (key, default) in defaults {
        if matches!(params.get(key), Some(Value::String(s)) if s.is_empty()) {
            params.insert(key.clone(), default.clone());
        }
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn commaize() {
        assert_eq!(commaize_number(13_209_802), "13,209,802");
        assert_eq!(commaize_number("13209802"), "13,209,802");
        assert_eq!(commaize_number(999), "999");
        assert_eq!(commaize_number(1000), "1,000");
        assert_eq!(commaize_number(-1_234_567), "-1,234,567");
        assert_eq!(commaize_number("1234.5678"), "1,234.5678");
        assert_eq!(commaize_number("n/a"), "n/a");
    }

    #[test]
    fn unit_rounding() {
        assert!((floor_to_unit(320_980.0, 10_000.0) - 320_000.0).abs() < f64::EPSILON);
        assert!((ceil_to_unit(320_980.0, 10_000.0) - 330_000.0).abs() < f64::EPSILON);
        assert!((ceil_to_unit(320_000.0, 10_000.0) - 320_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn phone_numbers() {
        assert_eq!(format_phone_with_hyphen("01012345678"), "010-1234-5678");
        assert_eq!(format_phone_with_hyphen("0212345678"), "02-1234-5678");
        assert_eq!(format_phone_with_hyphen(" 021234567 "), "02-123-4567");
        assert_eq!(format_phone_with_hyphen("12345678"), "12345678");
        assert_eq!(format_phone_without_hyphen("010-1234-5678"), "01012345678");
        assert_eq!(format_phone_without_hyphen("01012345678"), "01012345678");
    }

    #[test]
    fn uniq_by_keeps_first() {
        let items = vec![(1, "a"), (2, "b"), (1, "c")];
        assert_eq!(uniq_by(items, |item| item.0), vec![(1, "a"), (2, "b")]);
    }

    #[test]
    fn sanitize_replaces_only_empty_strings() {
        let params = json!({ "organ": "", "license": "A", "page": 1 });
        let defaults = json!({ "organ": "*", "license": "*" });

        let sanitized = sanitize_query_params(
            params.as_object().cloned().unwrap(),
            defaults.as_object().unwrap(),
        );
        assert_eq!(
            Value::Object(sanitized),
            json!({ "organ": "*", "license": "A", "page": 1 })
        );
    }
}
