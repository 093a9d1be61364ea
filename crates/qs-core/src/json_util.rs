//! JSON parsing helpers for quote payloads.
//!
//! The backend forwards quote dicts as the collector produced them, so numeric
//! fields may arrive as JSON numbers, numeric strings, or `null`. These helpers
//! read such values leniently: anything unusable reads as absent.

use serde_json::Value;

/// Parse a JSON value (string or number) as `f64`.
///
/// Handles values encoded as either JSON strings (`"1700.5"`) or native
/// numbers (`1700.5`).
#[inline]
pub fn parse_str_f64(v: Option<&Value>) -> Option<f64> {
    let v = v?;
    if let Some(s) = v.as_str() {
        fast_float2::parse(s.trim()).ok()
    } else {
        v.as_f64()
    }
}

/// Parse a JSON value (string or number) as a `String`.
///
/// Trade dates show up both as `"20240105"` and `20240105`.
#[inline]
pub fn parse_str_string(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn f64_from_number_and_string() {
        assert_eq!(parse_str_f64(Some(&json!(1700.5))), Some(1700.5));
        assert_eq!(parse_str_f64(Some(&json!("1705.25"))), Some(1705.25));
        assert_eq!(parse_str_f64(Some(&json!(" -1.5 "))), Some(-1.5));
    }

    #[test]
    fn f64_junk_is_absent() {
        assert_eq!(parse_str_f64(None), None);
        assert_eq!(parse_str_f64(Some(&Value::Null)), None);
        assert_eq!(parse_str_f64(Some(&json!("n/a"))), None);
        assert_eq!(parse_str_f64(Some(&json!(true))), None);
    }

    #[test]
    fn string_from_number() {
        assert_eq!(parse_str_string(Some(&json!(20240105))).as_deref(), Some("20240105"));
        assert_eq!(parse_str_string(Some(&json!("20240105"))).as_deref(), Some("20240105"));
        assert_eq!(parse_str_string(Some(&json!([1]))), None);
    }
}
