//! Lenient field deserializers.
//!
//! Backend payloads are loosely typed: IDs and codes arrive as numbers or
//! strings, counts as strings, dates with or without a time part. These
//! helpers are used with `#[serde(deserialize_with = ...)]` on the canonical
//! models and never fail on a wrong-typed value; they fall back to "absent".

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::date::{parse_api_date, parse_api_datetime};

/// Text from a string, number or boolean. Empty strings count as absent.
#[must_use]
pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A non-negative count from a number or numeric string.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// An integer from a number or numeric string (`"03"` is 3).
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A boolean from `true`/`false`, `1`/`0` or their string forms.
#[must_use]
pub fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Deserialize an optional text field.
///
/// # Errors
///
/// Only fails if the input is not valid JSON.
pub fn opt_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(text(&Value::deserialize(deserializer)?))
}

/// Deserialize a text field that defaults to empty.
///
/// # Errors
///
/// Only fails if the input is not valid JSON.
pub fn text_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(text(&Value::deserialize(deserializer)?).unwrap_or_default())
}

/// Deserialize a count.
///
/// # Errors
///
/// Only fails if the input is not valid JSON.
pub fn opt_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(count(&Value::deserialize(deserializer)?))
}

/// Deserialize an optional integer.
///
/// # Errors
///
/// Only fails if the input is not valid JSON.
pub fn opt_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(int(&Value::deserialize(deserializer)?))
}

/// Deserialize an optional boolean.
///
/// # Errors
///
/// Only fails if the input is not valid JSON.
pub fn opt_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(flag(&Value::deserialize(deserializer)?))
}

/// Deserialize an optional calendar date from any backend date shape.
///
/// # Errors
///
/// Only fails if the input is not valid JSON.
pub fn opt_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => parse_api_date(&s),
        _ => None,
    })
}

/// Deserialize an optional timestamp.
///
/// # Errors
///
/// Only fails if the input is not valid JSON.
pub fn opt_datetime<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<NaiveDateTime>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => parse_api_datetime(&s),
        _ => None,
    })
}
