//! Helpers for string-valued plugin properties.
//!
//! The framework stores every property as text, but hand-written config files
//! often carry plain numbers or booleans. Config structs deserialize each
//! property with [`lenient_string`] and parse it later, so a bad value turns
//! into a validation failure instead of a deserialization error.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};

/// Deserialize an optional property that may be a string, number or boolean.
///
/// Use with `#[serde(default, deserialize_with = "lenient_string")]`.
///
/// # Errors
///
/// Fails for maps, sequences and other non-scalar values.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(LenientVisitor)
}

struct LenientVisitor;

impl<'de> Visitor<'de> for LenientVisitor {
    type Value = Option<String>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number or boolean")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(Some(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
        d.deserialize_any(self)
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
#[must_use]
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reason a numeric property was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionError {
    #[error("'{value}' is not a valid {expected}")]
    NotANumber { value: String, expected: &'static str },
    #[error("must be greater than zero, got {0}")]
    NotPositive(String),
}

/// Parse an optional property, falling back to `default` when it is unset
/// or blank.
///
/// # Errors
///
/// Returns [`OptionError::NotANumber`] when the text does not parse.
pub fn parse_or<T: FromStr>(
    value: Option<&str>,
    default: T,
    expected: &'static str,
) -> Result<T, OptionError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| OptionError::NotANumber {
            value: v.to_string(),
            expected,
        }),
    }
}

/// Like [`parse_or`] for counts that must be at least one.
///
/// # Errors
///
/// Returns [`OptionError::NotPositive`] for zero.
pub fn parse_positive_or(value: Option<&str>, default: u32) -> Result<u32, OptionError> {
    let n = parse_or(value, default, "positive integer")?;
    if n == 0 {
        return Err(OptionError::NotPositive(n.to_string()));
    }
    Ok(n)
}
