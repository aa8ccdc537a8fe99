//! Shape checks for request values and token claims.
//!
//! Checks never fail with an error: every outcome is a [`Validation`] whose
//! `cause` is forwarded verbatim to the caller.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use validator::ValidateEmail;

pub const INCOMPLETE_ATTRIBUTES: &str = "incomplete attributes";
pub const UNKNOWN_TYPE: &str = "unknown type";

/// Kinds of value the validator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Token,
    StringArray,
    EmailArray,
    Number,
    Float,
    Amount,
    Email,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind;

impl FromStr for ValueKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(ValueKind::String),
            "token" => Ok(ValueKind::Token),
            "stringArray" => Ok(ValueKind::StringArray),
            "emailArray" => Ok(ValueKind::EmailArray),
            "number" => Ok(ValueKind::Number),
            "float" => Ok(ValueKind::Float),
            "amount" => Ok(ValueKind::Amount),
            "email" => Ok(ValueKind::Email),
            "date" => Ok(ValueKind::Date),
            _ => Err(UnknownKind),
        }
    }
}

/// Outcome of a check. `cause` is always set; on success it is `"valid"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub valid: bool,
    pub cause: String,
}

impl Validation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            cause: "valid".to_string(),
        }
    }

    pub fn fail(cause: impl Into<String>) -> Self {
        Self {
            valid: false,
            cause: cause.into(),
        }
    }
}

/// Check `value` against the kind named by `kind`.
///
/// A missing (or JSON `null`) value fails with [`INCOMPLETE_ATTRIBUTES`],
/// an unrecognised kind name with [`UNKNOWN_TYPE`].
pub fn validate(value: Option<&Value>, kind: &str) -> Validation {
    if is_missing(value) {
        return Validation::fail(INCOMPLETE_ATTRIBUTES);
    }
    match kind.parse::<ValueKind>() {
        Ok(kind) => validate_kind(value, kind),
        Err(UnknownKind) => Validation::fail(UNKNOWN_TYPE),
    }
}

/// Typed variant of [`validate`].
pub fn validate_kind(value: Option<&Value>, kind: ValueKind) -> Validation {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Validation::fail(INCOMPLETE_ATTRIBUTES);
    };
    match check(value, kind) {
        Ok(()) => Validation::ok(),
        Err(cause) => Validation::fail(cause),
    }
}

/// Run checks in order and return the first failure unchanged.
pub fn validate_value_types(checks: &[(Option<&Value>, &str)]) -> Validation {
    for (value, kind) in checks {
        let result = validate(*value, kind);
        if !result.valid {
            return result;
        }
    }
    Validation::ok()
}

/// Parse a strict `YYYY-MM-DD` calendar day.
///
/// Beyond the shape, the day must exist: `2023-02-30` is rejected.
pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    let shaped = raw.len() == 10
        && raw.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return Err("invalid date format, expected YYYY-MM-DD".to_string());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| format!("invalid date: {}", e))
}

/// Parse a finite floating-point value from the whole (trimmed) string.
pub fn parse_number(raw: &str) -> Result<f64, String> {
    let number = raw.trim().parse::<f64>().map_err(|e| e.to_string())?;
    if !number.is_finite() {
        return Err("not a finite number".to_string());
    }
    Ok(number)
}

fn is_missing(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

fn check(value: &Value, kind: ValueKind) -> Result<(), String> {
    match kind {
        ValueKind::String | ValueKind::Token => check_string(value).map(|_| ()),
        ValueKind::StringArray => check_array(value, ValueKind::String),
        ValueKind::EmailArray => check_array(value, ValueKind::Email),
        ValueKind::Number | ValueKind::Float | ValueKind::Amount => check_number(value),
        ValueKind::Email => check_email(check_string(value)?),
        ValueKind::Date => parse_date(check_string(value)?).map(|_| ()),
    }
}

fn check_string(value: &Value) -> Result<&str, String> {
    let text = value.as_str().ok_or("not a string")?;
    if text.trim().is_empty() {
        return Err("empty string".to_string());
    }
    Ok(text)
}

fn check_array(value: &Value, element: ValueKind) -> Result<(), String> {
    let items = value.as_array().ok_or("not an array")?;
    if items.is_empty() {
        return Err("empty array".to_string());
    }
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        check(item, element)?;
        if let Some(text) = item.as_str() {
            if !seen.insert(text) {
                return Err(format!("duplicate value: {}", text));
            }
        }
    }
    Ok(())
}

fn check_number(value: &Value) -> Result<(), String> {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(number) if number.is_finite() => Ok(()),
            _ => Err("not a finite number".to_string()),
        },
        Value::String(raw) => parse_number(raw).map(|_| ()),
        _ => Err("not a number".to_string()),
    }
}

fn check_email(text: &str) -> Result<(), String> {
    if !text.validate_email() {
        return Err("invalid email".to_string());
    }
    Ok(())
}
