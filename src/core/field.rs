//! Scalar field types and value checking

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The scalar types a model field can declare
///
/// Declared in configuration by keyword (case-insensitive): `string`, `number`,
/// `integer`, `boolean`, `date`, `any` (alias `mixed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    String,
    Number,
    Integer,
    Boolean,
    Date,
    Any,
}

impl ScalarType {
    /// Resolve a declared type keyword, `None` when the keyword is not a scalar
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "string" | "str" | "text" => Some(ScalarType::String),
            "number" | "float" | "double" => Some(ScalarType::Number),
            "integer" | "int" => Some(ScalarType::Integer),
            "boolean" | "bool" => Some(ScalarType::Boolean),
            "date" | "datetime" => Some(ScalarType::Date),
            "any" | "mixed" | "json" => Some(ScalarType::Any),
            _ => None,
        }
    }

    /// Name used in validation messages
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::String => "string",
            ScalarType::Number => "number",
            ScalarType::Integer => "integer",
            ScalarType::Boolean => "boolean",
            ScalarType::Date => "date",
            ScalarType::Any => "any",
        }
    }

    /// The value a field is reset to when a full replace omits it
    pub fn zero_value(&self) -> Value {
        match self {
            ScalarType::String => Value::String(String::new()),
            ScalarType::Number | ScalarType::Integer => Value::from(0),
            ScalarType::Boolean => Value::Bool(false),
            ScalarType::Date | ScalarType::Any => Value::Null,
        }
    }

    /// Check a JSON payload value, returning its stored form
    ///
    /// `null` is accepted for every type. Dates are normalized to RFC 3339 in
    /// UTC with millisecond precision so that stored dates compare as strings.
    pub fn check(&self, value: Value) -> Option<Value> {
        if value.is_null() {
            return Some(Value::Null);
        }
        match self {
            ScalarType::String => value.is_string().then_some(value),
            ScalarType::Number => value.is_number().then_some(value),
            ScalarType::Integer => match &value {
                Value::Number(n) if n.is_i64() || n.is_u64() => Some(value),
                Value::Number(n) => n
                    .as_f64()
                    .filter(|f| f.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(f))
                    .map(|f| Value::from(f as i64)),
                _ => None,
            },
            ScalarType::Boolean => value.is_boolean().then_some(value),
            ScalarType::Date => value.as_str().and_then(normalize_date).map(Value::String),
            ScalarType::Any => Some(value),
        }
    }

    /// Convert a raw query-string value into a comparable JSON value
    pub fn coerce(&self, raw: &str) -> Option<Value> {
        match self {
            ScalarType::String => Some(Value::String(raw.to_string())),
            ScalarType::Number => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            ScalarType::Integer => raw.parse::<i64>().ok().map(Value::from),
            ScalarType::Boolean => match raw {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            ScalarType::Date => normalize_date(raw).map(Value::String),
            ScalarType::Any => {
                Some(serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())))
            }
        }
    }
}

/// Parse an RFC 3339 timestamp and re-render it in the canonical stored form
pub fn normalize_date(raw: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| format_timestamp(&dt.with_timezone(&Utc)))
}

/// Canonical wire form of a timestamp (`2024-01-31T12:00:00.000Z`)
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
