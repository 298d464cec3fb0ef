//! # Cell Values
//!
//! The typed value stored in a DataStore cell and bound as a query parameter.
//!
//! ## Value Kinds
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            Value                                        │
//! │                                                                         │
//! │  Null        │ SQL NULL (fresh insert rows start here)                 │
//! │  Bool        │ add_boolean_param                                       │
//! │  Int(i64)    │ add_int_param, primary keys, sequence values            │
//! │  Float(f64)  │ REAL / NUMERIC cells                                    │
//! │  Text        │ add_string_param                                        │
//! │  Date        │ add_date_param, fecha_* columns                         │
//! │  Time        │ hora_* columns                                          │
//! │  Timestamp   │ timestamptz-like columns                                │
//! │  IntArray    │ add_int_array_param  (bound as JSON text)               │
//! │  TextArray   │ add_string_array_param (bound as JSON text)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Equality
//! Equality is strict: `Int(1) != Text("1")` and `Int(1) != Float(1.0)`.
//! `DataStore::get_index_row` relies on this.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

/// A single SQL value.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// SQL NULL.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(DateTime<Utc>),
    IntArray(Vec<i64>),
    TextArray(Vec<String>),
}

impl Value {
    /// Returns true for SQL NULL.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the integer payload, if this is an `Int`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text payload, if this is a `Text`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Converts a raw JSON value (HTTP input) into a cell value.
    ///
    /// ## Mapping
    /// ```text
    /// null            → Null
    /// true/false      → Bool
    /// 12              → Int(12)
    /// 12.5            → Float(12.5)
    /// "abc"           → Text
    /// [1, 2]          → IntArray
    /// ["a", "b"]      → TextArray
    /// other arrays    → Text(JSON)
    /// objects         → Text(JSON)
    /// ```
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Array(items) => {
                if let Some(ints) = items.iter().map(|v| v.as_i64()).collect::<Option<Vec<_>>>() {
                    Value::IntArray(ints)
                } else if let Some(texts) = items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string))
                    .collect::<Option<Vec<_>>>()
                {
                    Value::TextArray(texts)
                } else {
                    Value::Text(json.to_string())
                }
            }
            serde_json::Value::Object(_) => Value::Text(json.to_string()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Value::IntArray(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::TextArray(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strict_equality() {
        assert_ne!(Value::Int(1), Value::Text("1".to_string()));
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_eq!(Value::from(7_i32), Value::Int(7));
    }

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(Value::from_json(&json!(null)), Value::Null);
        assert_eq!(Value::from_json(&json!(true)), Value::Bool(true));
        assert_eq!(Value::from_json(&json!(42)), Value::Int(42));
        assert_eq!(Value::from_json(&json!(2.5)), Value::Float(2.5));
        assert_eq!(
            Value::from_json(&json!("Coca-Cola")),
            Value::Text("Coca-Cola".to_string())
        );
    }

    #[test]
    fn test_from_json_arrays() {
        assert_eq!(Value::from_json(&json!([1, 2, 3])), Value::IntArray(vec![1, 2, 3]));
        assert_eq!(
            Value::from_json(&json!(["a", "b"])),
            Value::TextArray(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(
            Value::from_json(&json!([1, "b"])),
            Value::Text("[1,\"b\"]".to_string())
        );
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
    }

    #[test]
    fn test_serializes_untagged() {
        let params = vec![Value::Int(3), Value::Text("a".to_string()), Value::Null];
        assert_eq!(serde_json::to_string(&params).unwrap(), "[3,\"a\",null]");
    }
}
