//! Field value types used by filter clauses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A polymorphic field value that can hold different types
///
/// Items expose their filterable fields through [`Item::field_value`](crate::core::Item::field_value);
/// clauses only ever see this representation, never the concrete record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    List(Vec<String>),
    Null,
}

impl FieldValue {
    /// Get the value as a number if it is numeric
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(i) => Some(*i as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get the value as a boolean if possible
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Textual values carried by this field
    ///
    /// A string yields itself, a list yields each element, everything else yields nothing.
    pub fn text_values(&self) -> Vec<&str> {
        match self {
            FieldValue::String(s) => vec![s.as_str()],
            FieldValue::List(values) => values.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

impl<V: Into<FieldValue>> From<Option<V>> for FieldValue {
    fn from(value: Option<V>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}
