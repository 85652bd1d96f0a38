//! Raw and synthesized data records
//!
//! A record is a mapping from field key to a string or numeric value plus a
//! `grouped` flag marking rows synthesized by the group synthesizer. Raw
//! records deserialize straight from JSON dataset rows; declared numeric
//! fields are coerced exactly once during initialization.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;

/// A single field value: either free text (categorical keys) or a number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric view of the value. Text parses as a float; empty text
    /// coerces to zero and unparseable text to NaN, matching the loose
    /// numeric coercion the datasets were authored against.
    pub fn as_number(&self) -> f64 {
        match self {
            FieldValue::Number(n) => *n,
            FieldValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
        }
    }

    /// Textual view of the value. Numbers render in their shortest form
    /// ("2000", not "2000.0") so coerced and uncoerced copies of the same
    /// field compare equal.
    pub fn render(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Number(n) => Cow::Owned(n.to_string()),
            FieldValue::Text(s) => Cow::Borrowed(s),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

/// One tabular row: field key → value, plus the synthesized-row marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(flatten)]
    pub values: HashMap<String, FieldValue>,
    #[serde(skip)]
    pub grouped: bool,
}

impl Record {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            grouped: false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Numeric view of a field; NaN when the field is absent
    pub fn number(&self, key: &str) -> f64 {
        self.get(key).map(FieldValue::as_number).unwrap_or(f64::NAN)
    }

    /// Textual view of a field
    pub fn text(&self, key: &str) -> Option<Cow<'_, str>> {
        self.get(key).map(FieldValue::render)
    }

    /// All field keys present on this record
    pub fn field_keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Replace the listed fields with their numeric coercion in place
    pub fn coerce_numeric(&mut self, fields: &[String]) {
        for field in fields {
            if let Some(value) = self.values.get_mut(field) {
                *value = FieldValue::Number(value.as_number());
            }
        }
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}
