//! Field value types for folio collections
//!
//! This module defines:
//! - FieldValue: the unified enum for every column value
//! - a total ordering helper used by sorted derived views
//!
//! ## Value model
//!
//! Seven variants, one per column kind plus `Null`:
//! Null, String, Number (f64, also carries timestamps), Bool, StringArray,
//! NumberArray, Vector (f32 embedding).
//!
//! `Null` doubles as "absent": it is the default for vector columns and the
//! conform target for omitted fields of every other kind.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A single column value
///
/// Timestamps are plain numbers (epoch milliseconds); vector fields carry
/// `f32` embeddings and default to `Null` (absence), never a zero vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Null / absent value
    Null,
    /// UTF-8 string
    String(String),
    /// 64-bit float (numbers and timestamps)
    Number(f64),
    /// Boolean
    Bool(bool),
    /// Array of strings
    StringArray(Vec<String>),
    /// Array of numbers
    NumberArray(Vec<f64>),
    /// Fixed-dimension embedding
    Vector(Vec<f32>),
}

impl FieldValue {
    /// Get the value kind as a string (used in error messages)
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::String(_) => "string",
            FieldValue::Number(_) => "number",
            FieldValue::Bool(_) => "boolean",
            FieldValue::StringArray(_) => "string-array",
            FieldValue::NumberArray(_) => "number-array",
            FieldValue::Vector(_) => "vector",
        }
    }

    /// Check if this is `Null`
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Get as `&str` if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as `f64` if this is a Number value
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as `bool` if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as a string slice array if this is a StringArray value
    pub fn as_string_array(&self) -> Option<&[String]> {
        match self {
            FieldValue::StringArray(a) => Some(a),
            _ => None,
        }
    }

    /// Get as a number slice if this is a NumberArray value
    pub fn as_number_array(&self) -> Option<&[f64]> {
        match self {
            FieldValue::NumberArray(a) => Some(a),
            _ => None,
        }
    }

    /// Get as an embedding slice if this is a Vector value
    pub fn as_vector(&self) -> Option<&[f32]> {
        match self {
            FieldValue::Vector(v) => Some(v),
            _ => None,
        }
    }
}

/// Total ordering over field values, used by sorted derived views.
///
/// Kinds order as Null < Bool < Number < String < arrays < Vector; within a
/// kind the natural order applies (NaN compares equal to everything to keep
/// the ordering total; arrays compare by length only).
pub fn compare_values(a: &FieldValue, b: &FieldValue) -> Ordering {
    fn rank(v: &FieldValue) -> u8 {
        match v {
            FieldValue::Null => 0,
            FieldValue::Bool(_) => 1,
            FieldValue::Number(_) => 2,
            FieldValue::String(_) => 3,
            FieldValue::StringArray(_) => 4,
            FieldValue::NumberArray(_) => 5,
            FieldValue::Vector(_) => 6,
        }
    }

    match (a, b) {
        (FieldValue::Bool(x), FieldValue::Bool(y)) => x.cmp(y),
        (FieldValue::Number(x), FieldValue::Number(y)) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        (FieldValue::String(x), FieldValue::String(y)) => x.cmp(y),
        (FieldValue::StringArray(x), FieldValue::StringArray(y)) => x.len().cmp(&y.len()),
        (FieldValue::NumberArray(x), FieldValue::NumberArray(y)) => x.len().cmp(&y.len()),
        (FieldValue::Vector(x), FieldValue::Vector(y)) => x.len().cmp(&y.len()),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Format a number the way the markdown codec writes it: integral values
/// print without a fractional part, everything else as shortest decimal.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(a: Vec<String>) -> Self {
        FieldValue::StringArray(a)
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(a: Vec<&str>) -> Self {
        FieldValue::StringArray(a.into_iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<f64>> for FieldValue {
    fn from(a: Vec<f64>) -> Self {
        FieldValue::NumberArray(a)
    }
}

impl From<Vec<f32>> for FieldValue {
    fn from(v: Vec<f32>) -> Self {
        FieldValue::Vector(v)
    }
}
