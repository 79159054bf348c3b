//! Materialized record projections
//!
//! A `Record` is never stored: it is reconstructed on demand from the slot
//! state of a collection (columns + metadata). Holding one does not pin any
//! buffer.

use crate::value::FieldValue;
use std::collections::BTreeMap;

/// Field-name → value map used for inserts, updates and projections.
///
/// `BTreeMap` keeps iteration deterministic.
pub type Fields = BTreeMap<String, FieldValue>;

/// A record materialized from a collection slot
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Opaque id, unique within the collection
    pub id: String,
    /// Epoch milliseconds at first insert
    pub created: i64,
    /// Epoch milliseconds at most recent mutation
    pub updated: i64,
    /// Embedding staleness flag
    pub stale: bool,
    /// All schema fields read from the columns
    pub fields: Fields,
}

impl Record {
    /// Look up a field value
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// Build a [`Fields`] map in place: `fields! { "name" => "Ada", "score" => 3 }`.
#[macro_export]
macro_rules! fields {
    () => { $crate::Fields::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::Fields::new();
        $( map.insert(($key).to_string(), $crate::FieldValue::from($value)); )+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_macro() {
        let fields = fields! { "name" => "Ada", "score" => 3 };
        assert_eq!(fields.get("name"), Some(&FieldValue::from("Ada")));
        assert_eq!(fields.get("score"), Some(&FieldValue::Number(3.0)));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_record_field_lookup() {
        let record = Record {
            id: "r1".to_string(),
            created: 1,
            updated: 2,
            stale: false,
            fields: fields! { "name" => "Ada" },
        };
        assert_eq!(record.field("name"), Some(&FieldValue::from("Ada")));
        assert_eq!(record.field("missing"), None);
    }
}
