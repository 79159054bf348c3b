//! Collection schemas
//!
//! A schema is an ordered mapping from field name to a column type. Column
//! kinds form a closed tagged variant (`ColumnType`), with `Vector` carrying
//! its dimension, so every access site dispatches on the variant instead of
//! re-parsing type strings. Schemas are validated once, at collection
//! construction, never per operation.

use crate::error::{Error, Result};
use crate::value::{format_number, FieldValue};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Field names reserved for record identity and metadata.
pub const RESERVED_FIELDS: [&str; 4] = ["id", "created", "updated", "stale"];

/// Column type of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// UTF-8 string, default `""`
    String,
    /// 64-bit float, default `0`
    Number,
    /// Boolean, default `false`
    Boolean,
    /// Epoch milliseconds with number semantics, default `0`
    Timestamp,
    /// Array of strings, default empty
    StringArray,
    /// Array of numbers, default empty
    NumberArray,
    /// Fixed-length embedding; default is absence (`Null`), not a zero vector
    Vector {
        /// Embedding dimension
        dimension: usize,
    },
}

impl ColumnType {
    /// Column type name (used in error messages)
    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Number => "number",
            ColumnType::Boolean => "boolean",
            ColumnType::Timestamp => "timestamp",
            ColumnType::StringArray => "string-array",
            ColumnType::NumberArray => "number-array",
            ColumnType::Vector { .. } => "vector",
        }
    }

    /// The value a freed or never-written slot exposes for this type
    pub fn default_value(&self) -> FieldValue {
        match self {
            ColumnType::String => FieldValue::String(String::new()),
            ColumnType::Number | ColumnType::Timestamp => FieldValue::Number(0.0),
            ColumnType::Boolean => FieldValue::Bool(false),
            ColumnType::StringArray => FieldValue::StringArray(Vec::new()),
            ColumnType::NumberArray => FieldValue::NumberArray(Vec::new()),
            ColumnType::Vector { .. } => FieldValue::Null,
        }
    }
}

/// An ordered field-name → column-type mapping
///
/// Field order is declaration order; it drives both column layout and the
/// frontmatter line order of persisted records.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<(String, ColumnType)>,
    index: FxHashMap<String, usize>,
}

impl Schema {
    /// Build a schema from ordered (name, type) pairs.
    ///
    /// # Errors
    ///
    /// Rejects empty field names, duplicates, reserved names (`id`,
    /// `created`, `updated`, `stale`) and zero-dimension vectors.
    pub fn new(fields: Vec<(String, ColumnType)>) -> Result<Self> {
        let mut index = FxHashMap::default();
        for (pos, (name, column)) in fields.iter().enumerate() {
            if name.is_empty() {
                return Err(Error::InvalidSchema("empty field name".to_string()));
            }
            if RESERVED_FIELDS.contains(&name.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "field name '{}' is reserved",
                    name
                )));
            }
            if let ColumnType::Vector { dimension } = column {
                if *dimension == 0 {
                    return Err(Error::InvalidSchema(format!(
                        "vector field '{}' must have a non-zero dimension",
                        name
                    )));
                }
            }
            if index.insert(name.clone(), pos).is_some() {
                return Err(Error::InvalidSchema(format!(
                    "duplicate field name '{}'",
                    name
                )));
            }
        }
        Ok(Schema { fields, index })
    }

    /// Start building a schema field by field
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder { fields: Vec::new() }
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the schema has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check if a field exists
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Positional index of a field, if present
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Column type of a field, if present
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.position(name).map(|pos| self.fields[pos].1)
    }

    /// Iterate fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, ColumnType)> {
        self.fields.iter().map(|(name, ty)| (name.as_str(), *ty))
    }

    /// Validate and coerce a value for a column.
    ///
    /// `Null` conforms to the type default (vectors keep `Null` — absence is
    /// their default). A raw numeric sequence written to a vector column is
    /// converted to the vector representation. Numbers and booleans coerce to
    /// strings so externally edited files with bare scalars still load.
    ///
    /// # Errors
    ///
    /// `UnknownColumn` for names outside the schema, `DimensionMismatch` for
    /// wrong-length vectors, `TypeMismatch` otherwise.
    pub fn conform(&self, column: &str, value: FieldValue) -> Result<FieldValue> {
        let ty = self
            .column_type(column)
            .ok_or_else(|| Error::UnknownColumn(column.to_string()))?;

        if value.is_null() {
            return Ok(ty.default_value());
        }

        let mismatch = |actual: &FieldValue| Error::TypeMismatch {
            column: column.to_string(),
            expected: ty.name(),
            actual: actual.type_name(),
        };

        match ty {
            ColumnType::String => match value {
                FieldValue::String(_) => Ok(value),
                FieldValue::Number(n) => Ok(FieldValue::String(format_number(n))),
                FieldValue::Bool(b) => Ok(FieldValue::String(b.to_string())),
                other => Err(mismatch(&other)),
            },
            ColumnType::Number | ColumnType::Timestamp => match value {
                FieldValue::Number(_) => Ok(value),
                other => Err(mismatch(&other)),
            },
            ColumnType::Boolean => match value {
                FieldValue::Bool(_) => Ok(value),
                other => Err(mismatch(&other)),
            },
            ColumnType::StringArray => match value {
                FieldValue::StringArray(_) => Ok(value),
                other => Err(mismatch(&other)),
            },
            ColumnType::NumberArray => match value {
                FieldValue::NumberArray(_) => Ok(value),
                other => Err(mismatch(&other)),
            },
            ColumnType::Vector { dimension } => match value {
                FieldValue::Vector(v) => {
                    if v.len() != dimension {
                        return Err(Error::DimensionMismatch {
                            expected: dimension,
                            actual: v.len(),
                        });
                    }
                    Ok(FieldValue::Vector(v))
                }
                // Raw numeric sequences convert to the vector representation
                FieldValue::NumberArray(a) => {
                    if a.len() != dimension {
                        return Err(Error::DimensionMismatch {
                            expected: dimension,
                            actual: a.len(),
                        });
                    }
                    Ok(FieldValue::Vector(a.into_iter().map(|n| n as f32).collect()))
                }
                other => Err(mismatch(&other)),
            },
        }
    }
}

/// Incremental schema construction
pub struct SchemaBuilder {
    fields: Vec<(String, ColumnType)>,
}

impl SchemaBuilder {
    /// Append a field with an explicit column type
    pub fn field(mut self, name: &str, column: ColumnType) -> Self {
        self.fields.push((name.to_string(), column));
        self
    }

    /// Append a string field
    pub fn string(self, name: &str) -> Self {
        self.field(name, ColumnType::String)
    }

    /// Append a number field
    pub fn number(self, name: &str) -> Self {
        self.field(name, ColumnType::Number)
    }

    /// Append a boolean field
    pub fn boolean(self, name: &str) -> Self {
        self.field(name, ColumnType::Boolean)
    }

    /// Append a timestamp field
    pub fn timestamp(self, name: &str) -> Self {
        self.field(name, ColumnType::Timestamp)
    }

    /// Append a string-array field
    pub fn string_array(self, name: &str) -> Self {
        self.field(name, ColumnType::StringArray)
    }

    /// Append a number-array field
    pub fn number_array(self, name: &str) -> Self {
        self.field(name, ColumnType::NumberArray)
    }

    /// Append a vector field with the given dimension
    pub fn vector(self, name: &str, dimension: usize) -> Self {
        self.field(name, ColumnType::Vector { dimension })
    }

    /// Validate and produce the schema
    ///
    /// # Errors
    ///
    /// Same rules as [`Schema::new`].
    pub fn build(self) -> Result<Schema> {
        Schema::new(self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> Schema {
        Schema::builder()
            .string("name")
            .number("score")
            .boolean("active")
            .vector("embedding", 3)
            .build()
            .unwrap()
    }

    #[test]
    fn test_declaration_order_preserved() {
        let schema = sample_schema();
        let names: Vec<&str> = schema.fields().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["name", "score", "active", "embedding"]);
    }

    #[test]
    fn test_column_type_lookup() {
        let schema = sample_schema();
        assert_eq!(schema.column_type("score"), Some(ColumnType::Number));
        assert_eq!(
            schema.column_type("embedding"),
            Some(ColumnType::Vector { dimension: 3 })
        );
        assert_eq!(schema.column_type("missing"), None);
    }

    #[test]
    fn test_reserved_names_rejected() {
        for name in RESERVED_FIELDS {
            let result = Schema::builder().string(name).build();
            assert!(matches!(result, Err(Error::InvalidSchema(_))), "{}", name);
        }
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = Schema::builder().string("a").number("a").build();
        assert!(matches!(result, Err(Error::InvalidSchema(_))));
    }

    #[test]
    fn test_zero_dimension_vector_rejected() {
        let result = Schema::builder().vector("v", 0).build();
        assert!(matches!(result, Err(Error::InvalidSchema(_))));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(
            ColumnType::String.default_value(),
            FieldValue::String(String::new())
        );
        assert_eq!(ColumnType::Number.default_value(), FieldValue::Number(0.0));
        assert_eq!(ColumnType::Boolean.default_value(), FieldValue::Bool(false));
        // Vector default is absence, not a zero vector
        assert_eq!(
            ColumnType::Vector { dimension: 4 }.default_value(),
            FieldValue::Null
        );
    }

    #[test]
    fn test_conform_null_resets_to_default() {
        let schema = sample_schema();
        assert_eq!(
            schema.conform("score", FieldValue::Null).unwrap(),
            FieldValue::Number(0.0)
        );
        assert_eq!(
            schema.conform("embedding", FieldValue::Null).unwrap(),
            FieldValue::Null
        );
    }

    #[test]
    fn test_conform_unknown_column() {
        let schema = sample_schema();
        let result = schema.conform("missing", FieldValue::from(1.0));
        assert!(matches!(result, Err(Error::UnknownColumn(_))));
    }

    #[test]
    fn test_conform_type_mismatch() {
        let schema = sample_schema();
        let result = schema.conform("score", FieldValue::from("not a number"));
        assert!(matches!(result, Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_conform_number_array_to_vector() {
        let schema = sample_schema();
        let value = schema
            .conform("embedding", FieldValue::from(vec![1.0_f64, 2.0, 3.0]))
            .unwrap();
        assert_eq!(value, FieldValue::Vector(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_conform_vector_dimension_checked() {
        let schema = sample_schema();
        let result = schema.conform("embedding", FieldValue::Vector(vec![1.0, 2.0]));
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_conform_scalar_to_string_coercion() {
        let schema = sample_schema();
        assert_eq!(
            schema.conform("name", FieldValue::from(42.0)).unwrap(),
            FieldValue::String("42".to_string())
        );
        assert_eq!(
            schema.conform("name", FieldValue::from(true)).unwrap(),
            FieldValue::String("true".to_string())
        );
    }
}
