//! Core types for the folio record store
//!
//! This crate defines the foundational vocabulary shared by the storage and
//! persistence layers:
//!
//! - **Schema / ColumnType**: ordered field layout, validated once
//! - **FieldValue**: unified column value enum
//! - **Record / Fields**: materialized projections and field maps
//! - **Error / Result**: the error taxonomy
//! - **generate_id**: timestamp + random-suffix id generation

pub mod error;
pub mod id;
pub mod record;
pub mod schema;
pub mod value;

pub use error::{Error, Result};
pub use id::generate_id;
pub use record::{Fields, Record};
pub use schema::{ColumnType, Schema, SchemaBuilder, RESERVED_FIELDS};
pub use value::{compare_values, format_number, FieldValue};
