//! Error types for the folio record store
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Missing-record conditions are deliberately NOT errors: id-keyed reads
//! return `Option` and id-keyed mutations return `bool`. The variants here
//! cover programmer errors (unknown column, wrong dimension), bad input
//! (schema, decode) and I/O.

use std::io;
use thiserror::Error;

/// Result type alias for folio operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the folio record store
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file operations, directory scans, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A field name outside the collection schema was referenced
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// A value of the wrong kind was written to a column
    #[error("Type mismatch for column {column}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Column that rejected the value
        column: String,
        /// Column type name
        expected: &'static str,
        /// Value type name
        actual: &'static str,
    },

    /// Vector lengths differ (storage write or similarity comparison)
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected vector dimension
        expected: usize,
        /// Actual vector length
        actual: usize,
    },

    /// Schema rejected at collection construction
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// Malformed frontmatter or unreadable persisted record
    #[error("Decode error: {0}")]
    Decode(String),

    /// Filesystem watch could not be established
    #[error("Watch error: {0}")]
    Watch(String),
}
