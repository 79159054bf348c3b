//! folio - embedded, reactive, file-synchronized record store
//!
//! folio keeps schema-defined records in columnar in-memory storage, derives
//! reactive views that recompute only when the data actually changed, runs
//! brute-force vector similarity search with content-hash staleness
//! tracking, and persists every record as a human-editable markdown file
//! with frontmatter. A directory watcher folds external edits back into
//! memory.
//!
//! # Quick Start
//!
//! ```ignore
//! use foliodb::{fields, CollectionConfig, Database, DatabaseConfig, Schema};
//!
//! let db = Database::open(DatabaseConfig::named("workbench").local())?;
//! let notes = db.collection(
//!     "notes",
//!     CollectionConfig::new(
//!         Schema::builder()
//!             .string("title")
//!             .string("body")
//!             .vector("embedding", 384)
//!             .build()?,
//!     )
//!     .content_column("body"),
//! )?;
//!
//! let id = notes.insert(fields! { "title" => "hello", "body" => "first note" })?;
//!
//! // Edit ~/.folio/workbench/notes/<id>.md in any editor; the change is
//! // picked up and applied automatically.
//! notes.on_file_change(|change| println!("changed: {}", change.id()));
//! ```
//!
//! # Architecture
//!
//! - [`folio_core`]: schema, values, records, ids, errors
//! - [`folio_store`]: slot registry, columnar buffers, [`Collection`],
//!   derived views, embedding tracker, vector search
//! - [`folio_persist`]: markdown codec, directory watcher,
//!   [`PersistentCollection`], [`Database`]

pub use folio_core::fields;
pub use folio_core::{
    compare_values, format_number, generate_id, ColumnType, Error, FieldValue, Fields, Record,
    Result, Schema, SchemaBuilder, RESERVED_FIELDS,
};
pub use folio_persist::{
    decode, encode, CollectionConfig, Database, DatabaseConfig, DecodedRecord, DirWatcher,
    FileChange, PersistentCollection, DEFAULT_DEBOUNCE, DEFAULT_GRACE,
};
pub use folio_store::{
    cosine_similarity, query, query_aggregate, query_count, query_first, query_group_by,
    query_sorted, vector_search, Collection, DerivedView, EmbeddingTracker, RowView, SearchHit,
    SearchOptions, SortOrder,
};
