//! In-memory storage engine for folio
//!
//! This crate implements the slot-addressed storage core and everything that
//! reads it:
//!
//! - **SlotRegistry**: id↔slot bijection with LIFO slot reuse
//! - **ColumnStore / MetadataStore**: parallel per-field buffers
//! - **Collection**: CRUD + filter/find over the buffers
//! - **DerivedView** and the `query_*` constructors: memoized,
//!   auto-invalidating reads
//! - **EmbeddingTracker**: content fingerprints for embedding staleness
//! - **vector_search / cosine_similarity**: brute-force similarity search
//!
//! Persistence lives in `folio-persist`; this crate owns no I/O.

pub mod collection;
pub mod columns;
pub mod embedding;
pub mod metadata;
pub mod reactive;
pub mod registry;
pub mod search;

pub use collection::{Collection, RowView};
pub use columns::ColumnStore;
pub use embedding::EmbeddingTracker;
pub use metadata::MetadataStore;
pub use reactive::{
    query, query_aggregate, query_count, query_first, query_group_by, query_sorted, DerivedView,
    SortOrder,
};
pub use registry::SlotRegistry;
pub use search::{cosine_similarity, vector_search, SearchHit, SearchOptions};
