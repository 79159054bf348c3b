//! File persistence for folio
//!
//! One markdown file per record (frontmatter header + body), one directory
//! per collection, synchronized both ways:
//!
//! - **codec**: deterministic encode/decode between records and files
//! - **DirWatcher**: debounced external-change detection with self-write
//!   suppression
//! - **PersistentCollection**: a [`folio_store::Collection`] with
//!   write-through saves, directory loading and external-edit application
//! - **Database**: named directory of collections with home/local/explicit
//!   path resolution

pub mod codec;
pub mod collection;
pub mod database;
pub mod paths;
pub mod watcher;

pub use codec::{decode, encode, DecodedRecord};
pub use collection::{CollectionConfig, PersistentCollection};
pub use database::{Database, DatabaseConfig};
pub use watcher::{DirWatcher, FileChange, DEFAULT_DEBOUNCE, DEFAULT_GRACE};
