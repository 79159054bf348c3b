//! Persistent collection - a [`Collection`] synchronized with a directory
//!
//! One record per markdown file under the collection directory. Mutations go
//! to memory first and, with `auto_save` on, to disk in the same call.
//! External edits flow back in through the [`DirWatcher`]: the file's state
//! is applied as truth, preserving the file's timestamps, then change
//! callbacks run.
//!
//! Failed file operations are logged and reported as booleans or skip
//! counts; they never poison the in-memory state.

use crate::codec::{self, DecodedRecord};
use crate::paths;
use crate::watcher::{DirWatcher, FileChange, StaleCheck, DEFAULT_DEBOUNCE, DEFAULT_GRACE};
use folio_core::{Error, FieldValue, Fields, Record, Result, Schema};
use folio_store::{vector_search, Collection, EmbeddingTracker, RowView, SearchHit, SearchOptions};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

type ChangeListener = Arc<dyn Fn(&FileChange) + Send + Sync>;

/// Configuration for opening a persistent collection
pub struct CollectionConfig {
    /// Record schema (required)
    pub schema: Schema,
    /// String column whose value is stored as the file body and hashed for
    /// embedding staleness
    pub content_column: Option<String>,
    /// Write records to disk as part of every successful mutation
    pub auto_save: bool,
    /// Start the directory watcher on open
    pub watch_files: bool,
    /// Callback invoked after an external change has been applied
    pub on_external_change: Option<ChangeListener>,
    /// Debounce window override for the watcher
    pub debounce: Duration,
    /// Self-write grace window override for the watcher
    pub grace: Duration,
}

impl CollectionConfig {
    /// Defaults: auto-save on, watching on, default windows
    pub fn new(schema: Schema) -> Self {
        CollectionConfig {
            schema,
            content_column: None,
            auto_save: true,
            watch_files: true,
            on_external_change: None,
            debounce: DEFAULT_DEBOUNCE,
            grace: DEFAULT_GRACE,
        }
    }

    /// Designate the content column
    pub fn content_column(mut self, column: impl Into<String>) -> Self {
        self.content_column = Some(column.into());
        self
    }

    /// Toggle write-through persistence
    pub fn auto_save(mut self, auto_save: bool) -> Self {
        self.auto_save = auto_save;
        self
    }

    /// Toggle the directory watcher
    pub fn watch_files(mut self, watch_files: bool) -> Self {
        self.watch_files = watch_files;
        self
    }

    /// Set the external-change callback
    pub fn on_external_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(&FileChange) + Send + Sync + 'static,
    {
        self.on_external_change = Some(Arc::new(callback));
        self
    }

    /// Override the watcher debounce window
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Override the self-write grace window
    pub fn grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }
}

struct PersistInner {
    dir: PathBuf,
    collection: Collection,
    tracker: EmbeddingTracker,
    content_column: Option<String>,
    auto_save: bool,
    debounce: Duration,
    grace: Duration,
    watcher: Mutex<Option<DirWatcher>>,
    listeners: Mutex<Vec<ChangeListener>>,
    on_external_change: Option<ChangeListener>,
}

/// Directory-backed record collection
#[derive(Clone)]
pub struct PersistentCollection {
    inner: Arc<PersistInner>,
}

impl PersistentCollection {
    /// Open a collection over `dir`: create the directory, load every
    /// decodable record file, start watching when configured to.
    ///
    /// # Errors
    ///
    /// `Io` if the directory cannot be created or scanned, `Watch` if the
    /// watcher cannot start. Individual bad files never fail an open.
    pub fn open(dir: &Path, config: CollectionConfig) -> Result<Self> {
        if let Some(content) = &config.content_column {
            if config.schema.column_type(content).is_none() {
                return Err(Error::UnknownColumn(content.clone()));
            }
        }
        std::fs::create_dir_all(dir)?;
        let this = PersistentCollection {
            inner: Arc::new(PersistInner {
                dir: dir.to_path_buf(),
                collection: Collection::new(config.schema),
                tracker: EmbeddingTracker::new(),
                content_column: config.content_column,
                auto_save: config.auto_save,
                debounce: config.debounce,
                grace: config.grace,
                watcher: Mutex::new(None),
                listeners: Mutex::new(Vec::new()),
                on_external_change: config.on_external_change,
            }),
        };
        this.load()?;
        if config.watch_files {
            this.start_watching()?;
        }
        Ok(this)
    }

    /// The directory this collection persists to
    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// The collection schema
    pub fn schema(&self) -> &Arc<Schema> {
        self.inner.collection.schema()
    }

    /// The underlying in-memory collection, for building derived views
    pub fn collection(&self) -> &Collection {
        &self.inner.collection
    }

    // ---- CRUD -------------------------------------------------------------

    /// Insert a record with a generated id; persists when auto-save is on
    pub fn insert(&self, fields: Fields) -> Result<String> {
        let id = self.inner.collection.insert(fields)?;
        self.autosave(&id);
        Ok(id)
    }

    /// Insert a batch, returning the number of successful inserts
    pub fn insert_many(&self, batch: Vec<Fields>) -> usize {
        let mut inserted = 0;
        for fields in batch {
            match self.insert(fields) {
                Ok(_) => inserted += 1,
                Err(e) => {
                    tracing::warn!(target: "folio::sync", error = %e, "insert_many entry skipped")
                }
            }
        }
        inserted
    }

    /// Materialize a record by id
    pub fn get(&self, id: &str) -> Option<Record> {
        self.inner.collection.get(id)
    }

    /// Check if an id is live
    pub fn has(&self, id: &str) -> bool {
        self.inner.collection.has(id)
    }

    /// Materialize every live record in scan order
    pub fn all(&self) -> Vec<Record> {
        self.inner.collection.all()
    }

    /// Records matching a predicate over the raw field projection
    pub fn find<P>(&self, predicate: P) -> Vec<Record>
    where
        P: Fn(&RowView<'_>) -> bool,
    {
        self.inner.collection.find(predicate)
    }

    /// First match in scan order
    pub fn find_one<P>(&self, predicate: P) -> Option<Record>
    where
        P: Fn(&RowView<'_>) -> bool,
    {
        self.inner.collection.find_one(predicate)
    }

    /// Count matches without materializing records
    pub fn count<P>(&self, predicate: P) -> usize
    where
        P: Fn(&RowView<'_>) -> bool,
    {
        self.inner.collection.count(predicate)
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.inner.collection.len()
    }

    /// Check if the collection has no records
    pub fn is_empty(&self) -> bool {
        self.inner.collection.is_empty()
    }

    /// Merge the listed fields into a record; `false` for unknown ids
    pub fn update(&self, id: &str, fields: Fields) -> Result<bool> {
        let touched = self.inner.collection.update(id, fields)?;
        if touched {
            self.autosave(id);
        }
        Ok(touched)
    }

    /// Single-field variant of [`update`](PersistentCollection::update)
    pub fn update_field(&self, id: &str, field: &str, value: FieldValue) -> Result<bool> {
        let touched = self.inner.collection.update_field(id, field, value)?;
        if touched {
            self.autosave(id);
        }
        Ok(touched)
    }

    /// Update every matching record; the match set is snapshotted before any
    /// mutation. Returns how many were touched — records that disappear
    /// between the snapshot and the apply (a watcher delete, say) are
    /// skipped, not counted.
    pub fn update_many<P>(&self, predicate: P, fields: Fields) -> Result<usize>
    where
        P: Fn(&RowView<'_>) -> bool,
    {
        let ids: Vec<String> = self
            .inner
            .collection
            .find(predicate)
            .into_iter()
            .map(|record| record.id)
            .collect();
        self.update_ids(&ids, &fields)
    }

    fn update_ids(&self, ids: &[String], fields: &Fields) -> Result<usize> {
        let mut touched = 0;
        for id in ids {
            if self.inner.collection.update(id, fields.clone())? {
                self.autosave(id);
                touched += 1;
            }
        }
        Ok(touched)
    }

    /// Delete a record, its fingerprints, and its file. Returns `false`
    /// (touching nothing) for unknown ids.
    pub fn delete(&self, id: &str) -> bool {
        if !self.inner.collection.delete(id) {
            return false;
        }
        self.inner.tracker.clear_record(id);
        self.delete_file(id);
        true
    }

    /// Delete every matching record, snapshot-then-apply
    pub fn delete_many<P>(&self, predicate: P) -> usize
    where
        P: Fn(&RowView<'_>) -> bool,
    {
        let ids: Vec<String> = self
            .inner
            .collection
            .find(predicate)
            .into_iter()
            .map(|record| record.id)
            .collect();
        let mut deleted = 0;
        for id in &ids {
            if self.delete(id) {
                deleted += 1;
            }
        }
        deleted
    }

    /// Reset the in-memory state only; files on disk are untouched.
    /// Resynchronize afterwards with [`load`](PersistentCollection::load).
    pub fn clear(&self) {
        self.inner.collection.clear();
        self.inner.tracker.clear();
    }

    // ---- Staleness --------------------------------------------------------

    /// A record is stale when its metadata flag is set or any embedding
    /// fingerprint no longer matches the current content column value
    pub fn is_stale(&self, id: &str) -> bool {
        if self.inner.collection.is_stale(id) {
            return true;
        }
        match self.content_of(id) {
            Some(content) => self.inner.tracker.is_content_stale(id, &content),
            None => false,
        }
    }

    /// Ids of every stale record, in scan order
    pub fn stale_ids(&self) -> Vec<String> {
        self.all()
            .into_iter()
            .map(|record| record.id)
            .filter(|id| self.is_stale(id))
            .collect()
    }

    /// Force the metadata staleness flag; `false` for unknown ids
    pub fn set_stale(&self, id: &str, stale: bool) -> bool {
        self.inner.collection.set_stale(id, stale)
    }

    /// Store an embedding and fingerprint the content it was computed from.
    ///
    /// Clears the record's staleness flag: the embedding is current as of
    /// this call. Returns `false` for unknown ids.
    pub fn set_embedding(&self, id: &str, field: &str, embedding: Vec<f32>) -> Result<bool> {
        let touched = self
            .inner
            .collection
            .update_field(id, field, FieldValue::Vector(embedding))?;
        if !touched {
            return Ok(false);
        }
        let content = self.content_of(id).unwrap_or_default();
        self.inner.tracker.set_embedding(id, field, &content);
        self.inner.collection.set_stale(id, false);
        self.autosave(id);
        Ok(true)
    }

    /// Brute-force cosine search; `stale` on each hit is re-derived from the
    /// fingerprint tracker against the hit's current content
    pub fn search(&self, field: &str, query: &[f32], options: &SearchOptions) -> Result<Vec<SearchHit>> {
        let mut hits = vector_search(&self.inner.collection, field, query, options)?;
        for hit in &mut hits {
            let content = self.record_content(&hit.record);
            hit.stale = hit.stale
                || self
                    .inner
                    .tracker
                    .is_content_stale(&hit.record.id, &content);
        }
        Ok(hits)
    }

    // ---- Persistence ------------------------------------------------------

    /// Scan the directory and apply every decodable record file, preserving
    /// file timestamps. Returns how many records were loaded; bad files are
    /// skipped with a warning.
    pub fn load(&self) -> Result<usize> {
        let mut loaded = 0;
        for entry in std::fs::read_dir(&self.inner.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(stem) = paths::id_from_filename(&name) else {
                continue;
            };
            let text = match std::fs::read_to_string(entry.path()) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(target: "folio::sync", file = %name, error = %e, "unreadable file skipped");
                    continue;
                }
            };
            let decoded = match codec::decode(&text) {
                Ok(decoded) => decoded,
                Err(e) => {
                    tracing::warn!(target: "folio::sync", file = %name, error = %e, "undecodable file skipped");
                    continue;
                }
            };
            let id = decoded.id.clone().unwrap_or_else(|| stem.to_string());
            match self.apply_decoded(&id, &decoded) {
                Ok(()) => {
                    loaded += 1;
                    if let Some(watcher) = self.inner.watcher.lock().as_ref() {
                        watcher.register_known(&name, &id);
                    }
                }
                Err(e) => {
                    tracing::warn!(target: "folio::sync", file = %name, error = %e, "nonconforming file skipped")
                }
            }
        }
        tracing::debug!(
            target: "folio::sync",
            dir = %self.inner.dir.display(),
            loaded,
            "directory loaded"
        );
        Ok(loaded)
    }

    /// Write one record's file. Returns `false` (logging the failure) when
    /// the id is unknown or the write fails.
    pub fn save_record(&self, id: &str) -> bool {
        let Some(record) = self.inner.collection.get(id) else {
            return false;
        };
        let text = codec::encode(
            &record,
            self.schema(),
            self.inner.content_column.as_deref(),
        );
        let filename = paths::record_filename(id);
        let path = self.inner.dir.join(&filename);

        let watcher = self.inner.watcher.lock();
        if let Some(watcher) = watcher.as_ref() {
            watcher.mark_saving(id);
        }
        let outcome = std::fs::write(&path, text);
        if let Some(watcher) = watcher.as_ref() {
            watcher.complete_saving(id);
            watcher.register_known(&filename, id);
        }
        match outcome {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(target: "folio::sync", id = %id, error = %e, "save failed");
                false
            }
        }
    }

    /// Write every record's file, returning how many succeeded
    pub fn save(&self) -> usize {
        self.all()
            .into_iter()
            .filter(|record| self.save_record(&record.id))
            .count()
    }

    // ---- Watching ---------------------------------------------------------

    /// Start the directory watcher. No-op when already watching.
    pub fn start_watching(&self) -> Result<()> {
        let mut slot = self.inner.watcher.lock();
        if slot.is_some() {
            return Ok(());
        }
        let watcher = DirWatcher::start(
            &self.inner.dir,
            self.inner.debounce,
            self.inner.grace,
            self.stale_check(),
        )?;
        // Bind every live record's filename so external deletes carry the
        // right id
        for record in self.inner.collection.all() {
            watcher.register_known(&paths::record_filename(&record.id), &record.id);
        }
        let weak = Arc::downgrade(&self.inner);
        watcher.on_change(move |change| {
            if let Some(inner) = weak.upgrade() {
                PersistentCollection { inner }.apply_external(change);
            }
        });
        *slot = Some(watcher);
        Ok(())
    }

    /// Stop the directory watcher. No-op when not watching.
    pub fn stop_watching(&self) {
        if let Some(watcher) = self.inner.watcher.lock().take() {
            watcher.stop();
        }
    }

    /// Register a callback invoked after any external change is applied
    pub fn on_file_change<F>(&self, listener: F)
    where
        F: Fn(&FileChange) + Send + Sync + 'static,
    {
        self.inner.listeners.lock().push(Arc::new(listener));
    }

    /// Flush unsaved records and stop watching
    pub fn close(&self) {
        self.save();
        self.stop_watching();
    }

    // ---- Internals --------------------------------------------------------

    fn autosave(&self, id: &str) {
        if self.inner.auto_save {
            self.save_record(id);
        }
    }

    fn delete_file(&self, id: &str) {
        let filename = paths::record_filename(id);
        let path = self.inner.dir.join(&filename);
        if let Some(watcher) = self.inner.watcher.lock().as_ref() {
            watcher.forget_known(&filename);
        }
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!(target: "folio::sync", id = %id, error = %e, "file delete failed");
            }
        }
    }

    /// Content column value of a live record
    fn content_of(&self, id: &str) -> Option<String> {
        let record = self.inner.collection.get(id)?;
        Some(self.record_content(&record))
    }

    fn record_content(&self, record: &Record) -> String {
        self.inner
            .content_column
            .as_deref()
            .and_then(|column| record.field(column))
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_default()
    }

    fn stale_check(&self) -> StaleCheck {
        let tracker = self.inner.tracker.clone();
        Box::new(move |id, decoded| tracker.is_content_stale(id, &decoded.body))
    }

    /// Conform decoded file state into the collection, file as truth
    fn apply_decoded(&self, id: &str, decoded: &DecodedRecord) -> Result<()> {
        let schema = self.schema();
        let mut fields = Fields::new();
        for (name, value) in &decoded.fields {
            if schema.column_type(name).is_some() {
                fields.insert(name.clone(), value.clone());
            } else {
                tracing::trace!(target: "folio::sync", id = %id, field = %name, "unknown field ignored");
            }
        }
        if let Some(content) = self.inner.content_column.as_deref() {
            fields.insert(content.to_string(), FieldValue::String(decoded.body.clone()));
        }
        let now = chrono::Utc::now().timestamp_millis();
        let created = decoded.created.unwrap_or(now);
        let updated = decoded.updated.unwrap_or(created);
        self.inner
            .collection
            .upsert_external(id, fields, created, updated)
    }

    /// A debounced external change fired: apply disk state, then notify
    fn apply_external(&self, change: &FileChange) {
        match change {
            FileChange::Created { id, decoded, stale }
            | FileChange::Updated { id, decoded, stale } => {
                if let Err(e) = self.apply_decoded(id, decoded) {
                    tracing::warn!(target: "folio::sync", id = %id, error = %e, "external change not applicable");
                    return;
                }
                self.inner.collection.set_stale(id, *stale);
            }
            FileChange::Deleted { id } => {
                self.inner.collection.delete(id);
                self.inner.tracker.clear_record(id);
            }
        }
        // Each callback is contained on its own; one panicking listener
        // never starves the ones registered after it
        if let Some(callback) = &self.inner.on_external_change {
            if catch_unwind(AssertUnwindSafe(|| callback(change))).is_err() {
                tracing::error!(target: "folio::sync", id = %change.id(), "external-change callback panicked");
            }
        }
        let listeners: Vec<ChangeListener> = self.inner.listeners.lock().clone();
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(change))).is_err() {
                tracing::error!(target: "folio::sync", id = %change.id(), "file-change listener panicked");
            }
        }
    }
}

impl Drop for PersistInner {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.get_mut().take() {
            watcher.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::fields;

    fn schema() -> Schema {
        Schema::builder()
            .string("title")
            .number("priority")
            .string("content")
            .vector("embedding", 2)
            .build()
            .unwrap()
    }

    fn config() -> CollectionConfig {
        CollectionConfig::new(schema())
            .content_column("content")
            .watch_files(false)
    }

    #[test]
    fn test_insert_persists_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let coll = PersistentCollection::open(dir.path(), config()).unwrap();
        let id = coll
            .insert(fields! { "title" => "note", "content" => "body text" })
            .unwrap();

        let path = dir.path().join(format!("{}.md", id));
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.starts_with("---\n"));
        assert!(text.contains("title: note"));
        assert!(text.ends_with("body text"));
    }

    #[test]
    fn test_open_loads_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        {
            let coll = PersistentCollection::open(dir.path(), config()).unwrap();
            coll.insert_many(vec![
                fields! { "title" => "a", "content" => "A" },
                fields! { "title" => "b", "content" => "B" },
            ]);
        }
        let reopened = PersistentCollection::open(dir.path(), config()).unwrap();
        assert_eq!(reopened.len(), 2);
        let a = reopened
            .find_one(|row| row.text("title").as_deref() == Some("a"))
            .unwrap();
        assert_eq!(a.field("content"), Some(&FieldValue::from("A")));
    }

    #[test]
    fn test_load_preserves_file_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("old.md"),
            "---\nid: old\ncreated: 111\nupdated: 222\ntitle: kept\n---\n\nbody",
        )
        .unwrap();
        let coll = PersistentCollection::open(dir.path(), config()).unwrap();
        let record = coll.get("old").unwrap();
        assert_eq!(record.created, 111);
        assert_eq!(record.updated, 222);
        assert_eq!(record.field("content"), Some(&FieldValue::from("body")));
    }

    #[test]
    fn test_load_skips_undecodable_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.md"), "---\nnever closed").unwrap();
        std::fs::write(dir.path().join("good.md"), "---\nid: good\n---\n\nok").unwrap();
        let coll = PersistentCollection::open(dir.path(), config()).unwrap();
        assert_eq!(coll.len(), 1);
        assert!(coll.has("good"));
    }

    #[test]
    fn test_delete_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let coll = PersistentCollection::open(dir.path(), config()).unwrap();
        let id = coll.insert(fields! { "title" => "gone" }).unwrap();
        let path = dir.path().join(format!("{}.md", id));
        assert!(path.exists());

        assert!(coll.delete(&id));
        assert!(!path.exists());
        assert!(!coll.has(&id));
        assert!(!coll.delete(&id));
    }

    #[test]
    fn test_auto_save_off_keeps_disk_untouched_until_save() {
        let dir = tempfile::tempdir().unwrap();
        let coll = PersistentCollection::open(dir.path(), config().auto_save(false)).unwrap();
        let id = coll.insert(fields! { "title" => "memory only" }).unwrap();
        assert!(!dir.path().join(format!("{}.md", id)).exists());

        assert_eq!(coll.save(), 1);
        assert!(dir.path().join(format!("{}.md", id)).exists());
    }

    #[test]
    fn test_update_rewrites_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let coll = PersistentCollection::open(dir.path(), config()).unwrap();
        let id = coll.insert(fields! { "title" => "v1" }).unwrap();
        coll.update(&id, fields! { "title" => "v2" }).unwrap();

        let text = std::fs::read_to_string(dir.path().join(format!("{}.md", id))).unwrap();
        assert!(text.contains("title: v2"));
    }

    #[test]
    fn test_clear_resets_memory_not_disk() {
        let dir = tempfile::tempdir().unwrap();
        let coll = PersistentCollection::open(dir.path(), config()).unwrap();
        let id = coll.insert(fields! { "title" => "kept on disk" }).unwrap();

        coll.clear();
        assert!(coll.is_empty());
        assert!(dir.path().join(format!("{}.md", id)).exists());

        assert_eq!(coll.load().unwrap(), 1);
        assert!(coll.has(&id));
    }

    #[test]
    fn test_embedding_staleness_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let coll = PersistentCollection::open(dir.path(), config()).unwrap();
        let id = coll
            .insert(fields! { "title" => "doc", "content" => "original" })
            .unwrap();

        // No embedding yet: nothing to be stale
        assert!(!coll.is_stale(&id));

        coll.set_embedding(&id, "embedding", vec![1.0, 0.0]).unwrap();
        assert!(!coll.is_stale(&id));

        // Content drift flips staleness
        coll.update_field(&id, "content", FieldValue::from("rewritten"))
            .unwrap();
        assert!(coll.is_stale(&id));
        assert_eq!(coll.stale_ids(), vec![id.clone()]);

        // Re-embedding clears it
        coll.set_embedding(&id, "embedding", vec![0.0, 1.0]).unwrap();
        assert!(!coll.is_stale(&id));
    }

    #[test]
    fn test_set_embedding_unknown_id() {
        let dir = tempfile::tempdir().unwrap();
        let coll = PersistentCollection::open(dir.path(), config()).unwrap();
        assert!(!coll.set_embedding("missing", "embedding", vec![1.0, 0.0]).unwrap());
    }

    #[test]
    fn test_search_rederives_staleness_from_content() {
        let dir = tempfile::tempdir().unwrap();
        let coll = PersistentCollection::open(dir.path(), config()).unwrap();
        let id = coll
            .insert(fields! { "title" => "doc", "content" => "original" })
            .unwrap();
        coll.set_embedding(&id, "embedding", vec![1.0, 0.0]).unwrap();
        coll.update_field(&id, "content", FieldValue::from("drifted"))
            .unwrap();

        let hits = coll
            .search("embedding", &[1.0, 0.0], &SearchOptions::default())
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].stale);
    }

    #[test]
    fn test_update_many_and_delete_many_persist() {
        let dir = tempfile::tempdir().unwrap();
        let coll = PersistentCollection::open(dir.path(), config()).unwrap();
        for n in [1, 2, 3] {
            coll.insert(fields! { "title" => format!("n{}", n), "priority" => n })
                .unwrap();
        }

        let touched = coll
            .update_many(
                |row| row.number("priority").unwrap_or(0.0) < 3.0,
                fields! { "priority" => 10 },
            )
            .unwrap();
        assert_eq!(touched, 2);

        let removed = coll.delete_many(|row| row.number("priority") == Some(10.0));
        assert_eq!(removed, 2);
        assert_eq!(coll.len(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_update_many_counts_only_live_records() {
        let dir = tempfile::tempdir().unwrap();
        let coll = PersistentCollection::open(dir.path(), config()).unwrap();
        let a = coll.insert(fields! { "title" => "a" }).unwrap();
        let b = coll.insert(fields! { "title" => "b" }).unwrap();

        // A record deleted after the id snapshot is skipped, not counted
        let snapshot = vec![a.clone(), b.clone()];
        assert!(coll.delete(&b));
        let touched = coll
            .update_ids(&snapshot, &fields! { "title" => "touched" })
            .unwrap();
        assert_eq!(touched, 1);
        assert_eq!(
            coll.get(&a).unwrap().field("title"),
            Some(&FieldValue::from("touched"))
        );
    }

    #[test]
    fn test_content_column_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let config = CollectionConfig::new(schema())
            .content_column("nonexistent")
            .watch_files(false);
        let result = PersistentCollection::open(dir.path(), config);
        assert!(matches!(result, Err(Error::UnknownColumn(_))));
    }

    #[test]
    fn test_close_flushes_unsaved_records() {
        let dir = tempfile::tempdir().unwrap();
        let coll = PersistentCollection::open(dir.path(), config().auto_save(false)).unwrap();
        let id = coll.insert(fields! { "title" => "flushed" }).unwrap();
        coll.close();
        assert!(dir.path().join(format!("{}.md", id)).exists());
    }
}
