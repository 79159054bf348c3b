//! Collection - CRUD and scans over registry + columns + metadata
//!
//! A `Collection` composes the slot registry, the columnar buffers and the
//! metadata arrays into the record-level API. It owns no I/O; persistence
//! layers compose around it.
//!
//! ## Ownership and concurrency
//!
//! The handle is cheap to clone (`Arc` inner). All state sits behind one
//! `RwLock`; every mutation runs synchronously on the calling thread and
//! bumps an atomic version stamp that the reactive layer keys its caches on.
//! There is no module-level registry of collections — each one is an
//! explicitly constructed, independently owned instance.
//!
//! ## Predicates
//!
//! Filter predicates receive a [`RowView`] — the raw field projection at a
//! slot — not a materialized [`Record`]. Records are only materialized for
//! rows that are actually returned.

use crate::columns::ColumnStore;
use crate::metadata::MetadataStore;
use crate::registry::SlotRegistry;
use folio_core::{generate_id, Fields, FieldValue, Record, Result, Schema};
use parking_lot::{RwLock, RwLockReadGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Current time in epoch milliseconds
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Raw field projection at one slot, handed to filter predicates.
///
/// Deliberately excludes `id`, `created`, `updated` and `stale`: predicates
/// operate on column data only.
pub struct RowView<'a> {
    columns: &'a ColumnStore,
    slot: u32,
}

impl RowView<'_> {
    /// The slot under scan
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Field value at this row; `None` for names outside the schema
    pub fn get(&self, field: &str) -> Option<FieldValue> {
        self.columns.get(field, self.slot).ok()
    }

    /// String field shortcut
    pub fn text(&self, field: &str) -> Option<String> {
        match self.get(field)? {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Number field shortcut
    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field)?.as_number()
    }

    /// Boolean field shortcut
    pub fn boolean(&self, field: &str) -> Option<bool> {
        self.get(field)?.as_bool()
    }
}

pub(crate) struct CollectionState {
    pub(crate) registry: SlotRegistry,
    pub(crate) columns: ColumnStore,
    pub(crate) meta: MetadataStore,
}

impl CollectionState {
    pub(crate) fn materialize(&self, slot: u32, id: &str) -> Record {
        Record {
            id: id.to_string(),
            created: self.meta.created(slot),
            updated: self.meta.updated(slot),
            stale: self.meta.stale(slot),
            fields: self.columns.row(slot),
        }
    }

    pub(crate) fn row_view(&self, slot: u32) -> RowView<'_> {
        RowView {
            columns: &self.columns,
            slot,
        }
    }
}

struct CollectionInner {
    schema: Arc<Schema>,
    state: RwLock<CollectionState>,
    /// Mutation counter; derived views cache against it
    version: AtomicU64,
}

/// Schema-defined record collection over slot-addressed columnar buffers
#[derive(Clone)]
pub struct Collection {
    inner: Arc<CollectionInner>,
}

impl Collection {
    /// Create an empty collection for a validated schema
    pub fn new(schema: Schema) -> Self {
        let schema = Arc::new(schema);
        Collection {
            inner: Arc::new(CollectionInner {
                state: RwLock::new(CollectionState {
                    registry: SlotRegistry::new(),
                    columns: ColumnStore::new(schema.clone()),
                    meta: MetadataStore::new(),
                }),
                schema,
                version: AtomicU64::new(0),
            }),
        }
    }

    /// The collection schema
    pub fn schema(&self) -> &Arc<Schema> {
        &self.inner.schema
    }

    /// Current mutation version stamp
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    fn bump_version(&self) {
        self.inner.version.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, CollectionState> {
        self.inner.state.read()
    }

    /// Insert a record with a generated id, returning the id.
    ///
    /// Omitted schema fields take their type default; `created` and
    /// `updated` are stamped with the current time.
    ///
    /// # Errors
    ///
    /// `UnknownColumn`/`TypeMismatch`/`DimensionMismatch` from field
    /// conformance; nothing is inserted on error.
    pub fn insert(&self, fields: Fields) -> Result<String> {
        self.insert_with_id(&generate_id(), fields)
    }

    /// Insert (or fully replace) a record under a caller-supplied id.
    pub fn insert_with_id(&self, id: &str, fields: Fields) -> Result<String> {
        let now = now_millis();
        let mut state = self.inner.state.write();
        let existed = state.registry.contains(id);
        let slot = state.registry.allocate(id);
        if let Err(e) = state.columns.set_row(slot, &fields) {
            // Roll back a freshly allocated slot so bad input has no effect
            if !existed {
                state.registry.release(id);
            }
            return Err(e);
        }
        state.meta.touch_insert(slot, now);
        self.bump_version();
        Ok(id.to_string())
    }

    /// Insert a batch, returning the number of successful inserts.
    ///
    /// Failing entries are skipped and logged, never raised.
    pub fn insert_many(&self, batch: Vec<Fields>) -> usize {
        let mut inserted = 0;
        for fields in batch {
            match self.insert(fields) {
                Ok(_) => inserted += 1,
                Err(e) => {
                    tracing::warn!(target: "folio::store", error = %e, "insert_many entry skipped")
                }
            }
        }
        inserted
    }

    /// Materialize a record by id; O(1) via the registry
    pub fn get(&self, id: &str) -> Option<Record> {
        let state = self.read_state();
        let slot = state.registry.slot_of(id)?;
        Some(state.materialize(slot, id))
    }

    /// Check if an id is live
    pub fn has(&self, id: &str) -> bool {
        self.read_state().registry.contains(id)
    }

    /// Materialize every live record in scan order
    pub fn all(&self) -> Vec<Record> {
        let state = self.read_state();
        state
            .registry
            .live_slots()
            .map(|(slot, id)| state.materialize(slot, id))
            .collect()
    }

    /// Linear scan over live slots; materializes matching rows only
    pub fn find<P>(&self, predicate: P) -> Vec<Record>
    where
        P: Fn(&RowView<'_>) -> bool,
    {
        let state = self.read_state();
        state
            .registry
            .live_slots()
            .filter(|(slot, _)| predicate(&state.row_view(*slot)))
            .map(|(slot, id)| state.materialize(slot, id))
            .collect()
    }

    /// First match in scan order
    pub fn find_one<P>(&self, predicate: P) -> Option<Record>
    where
        P: Fn(&RowView<'_>) -> bool,
    {
        let state = self.read_state();
        // Bound to a local so the iterator's borrow of `state` ends before
        // the guard is dropped
        let found = state
            .registry
            .live_slots()
            .find(|(slot, _)| predicate(&state.row_view(*slot)))
            .map(|(slot, id)| state.materialize(slot, id));
        found
    }

    /// Count matches without materializing any record
    pub fn count<P>(&self, predicate: P) -> usize
    where
        P: Fn(&RowView<'_>) -> bool,
    {
        let state = self.read_state();
        state
            .registry
            .live_slots()
            .filter(|(slot, _)| predicate(&state.row_view(*slot)))
            .count()
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.read_state().registry.len()
    }

    /// Check if the collection has no records
    pub fn is_empty(&self) -> bool {
        self.read_state().registry.is_empty()
    }

    /// Rewrite only the listed fields and bump `updated`.
    ///
    /// Returns `false` if the id is unknown; `created` is never changed.
    pub fn update(&self, id: &str, fields: Fields) -> Result<bool> {
        let now = now_millis();
        let mut state = self.inner.state.write();
        let slot = match state.registry.slot_of(id) {
            Some(slot) => slot,
            None => return Ok(false),
        };
        state.columns.merge_row(slot, &fields)?;
        state.meta.touch_update(slot, now);
        self.bump_version();
        Ok(true)
    }

    /// Single-field variant of [`update`](Collection::update)
    pub fn update_field(&self, id: &str, field: &str, value: FieldValue) -> Result<bool> {
        let now = now_millis();
        let mut state = self.inner.state.write();
        let slot = match state.registry.slot_of(id) {
            Some(slot) => slot,
            None => return Ok(false),
        };
        state.columns.set(field, slot, value)?;
        state.meta.touch_update(slot, now);
        self.bump_version();
        Ok(true)
    }

    /// Update every matching record, returning how many were touched.
    ///
    /// The matching id set is snapshotted before any mutation, so rewrites
    /// can never skip or double-visit rows mid-scan.
    pub fn update_many<P>(&self, predicate: P, fields: Fields) -> Result<usize>
    where
        P: Fn(&RowView<'_>) -> bool,
    {
        let now = now_millis();
        let mut state = self.inner.state.write();
        let matches: Vec<u32> = state
            .registry
            .live_slots()
            .filter(|(slot, _)| predicate(&state.row_view(*slot)))
            .map(|(slot, _)| slot)
            .collect();
        for &slot in &matches {
            state.columns.merge_row(slot, &fields)?;
            state.meta.touch_update(slot, now);
        }
        if !matches.is_empty() {
            self.bump_version();
        }
        Ok(matches.len())
    }

    /// Delete a record: columns and metadata reset to defaults, slot
    /// released for reuse. Returns `false` (mutating nothing) if unknown.
    pub fn delete(&self, id: &str) -> bool {
        let mut state = self.inner.state.write();
        let slot = match state.registry.release(id) {
            Some(slot) => slot,
            None => return false,
        };
        state.columns.clear_slot(slot);
        state.meta.clear_slot(slot);
        self.bump_version();
        true
    }

    /// Delete every matching record, snapshot-then-apply like `update_many`.
    pub fn delete_many<P>(&self, predicate: P) -> usize
    where
        P: Fn(&RowView<'_>) -> bool,
    {
        let mut state = self.inner.state.write();
        let matches: Vec<String> = state
            .registry
            .live_slots()
            .filter(|(slot, _)| predicate(&state.row_view(*slot)))
            .map(|(_, id)| id.to_string())
            .collect();
        for id in &matches {
            if let Some(slot) = state.registry.release(id) {
                state.columns.clear_slot(slot);
                state.meta.clear_slot(slot);
            }
        }
        if !matches.is_empty() {
            self.bump_version();
        }
        matches.len()
    }

    /// Staleness flag of a record; `false` for unknown ids
    pub fn is_stale(&self, id: &str) -> bool {
        let state = self.read_state();
        match state.registry.slot_of(id) {
            Some(slot) => state.meta.stale(slot),
            None => false,
        }
    }

    /// Set the staleness flag; returns `false` if the id is unknown
    pub fn set_stale(&self, id: &str, stale: bool) -> bool {
        let mut state = self.inner.state.write();
        let slot = match state.registry.slot_of(id) {
            Some(slot) => slot,
            None => return false,
        };
        state.meta.set_stale(slot, stale);
        self.bump_version();
        true
    }

    /// Ids of every record currently flagged stale, in scan order
    pub fn stale_ids(&self) -> Vec<String> {
        let state = self.read_state();
        state
            .registry
            .live_slots()
            .filter(|(slot, _)| state.meta.stale(*slot))
            .map(|(_, id)| id.to_string())
            .collect()
    }

    /// Full reset: registry, columns and metadata all dropped to empty
    pub fn clear(&self) {
        let mut state = self.inner.state.write();
        state.registry.clear();
        state.columns.reset();
        state.meta.reset();
        self.bump_version();
    }

    /// Apply externally observed record state (persistence hook).
    ///
    /// Replaces the whole row and stamps `created`/`updated` from the file
    /// rather than the clock. The staleness flag is left for the caller.
    pub fn upsert_external(
        &self,
        id: &str,
        fields: Fields,
        created: i64,
        updated: i64,
    ) -> Result<()> {
        let mut state = self.inner.state.write();
        let existed = state.registry.contains(id);
        let slot = state.registry.allocate(id);
        if let Err(e) = state.columns.set_row(slot, &fields) {
            if !existed {
                state.registry.release(id);
            }
            return Err(e);
        }
        state.meta.set_times(slot, created, updated);
        if !existed {
            state.meta.set_stale(slot, false);
        }
        self.bump_version();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{fields, Error};

    fn collection() -> Collection {
        let schema = Schema::builder()
            .string("name")
            .number("score")
            .boolean("active")
            .vector("embedding", 2)
            .build()
            .unwrap();
        Collection::new(schema)
    }

    #[test]
    fn test_insert_and_get() {
        let coll = collection();
        let id = coll
            .insert(fields! { "name" => "Ada", "score" => 5 })
            .unwrap();
        let record = coll.get(&id).unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.field("name"), Some(&FieldValue::from("Ada")));
        assert_eq!(record.field("score"), Some(&FieldValue::Number(5.0)));
        // Omitted fields hold defaults
        assert_eq!(record.field("active"), Some(&FieldValue::Bool(false)));
        assert_eq!(record.field("embedding"), Some(&FieldValue::Null));
        assert!(record.created > 0);
        assert_eq!(record.created, record.updated);
        assert!(!record.stale);
    }

    #[test]
    fn test_insert_bad_fields_leaves_nothing_behind() {
        let coll = collection();
        let result = coll.insert(fields! { "bogus" => 1 });
        assert!(matches!(result, Err(Error::UnknownColumn(_))));
        assert_eq!(coll.len(), 0);
        // The rolled-back slot is reused by the next insert
        let id = coll.insert(fields! { "name" => "Ada" }).unwrap();
        assert_eq!(coll.read_state().registry.slot_of(&id), Some(0));
    }

    #[test]
    fn test_get_unknown_is_none() {
        let coll = collection();
        assert!(coll.get("missing").is_none());
        assert!(!coll.has("missing"));
    }

    #[test]
    fn test_update_merges_and_bumps_updated() {
        let coll = collection();
        let id = coll
            .insert(fields! { "name" => "Ada", "score" => 5 })
            .unwrap();
        let before = coll.get(&id).unwrap();

        assert!(coll.update(&id, fields! { "score" => 9 }).unwrap());
        let after = coll.get(&id).unwrap();
        assert_eq!(after.field("name"), Some(&FieldValue::from("Ada")));
        assert_eq!(after.field("score"), Some(&FieldValue::Number(9.0)));
        assert_eq!(after.created, before.created);
        assert!(after.updated >= before.updated);
    }

    #[test]
    fn test_update_unknown_id_is_false() {
        let coll = collection();
        assert!(!coll.update("missing", fields! { "score" => 1 }).unwrap());
        assert!(!coll
            .update_field("missing", "score", FieldValue::from(1.0))
            .unwrap());
    }

    #[test]
    fn test_update_field() {
        let coll = collection();
        let id = coll.insert(fields! { "score" => 1 }).unwrap();
        assert!(coll
            .update_field(&id, "score", FieldValue::from(2.0))
            .unwrap());
        assert_eq!(
            coll.get(&id).unwrap().field("score"),
            Some(&FieldValue::Number(2.0))
        );
    }

    #[test]
    fn test_delete_then_get_absent() {
        let coll = collection();
        let id = coll.insert(fields! { "name" => "Ada" }).unwrap();
        assert!(coll.delete(&id));
        assert!(coll.get(&id).is_none());
        assert!(!coll.delete(&id));
        assert_eq!(coll.len(), 0);
    }

    #[test]
    fn test_delete_unknown_mutates_nothing() {
        let coll = collection();
        coll.insert(fields! { "name" => "Ada" }).unwrap();
        let version = coll.version();
        assert!(!coll.delete("missing"));
        assert_eq!(coll.version(), version);
        assert_eq!(coll.len(), 1);
    }

    #[test]
    fn test_slot_reuse_after_delete() {
        let coll = collection();
        let a = coll.insert(fields! { "name" => "a" }).unwrap();
        let _b = coll.insert(fields! { "name" => "b" }).unwrap();
        {
            let state = coll.read_state();
            assert_eq!(state.registry.slot_of(&a), Some(0));
        }
        coll.delete(&a);
        let c = coll.insert(fields! { "name" => "c" }).unwrap();
        // LIFO reuse: new record takes the freed slot before any higher one
        assert_eq!(coll.read_state().registry.slot_of(&c), Some(0));
        // Freed slot was wiped before reuse
        assert_eq!(
            coll.get(&c).unwrap().field("name"),
            Some(&FieldValue::from("c"))
        );
    }

    #[test]
    fn test_find_scans_live_slots() {
        let coll = collection();
        coll.insert(fields! { "name" => "a", "score" => 1 }).unwrap();
        coll.insert(fields! { "name" => "b", "score" => 5 }).unwrap();
        coll.insert(fields! { "name" => "c", "score" => 9 }).unwrap();

        let high = coll.find(|row| row.number("score").unwrap_or(0.0) > 3.0);
        assert_eq!(high.len(), 2);
        assert_eq!(high[0].field("name"), Some(&FieldValue::from("b")));

        let one = coll.find_one(|row| row.text("name").as_deref() == Some("c"));
        assert!(one.is_some());

        assert_eq!(coll.count(|row| row.number("score").unwrap_or(0.0) > 0.0), 3);
    }

    #[test]
    fn test_update_many_snapshots_matches() {
        let coll = collection();
        for score in [1, 2, 3, 4] {
            coll.insert(fields! { "score" => score }).unwrap();
        }
        // Flip every low score above the threshold; the snapshot taken
        // before mutating keeps the scan from revisiting rewritten rows.
        let touched = coll
            .update_many(
                |row| row.number("score").unwrap_or(0.0) < 3.0,
                fields! { "score" => 10 },
            )
            .unwrap();
        assert_eq!(touched, 2);
        assert_eq!(coll.count(|row| row.number("score") == Some(10.0)), 2);
    }

    #[test]
    fn test_delete_many() {
        let coll = collection();
        for score in [1, 2, 3] {
            coll.insert(fields! { "score" => score }).unwrap();
        }
        let removed = coll.delete_many(|row| row.number("score").unwrap_or(0.0) < 3.0);
        assert_eq!(removed, 2);
        assert_eq!(coll.len(), 1);
    }

    #[test]
    fn test_insert_many_counts_successes() {
        let coll = collection();
        let inserted = coll.insert_many(vec![
            fields! { "name" => "a" },
            fields! { "bogus" => 1 },
            fields! { "name" => "b" },
        ]);
        assert_eq!(inserted, 2);
        assert_eq!(coll.len(), 2);
    }

    #[test]
    fn test_stale_flags() {
        let coll = collection();
        let id = coll.insert(fields! { "name" => "a" }).unwrap();
        assert!(!coll.is_stale(&id));
        assert!(coll.set_stale(&id, true));
        assert!(coll.is_stale(&id));
        assert_eq!(coll.stale_ids(), vec![id.clone()]);
        assert!(coll.set_stale(&id, false));
        assert!(coll.stale_ids().is_empty());
        assert!(!coll.set_stale("missing", true));
        assert!(!coll.is_stale("missing"));
    }

    #[test]
    fn test_clear() {
        let coll = collection();
        coll.insert(fields! { "name" => "a" }).unwrap();
        coll.clear();
        assert!(coll.is_empty());
        assert!(coll.all().is_empty());
    }

    #[test]
    fn test_version_bumps_on_every_mutation() {
        let coll = collection();
        let v0 = coll.version();
        let id = coll.insert(fields! { "score" => 1 }).unwrap();
        let v1 = coll.version();
        assert!(v1 > v0);
        coll.update(&id, fields! { "score" => 2 }).unwrap();
        let v2 = coll.version();
        assert!(v2 > v1);
        coll.delete(&id);
        assert!(coll.version() > v2);
        // Reads leave the stamp alone
        let v3 = coll.version();
        coll.all();
        coll.get(&id);
        assert_eq!(coll.version(), v3);
    }

    #[test]
    fn test_upsert_external_preserves_file_times() {
        let coll = collection();
        coll.upsert_external("ext-1", fields! { "name" => "Ada" }, 100, 200)
            .unwrap();
        let record = coll.get("ext-1").unwrap();
        assert_eq!(record.created, 100);
        assert_eq!(record.updated, 200);
        assert!(!record.stale);

        // Re-applying replaces the row
        coll.upsert_external("ext-1", fields! { "score" => 4 }, 100, 300)
            .unwrap();
        let record = coll.get("ext-1").unwrap();
        assert_eq!(record.field("name"), Some(&FieldValue::String(String::new())));
        assert_eq!(record.updated, 300);
    }

    #[test]
    fn test_collection_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Collection>();
    }
}
