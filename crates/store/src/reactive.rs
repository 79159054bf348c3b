//! Reactive derivation layer - memoized, auto-invalidating views
//!
//! Each derived view wraps a pure function of current collection state plus
//! a cache keyed by the collection's mutation version stamp. Reading a view
//! recomputes at most once when dirty and otherwise returns the cached
//! value; recomputation is synchronous on the reading thread, never
//! speculative, never partial.
//!
//! Invalidation is coarse: any collection mutation (insert/update/delete,
//! batched variants included) advances the version stamp and thereby dirties
//! every view over that collection. There is no per-field dependency
//! narrowing.

use crate::collection::{Collection, RowView};
use folio_core::{compare_values, FieldValue, Record};
use parking_lot::Mutex;

/// Sort direction for [`query_sorted`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest value first
    Ascending,
    /// Largest value first
    Descending,
}

/// A cached view over collection state, recomputed lazily when dirty
pub struct DerivedView<T> {
    collection: Collection,
    compute: Box<dyn Fn(&Collection) -> T + Send + Sync>,
    cache: Mutex<Option<(u64, T)>>,
}

impl<T: Clone> DerivedView<T> {
    /// Wrap a pure function of collection state
    pub fn new<F>(collection: Collection, compute: F) -> Self
    where
        F: Fn(&Collection) -> T + Send + Sync + 'static,
    {
        DerivedView {
            collection,
            compute: Box::new(compute),
            cache: Mutex::new(None),
        }
    }

    /// Current value; recomputes iff a mutation happened since last read
    pub fn get(&self) -> T {
        let version = self.collection.version();
        let mut cache = self.cache.lock();
        if let Some((cached_version, value)) = cache.as_ref() {
            if *cached_version == version {
                return value.clone();
            }
        }
        let value = (self.compute)(&self.collection);
        *cache = Some((version, value.clone()));
        value
    }

    /// Check whether the next read would recompute
    pub fn is_dirty(&self) -> bool {
        let version = self.collection.version();
        !matches!(&*self.cache.lock(), Some((cached, _)) if *cached == version)
    }
}

/// Live filtered query
pub fn query<P>(collection: &Collection, predicate: P) -> DerivedView<Vec<Record>>
where
    P: Fn(&RowView<'_>) -> bool + Send + Sync + 'static,
{
    DerivedView::new(collection.clone(), move |coll| coll.find(&predicate))
}

/// Live filtered query sorted by one field.
///
/// The ordering is re-derived from the filtered set on every recomputation —
/// never patched incrementally. The underlying sort is stable, so records
/// with equal keys keep scan order.
pub fn query_sorted<P>(
    collection: &Collection,
    predicate: P,
    sort_field: &str,
    order: SortOrder,
) -> DerivedView<Vec<Record>>
where
    P: Fn(&RowView<'_>) -> bool + Send + Sync + 'static,
{
    let sort_field = sort_field.to_string();
    DerivedView::new(collection.clone(), move |coll| {
        let mut records = coll.find(&predicate);
        records.sort_by(|a, b| {
            let left = a.field(&sort_field).unwrap_or(&FieldValue::Null);
            let right = b.field(&sort_field).unwrap_or(&FieldValue::Null);
            let ordering = compare_values(left, right);
            match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
        records
    })
}

/// Live first-match view
pub fn query_first<P>(collection: &Collection, predicate: P) -> DerivedView<Option<Record>>
where
    P: Fn(&RowView<'_>) -> bool + Send + Sync + 'static,
{
    DerivedView::new(collection.clone(), move |coll| coll.find_one(&predicate))
}

/// Live match count
pub fn query_count<P>(collection: &Collection, predicate: P) -> DerivedView<usize>
where
    P: Fn(&RowView<'_>) -> bool + Send + Sync + 'static,
{
    DerivedView::new(collection.clone(), move |coll| coll.count(&predicate))
}

/// Live aggregate over the filtered record set
pub fn query_aggregate<P, A, T>(
    collection: &Collection,
    predicate: P,
    aggregate: A,
) -> DerivedView<T>
where
    P: Fn(&RowView<'_>) -> bool + Send + Sync + 'static,
    A: Fn(&[Record]) -> T + Send + Sync + 'static,
    T: Clone,
{
    DerivedView::new(collection.clone(), move |coll| {
        aggregate(&coll.find(&predicate))
    })
}

/// Live grouping by a field's raw value.
///
/// Group keys appear in first-encounter scan order; records with equal keys
/// keep scan order within their group. Returned as ordered pairs because
/// float-valued keys have no hash.
pub fn query_group_by(
    collection: &Collection,
    group_field: &str,
) -> DerivedView<Vec<(FieldValue, Vec<Record>)>> {
    let group_field = group_field.to_string();
    DerivedView::new(collection.clone(), move |coll| {
        let mut groups: Vec<(FieldValue, Vec<Record>)> = Vec::new();
        for record in coll.all() {
            let key = record
                .field(&group_field)
                .cloned()
                .unwrap_or(FieldValue::Null);
            match groups.iter_mut().find(|(existing, _)| existing == &key) {
                Some((_, members)) => members.push(record),
                None => groups.push((key, vec![record])),
            }
        }
        groups
    })
}
