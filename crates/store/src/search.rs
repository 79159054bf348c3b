//! Vector similarity search over a collection's raw column data
//!
//! Stateless: a search borrows the collection's buffers for the duration of
//! one scan and owns nothing afterwards.
//!
//! ## Scan protocol
//!
//! 1. Iterate live slots in scan order; apply the pre-filter against the raw
//!    field projection first — similarity is never computed for filtered-out
//!    slots.
//! 2. Score every remaining slot with a present embedding against the query.
//! 3. Keep the `top_k` highest scores (stable sort, so ties keep scan
//!    order), then drop results below `min_similarity`.
//! 4. Materialize full records for the final result set only.

use crate::collection::{Collection, RowView};
use folio_core::{ColumnType, Error, Record, Result};
use std::cmp::Ordering;

/// Cosine similarity: dot(a,b) / (‖a‖·‖b‖)
///
/// Range [-1, 1], higher = more similar. Returns 0.0 if either vector has
/// zero norm — never a division error.
///
/// # Errors
///
/// `DimensionMismatch` if the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        Ok(0.0)
    } else {
        Ok(dot / (norm_a * norm_b))
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Options for [`vector_search`]
pub struct SearchOptions {
    /// Maximum number of results (default 10)
    pub top_k: usize,
    /// Drop selected results scoring below this (default: keep everything)
    pub min_similarity: Option<f32>,
    /// Pre-filter over the raw field projection, applied before any vector math
    pub filter: Option<Box<dyn Fn(&RowView<'_>) -> bool + Send + Sync>>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            top_k: 10,
            min_similarity: None,
            filter: None,
        }
    }
}

impl SearchOptions {
    /// Set the result limit
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the similarity floor
    pub fn min_similarity(mut self, min: f32) -> Self {
        self.min_similarity = Some(min);
        self
    }

    /// Set the pre-filter
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&RowView<'_>) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }
}

/// One search result
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// The materialized record
    pub record: Record,
    /// Cosine similarity against the query
    pub similarity: f32,
    /// Staleness at the time of the search
    pub stale: bool,
}

/// Brute-force cosine search over one vector field.
///
/// Results are sorted by descending similarity, at most `top_k` long, and
/// every similarity is ≥ `min_similarity` when one is set. `stale` carries
/// the collection's metadata flag; the persistence layer re-derives it from
/// the fingerprint tracker where content is known.
///
/// # Errors
///
/// `UnknownColumn` if `field` is not in the schema or not a vector column;
/// `DimensionMismatch` if the query length differs from the field dimension.
pub fn vector_search(
    collection: &Collection,
    field: &str,
    query: &[f32],
    options: &SearchOptions,
) -> Result<Vec<SearchHit>> {
    let dimension = match collection.schema().column_type(field) {
        Some(ColumnType::Vector { dimension }) => dimension,
        Some(_) | None => return Err(Error::UnknownColumn(field.to_string())),
    };
    if query.len() != dimension {
        return Err(Error::DimensionMismatch {
            expected: dimension,
            actual: query.len(),
        });
    }

    let state = collection.read_state();

    // Score pass: pre-filter, then similarity for present embeddings only
    let mut scored: Vec<(u32, &str, f32)> = Vec::new();
    for (slot, id) in state.registry.live_slots() {
        if let Some(filter) = &options.filter {
            if !filter(&state.row_view(slot)) {
                continue;
            }
        }
        let Some(embedding) = state.columns.vector(field, slot)? else {
            continue;
        };
        let similarity = cosine_similarity(query, embedding)?;
        scored.push((slot, id, similarity));
    }

    // Stable sort keeps scan order between equal scores
    scored.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal));
    scored.truncate(options.top_k);
    if let Some(min) = options.min_similarity {
        scored.retain(|(_, _, similarity)| *similarity >= min);
    }

    // Materialize records for the final set only
    Ok(scored
        .into_iter()
        .map(|(slot, id, similarity)| SearchHit {
            record: state.materialize(slot, id),
            similarity,
            stale: state.meta.stale(slot),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{fields, FieldValue, Schema};

    fn collection() -> Collection {
        let schema = Schema::builder()
            .string("name")
            .string("kind")
            .vector("embedding", 3)
            .build()
            .unwrap();
        Collection::new(schema)
    }

    #[test]
    fn test_cosine_self_similarity() {
        let v = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&v, &v).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let sim = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector_is_zero_not_error() {
        let zero = vec![0.0, 0.0];
        let nonzero = vec![1.0, 2.0];
        assert_eq!(cosine_similarity(&zero, &nonzero).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&nonzero, &zero).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&zero, &zero).unwrap(), 0.0);
    }

    #[test]
    fn test_cosine_dimension_mismatch() {
        let result = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]);
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn test_search_orders_by_descending_similarity() {
        let coll = collection();
        coll.insert(fields! { "name" => "far", "embedding" => vec![0.0_f32, 0.0, 1.0] })
            .unwrap();
        coll.insert(fields! { "name" => "near", "embedding" => vec![1.0_f32, 0.0, 0.0] })
            .unwrap();
        coll.insert(fields! { "name" => "mid", "embedding" => vec![0.7_f32, 0.0, 0.7] })
            .unwrap();

        let hits = vector_search(
            &coll,
            "embedding",
            &[1.0, 0.0, 0.0],
            &SearchOptions::default(),
        )
        .unwrap();
        assert_eq!(hits.len(), 3);
        let names: Vec<_> = hits
            .iter()
            .map(|h| h.record.field("name").unwrap().clone())
            .collect();
        assert_eq!(
            names,
            vec![
                FieldValue::from("near"),
                FieldValue::from("mid"),
                FieldValue::from("far")
            ]
        );
        for window in hits.windows(2) {
            assert!(window[0].similarity >= window[1].similarity);
        }
    }

    #[test]
    fn test_search_top_k_and_min_similarity() {
        let coll = collection();
        for i in 0..5 {
            let x = 1.0 - i as f32 * 0.2;
            coll.insert(fields! { "name" => format!("r{}", i), "embedding" => vec![x, (1.0 - x * x).max(0.0).sqrt(), 0.0_f32] })
                .unwrap();
        }

        let hits = vector_search(
            &coll,
            "embedding",
            &[1.0, 0.0, 0.0],
            &SearchOptions::default().top_k(2),
        )
        .unwrap();
        assert_eq!(hits.len(), 2);

        let hits = vector_search(
            &coll,
            "embedding",
            &[1.0, 0.0, 0.0],
            &SearchOptions::default().top_k(5).min_similarity(0.9),
        )
        .unwrap();
        assert!(hits.iter().all(|h| h.similarity >= 0.9));
        assert!(hits.len() < 5);
    }

    #[test]
    fn test_search_skips_absent_embeddings() {
        let coll = collection();
        coll.insert(fields! { "name" => "no-vec" }).unwrap();
        coll.insert(fields! { "name" => "vec", "embedding" => vec![1.0_f32, 0.0, 0.0] })
            .unwrap();

        let hits = vector_search(
            &coll,
            "embedding",
            &[1.0, 0.0, 0.0],
            &SearchOptions::default(),
        )
        .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.field("name"), Some(&FieldValue::from("vec")));
    }

    #[test]
    fn test_search_prefilter() {
        let coll = collection();
        coll.insert(fields! { "name" => "a", "kind" => "keep", "embedding" => vec![1.0_f32, 0.0, 0.0] })
            .unwrap();
        coll.insert(fields! { "name" => "b", "kind" => "drop", "embedding" => vec![1.0_f32, 0.0, 0.0] })
            .unwrap();

        let options =
            SearchOptions::default().filter(|row| row.text("kind").as_deref() == Some("keep"));
        let hits = vector_search(&coll, "embedding", &[1.0, 0.0, 0.0], &options).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record.field("name"), Some(&FieldValue::from("a")));
    }

    #[test]
    fn test_search_ties_keep_scan_order() {
        let coll = collection();
        let a = coll
            .insert(fields! { "name" => "first", "embedding" => vec![1.0_f32, 0.0, 0.0] })
            .unwrap();
        let b = coll
            .insert(fields! { "name" => "second", "embedding" => vec![1.0_f32, 0.0, 0.0] })
            .unwrap();

        let hits = vector_search(
            &coll,
            "embedding",
            &[1.0, 0.0, 0.0],
            &SearchOptions::default(),
        )
        .unwrap();
        assert_eq!(hits[0].record.id, a);
        assert_eq!(hits[1].record.id, b);
    }

    #[test]
    fn test_search_query_dimension_checked() {
        let coll = collection();
        let result = vector_search(&coll, "embedding", &[1.0, 0.0], &SearchOptions::default());
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn test_search_non_vector_field_rejected() {
        let coll = collection();
        let result = vector_search(&coll, "name", &[1.0, 0.0, 0.0], &SearchOptions::default());
        assert!(matches!(result, Err(Error::UnknownColumn(_))));
    }

    #[test]
    fn test_search_carries_stale_flag() {
        let coll = collection();
        let id = coll
            .insert(fields! { "name" => "a", "embedding" => vec![1.0_f32, 0.0, 0.0] })
            .unwrap();
        coll.set_stale(&id, true);

        let hits = vector_search(
            &coll,
            "embedding",
            &[1.0, 0.0, 0.0],
            &SearchOptions::default(),
        )
        .unwrap();
        assert!(hits[0].stale);
    }
}
