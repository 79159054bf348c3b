//! Embedding staleness tracker - (id, field) → content fingerprint
//!
//! Tracks, per vector field, the xxh3 hash of the content an embedding was
//! computed from. A record is stale when a stored hash no longer matches the
//! current content; absence of a stored hash is defined as *not stale*
//! (no embedding means nothing to be stale relative to).
//!
//! Independent of the storage layout — keyed by record id, not slot — and
//! safe to touch from both the mutation path and the watcher thread.

use dashmap::DashMap;
use std::sync::Arc;
use xxhash_rust::xxh3::xxh3_64;

/// Concurrent fingerprint table for embedding staleness
#[derive(Clone, Default)]
pub struct EmbeddingTracker {
    hashes: Arc<DashMap<(String, String), u64>>,
}

impl EmbeddingTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the content fingerprint an embedding was computed from
    pub fn set_embedding(&self, id: &str, field: &str, content: &str) {
        self.hashes
            .insert((id.to_string(), field.to_string()), xxh3_64(content.as_bytes()));
    }

    /// Check one field against the current content.
    ///
    /// True iff a hash is stored and differs from `hash(content)`.
    pub fn is_stale(&self, id: &str, field: &str, content: &str) -> bool {
        match self.hashes.get(&(id.to_string(), field.to_string())) {
            Some(stored) => *stored != xxh3_64(content.as_bytes()),
            None => false,
        }
    }

    /// Check every tracked field of a record against the current content
    pub fn is_content_stale(&self, id: &str, content: &str) -> bool {
        let current = xxh3_64(content.as_bytes());
        self.hashes
            .iter()
            .any(|entry| entry.key().0 == id && *entry.value() != current)
    }

    /// Check whether any fingerprint is stored for (id, field)
    pub fn has_embedding(&self, id: &str, field: &str) -> bool {
        self.hashes
            .contains_key(&(id.to_string(), field.to_string()))
    }

    /// Drop one field's fingerprint
    pub fn clear_field(&self, id: &str, field: &str) {
        self.hashes.remove(&(id.to_string(), field.to_string()));
    }

    /// Drop every fingerprint of a record (called on delete)
    pub fn clear_record(&self, id: &str) {
        self.hashes.retain(|(entry_id, _), _| entry_id != id);
    }

    /// Drop all fingerprints
    pub fn clear(&self) {
        self.hashes.clear();
    }

    /// Number of stored fingerprints
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Check if no fingerprint is stored
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
