//! Metadata arrays - created/updated/stale parallel buffers
//!
//! Same slot discipline as the column store: grown with defaults on write,
//! reset to defaults on release.

/// Per-slot record metadata
#[derive(Debug, Default)]
pub struct MetadataStore {
    /// Epoch millis at first insert
    created: Vec<i64>,
    /// Epoch millis at most recent mutation
    updated: Vec<i64>,
    /// Embedding staleness flag
    stale: Vec<bool>,
}

impl MetadataStore {
    /// Create empty metadata buffers
    pub fn new() -> Self {
        Self::default()
    }

    fn grow_to(&mut self, slot: u32) {
        let len = (slot as usize + 1).max(self.created.len());
        self.created.resize(len, 0);
        self.updated.resize(len, 0);
        self.stale.resize(len, false);
    }

    /// Stamp a freshly inserted slot: created = updated = `now`, not stale
    pub fn touch_insert(&mut self, slot: u32, now: i64) {
        self.grow_to(slot);
        let at = slot as usize;
        self.created[at] = now;
        self.updated[at] = now;
        self.stale[at] = false;
    }

    /// Bump `updated` only; `created` is never changed by updates
    pub fn touch_update(&mut self, slot: u32, now: i64) {
        self.grow_to(slot);
        self.updated[slot as usize] = now;
    }

    /// Stamp both timestamps explicitly (persistence applying file state)
    pub fn set_times(&mut self, slot: u32, created: i64, updated: i64) {
        self.grow_to(slot);
        self.created[slot as usize] = created;
        self.updated[slot as usize] = updated;
    }

    /// Creation time at `slot`
    pub fn created(&self, slot: u32) -> i64 {
        self.created.get(slot as usize).copied().unwrap_or(0)
    }

    /// Last-mutation time at `slot`
    pub fn updated(&self, slot: u32) -> i64 {
        self.updated.get(slot as usize).copied().unwrap_or(0)
    }

    /// Staleness flag at `slot`
    pub fn stale(&self, slot: u32) -> bool {
        self.stale.get(slot as usize).copied().unwrap_or(false)
    }

    /// Set the staleness flag at `slot`
    pub fn set_stale(&mut self, slot: u32, stale: bool) {
        self.grow_to(slot);
        self.stale[slot as usize] = stale;
    }

    /// Reset every buffer at `slot` to defaults
    pub fn clear_slot(&mut self, slot: u32) {
        let at = slot as usize;
        if at < self.created.len() {
            self.created[at] = 0;
            self.updated[at] = 0;
            self.stale[at] = false;
        }
    }

    /// Drop all buffers to empty
    pub fn reset(&mut self) {
        self.created.clear();
        self.updated.clear();
        self.stale.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_insert_sets_both_timestamps() {
        let mut meta = MetadataStore::new();
        meta.touch_insert(2, 1000);
        assert_eq!(meta.created(2), 1000);
        assert_eq!(meta.updated(2), 1000);
        assert!(!meta.stale(2));
        // Grown slots below hold defaults
        assert_eq!(meta.created(0), 0);
    }

    #[test]
    fn test_touch_update_preserves_created() {
        let mut meta = MetadataStore::new();
        meta.touch_insert(0, 1000);
        meta.touch_update(0, 2000);
        assert_eq!(meta.created(0), 1000);
        assert_eq!(meta.updated(0), 2000);
    }

    #[test]
    fn test_stale_flag() {
        let mut meta = MetadataStore::new();
        meta.touch_insert(0, 1);
        assert!(!meta.stale(0));
        meta.set_stale(0, true);
        assert!(meta.stale(0));
    }

    #[test]
    fn test_clear_slot() {
        let mut meta = MetadataStore::new();
        meta.touch_insert(1, 500);
        meta.set_stale(1, true);
        meta.clear_slot(1);
        assert_eq!(meta.created(1), 0);
        assert_eq!(meta.updated(1), 0);
        assert!(!meta.stale(1));
    }

    #[test]
    fn test_out_of_range_reads_default() {
        let meta = MetadataStore::new();
        assert_eq!(meta.created(42), 0);
        assert!(!meta.stale(42));
    }
}
