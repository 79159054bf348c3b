//! Slot registry - bidirectional id↔slot mapping with slot reuse
//!
//! Every record occupies one slot: a `u32` index into all of a collection's
//! parallel buffers. The registry owns the bijection between live ids and
//! live slots plus the free list of released slots.
//!
//! # Critical Invariants
//!
//! - A slot is live iff it is reachable via the id map and absent from the
//!   free list; the id map and the reverse map never disagree.
//! - Released slots are reused LIFO (most recently freed first) to bound
//!   buffer growth. LIFO is a design choice, not a contract — callers must
//!   not assume FIFO.
//! - The slot counter only grows when the free list is empty.

use rustc_hash::FxHashMap;

/// Bidirectional id↔slot mapping with LIFO slot reuse
#[derive(Debug, Default)]
pub struct SlotRegistry {
    /// id → slot (sole source of truth for liveness)
    id_to_slot: FxHashMap<String, u32>,
    /// slot → id reverse map; `None` marks a freed slot
    slot_to_id: Vec<Option<String>>,
    /// Freed slots, reused from the back
    free: Vec<u32>,
}

impl SlotRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a slot for `id`, idempotently.
    ///
    /// If `id` is already registered its existing slot is returned unchanged.
    /// Otherwise the most recently freed slot is reused, or a fresh slot is
    /// appended.
    pub fn allocate(&mut self, id: &str) -> u32 {
        if let Some(slot) = self.id_to_slot.get(id) {
            return *slot;
        }
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.slot_to_id.push(None);
                (self.slot_to_id.len() - 1) as u32
            }
        };
        self.id_to_slot.insert(id.to_string(), slot);
        self.slot_to_id[slot as usize] = Some(id.to_string());
        slot
    }

    /// Release the slot held by `id`, returning it to the free pool.
    ///
    /// Returns the released slot, or `None` if the id was unknown.
    pub fn release(&mut self, id: &str) -> Option<u32> {
        let slot = self.id_to_slot.remove(id)?;
        self.slot_to_id[slot as usize] = None;
        self.free.push(slot);
        Some(slot)
    }

    /// Slot of a live id
    pub fn slot_of(&self, id: &str) -> Option<u32> {
        self.id_to_slot.get(id).copied()
    }

    /// Id at a live slot
    pub fn id_at(&self, slot: u32) -> Option<&str> {
        self.slot_to_id
            .get(slot as usize)
            .and_then(|id| id.as_deref())
    }

    /// Check if an id is live
    pub fn contains(&self, id: &str) -> bool {
        self.id_to_slot.contains_key(id)
    }

    /// Number of live slots
    pub fn len(&self) -> usize {
        self.id_to_slot.len()
    }

    /// Check if no slot is live
    pub fn is_empty(&self) -> bool {
        self.id_to_slot.is_empty()
    }

    /// Highest-ever-used slot count (live + freed)
    pub fn capacity(&self) -> usize {
        self.slot_to_id.len()
    }

    /// Iterate live `(slot, id)` pairs in ascending slot order.
    ///
    /// This is the canonical scan order for find/search operations.
    pub fn live_slots(&self) -> impl Iterator<Item = (u32, &str)> {
        self.slot_to_id
            .iter()
            .enumerate()
            .filter_map(|(slot, id)| id.as_deref().map(|id| (slot as u32, id)))
    }

    /// Drop every mapping and the free list
    pub fn clear(&mut self) {
        self.id_to_slot.clear();
        self.slot_to_id.clear();
        self.free.clear();
    }
}
