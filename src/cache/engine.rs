//! Cache engine: capacity-bounded map with recency eviction and TTL.
//!
//! The recency order lives in an intrusive doubly-linked list laid out over
//! a slab of slots, with a hash index from key to slot. `get` relinks the
//! touched entry at the tail, `put` inserts at the tail, eviction pops the
//! head. All operations are O(1); the expiry sweep is O(n) and runs off the
//! hot path. Callers serialize access through a single mutex.

use std::collections::HashMap;

use crate::cache::entry::CacheEntry;
use crate::cache::stats::EngineStats;

/// Returned by `put` once the engine has been shut down.
#[derive(Debug, thiserror::Error)]
#[error("cache engine is shut down")]
pub struct CacheClosed;

/// One row of the live-key listing exposed over `GET /cache/keys`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct KeySnapshot {
    pub key: String,
    pub value: String,
    pub ttl_remaining: Option<u64>,
}

struct Slot {
    key: String,
    entry: CacheEntry,
    prev: Option<usize>,
    next: Option<usize>,
}

/// The recency-ordered cache engine. Head of the list is the least-recent
/// entry, tail the most-recent.
pub struct CacheEngine {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    capacity: usize,
    hits: u64,
    misses: u64,
    closed: bool,
}

impl CacheEngine {
    /// Creates an engine bounded to `capacity` entries. Capacity must be
    /// positive; the node binary validates its CLI argument before this.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be positive");

        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            index: HashMap::with_capacity(capacity),
            head: None,
            tail: None,
            capacity,
            hits: 0,
            misses: 0,
            closed: false,
        }
    }

    /// Looks up a key. A live hit moves the entry to the most-recent end
    /// and counts a hit; absence or expiry counts a miss. An expired entry
    /// is removed on the spot, so repeated gets on the same dead key each
    /// miss without observing stale data.
    pub fn get(&mut self, key: &str) -> Option<String> {
        let idx = match self.index.get(key) {
            Some(&idx) => idx,
            None => {
                self.misses += 1;
                return None;
            }
        };

        if self.slot(idx).entry.is_expired() {
            self.remove_slot(idx);
            self.misses += 1;
            return None;
        }

        self.unlink(idx);
        self.push_tail(idx);
        self.hits += 1;
        Some(self.slot(idx).entry.value.clone())
    }

    /// Inserts or replaces an entry. Replacement refreshes both the TTL and
    /// the recency position. An insert at capacity evicts the least-recent
    /// entry first.
    pub fn put(&mut self, key: String, value: String, ttl: Option<i64>) -> Result<(), CacheClosed> {
        if self.closed {
            return Err(CacheClosed);
        }

        let entry = CacheEntry::new(value, ttl);

        if let Some(&idx) = self.index.get(&key) {
            self.slot_mut(idx).entry = entry;
            self.unlink(idx);
            self.push_tail(idx);
            return Ok(());
        }

        if self.index.len() >= self.capacity {
            if let Some(oldest) = self.head {
                self.remove_slot(oldest);
            }
        }

        let idx = self.alloc(Slot {
            key: key.clone(),
            entry,
            prev: None,
            next: None,
        });
        self.index.insert(key, idx);
        self.push_tail(idx);
        Ok(())
    }

    /// Removes a key if present.
    pub fn delete(&mut self, key: &str) -> bool {
        match self.index.get(key) {
            Some(&idx) => {
                self.remove_slot(idx);
                true
            }
            None => false,
        }
    }

    /// Drops every entry. Hit/miss counters are deliberately preserved.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
    }

    /// Removes every entry past its TTL and returns how many were dropped.
    /// Swept entries do not count as misses.
    pub fn sweep_expired(&mut self) -> usize {
        let expired: Vec<usize> = self
            .index
            .values()
            .copied()
            .filter(|&idx| self.slot(idx).entry.is_expired())
            .collect();

        let count = expired.len();
        for idx in expired {
            self.remove_slot(idx);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats::new(self.hits, self.misses, self.index.len(), self.capacity)
    }

    /// Lists live entries in recency order (least recent first), skipping
    /// anything already past TTL without mutating counters.
    pub fn snapshot(&self) -> Vec<KeySnapshot> {
        let mut keys = Vec::with_capacity(self.index.len());
        let mut cursor = self.head;

        while let Some(idx) = cursor {
            let slot = self.slot(idx);
            if !slot.entry.is_expired() {
                keys.push(KeySnapshot {
                    key: slot.key.clone(),
                    value: slot.entry.value.clone(),
                    ttl_remaining: slot.entry.ttl_remaining(),
                });
            }
            cursor = slot.next;
        }

        keys
    }

    /// Marks the engine shut down; subsequent `put` calls fail.
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn slot(&self, idx: usize) -> &Slot {
        self.slots[idx].as_ref().expect("slot index points at a live slot")
    }

    fn slot_mut(&mut self, idx: usize) -> &mut Slot {
        self.slots[idx].as_mut().expect("slot index points at a live slot")
    }

    fn alloc(&mut self, slot: Slot) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(slot);
                idx
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let slot = self.slot(idx);
            (slot.prev, slot.next)
        };

        match prev {
            Some(p) => self.slot_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slot_mut(n).prev = prev,
            None => self.tail = prev,
        }

        let slot = self.slot_mut(idx);
        slot.prev = None;
        slot.next = None;
    }

    fn push_tail(&mut self, idx: usize) {
        let old_tail = self.tail;
        self.slot_mut(idx).prev = old_tail;
        self.slot_mut(idx).next = None;

        match old_tail {
            Some(t) => self.slot_mut(t).next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }

    fn remove_slot(&mut self, idx: usize) {
        self.unlink(idx);
        let slot = self.slots[idx].take().expect("slot index points at a live slot");
        self.index.remove(&slot.key);
        self.free.push(idx);
    }
}

impl std::fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEngine")
            .field("len", &self.index.len())
            .field("capacity", &self.capacity)
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .field("closed", &self.closed)
            .finish()
    }
}
