//! Simulated network partitions between node pairs.
//!
//! A partition is a declared inability to deliver from one node to the
//! other, enforced by the proxy during write fan-out. Pairs are stored
//! canonicalized as `(min, max)`, so symmetry holds by construction and
//! lookup is a single set probe.

use std::collections::HashSet;
use std::sync::RwLock;

/// Requested partition between a node and itself.
#[derive(Debug, thiserror::Error)]
#[error("cannot partition a node from itself (port {0})")]
pub struct SelfPartition(pub u16);

#[derive(Debug, Default)]
pub struct PartitionMatrix {
    pairs: RwLock<HashSet<(u16, u16)>>,
}

fn canonical(a: u16, b: u16) -> (u16, u16) {
    (a.min(b), a.max(b))
}

impl PartitionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a partition. Returns false when the pair already existed.
    pub fn create(&self, a: u16, b: u16) -> Result<bool, SelfPartition> {
        if a == b {
            return Err(SelfPartition(a));
        }
        Ok(self.lock_write().insert(canonical(a, b)))
    }

    /// Lifts a partition. Returns false when no such pair existed. Writes
    /// missed while the partition was in place are not replayed.
    pub fn remove(&self, a: u16, b: u16) -> bool {
        self.lock_write().remove(&canonical(a, b))
    }

    /// Whether delivery between the two ports is blocked, in either
    /// direction.
    pub fn has(&self, a: u16, b: u16) -> bool {
        if a == b {
            return false;
        }
        self.lock_read().contains(&canonical(a, b))
    }

    /// All declared pairs, sorted.
    pub fn list(&self) -> Vec<(u16, u16)> {
        let mut pairs: Vec<(u16, u16)> = self.lock_read().iter().copied().collect();
        pairs.sort_unstable();
        pairs
    }

    /// Drops every pair, returning how many were lifted.
    pub fn clear(&self) -> usize {
        let mut pairs = self.lock_write();
        let count = pairs.len();
        pairs.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.lock_read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_read().is_empty()
    }

    fn lock_read(&self) -> std::sync::RwLockReadGuard<'_, HashSet<(u16, u16)>> {
        self.pairs.read().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_write(&self) -> std::sync::RwLockWriteGuard<'_, HashSet<(u16, u16)>> {
        self.pairs.write().unwrap_or_else(|e| e.into_inner())
    }
}
