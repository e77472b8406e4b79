//! Consistent-Hash Ring Module
//!
//! Maps keys onto an ordered set of physical nodes with minimal key
//! movement on membership change.
//!
//! ## Mechanism
//! - **Positions**: Strings hash to the full 128-bit MD5 digest, so the
//!   ring space is `[0, u128::MAX]`.
//! - **Virtual nodes**: Every physical node contributes a fixed number of
//!   positions derived from `hash("{id}#{i}")`, which smooths the key
//!   distribution across nodes.
//! - **Resolution**: A key is owned by the first virtual node clockwise
//!   from its position; walking further clockwise yields the replica set.

use std::collections::BTreeSet;

use serde::Serialize;

/// One virtual node's placement, exposed for ring visualization. The angle
/// is derived from the position; routing never uses it.
#[derive(Debug, Clone, Serialize)]
pub struct VnodeInfo {
    pub id: String,
    pub angle: f64,
}

/// Summary counts for the ring, returned with membership mutations.
#[derive(Debug, Clone, Serialize)]
pub struct RingStats {
    pub num_physical_nodes: usize,
    pub num_virtual_nodes: usize,
    pub virtual_nodes_per_physical: usize,
    pub nodes: Vec<String>,
}

/// The ring itself: a sorted sequence of `(position, node id)` pairs.
///
/// Membership changes take `&mut self`; resolution is read-only. The proxy
/// wraps the ring in a read-write lock so lookups run concurrently.
#[derive(Debug, Clone)]
pub struct HashRing {
    vnodes: Vec<(u128, String)>,
    nodes: BTreeSet<String>,
    virtual_nodes: usize,
}

/// 128-bit ring position of a string.
fn position(s: &str) -> u128 {
    u128::from_be_bytes(md5::compute(s.as_bytes()).0)
}

impl HashRing {
    /// Creates an empty ring with `virtual_nodes` positions per physical
    /// node (at least 10 for an even spread).
    pub fn new(virtual_nodes: usize) -> Self {
        assert!(virtual_nodes >= 10, "virtual node count must be at least 10");

        Self {
            vnodes: Vec::new(),
            nodes: BTreeSet::new(),
            virtual_nodes,
        }
    }

    /// Adds a physical node, inserting its virtual positions. Idempotent;
    /// returns false when the node was already present.
    pub fn add(&mut self, id: &str) -> bool {
        if !self.nodes.insert(id.to_string()) {
            return false;
        }

        for i in 0..self.virtual_nodes {
            // Positions are deterministic from the node id and the vnode
            // index. A 128-bit collision is practically impossible, but the
            // salt is bumped until the slot is free so every node holds
            // exactly `virtual_nodes` unique positions.
            let mut salt = i;
            let pos = loop {
                let candidate = position(&format!("{}#{}", id, salt));
                if self
                    .vnodes
                    .binary_search_by_key(&candidate, |&(p, _)| p)
                    .is_err()
                {
                    break candidate;
                }
                salt += self.virtual_nodes;
            };

            let insert_at = self
                .vnodes
                .binary_search_by_key(&pos, |&(p, _)| p)
                .unwrap_err();
            self.vnodes.insert(insert_at, (pos, id.to_string()));
        }

        true
    }

    /// Removes a physical node and every virtual position it contributed.
    /// Returns false when the node was not on the ring.
    pub fn remove(&mut self, id: &str) -> bool {
        if !self.nodes.remove(id) {
            return false;
        }
        self.vnodes.retain(|(_, node)| node != id);
        true
    }

    /// Resolves the ordered replica set for a key: the first `n` distinct
    /// physical nodes clockwise from the key's position. The first element
    /// is the primary. `n` is clamped to the number of physical nodes.
    pub fn replicas(&self, key: &str, n: usize) -> Vec<String> {
        if self.vnodes.is_empty() || n == 0 {
            return Vec::new();
        }

        let target = self.nodes.len().min(n);
        let p = position(key);
        let start = match self.vnodes.binary_search_by_key(&p, |&(pos, _)| pos) {
            Ok(idx) => idx,
            Err(idx) => idx % self.vnodes.len(),
        };

        let mut replicas: Vec<String> = Vec::with_capacity(target);
        for offset in 0..self.vnodes.len() {
            let (_, id) = &self.vnodes[(start + offset) % self.vnodes.len()];
            if !replicas.iter().any(|r| r == id) {
                replicas.push(id.clone());
                if replicas.len() == target {
                    break;
                }
            }
        }

        replicas
    }

    /// The node reads target for a key.
    pub fn primary(&self, key: &str) -> Option<String> {
        self.replicas(key, 1).into_iter().next()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains(id)
    }

    /// Number of physical nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Physical node ids in sorted order.
    pub fn node_ids(&self) -> Vec<String> {
        self.nodes.iter().cloned().collect()
    }

    /// Every virtual node with its angle on a 360-degree dial, sorted by
    /// angle. Purely for the cluster map visualization.
    pub fn snapshot(&self) -> Vec<VnodeInfo> {
        self.vnodes
            .iter()
            .map(|(pos, id)| VnodeInfo {
                id: id.clone(),
                angle: (*pos as f64 / u128::MAX as f64) * 360.0,
            })
            .collect()
    }

    pub fn stats(&self) -> RingStats {
        RingStats {
            num_physical_nodes: self.nodes.len(),
            num_virtual_nodes: self.vnodes.len(),
            virtual_nodes_per_physical: self.virtual_nodes,
            nodes: self.node_ids(),
        }
    }
}

#[cfg(test)]
mod tests;
