use std::collections::HashMap;

use crate::ring::HashRing;

fn ring_with_nodes(ports: &[u16]) -> HashRing {
    let mut ring = HashRing::new(50);
    for port in ports {
        ring.add(&format!("127.0.0.1:{}", port));
    }
    ring
}

// ============================================================
// MEMBERSHIP
// ============================================================

#[test]
fn test_add_inserts_virtual_nodes() {
    let ring = ring_with_nodes(&[8001]);

    let stats = ring.stats();
    assert_eq!(stats.num_physical_nodes, 1);
    assert_eq!(stats.num_virtual_nodes, 50);
}

#[test]
fn test_add_is_idempotent() {
    let mut ring = ring_with_nodes(&[8001]);

    assert!(!ring.add("127.0.0.1:8001"));
    assert_eq!(ring.stats().num_virtual_nodes, 50);
}

#[test]
fn test_remove_drops_every_virtual_node() {
    let mut ring = ring_with_nodes(&[8001, 8002]);

    assert!(ring.remove("127.0.0.1:8001"));
    let stats = ring.stats();
    assert_eq!(stats.num_physical_nodes, 1);
    assert_eq!(stats.num_virtual_nodes, 50);
    assert!(!ring.contains("127.0.0.1:8001"));
}

#[test]
fn test_remove_unknown_node_is_noop() {
    let mut ring = ring_with_nodes(&[8001]);
    assert!(!ring.remove("127.0.0.1:9999"));
    assert_eq!(ring.len(), 1);
}

// ============================================================
// RESOLUTION
// ============================================================

#[test]
fn test_resolution_is_deterministic() {
    let ring = ring_with_nodes(&[8001, 8002, 8003]);

    for i in 0..100 {
        let key = format!("key-{}", i);
        let first = ring.replicas(&key, 2);
        let second = ring.replicas(&key, 2);
        assert_eq!(first, second);
    }
}

#[test]
fn test_replicas_are_distinct_physical_nodes() {
    let ring = ring_with_nodes(&[8001, 8002, 8003]);

    for i in 0..100 {
        let replicas = ring.replicas(&format!("key-{}", i), 3);
        assert_eq!(replicas.len(), 3);
        let mut unique = replicas.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 3, "replica set must not repeat nodes");
    }
}

#[test]
fn test_replica_count_clamped_to_node_count() {
    let ring = ring_with_nodes(&[8001, 8002]);

    let replicas = ring.replicas("some-key", 5);
    assert_eq!(replicas.len(), 2);
}

#[test]
fn test_empty_ring_resolves_to_nothing() {
    let ring = HashRing::new(50);
    assert!(ring.replicas("key", 2).is_empty());
    assert!(ring.primary("key").is_none());
}

#[test]
fn test_primary_is_first_replica() {
    let ring = ring_with_nodes(&[8001, 8002, 8003]);

    for i in 0..50 {
        let key = format!("key-{}", i);
        assert_eq!(ring.primary(&key), ring.replicas(&key, 2).first().cloned());
    }
}

#[test]
fn test_keys_spread_across_nodes() {
    let ring = ring_with_nodes(&[8001, 8002, 8003]);

    let mut counts: HashMap<String, usize> = HashMap::new();
    for i in 0..3000 {
        let primary = ring.primary(&format!("key-{}", i)).unwrap();
        *counts.entry(primary).or_insert(0) += 1;
    }

    assert_eq!(counts.len(), 3, "every node should own some keys");
    for (node, count) in counts {
        assert!(count > 300, "node {} owns only {} of 3000 keys", node, count);
    }
}

// ============================================================
// REBALANCE BOUND
// ============================================================

#[test]
fn test_adding_a_node_moves_a_bounded_fraction_of_keys() {
    let mut ring = ring_with_nodes(&[8001, 8002, 8003]);

    let keys: Vec<String> = (0..10_000).map(|i| format!("user-{}", i)).collect();
    let before: Vec<String> = keys.iter().map(|k| ring.primary(k).unwrap()).collect();

    ring.add("127.0.0.1:8004");

    let moved = keys
        .iter()
        .zip(&before)
        .filter(|(key, old)| ring.primary(key).unwrap() != **old)
        .count();

    // Prior ring had 3 nodes; the moved fraction must stay within 1.5x of
    // 1/3, and every moved key must now land on the new node.
    let fraction = moved as f64 / keys.len() as f64;
    assert!(fraction <= 0.5, "moved fraction {} exceeds bound", fraction);
    assert!(fraction > 0.05, "adding a node should re-home some keys");

    for (key, old) in keys.iter().zip(&before) {
        let now = ring.primary(key).unwrap();
        if now != *old {
            assert_eq!(now, "127.0.0.1:8004", "moved key {} went sideways", key);
        }
    }
}

#[test]
fn test_removing_a_node_only_moves_its_keys() {
    let mut ring = ring_with_nodes(&[8001, 8002, 8003, 8004]);

    let keys: Vec<String> = (0..5_000).map(|i| format!("item-{}", i)).collect();
    let before: Vec<String> = keys.iter().map(|k| ring.primary(k).unwrap()).collect();

    ring.remove("127.0.0.1:8002");

    for (key, old) in keys.iter().zip(&before) {
        let now = ring.primary(key).unwrap();
        if *old != "127.0.0.1:8002" {
            assert_eq!(now, *old, "key {} moved although its node survived", key);
        } else {
            assert_ne!(now, "127.0.0.1:8002");
        }
    }
}

// ============================================================
// SNAPSHOT
// ============================================================

#[test]
fn test_snapshot_angles_are_sorted_and_in_range() {
    let ring = ring_with_nodes(&[8001, 8002]);

    let snapshot = ring.snapshot();
    assert_eq!(snapshot.len(), 100);

    let mut last = -1.0;
    for vnode in &snapshot {
        assert!(vnode.angle >= 0.0 && vnode.angle <= 360.0);
        assert!(vnode.angle >= last, "snapshot must be sorted by angle");
        last = vnode.angle;
    }
}
