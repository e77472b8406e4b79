//! Membership & Liveness
//!
//! The proxy's registry of cache nodes and the health loop that prunes
//! dead ones.
//!
//! ## Core Mechanisms
//! - **Registration**: Nodes enter the cluster only through an explicit
//!   add (idempotent) and leave through an explicit remove or liveness
//!   pruning. A node that comes back after being pruned is not re-added
//!   automatically.
//! - **Failure detection**: Every `health_check_period` the loop probes
//!   `GET /health` on all registered nodes concurrently. Two consecutive
//!   failed probes mark a node dead and drop it from both the registry and
//!   the ring. This is the only mechanism that reacts to chaos kills, so a
//!   short routing-to-dead-node window is expected.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::RwLock;
use tokio::task::JoinSet;

use crate::node::protocol::ENDPOINT_HEALTH;
use crate::ring::HashRing;

/// Consecutive failed probes after which a node is declared dead.
const DEAD_AFTER_FAILED_PROBES: u32 = 2;

/// One registered cache node.
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    pub id: String,
    pub host: String,
    pub port: u16,
    pub last_healthy_at: Option<Instant>,
    pub failed_probes: u32,
}

/// Registry of registered cache nodes, keyed by `host:port`.
#[derive(Debug, Default)]
pub struct MembershipService {
    nodes: DashMap<String, NodeDescriptor>,
}

impl MembershipService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node. Returns false when the id was already present
    /// (the registration is idempotent).
    pub fn add(&self, host: &str, port: u16) -> bool {
        let id = format!("{}:{}", host, port);
        if self.nodes.contains_key(&id) {
            return false;
        }

        self.nodes.insert(
            id.clone(),
            NodeDescriptor {
                id,
                host: host.to_string(),
                port,
                last_healthy_at: None,
                failed_probes: 0,
            },
        );
        true
    }

    /// Unregisters the node listening on `port`. Does not stop the process.
    pub fn remove_by_port(&self, port: u16) -> Option<NodeDescriptor> {
        let id = self
            .nodes
            .iter()
            .find(|entry| entry.value().port == port)
            .map(|entry| entry.key().clone())?;

        self.nodes.remove(&id).map(|(_, descriptor)| descriptor)
    }

    pub fn remove_by_id(&self, id: &str) -> Option<NodeDescriptor> {
        self.nodes.remove(id).map(|(_, descriptor)| descriptor)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Registered node ids in sorted order.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.nodes.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Applies one probe outcome. Returns true when the node crossed the
    /// death threshold and must be pruned.
    fn record_probe(&self, id: &str, healthy: bool) -> bool {
        let Some(mut descriptor) = self.nodes.get_mut(id) else {
            return false;
        };

        if healthy {
            descriptor.failed_probes = 0;
            descriptor.last_healthy_at = Some(Instant::now());
            return false;
        }

        descriptor.failed_probes += 1;
        descriptor.failed_probes >= DEAD_AFTER_FAILED_PROBES
    }
}

/// Probes every registered node once, concurrently, and prunes nodes that
/// have now failed twice in a row. Returns the pruned ids.
pub async fn run_health_tick(
    members: &MembershipService,
    ring: &RwLock<HashRing>,
    client: &reqwest::Client,
    probe_timeout: Duration,
) -> Vec<String> {
    let mut probes = JoinSet::new();
    for id in members.ids() {
        let client = client.clone();
        let url = format!("http://{}{}", id, ENDPOINT_HEALTH);
        probes.spawn(async move {
            let healthy = match client.get(&url).timeout(probe_timeout).send().await {
                Ok(response) => response.status().is_success(),
                Err(_) => false,
            };
            (id, healthy)
        });
    }

    let mut dead = Vec::new();
    while let Some(result) = probes.join_next().await {
        let Ok((id, healthy)) = result else { continue };
        if members.record_probe(&id, healthy) {
            dead.push(id);
        }
    }

    if !dead.is_empty() {
        let mut ring = ring.write().await;
        for id in &dead {
            tracing::warn!("node {} failed two health probes, pruning", id);
            members.remove_by_id(id);
            ring.remove(id);
        }
    }

    dead
}

/// Spawns the periodic health loop.
pub fn spawn_health_loop(
    members: Arc<MembershipService>,
    ring: Arc<RwLock<HashRing>>,
    client: reqwest::Client,
    period: Duration,
    probe_timeout: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);

        loop {
            interval.tick().await;
            let dead = run_health_tick(&members, &ring, &client, probe_timeout).await;
            if !dead.is_empty() {
                tracing::info!(
                    "health tick pruned {} node(s), {} remain",
                    dead.len(),
                    members.len()
                );
            }
        }
    })
}
