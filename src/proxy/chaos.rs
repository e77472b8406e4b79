//! Chaos Controller
//!
//! Randomly terminates cache nodes to exercise the failure path. A strike
//! calls the victim's admin shutdown endpoint; the victim deliberately
//! stays on the ring until the health loop prunes it, so the cluster must
//! tolerate a window of routing to a dead node.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;

use crate::node::protocol::ENDPOINT_SHUTDOWN;
use crate::proxy::membership::MembershipService;

/// Controller state. `start`/`stop` guard against double transitions.
#[derive(Debug)]
pub struct ChaosController {
    running: AtomicBool,
    min_interval: Duration,
    max_interval: Duration,
    min_surviving_nodes: usize,
}

/// Payload of `GET /chaos/status`.
#[derive(Debug, Serialize)]
pub struct ChaosStatus {
    pub enabled: bool,
    pub min_interval_secs: u64,
    pub max_interval_secs: u64,
    pub min_surviving_nodes: usize,
    pub current_nodes: usize,
}

impl ChaosController {
    /// Builds the controller. An inverted interval range is a configuration
    /// error and fails loudly at startup.
    pub fn new(min_interval: Duration, max_interval: Duration, min_surviving_nodes: usize) -> Self {
        assert!(
            min_interval <= max_interval,
            "chaos interval range is inverted"
        );

        Self {
            running: AtomicBool::new(false),
            min_interval,
            max_interval,
            min_surviving_nodes,
        }
    }

    /// Flips the controller on. Returns false when it was already running.
    pub fn start(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Flips the controller off. Returns false when it was not running.
    pub fn stop(&self) -> bool {
        self.running
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn status(&self, current_nodes: usize) -> ChaosStatus {
        ChaosStatus {
            enabled: self.is_running(),
            min_interval_secs: self.min_interval.as_secs(),
            max_interval_secs: self.max_interval.as_secs(),
            min_surviving_nodes: self.min_surviving_nodes,
            current_nodes,
        }
    }

    /// Picks the victim for one tick, or `None` when the strike must be
    /// skipped to keep `min_surviving_nodes` alive.
    pub fn pick_victim(&self, nodes: &[String]) -> Option<String> {
        if nodes.len() <= self.min_surviving_nodes {
            return None;
        }
        let idx = rand::thread_rng().gen_range(0..nodes.len());
        Some(nodes[idx].clone())
    }

    fn next_pause(&self) -> Duration {
        let min = self.min_interval.as_millis() as u64;
        let max = self.max_interval.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

/// Runs the strike loop until the controller is stopped. Termination goes
/// through the victim's admin shutdown endpoint; the node is left on the
/// ring for the health loop to prune.
pub async fn run_chaos_loop(
    controller: Arc<ChaosController>,
    members: Arc<MembershipService>,
    client: reqwest::Client,
) {
    tracing::warn!("chaos controller engaged");

    while controller.is_running() {
        tokio::time::sleep(controller.next_pause()).await;
        if !controller.is_running() {
            break;
        }

        let nodes = members.ids();
        let Some(victim) = controller.pick_victim(&nodes) else {
            tracing::warn!(
                "chaos tick skipped: only {} node(s) registered",
                nodes.len()
            );
            continue;
        };

        tracing::warn!("chaos strike: terminating node {}", victim);
        let url = format!("http://{}{}", victim, ENDPOINT_SHUTDOWN);
        match client
            .post(&url)
            .timeout(Duration::from_secs(1))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                tracing::warn!("node {} terminated, awaiting health pruning", victim);
            }
            Ok(response) => {
                tracing::error!("shutdown of {} returned {}", victim, response.status());
            }
            Err(e) => {
                tracing::error!("shutdown of {} failed: {}", victim, e);
            }
        }
    }

    tracing::info!("chaos controller disengaged");
}
