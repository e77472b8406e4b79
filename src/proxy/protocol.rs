//! Proxy Wire Protocol
//!
//! DTOs for the coordinator's public HTTP surface: data operations,
//! cluster mutation, partition control, chaos control and the
//! observability payloads consumed by the dashboard.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::node::protocol::NodeStats;
use crate::ring::{RingStats, VnodeInfo};

// --- Data plane ---

/// Body of `POST /data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataRequest {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub ttl: Option<i64>,
}

/// Query parameters of `GET /data/:key`.
#[derive(Debug, Deserialize)]
pub struct GetDataParams {
    #[serde(default)]
    pub bypass_cache: bool,
}

/// One replica write that did not land, with the reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedReplica {
    pub node: String,
    pub reason: String,
}

/// Outcome of a write: which replicas took it, which were skipped because
/// of a declared partition, which failed outright.
#[derive(Debug, Serialize, Deserialize)]
pub struct WriteReceipt {
    pub key: String,
    pub nodes: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<FailedReplica>,
    pub backing_store: String,
}

/// Outcome of a read. `source` is `"cache"` or `"db"`; `node` names the
/// serving cache node on a hit.
#[derive(Debug, Serialize, Deserialize)]
pub struct DataResponse {
    pub key: String,
    pub value: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteDataResponse {
    pub key: String,
    pub deleted: bool,
}

// --- Cluster mutation ---

/// Body of `POST /cluster/add-node`.
#[derive(Debug, Deserialize)]
pub struct AddNodeRequest {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[derive(Debug, Serialize)]
pub struct AddNodeResponse {
    pub message: String,
    pub node: String,
    /// Ring snapshot after the mutation, one row per virtual node.
    pub nodes: Vec<VnodeInfo>,
}

#[derive(Debug, Serialize)]
pub struct RemoveNodeResponse {
    pub message: String,
    pub node: String,
    pub nodes: Vec<VnodeInfo>,
}

// --- Partition control ---

/// Query parameters of `POST /partition/create` and `/partition/remove`.
#[derive(Debug, Deserialize)]
pub struct PartitionParams {
    pub source_port: u16,
    pub target_port: u16,
}

#[derive(Debug, Serialize)]
pub struct PartitionMessage {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionPair {
    pub source: u16,
    pub target: u16,
}

#[derive(Debug, Serialize)]
pub struct PartitionListResponse {
    pub partitions: Vec<PartitionPair>,
    pub count: usize,
}

// --- Chaos control ---

#[derive(Debug, Serialize)]
pub struct ChaosMessage {
    pub message: String,
}

// --- Observability ---

#[derive(Debug, Serialize)]
pub struct ClusterMapResponse {
    pub nodes: Vec<VnodeInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeLoad {
    pub name: String,
    pub keys: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionSlice {
    pub name: String,
    pub value: u64,
}

/// Aggregated cluster counters for the dashboard charts.
#[derive(Debug, Serialize)]
pub struct GlobalStatsResponse {
    pub hit_rate: f64,
    pub total_requests: u64,
    pub node_load: Vec<NodeLoad>,
    pub request_distribution: Vec<DistributionSlice>,
}

/// One live key on one node.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterKeyRow {
    pub key: String,
    pub value: String,
    pub ttl_remaining: Option<u64>,
    pub node: String,
}

#[derive(Debug, Serialize)]
pub struct DebugKeysResponse {
    pub keys: Vec<ClusterKeyRow>,
    pub total_keys: usize,
    pub nodes_queried: usize,
}

#[derive(Debug, Serialize)]
pub struct ClusterStatsResponse {
    pub ring_stats: RingStats,
    pub node_stats: BTreeMap<String, NodeStats>,
    pub unreachable: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ProxyHealthResponse {
    pub status: String,
    pub ring: RingStats,
}
