//! Node Wire Protocol
//!
//! Endpoint paths and DTOs for the node HTTP surface. The proxy's client
//! code shares these definitions, so both sides of every call agree on the
//! payload shape.

use serde::{Deserialize, Serialize};

// --- Endpoints ---

/// Entry operations (`POST /cache`, `GET|DELETE /cache/:key`).
pub const ENDPOINT_CACHE: &str = "/cache";
/// Per-node counters (`GET /cache/stats`).
pub const ENDPOINT_STATS: &str = "/cache/stats";
/// Live-key listing (`GET /cache/keys`).
pub const ENDPOINT_KEYS: &str = "/cache/keys";
/// Liveness probe (`GET /health`).
pub const ENDPOINT_HEALTH: &str = "/health";
/// Admin termination hook (`POST /admin/shutdown`).
pub const ENDPOINT_SHUTDOWN: &str = "/admin/shutdown";

// --- DTOs ---

/// Body of `POST /cache`. A `ttl` of `None` or `<= 0` stores a
/// never-expiring entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutEntryRequest {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub ttl: Option<i64>,
}

/// Acknowledgment of a stored entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct PutEntryResponse {
    pub key: String,
    pub ttl: Option<i64>,
}

/// A cache hit returned from `GET /cache/:key`.
#[derive(Debug, Serialize, Deserialize)]
pub struct EntryResponse {
    pub key: String,
    pub value: String,
    pub hit: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteEntryResponse {
    pub deleted: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
    pub cleared: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub removed: usize,
}

/// Per-node counters; the proxy aggregates these into the global view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub current_size: usize,
    pub capacity: usize,
}

/// One row of the live-key listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyEntry {
    pub key: String,
    pub value: String,
    pub ttl_remaining: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KeyListing {
    pub keys: Vec<KeyEntry>,
    pub total_keys: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShutdownResponse {
    pub message: String,
}
