//! Replicated TTL Cache Cluster Library
//!
//! This library crate defines the core modules shared by the two binaries
//! (`ringcache-node` and `ringcache-proxy`).
//!
//! ## Architecture Modules
//! The system is composed of loosely coupled subsystems:
//!
//! - **`cache`**: The per-node cache engine. A capacity-bounded key/value
//!   store with per-entry TTL and least-recently-used eviction.
//! - **`node`**: The HTTP surface of a cache node. Exposes the engine's
//!   operations plus stats, maintenance and admin endpoints.
//! - **`ring`**: The consistent-hash ring. Maps keys onto an ordered replica
//!   set of physical nodes via virtual-node placement.
//! - **`store`**: The durable backing store. Write-through authoritative
//!   storage and miss fallback, owned by the proxy.
//! - **`proxy`**: The coordinator. Routing, replication fan-out, partition
//!   simulation, liveness-driven membership, chaos injection and the
//!   cluster observability surface.

pub mod cache;
pub mod error;
pub mod node;
pub mod proxy;
pub mod ring;
pub mod store;
