//! Cache Engine Module
//!
//! Implements the per-node in-memory store.
//!
//! ## Core Concepts
//! - **Recency order**: Every access moves an entry to the most-recent end
//!   of an intrusive doubly-linked list; capacity overflow evicts the
//!   least-recent end.
//! - **TTL**: Entries carry an optional absolute expiry. Expired entries are
//!   dropped lazily on access and eagerly by a background sweep.
//! - **Counters**: Hits and misses are tracked per engine and exposed via
//!   `stats()` for the cluster observability surface.

pub mod engine;
pub mod entry;
pub mod stats;

pub use engine::{CacheClosed, CacheEngine, KeySnapshot};
pub use entry::CacheEntry;
pub use stats::EngineStats;
