//! Hit/miss accounting for a cache engine.

use serde::Serialize;

/// Snapshot of an engine's performance counters. `hits` and `misses` only
/// ever grow; `clear()` on the engine leaves them untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub current_size: usize,
    pub capacity: usize,
}

impl EngineStats {
    pub fn new(hits: u64, misses: u64, current_size: usize, capacity: usize) -> Self {
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };

        Self {
            hits,
            misses,
            hit_rate,
            current_size,
            capacity,
        }
    }
}
