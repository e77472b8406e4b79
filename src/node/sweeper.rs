//! Background TTL sweeper.
//!
//! Complements the lazy expiry check on access: entries that are never
//! touched again still get dropped within one sweep interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::cache::CacheEngine;

/// Spawns the sweep loop. Every `interval_secs` the engine is locked once
/// and scanned for expired entries. The returned handle is aborted on
/// shutdown.
pub fn spawn_sweeper(engine: Arc<Mutex<CacheEngine>>, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));

        loop {
            interval.tick().await;

            let removed = {
                let mut engine = engine.lock().await;
                engine.sweep_expired()
            };

            if removed > 0 {
                tracing::info!("sweeper removed {} expired entries", removed);
            }
        }
    })
}
