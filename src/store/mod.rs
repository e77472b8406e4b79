//! Backing Store Module
//!
//! Durable key/value persistence behind the proxy. Every user write goes
//! through here; cache misses fall back to it. Rows carry the original TTL
//! and creation time, so the proxy can both filter expired rows and compute
//! the remaining TTL when repopulating a cache node.
//!
//! SQLite via `rusqlite` with a single connection behind a mutex. The store
//! is owned exclusively by the proxy process; operations are short
//! single-row statements.

use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

/// One live row fetched from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredValue {
    pub value: String,
    pub ttl_seconds: Option<u64>,
    pub created_at: u64,
}

impl StoredValue {
    /// Remaining TTL in whole seconds, `None` for non-expiring rows. Used
    /// when repopulating a cache node after a miss so the cache copy dies
    /// no later than the authoritative row.
    pub fn ttl_remaining(&self) -> Option<u64> {
        self.ttl_seconds
            .map(|ttl| (self.created_at + ttl).saturating_sub(now_secs()))
    }
}

/// SQLite-backed durable store.
pub struct BackingStore {
    conn: Mutex<Connection>,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl BackingStore {
    /// Opens (or creates) the database file and ensures the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open backing store at {}", path.display()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                key         TEXT PRIMARY KEY,
                value       TEXT NOT NULL,
                ttl_seconds INTEGER,
                created_at  INTEGER NOT NULL
            )",
            [],
        )
        .context("failed to create cache_entries table")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Upserts a row; `created_at` resets to now.
    pub fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT OR REPLACE INTO cache_entries (key, value, ttl_seconds, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                key,
                value,
                ttl_seconds.map(|t| t as i64),
                now_secs() as i64
            ],
        )
        .context("failed to write to backing store")?;
        Ok(())
    }

    /// Fetches a row. A row past its TTL is treated as absent and
    /// best-effort deleted.
    pub fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        let conn = self.lock();
        let row = conn
            .query_row(
                "SELECT value, ttl_seconds, created_at FROM cache_entries WHERE key = ?1",
                params![key],
                |row| {
                    let ttl: Option<i64> = row.get(1)?;
                    let created_at: i64 = row.get(2)?;
                    Ok(StoredValue {
                        value: row.get(0)?,
                        ttl_seconds: ttl.map(|t| t as u64),
                        created_at: created_at as u64,
                    })
                },
            )
            .optional()
            .context("failed to read from backing store")?;

        let Some(stored) = row else {
            return Ok(None);
        };

        if let Some(ttl) = stored.ttl_seconds {
            if now_secs().saturating_sub(stored.created_at) >= ttl {
                let _ = conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![key]);
                return Ok(None);
            }
        }

        Ok(Some(stored))
    }

    /// Deletes a row if present.
    pub fn delete(&self, key: &str) -> Result<bool> {
        let conn = self.lock();
        let affected = conn
            .execute("DELETE FROM cache_entries WHERE key = ?1", params![key])
            .context("failed to delete from backing store")?;
        Ok(affected > 0)
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0))
            .context("failed to count backing store rows")?;
        Ok(count as u64)
    }

    pub fn clear(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute("DELETE FROM cache_entries", [])
            .context("failed to clear backing store")?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned mutex means a panic mid-statement; the connection is
        // still usable for independent statements.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}
