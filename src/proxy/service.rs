//! Proxy coordinator.
//!
//! Owns the shared cluster state and implements the data plane: replicated
//! write fan-out with partition awareness, primary reads with backing-store
//! fall-through, and cluster-wide deletes. Every outbound call carries its
//! own deadline; sibling calls are never cancelled by one replica failing.

use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinSet;

use crate::error::{ApiError, ApiResult};
use crate::node::protocol::{
    EntryResponse, KeyListing, NodeStats, PutEntryRequest, ENDPOINT_CACHE, ENDPOINT_KEYS,
    ENDPOINT_STATS,
};
use crate::proxy::chaos::ChaosController;
use crate::proxy::config::ProxyConfig;
use crate::proxy::membership::MembershipService;
use crate::proxy::partition::PartitionMatrix;
use crate::proxy::protocol::{DataResponse, DeleteDataResponse, FailedReplica, WriteReceipt};
use crate::ring::HashRing;
use crate::store::BackingStore;

/// Shared state of the proxy process. Cheap to clone; every field is
/// reference-counted.
#[derive(Clone)]
pub struct ProxyState {
    pub ring: Arc<RwLock<HashRing>>,
    pub members: Arc<MembershipService>,
    pub partitions: Arc<PartitionMatrix>,
    pub chaos: Arc<ChaosController>,
    pub store: Arc<BackingStore>,
    pub client: reqwest::Client,
    pub config: Arc<ProxyConfig>,
}

/// Port component of a `host:port` node id. Ids are built by the
/// membership service, so the suffix always parses.
fn node_port(id: &str) -> u16 {
    id.rsplit(':')
        .next()
        .and_then(|p| p.parse().ok())
        .unwrap_or(0)
}

impl ProxyState {
    pub fn new(config: ProxyConfig, store: BackingStore) -> Self {
        let chaos = ChaosController::new(
            config.chaos_min_interval,
            config.chaos_max_interval,
            config.min_surviving_nodes,
        );

        Self {
            ring: Arc::new(RwLock::new(HashRing::new(config.virtual_nodes))),
            members: Arc::new(MembershipService::new()),
            partitions: Arc::new(PartitionMatrix::new()),
            chaos: Arc::new(chaos),
            store: Arc::new(store),
            client: reqwest::Client::new(),
            config: Arc::new(config),
        }
    }

    /// Write path: fan the entry out to the key's replica set (minus
    /// partition-blocked nodes), then write through to the backing store.
    ///
    /// The call succeeds when the store write landed and at least one
    /// replica took the entry. When the primary was down but another
    /// replica succeeded, that replica leads the reported node list.
    pub async fn put_data(
        &self,
        key: &str,
        value: &str,
        ttl: Option<i64>,
    ) -> ApiResult<WriteReceipt> {
        let replicas = {
            let ring = self.ring.read().await;
            ring.replicas(key, self.config.replication_factor)
        };

        if replicas.is_empty() {
            return Err(ApiError::Unavailable("no cache nodes available".to_string()));
        }

        let primary = replicas[0].clone();
        let primary_port = node_port(&primary);

        let mut targets = vec![primary.clone()];
        let mut skipped = Vec::new();
        for replica in &replicas[1..] {
            if self.partitions.has(primary_port, node_port(replica)) {
                tracing::warn!(
                    "write of '{}' skips {}: partition from primary {}",
                    key,
                    replica,
                    primary
                );
                skipped.push(replica.clone());
            } else {
                targets.push(replica.clone());
            }
        }

        let payload = PutEntryRequest {
            key: key.to_string(),
            value: value.to_string(),
            ttl,
        };

        let mut fanout = JoinSet::new();
        for target in targets.clone() {
            let client = self.client.clone();
            let url = format!("http://{}{}", target, ENDPOINT_CACHE);
            let body = payload.clone();
            let timeout = self.config.http_timeout;
            fanout.spawn(async move {
                let outcome = match client.post(&url).json(&body).timeout(timeout).send().await {
                    Ok(response) if response.status().is_success() => Ok(()),
                    Ok(response) => Err(format!("HTTP {}", response.status())),
                    Err(e) => Err(e.to_string()),
                };
                (target, outcome)
            });
        }

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        while let Some(result) = fanout.join_next().await {
            let Ok((target, outcome)) = result else { continue };
            match outcome {
                Ok(()) => succeeded.push(target),
                Err(reason) => {
                    tracing::warn!("replica write to {} failed: {}", target, reason);
                    failed.push(FailedReplica {
                        node: target,
                        reason,
                    });
                }
            }
        }

        // Report replicas in ring order so a surviving primary stays first
        // and, when it died, the first successful replica takes its place.
        succeeded.sort_by_key(|id| targets.iter().position(|t| t == id));

        // Write-through happens regardless of replica outcomes; the store
        // stays authoritative even when the cache tier is degraded.
        let store_result = self.store.set(key, value, ttl.filter(|t| *t > 0).map(|t| t as u64));

        if succeeded.is_empty() {
            return Err(ApiError::Unavailable(format!(
                "no replica accepted the write for '{}'",
                key
            )));
        }

        if let Err(e) = store_result {
            tracing::error!("backing store write for '{}' failed: {:#}", key, e);
            return Err(ApiError::Internal("backing store write failed".to_string()));
        }

        Ok(WriteReceipt {
            key: key.to_string(),
            nodes: succeeded,
            skipped,
            failed,
            backing_store: "ok".to_string(),
        })
    }

    /// Read path. `bypass_cache` consults the backing store only.
    /// Otherwise the key's primary is queried first, and a miss (or an
    /// unreachable primary) falls through to the store, repopulating the
    /// primary best-effort with the row's remaining TTL.
    pub async fn get_data(&self, key: &str, bypass_cache: bool) -> ApiResult<DataResponse> {
        if bypass_cache {
            return match self.store_get(key)? {
                Some((value, _)) => Ok(DataResponse {
                    key: key.to_string(),
                    value,
                    source: "db".to_string(),
                    node: None,
                }),
                None => Err(ApiError::NotFound(format!("key '{}' not found", key))),
            };
        }

        let primary = {
            let ring = self.ring.read().await;
            ring.primary(key)
        };

        if let Some(primary) = &primary {
            let url = format!("http://{}{}/{}", primary, ENDPOINT_CACHE, key);
            match self
                .client
                .get(&url)
                .timeout(self.config.http_timeout)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    match response.json::<EntryResponse>().await {
                        Ok(entry) => {
                            tracing::debug!("cache hit for '{}' on {}", key, primary);
                            return Ok(DataResponse {
                                key: key.to_string(),
                                value: entry.value,
                                source: "cache".to_string(),
                                node: Some(primary.clone()),
                            });
                        }
                        Err(e) => {
                            tracing::warn!("bad cache payload from {}: {}", primary, e);
                        }
                    }
                }
                Ok(_) => {
                    tracing::debug!("cache miss for '{}' on {}", key, primary);
                }
                Err(e) => {
                    tracing::warn!("primary {} unreachable for '{}': {}", primary, key, e);
                }
            }
        }

        let Some((value, ttl_remaining)) = self.store_get(key)? else {
            return Err(ApiError::NotFound(format!("key '{}' not found", key)));
        };

        if let Some(primary) = primary {
            self.repopulate(&primary, key, &value, ttl_remaining).await;
        }

        Ok(DataResponse {
            key: key.to_string(),
            value,
            source: "db".to_string(),
            node: None,
        })
    }

    /// Delete path: drop the key from every current replica (individual
    /// failures ignored) and from the backing store.
    pub async fn delete_data(&self, key: &str) -> ApiResult<DeleteDataResponse> {
        let replicas = {
            let ring = self.ring.read().await;
            ring.replicas(key, self.config.replication_factor)
        };

        let mut fanout = JoinSet::new();
        for replica in replicas {
            let client = self.client.clone();
            let url = format!("http://{}{}/{}", replica, ENDPOINT_CACHE, key);
            let timeout = self.config.http_timeout;
            fanout.spawn(async move {
                if let Err(e) = client.delete(&url).timeout(timeout).send().await {
                    tracing::warn!("delete on {} failed: {}", replica, e);
                }
            });
        }
        while fanout.join_next().await.is_some() {}

        let deleted = self
            .store
            .delete(key)
            .map_err(|e| ApiError::Internal(format!("backing store delete failed: {}", e)))?;

        Ok(DeleteDataResponse {
            key: key.to_string(),
            deleted,
        })
    }

    /// Fetches one node's counters; `None` when the node does not answer
    /// within the probe deadline.
    pub async fn fetch_node_stats(&self, id: &str) -> Option<NodeStats> {
        let url = format!("http://{}{}", id, ENDPOINT_STATS);
        let response = self
            .client
            .get(&url)
            .timeout(self.config.probe_timeout)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        response.json().await.ok()
    }

    /// Fetches one node's live-key listing.
    pub async fn fetch_node_keys(&self, id: &str) -> Option<KeyListing> {
        let url = format!("http://{}{}", id, ENDPOINT_KEYS);
        let response = self
            .client
            .get(&url)
            .timeout(self.config.probe_timeout)
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        response.json().await.ok()
    }

    fn store_get(&self, key: &str) -> ApiResult<Option<(String, Option<u64>)>> {
        match self.store.get(key) {
            Ok(Some(stored)) => {
                let remaining = stored.ttl_remaining();
                Ok(Some((stored.value, remaining)))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                tracing::error!("backing store read for '{}' failed: {:#}", key, e);
                Err(ApiError::Internal("backing store read failed".to_string()))
            }
        }
    }

    /// Best-effort refill of the primary after a store fall-through. The
    /// cache copy must not outlive the authoritative row, so the remaining
    /// TTL is forwarded (floored to one second at the boundary).
    async fn repopulate(&self, primary: &str, key: &str, value: &str, ttl_remaining: Option<u64>) {
        let payload = PutEntryRequest {
            key: key.to_string(),
            value: value.to_string(),
            ttl: ttl_remaining.map(|secs| secs.max(1) as i64),
        };

        let url = format!("http://{}{}", primary, ENDPOINT_CACHE);
        match self
            .client
            .post(&url)
            .json(&payload)
            .timeout(self.config.http_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("repopulated '{}' on {}", key, primary);
            }
            Ok(response) => {
                tracing::warn!("repopulate of '{}' returned {}", key, response.status());
            }
            Err(e) => {
                tracing::warn!("repopulate of '{}' on {} failed: {}", key, primary, e);
            }
        }
    }
}
