//! Proxy API Handlers
//!
//! The coordinator's public HTTP surface: data operations, cluster
//! mutation, partition control, chaos control and observability.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tokio::task::JoinSet;

use crate::error::{ApiError, ApiResult};
use crate::proxy::chaos::{run_chaos_loop, ChaosStatus};
use crate::proxy::protocol::{
    AddNodeRequest, AddNodeResponse, ChaosMessage, ClusterKeyRow, ClusterMapResponse,
    ClusterStatsResponse, DataRequest, DataResponse, DebugKeysResponse, DeleteDataResponse,
    DistributionSlice, GetDataParams, GlobalStatsResponse, NodeLoad, PartitionListResponse,
    PartitionMessage, PartitionPair, PartitionParams, ProxyHealthResponse, RemoveNodeResponse,
    WriteReceipt,
};
use crate::proxy::service::ProxyState;

// --- Data plane ---

/// `POST /data`
pub async fn put_data(
    State(state): State<ProxyState>,
    Json(req): Json<DataRequest>,
) -> ApiResult<Json<WriteReceipt>> {
    if req.key.is_empty() {
        return Err(ApiError::BadRequest("key must not be empty".to_string()));
    }

    let receipt = state.put_data(&req.key, &req.value, req.ttl).await?;
    tracing::info!(
        "wrote '{}' to {}/{} replica(s)",
        req.key,
        receipt.nodes.len(),
        receipt.nodes.len() + receipt.skipped.len() + receipt.failed.len()
    );
    Ok(Json(receipt))
}

/// `GET /data/:key`
pub async fn get_data(
    State(state): State<ProxyState>,
    Path(key): Path<String>,
    Query(params): Query<GetDataParams>,
) -> ApiResult<Json<DataResponse>> {
    let response = state.get_data(&key, params.bypass_cache).await?;
    Ok(Json(response))
}

/// `DELETE /data/:key`
pub async fn delete_data(
    State(state): State<ProxyState>,
    Path(key): Path<String>,
) -> ApiResult<Json<DeleteDataResponse>> {
    let response = state.delete_data(&key).await?;
    Ok(Json(response))
}

// --- Cluster mutation ---

/// `POST /cluster/add-node`
pub async fn add_node(
    State(state): State<ProxyState>,
    Json(req): Json<AddNodeRequest>,
) -> ApiResult<Json<AddNodeResponse>> {
    let id = format!("{}:{}", req.host, req.port);
    let newly_added = state.members.add(&req.host, req.port);

    let mut ring = state.ring.write().await;
    ring.add(&id);

    let message = if newly_added {
        tracing::info!("node {} added to cluster", id);
        format!("node {} added to cluster", id)
    } else {
        format!("node {} already registered", id)
    };

    Ok(Json(AddNodeResponse {
        message,
        node: id,
        nodes: ring.snapshot(),
    }))
}

/// `DELETE /cluster/remove-node/:port`
pub async fn remove_node(
    State(state): State<ProxyState>,
    Path(port): Path<u16>,
) -> ApiResult<Json<RemoveNodeResponse>> {
    let Some(descriptor) = state.members.remove_by_port(port) else {
        return Err(ApiError::BadRequest(format!(
            "no node registered on port {}",
            port
        )));
    };

    let mut ring = state.ring.write().await;
    ring.remove(&descriptor.id);
    tracing::info!("node {} removed from cluster", descriptor.id);

    Ok(Json(RemoveNodeResponse {
        message: format!("node {} removed from cluster", descriptor.id),
        node: descriptor.id,
        nodes: ring.snapshot(),
    }))
}

// --- Partition control ---

/// `POST /partition/create`
pub async fn partition_create(
    State(state): State<ProxyState>,
    Query(params): Query<PartitionParams>,
) -> ApiResult<Json<PartitionMessage>> {
    let created = state
        .partitions
        .create(params.source_port, params.target_port)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let message = if created {
        tracing::warn!(
            "network partition created between {} and {}",
            params.source_port,
            params.target_port
        );
        format!(
            "partition created between {} and {}",
            params.source_port, params.target_port
        )
    } else {
        format!(
            "partition between {} and {} already exists",
            params.source_port, params.target_port
        )
    };

    Ok(Json(PartitionMessage { message }))
}

/// `POST /partition/remove`
pub async fn partition_remove(
    State(state): State<ProxyState>,
    Query(params): Query<PartitionParams>,
) -> Json<PartitionMessage> {
    let removed = state.partitions.remove(params.source_port, params.target_port);

    let message = if removed {
        tracing::info!(
            "network partition removed between {} and {}",
            params.source_port,
            params.target_port
        );
        format!(
            "partition removed between {} and {}",
            params.source_port, params.target_port
        )
    } else {
        format!(
            "no partition between {} and {}",
            params.source_port, params.target_port
        )
    };

    Json(PartitionMessage { message })
}

/// `GET /partition/list`
pub async fn partition_list(State(state): State<ProxyState>) -> Json<PartitionListResponse> {
    let partitions: Vec<PartitionPair> = state
        .partitions
        .list()
        .into_iter()
        .map(|(source, target)| PartitionPair { source, target })
        .collect();

    let count = partitions.len();
    Json(PartitionListResponse { partitions, count })
}

/// `POST /partition/clear`
pub async fn partition_clear(State(state): State<ProxyState>) -> Json<PartitionMessage> {
    let cleared = state.partitions.clear();
    tracing::info!("cleared {} network partition(s)", cleared);
    Json(PartitionMessage {
        message: format!("cleared {} partition(s)", cleared),
    })
}

// --- Chaos control ---

/// `POST /chaos/start`
pub async fn chaos_start(State(state): State<ProxyState>) -> Json<ChaosMessage> {
    if !state.chaos.start() {
        return Json(ChaosMessage {
            message: "chaos controller already running".to_string(),
        });
    }

    let controller = state.chaos.clone();
    let members = state.members.clone();
    let client = state.client.clone();
    tokio::spawn(run_chaos_loop(controller, members, client));

    Json(ChaosMessage {
        message: "chaos controller started; nodes will be terminated at random".to_string(),
    })
}

/// `POST /chaos/stop`
pub async fn chaos_stop(State(state): State<ProxyState>) -> Json<ChaosMessage> {
    let message = if state.chaos.stop() {
        "chaos controller stopped".to_string()
    } else {
        "chaos controller is not running".to_string()
    };

    Json(ChaosMessage { message })
}

/// `GET /chaos/status`
pub async fn chaos_status(State(state): State<ProxyState>) -> Json<ChaosStatus> {
    Json(state.chaos.status(state.members.len()))
}

// --- Observability ---

/// `GET /cluster/map`
pub async fn cluster_map(State(state): State<ProxyState>) -> Json<ClusterMapResponse> {
    let ring = state.ring.read().await;
    Json(ClusterMapResponse {
        nodes: ring.snapshot(),
    })
}

/// `GET /stats/global`
///
/// Fans `GET /cache/stats` out to every registered node and aggregates the
/// counters. Unreachable nodes are skipped.
pub async fn global_stats(State(state): State<ProxyState>) -> Json<GlobalStatsResponse> {
    let mut fanout = JoinSet::new();
    for id in state.members.ids() {
        let state = state.clone();
        fanout.spawn(async move {
            let stats = state.fetch_node_stats(&id).await;
            (id, stats)
        });
    }

    let mut total_hits = 0u64;
    let mut total_misses = 0u64;
    let mut node_load = Vec::new();
    while let Some(result) = fanout.join_next().await {
        let Ok((id, stats)) = result else { continue };
        let Some(stats) = stats else {
            tracing::warn!("stats fetch from {} failed", id);
            continue;
        };
        total_hits += stats.hits;
        total_misses += stats.misses;
        node_load.push(NodeLoad {
            name: id,
            keys: stats.current_size,
        });
    }

    node_load.sort_by(|a, b| a.name.cmp(&b.name));

    let total_requests = total_hits + total_misses;
    let hit_rate = if total_requests == 0 {
        0.0
    } else {
        total_hits as f64 / total_requests as f64
    };

    Json(GlobalStatsResponse {
        hit_rate,
        total_requests,
        node_load,
        request_distribution: vec![
            DistributionSlice {
                name: "Hits".to_string(),
                value: total_hits,
            },
            DistributionSlice {
                name: "Misses".to_string(),
                value: total_misses,
            },
        ],
    })
}

/// `GET /debug/keys`
///
/// Union of every node's live-key listing, one row per (key, node).
pub async fn debug_keys(State(state): State<ProxyState>) -> Json<DebugKeysResponse> {
    let mut fanout = JoinSet::new();
    for id in state.members.ids() {
        let state = state.clone();
        fanout.spawn(async move {
            let listing = state.fetch_node_keys(&id).await;
            (id, listing)
        });
    }

    let mut keys = Vec::new();
    let mut nodes_queried = 0;
    while let Some(result) = fanout.join_next().await {
        let Ok((id, listing)) = result else { continue };
        let Some(listing) = listing else {
            tracing::warn!("key listing fetch from {} failed", id);
            continue;
        };
        nodes_queried += 1;
        for entry in listing.keys {
            keys.push(ClusterKeyRow {
                key: entry.key,
                value: entry.value,
                ttl_remaining: entry.ttl_remaining,
                node: id.clone(),
            });
        }
    }

    // Shortest-lived keys first; non-expiring ones at the end.
    keys.sort_by_key(|row| (row.ttl_remaining.is_none(), row.ttl_remaining, row.key.clone()));

    let total_keys = keys.len();
    Json(DebugKeysResponse {
        keys,
        total_keys,
        nodes_queried,
    })
}

/// `GET /cluster/stats`
pub async fn cluster_stats(State(state): State<ProxyState>) -> Json<ClusterStatsResponse> {
    let ring_stats = {
        let ring = state.ring.read().await;
        ring.stats()
    };

    let mut fanout = JoinSet::new();
    for id in state.members.ids() {
        let state = state.clone();
        fanout.spawn(async move {
            let stats = state.fetch_node_stats(&id).await;
            (id, stats)
        });
    }

    let mut node_stats = BTreeMap::new();
    let mut unreachable = Vec::new();
    while let Some(result) = fanout.join_next().await {
        let Ok((id, stats)) = result else { continue };
        match stats {
            Some(stats) => {
                node_stats.insert(id, stats);
            }
            None => unreachable.push(id),
        }
    }
    unreachable.sort();

    Json(ClusterStatsResponse {
        ring_stats,
        node_stats,
        unreachable,
    })
}

/// `GET /health`
pub async fn health(State(state): State<ProxyState>) -> Json<ProxyHealthResponse> {
    let ring = state.ring.read().await;
    Json(ProxyHealthResponse {
        status: "ok".to_string(),
        ring: ring.stats(),
    })
}
