//! Node API Handlers
//!
//! Translate HTTP requests into cache engine calls. The engine is behind a
//! single mutex; every handler takes the lock for the duration of one O(1)
//! operation (the sweep endpoints are O(n) but rare).

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tokio::sync::{mpsc, Mutex};

use crate::cache::CacheEngine;
use crate::error::{ApiError, ApiResult};
use crate::node::protocol::{
    CleanupResponse, ClearResponse, DeleteEntryResponse, EntryResponse, HealthResponse, KeyEntry,
    KeyListing, NodeStats, PutEntryRequest, PutEntryResponse, ShutdownResponse,
};

/// Shared state of one node process.
#[derive(Clone)]
pub struct NodeState {
    pub engine: Arc<Mutex<CacheEngine>>,
    pub port: u16,
    shutdown_tx: mpsc::Sender<()>,
}

impl NodeState {
    pub fn new(engine: CacheEngine, port: u16, shutdown_tx: mpsc::Sender<()>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            port,
            shutdown_tx,
        }
    }
}

/// `GET /cache/:key`
pub async fn get_entry(
    State(state): State<NodeState>,
    Path(key): Path<String>,
) -> ApiResult<Json<EntryResponse>> {
    let mut engine = state.engine.lock().await;

    match engine.get(&key) {
        Some(value) => {
            tracing::debug!("cache hit for key {}", key);
            Ok(Json(EntryResponse {
                key,
                value,
                hit: true,
            }))
        }
        None => Err(ApiError::NotFound(format!("key '{}' not in cache", key))),
    }
}

/// `POST /cache`
pub async fn put_entry(
    State(state): State<NodeState>,
    Json(req): Json<PutEntryRequest>,
) -> ApiResult<(StatusCode, Json<PutEntryResponse>)> {
    if req.key.is_empty() {
        return Err(ApiError::BadRequest("key must not be empty".to_string()));
    }

    let mut engine = state.engine.lock().await;
    engine
        .put(req.key.clone(), req.value, req.ttl)
        .map_err(|_| ApiError::Unavailable("node is shutting down".to_string()))?;

    tracing::debug!("stored key {} (ttl {:?})", req.key, req.ttl);
    Ok((
        StatusCode::CREATED,
        Json(PutEntryResponse {
            key: req.key,
            ttl: req.ttl,
        }),
    ))
}

/// `DELETE /cache/:key`
pub async fn delete_entry(
    State(state): State<NodeState>,
    Path(key): Path<String>,
) -> Json<DeleteEntryResponse> {
    let mut engine = state.engine.lock().await;
    let deleted = engine.delete(&key);
    Json(DeleteEntryResponse { deleted })
}

/// `GET /cache/stats`
pub async fn engine_stats(State(state): State<NodeState>) -> Json<NodeStats> {
    let engine = state.engine.lock().await;
    let stats = engine.stats();

    Json(NodeStats {
        hits: stats.hits,
        misses: stats.misses,
        hit_rate: stats.hit_rate,
        current_size: stats.current_size,
        capacity: stats.capacity,
    })
}

/// `GET /cache/keys`
pub async fn list_keys(State(state): State<NodeState>) -> Json<KeyListing> {
    let engine = state.engine.lock().await;
    let keys: Vec<KeyEntry> = engine
        .snapshot()
        .into_iter()
        .map(|s| KeyEntry {
            key: s.key,
            value: s.value,
            ttl_remaining: s.ttl_remaining,
        })
        .collect();

    let total_keys = keys.len();
    Json(KeyListing { keys, total_keys })
}

/// `POST /cache/clear`
pub async fn clear_cache(State(state): State<NodeState>) -> Json<ClearResponse> {
    let mut engine = state.engine.lock().await;
    engine.clear();
    tracing::info!("cache cleared");
    Json(ClearResponse { cleared: true })
}

/// `POST /cache/cleanup`
pub async fn cleanup_expired(State(state): State<NodeState>) -> Json<CleanupResponse> {
    let mut engine = state.engine.lock().await;
    let removed = engine.sweep_expired();
    Json(CleanupResponse { removed })
}

/// `GET /health`
pub async fn health(State(state): State<NodeState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        port: state.port,
    })
}

/// `POST /admin/shutdown`
///
/// Closes the engine and signals the server loop to stop. The chaos
/// controller terminates victims through this endpoint.
pub async fn shutdown(State(state): State<NodeState>) -> Json<ShutdownResponse> {
    {
        let mut engine = state.engine.lock().await;
        engine.close();
    }

    tracing::warn!("shutdown requested via admin endpoint");
    let _ = state.shutdown_tx.send(()).await;

    Json(ShutdownResponse {
        message: format!("node on port {} shutting down", state.port),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::create_node_router;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    fn test_state() -> NodeState {
        let (tx, _rx) = mpsc::channel(1);
        NodeState::new(CacheEngine::new(100), 8001, tx)
    }

    async fn body_json(body: Body) -> serde_json::Value {
        let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_put_then_get_roundtrip() {
        let app = create_node_router(test_state());

        let put = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/cache")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"key":"u1","value":"alice","ttl":20}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(put.status(), StatusCode::CREATED);

        let get = app
            .oneshot(
                Request::builder()
                    .uri("/cache/u1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(get.status(), StatusCode::OK);

        let json = body_json(get.into_body()).await;
        assert_eq!(json["value"], "alice");
        assert_eq!(json["hit"], true);
    }

    #[tokio::test]
    async fn test_get_miss_is_404() {
        let app = create_node_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/cache/ghost")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_put_empty_key_is_400() {
        let app = create_node_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/cache")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"key":"","value":"x"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_reports_whether_key_existed() {
        let app = create_node_router(test_state());

        app.clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/cache")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"key":"k","value":"v"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        let first = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/cache/k")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(first.into_body()).await;
        assert_eq!(json["deleted"], true);

        let second = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/cache/k")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(second.into_body()).await;
        assert_eq!(json["deleted"], false);
    }

    #[tokio::test]
    async fn test_stats_reflect_hits_and_misses() {
        let app = create_node_router(test_state());

        app.clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/cache")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"key":"k","value":"v"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        // One hit, one miss.
        app.clone()
            .oneshot(
                Request::builder()
                    .uri("/cache/k")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        app.clone()
            .oneshot(
                Request::builder()
                    .uri("/cache/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/cache/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response.into_body()).await;

        assert_eq!(json["hits"], 1);
        assert_eq!(json["misses"], 1);
        assert_eq!(json["current_size"], 1);
        assert_eq!(json["capacity"], 100);
    }

    #[tokio::test]
    async fn test_keys_listing_contains_ttl() {
        let app = create_node_router(test_state());

        app.clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/cache")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"key":"k","value":"v","ttl":30}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/cache/keys")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response.into_body()).await;

        assert_eq!(json["total_keys"], 1);
        assert_eq!(json["keys"][0]["key"], "k");
        assert!(json["keys"][0]["ttl_remaining"].as_u64().unwrap() <= 30);
    }

    #[tokio::test]
    async fn test_health_reports_port() {
        let app = create_node_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response.into_body()).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["port"], 8001);
    }

    #[tokio::test]
    async fn test_shutdown_closes_engine_and_signals() {
        let (tx, mut rx) = mpsc::channel(1);
        let state = NodeState::new(CacheEngine::new(10), 8001, tx);
        let app = create_node_router(state.clone());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/admin/shutdown")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(rx.recv().await.is_some());

        // Writes are refused once the engine is closed.
        let put = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/cache")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"key":"k","value":"v"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(put.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
