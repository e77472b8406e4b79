//! Cache Node HTTP Surface
//!
//! Exposes one node's cache engine over HTTP for the proxy and for direct
//! inspection: entry operations, stats, the live-key listing, maintenance
//! endpoints and the admin shutdown hook used by the chaos controller.

pub mod handlers;
pub mod protocol;
pub mod sweeper;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use handlers::NodeState;
pub use sweeper::spawn_sweeper;

/// Builds the node router.
///
/// ## Endpoints
/// - `GET    /cache/:key`     - fetch an entry (404 on miss/expired)
/// - `POST   /cache`          - store an entry (201)
/// - `DELETE /cache/:key`     - drop an entry
/// - `GET    /cache/stats`    - hit/miss counters and sizes
/// - `GET    /cache/keys`     - live keys with remaining TTL
/// - `POST   /cache/clear`    - drop every entry
/// - `POST   /cache/cleanup`  - sweep expired entries now
/// - `GET    /health`         - liveness probe
/// - `POST   /admin/shutdown` - terminate this node
pub fn create_node_router(state: NodeState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/cache", post(handlers::put_entry))
        .route("/cache/stats", get(handlers::engine_stats))
        .route("/cache/keys", get(handlers::list_keys))
        .route("/cache/clear", post(handlers::clear_cache))
        .route("/cache/cleanup", post(handlers::cleanup_expired))
        .route(
            "/cache/:key",
            get(handlers::get_entry).delete(handlers::delete_entry),
        )
        .route("/health", get(handlers::health))
        .route("/admin/shutdown", post(handlers::shutdown))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
