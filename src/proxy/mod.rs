//! Proxy Coordinator Module
//!
//! The single coordinator fronting the cache cluster.
//!
//! ## Core Concepts
//! - **Routing**: Keys resolve to an ordered replica set on the
//!   consistent-hash ring; reads target the primary, writes fan out to the
//!   whole set.
//! - **Write-through**: Every user write lands in the backing store, which
//!   stays authoritative; cache contents are volatile.
//! - **Partition awareness**: Declared node-pair partitions remove replicas
//!   from write fan-out. Reads are unaffected, they only ever touch the
//!   primary.
//! - **Liveness**: A periodic health loop prunes nodes that fail two
//!   consecutive probes; this is also how chaos kills are detected.
//! - **Chaos**: An optional loop that terminates a random node at random
//!   intervals while keeping a configured survivor floor.

pub mod chaos;
pub mod config;
pub mod handlers;
pub mod membership;
pub mod partition;
pub mod protocol;
pub mod service;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use chaos::ChaosController;
pub use config::ProxyConfig;
pub use membership::MembershipService;
pub use partition::PartitionMatrix;
pub use service::ProxyState;


/// Builds the proxy router.
///
/// ## Endpoints
/// - `POST   /data`, `GET|DELETE /data/:key` - replicated data operations
/// - `POST   /cluster/add-node`, `DELETE /cluster/remove-node/:port`
/// - `GET    /cluster/map`, `GET /cluster/stats`
/// - `POST   /partition/create|remove|clear`, `GET /partition/list`
/// - `POST   /chaos/start|stop`, `GET /chaos/status`
/// - `GET    /stats/global`, `GET /debug/keys`, `GET /health`
pub fn create_proxy_router(state: ProxyState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/data", post(handlers::put_data))
        .route(
            "/data/:key",
            get(handlers::get_data).delete(handlers::delete_data),
        )
        .route("/cluster/add-node", post(handlers::add_node))
        .route("/cluster/remove-node/:port", delete(handlers::remove_node))
        .route("/cluster/map", get(handlers::cluster_map))
        .route("/cluster/stats", get(handlers::cluster_stats))
        .route("/partition/create", post(handlers::partition_create))
        .route("/partition/remove", post(handlers::partition_remove))
        .route("/partition/clear", post(handlers::partition_clear))
        .route("/partition/list", get(handlers::partition_list))
        .route("/chaos/start", post(handlers::chaos_start))
        .route("/chaos/stop", post(handlers::chaos_stop))
        .route("/chaos/status", get(handlers::chaos_status))
        .route("/stats/global", get(handlers::global_stats))
        .route("/debug/keys", get(handlers::debug_keys))
        .route("/health", get(handlers::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
