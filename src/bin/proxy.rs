use std::net::SocketAddr;

use tokio::signal;

use ringcache::proxy::membership::spawn_health_loop;
use ringcache::proxy::{create_proxy_router, ProxyConfig, ProxyState};
use ringcache::store::BackingStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut host = "127.0.0.1".to_string();
    let mut port: u16 = 8000;
    let mut db_path = "cache_db.sqlite".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--host" => {
                host = args[i + 1].clone();
                i += 2;
            }
            "--port" => {
                port = args[i + 1].parse()?;
                i += 2;
            }
            "--db" => {
                db_path = args[i + 1].clone();
                i += 2;
            }
            "--help" => {
                eprintln!("Usage: {} [--host <h>] [--port <p>] [--db <path>]", args[0]);
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    let config = ProxyConfig::from_env();
    tracing::info!("starting proxy on {}:{}", host, port);
    tracing::info!(
        "replication factor: {}, virtual nodes: {}, backing store: {}",
        config.replication_factor,
        config.virtual_nodes,
        db_path
    );

    let store = BackingStore::open(&db_path)?;
    let state = ProxyState::new(config, store);

    let _health_loop = spawn_health_loop(
        state.members.clone(),
        state.ring.clone(),
        state.client.clone(),
        state.config.health_check_period,
        state.config.probe_timeout,
    );

    let app = create_proxy_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("proxy listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("proxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, shutting down");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }
}
