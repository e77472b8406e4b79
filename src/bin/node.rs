use std::net::SocketAddr;

use tokio::signal;
use tokio::sync::mpsc;

use ringcache::cache::CacheEngine;
use ringcache::node::{create_node_router, spawn_sweeper, NodeState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut host = "127.0.0.1".to_string();
    let mut port: u16 = 8001;
    let mut capacity: usize = 100;

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
            "--capacity" => {
                capacity = args[i + 1].parse()?;
                i += 2;
            }
            "--help" => {
                eprintln!("Usage: {} [--host <h>] [--port <p>] [--capacity <n>]", args[0]);
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    if capacity == 0 {
        eprintln!("--capacity must be positive");
        std::process::exit(1);
    }

    let sweep_interval: u64 = std::env::var("SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(1);

    tracing::info!("starting cache node on {}:{}", host, port);
    tracing::info!("cache capacity: {}, sweep interval: {}s", capacity, sweep_interval);

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let state = NodeState::new(CacheEngine::new(capacity), port, shutdown_tx);

    let sweeper = spawn_sweeper(state.engine.clone(), sweep_interval);
    let app = create_node_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("cache node listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_rx))
        .await?;

    sweeper.abort();
    tracing::info!("cache node on port {} stopped", port);

    Ok(())
}

/// Resolves when the process should stop: Ctrl+C, SIGTERM, or the admin
/// shutdown endpoint.
async fn shutdown_signal(mut admin_rx: mpsc::Receiver<()>) {
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
        _ = admin_rx.recv() => {
            tracing::warn!("shutdown triggered via admin endpoint");
        }
    }
}
