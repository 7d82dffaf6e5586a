//! Cache Proxy - A forward/reverse HTTP proxy with a response cache
//!
//! Serves the proxy and the admin API on separate ports.

use std::future::IntoFuture;
use std::net::SocketAddr;

use anyhow::Context;
use tokio::{signal, sync::watch};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cache_proxy::api::{create_admin_router, create_proxy_router};
use cache_proxy::{AppState, Config};

/// Main entry point for the caching proxy.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache and the upstream fetcher
/// 4. Bind the proxy and admin listeners
/// 5. Serve both until SIGINT/SIGTERM, then shut down gracefully
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cache_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Cache Proxy");

    let config = Config::from_env();
    info!(
        "Configuration loaded: capacity={}, ttl={}s, proxy_port={}, admin_port={}, upstream={}",
        config.cache_capacity,
        config.cache_ttl,
        config.proxy_port,
        config.admin_port,
        config.upstream_url.as_deref().unwrap_or("<forward proxy>")
    );
    if config.cache_capacity == 0 {
        warn!("CACHE_CAPACITY is 0, responses will never be served from cache");
    }

    let state = AppState::from_config(&config).context("failed to initialise proxy state")?;
    info!("Cache initialized");

    let proxy_addr = SocketAddr::from(([0, 0, 0, 0], config.proxy_port));
    let admin_addr = SocketAddr::from(([0, 0, 0, 0], config.admin_port));
    let proxy_listener = tokio::net::TcpListener::bind(proxy_addr)
        .await
        .with_context(|| format!("failed to bind proxy listener on {}", proxy_addr))?;
    let admin_listener = tokio::net::TcpListener::bind(admin_addr)
        .await
        .with_context(|| format!("failed to bind admin listener on {}", admin_addr))?;
    info!("Proxy listening on http://{}", proxy_addr);
    info!("Admin API listening on http://{}", admin_addr);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let proxy = axum::serve(proxy_listener, create_proxy_router(state.clone()))
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));
    let admin = axum::serve(admin_listener, create_admin_router(state))
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx));

    let (proxy_result, admin_result) = tokio::join!(proxy.into_future(), admin.into_future());
    proxy_result.context("proxy server failed")?;
    admin_result.context("admin server failed")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
