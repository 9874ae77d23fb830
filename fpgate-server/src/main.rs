//! # fpgate
//!
//! Storefront trust-gate service: registers browser fingerprints behind an
//! origin allow-list, hands out short-lived HMAC-signed session cookies,
//! and relays gated order submissions to the Telegram notification
//! endpoint.

use std::time::Duration;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fpgate_server::{AppState, Config, create_router};

/// How often the background sweep drops expired fingerprints that no
/// lookup has touched.
const REGISTRY_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "fpgate_server=info,fpgate_core=info,tower_http=info"
                        .into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("failed to load configuration")?;
    if config.relay_api_secret.is_none() {
        // The gated endpoints respond 500 until this is fixed; say so now.
        error!("RELAY_API_SECRET is not set; relay and notify will refuse requests");
    }

    let bind_addr = config.bind_addr();
    let state = AppState::new(config)?;

    spawn_registry_sweeper(&state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "fpgate listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

/// Detached task, so it never keeps the process alive on shutdown.
fn spawn_registry_sweeper(state: &AppState) {
    let registry = state.registry.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(REGISTRY_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            registry.purge_expired();
        }
    });
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    } else {
        info!("shutdown signal received");
    }
}
