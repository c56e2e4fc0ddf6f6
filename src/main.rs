// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;

use resource_authenticator::{
    api::router,
    config::{LogFormat, Settings, DEFAULT_LOG_FILTER},
    state::AppState,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    init_tracing(settings.log_format);

    info!("Starting Resource Authenticator");

    let state = AppState::from_settings(&settings).map_err(|e| {
        error!("Failed to configure authenticators: {}", e);
        e
    })?;
    info!(authenticators = ?state.chain.names(), "Authenticator chain configured");

    let app = router(state)?;

    let addr: SocketAddr = settings.bind_address().parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Resource Authenticator listening on http://{addr} (docs at /docs)");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
