// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Realty-Session agent
//!
//! Loopback server that receives the identity provider's login redirect,
//! keeps the marketplace session alive and serves the guarded pages.

use anyhow::Context as _;
use realty_session::{
    api::HttpAuthApi, config::Config, context::AuthContext, navigation::LogNavigator,
    store::FileStore, AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(port = config.port, "Starting Realty-Session agent");

    let store = Arc::new(FileStore::open(&config.session_file));
    tracing::info!(path = %store.path().display(), "Session store opened");

    let api = HttpAuthApi::new(&config.api_base_url, config.http_timeout)
        .context("Failed to initialize auth API client")?;

    let refresh_locks = Arc::new(dashmap::DashMap::new());
    let context = AuthContext::new(
        store,
        Arc::new(api),
        Arc::new(LogNavigator::new()),
        config.session_settings(),
        refresh_locks,
    );

    // Resolve whatever session survived the last run before serving pages
    context.initialize().await;

    let state = Arc::new(AppState {
        config: config.clone(),
        context: context.clone(),
    });

    let app = realty_session::routes::create_router(state);

    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Agent listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    context.unmount();
    tracing::info!("Agent stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("realty_session=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
