// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lunch-Sync API Server
//!
//! Serves per-user lunch selections and favorites, per-place aggregates, and
//! live update streams over HTTP.

use lunch_sync::{config::Config, connect_store, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        backend = ?config.store_backend,
        collection = %config.users_collection,
        "Starting Lunch-Sync API"
    );

    let store = connect_store(&config).await?;
    let state = Arc::new(AppState::new(config.clone(), store));

    if let Some(interval) = config.refresh_interval {
        state.lunch.hub().spawn_poller(interval);
        tracing::info!(interval_secs = interval.as_secs(), "Live query poller started");
    }

    // Build router
    let app = lunch_sync::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lunch_sync=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
