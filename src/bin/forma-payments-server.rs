// ABOUTME: Server binary for the Forma payments service
// ABOUTME: Loads configuration, migrates the database, and serves the HTTP surface
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

//! `forma-payments-server` entry point.

use anyhow::Result;
use forma_payments::config::ServerConfig;
use forma_payments::logging;
use forma_payments::routes::ServerResources;
use forma_payments::storage::{PaymentStore, SqlitePaymentStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_from_env();

    let config = ServerConfig::from_env()?;
    info!(port = config.http_port, "starting forma-payments-server");

    let store = SqlitePaymentStore::new(&config.database_url).await?;
    store.migrate().await?;

    let http_port = config.http_port;
    let resources = Arc::new(ServerResources::new(config, Arc::new(store)));
    let router = resources.router();

    let addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    // SIGINT only; container runtimes send SIGTERM via the init shim
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
