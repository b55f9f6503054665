// ABOUTME: Health check route for liveness probes
// ABOUTME: Reports service name and version with no dependencies touched
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

/// Liveness response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "ok" when the process is serving
    pub status: &'static str,
    /// Service name
    pub service: &'static str,
    /// Crate version
    pub version: &'static str,
}

/// Health check routes
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create the health route
    #[must_use]
    pub fn routes() -> Router {
        Router::new().route("/health", get(Self::handle_health))
    }

    async fn handle_health() -> Json<HealthResponse> {
        Json(HealthResponse {
            status: "ok",
            service: "forma-payments-server",
            version: env!("CARGO_PKG_VERSION"),
        })
    }
}
