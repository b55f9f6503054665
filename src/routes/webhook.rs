// ABOUTME: Inbound processor webhook endpoint
// ABOUTME: Raw body plus signature header in, {received: true} or 400 out
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

use super::ServerResources;
use crate::errors::AppError;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;

/// Webhook routes
pub struct WebhookRoutes;

impl WebhookRoutes {
    /// Create the webhook route
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/payments/webhook", post(Self::handle_webhook))
            .with_state(resources)
    }

    /// The signature travels in a `signature` header alongside the raw body
    async fn handle_webhook(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<Response, AppError> {
        let signature = headers
            .get("signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        let ack = resources.webhooks.handle(&body, signature).await?;
        Ok(Json(ack).into_response())
    }
}
