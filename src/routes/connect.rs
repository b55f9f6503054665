// ABOUTME: Connect account lifecycle endpoints for the tenant frontend
// ABOUTME: Create, status, onboarding link regeneration, and disconnect
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

use super::{require_uuid_header, ServerResources};
use crate::connect::CreateConnectAccount;
use crate::errors::AppError;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

/// Response carrying a freshly generated onboarding URL
#[derive(Debug, Serialize)]
pub struct OnboardingLinkResponse {
    /// Single-use hosted onboarding URL
    pub onboarding_url: String,
}

/// Response after a successful disconnect
#[derive(Debug, Serialize)]
pub struct DisconnectResponse {
    /// Always true on success
    pub disconnected: bool,
}

/// Connect account routes
pub struct ConnectRoutes;

impl ConnectRoutes {
    /// Create all Connect routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/connect/accounts", post(Self::handle_create))
            .route("/connect/accounts", delete(Self::handle_disconnect))
            .route("/connect/accounts/status", get(Self::handle_status))
            .route(
                "/connect/accounts/onboarding-link",
                post(Self::handle_onboarding_link),
            )
            .with_state(resources)
    }

    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<CreateConnectAccount>,
    ) -> Result<Response, AppError> {
        let business_id = require_uuid_header(&headers, "x-business-id")?;
        let onboarding_url = resources.connect.create(business_id, request).await?;
        Ok((
            StatusCode::CREATED,
            Json(OnboardingLinkResponse { onboarding_url }),
        )
            .into_response())
    }

    async fn handle_status(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let business_id = require_uuid_header(&headers, "x-business-id")?;
        let status = resources.connect.get_status(business_id).await?;
        Ok(Json(status).into_response())
    }

    async fn handle_onboarding_link(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let business_id = require_uuid_header(&headers, "x-business-id")?;
        let onboarding_url = resources.connect.onboarding_link(business_id).await?;
        Ok(Json(OnboardingLinkResponse { onboarding_url }).into_response())
    }

    async fn handle_disconnect(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let business_id = require_uuid_header(&headers, "x-business-id")?;
        resources.connect.disconnect(business_id).await?;
        Ok(Json(DisconnectResponse { disconnected: true }).into_response())
    }
}
