// ABOUTME: Customer and card vault endpoints for the member frontend
// ABOUTME: Customer info, card list, add/default/delete card operations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

use super::{require_uuid_header, ServerResources};
use crate::errors::AppError;
use crate::models::UserProfile;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

/// Request body for vaulting a card
#[derive(Debug, Deserialize)]
pub struct AddCardRequest {
    /// Payment method to attach
    pub payment_method_id: String,
    /// Make it the default for future invoicing
    #[serde(default)]
    pub set_as_default: bool,
}

/// Request body for changing the default card
#[derive(Debug, Deserialize)]
pub struct SetDefaultCardRequest {
    /// Payment method to promote
    pub payment_method_id: String,
}

/// Customer vault routes
pub struct CustomerRoutes;

impl CustomerRoutes {
    /// Create all customer routes
    #[must_use]
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/customers/me", get(Self::handle_get_customer))
            .route("/customers/me/cards", get(Self::handle_list_cards))
            .route("/customers/me/cards", post(Self::handle_add_card))
            .route(
                "/customers/me/cards/default",
                get(Self::handle_get_default_card),
            )
            .route(
                "/customers/me/cards/default",
                put(Self::handle_set_default_card),
            )
            .route(
                "/customers/me/cards/:payment_method_id",
                delete(Self::handle_delete_card),
            )
            .with_state(resources)
    }

    /// Load the user projection for the propagated `x-user-id`
    async fn resolve_user(
        resources: &Arc<ServerResources>,
        headers: &HeaderMap,
    ) -> Result<UserProfile, AppError> {
        let user_id = require_uuid_header(headers, "x-user-id")?;
        resources
            .store
            .get_user(user_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::not_found(format!("user {user_id}")))
    }

    async fn handle_get_customer(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let user = Self::resolve_user(&resources, &headers).await?;
        let record = resources.vault.get_or_create(&user).await?;
        Ok(Json(record).into_response())
    }

    async fn handle_list_cards(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let user_id = require_uuid_header(&headers, "x-user-id")?;
        let cards = resources.vault.list_payment_methods(user_id).await?;
        Ok(Json(cards).into_response())
    }

    async fn handle_add_card(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<AddCardRequest>,
    ) -> Result<Response, AppError> {
        let user = Self::resolve_user(&resources, &headers).await?;
        resources
            .vault
            .add_payment_method(&user, &request.payment_method_id, request.set_as_default)
            .await?;
        Ok(StatusCode::CREATED.into_response())
    }

    async fn handle_get_default_card(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let user_id = require_uuid_header(&headers, "x-user-id")?;
        let card = resources.vault.get_default_payment_method(user_id).await?;
        Ok(Json(card).into_response())
    }

    async fn handle_set_default_card(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<SetDefaultCardRequest>,
    ) -> Result<Response, AppError> {
        let user_id = require_uuid_header(&headers, "x-user-id")?;
        resources
            .vault
            .set_default_payment_method(user_id, &request.payment_method_id)
            .await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    async fn handle_delete_card(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(payment_method_id): Path<String>,
    ) -> Result<Response, AppError> {
        let user_id = require_uuid_header(&headers, "x-user-id")?;
        resources
            .vault
            .delete_payment_method(user_id, &payment_method_id)
            .await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
