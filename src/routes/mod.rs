// ABOUTME: Route module organization for the payments service HTTP surface
// ABOUTME: Shared ServerResources wiring plus per-domain route modules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

//! HTTP routes.
//!
//! Each domain module exposes a `Routes` struct whose `routes()` takes the
//! shared [`ServerResources`] and returns an axum `Router`. Handlers are
//! thin: header parsing plus a delegate into the managers.

/// Connect account lifecycle routes
pub mod connect;
/// Customer and card vault routes
pub mod customers;
/// Health check route
pub mod health;
/// Inbound processor webhook route
pub mod webhook;

pub use connect::ConnectRoutes;
pub use customers::CustomerRoutes;
pub use health::HealthRoutes;
pub use webhook::WebhookRoutes;

use crate::config::ServerConfig;
use crate::connect::ConnectAccountManager;
use crate::errors::{AppError, AppResult};
use crate::gateways::paysafe::{PaysafeGateway, PaysafeHttpClient};
use crate::gateways::resolver::GatewayResolver;
use crate::gateways::stripe::api::StripeApi;
use crate::gateways::stripe::client::StripeHttpClient;
use crate::gateways::stripe::StripeGateway;
use crate::gateways::GatewayRegistry;
use crate::models::ProcessorKind;
use crate::storage::PaymentStore;
use crate::vault::CustomerVaultManager;
use crate::webhook::{LoggingWebhookHandler, WebhookProcessor};
use axum::http::HeaderMap;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Request bodies larger than this are rejected before any handler runs
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state for all route handlers
pub struct ServerResources {
    /// Persistence
    pub store: Arc<dyn PaymentStore>,
    /// Tenant → gateway resolution
    pub resolver: Arc<GatewayResolver>,
    /// Connect account lifecycle
    pub connect: Arc<ConnectAccountManager>,
    /// Customer vault
    pub vault: Arc<CustomerVaultManager>,
    /// Webhook verification and dispatch
    pub webhooks: Arc<WebhookProcessor>,
    /// Service configuration
    pub config: ServerConfig,
}

impl ServerResources {
    /// Wire the full dependency graph from configuration and a store.
    ///
    /// The Stripe and Paysafe HTTP clients initialize lazily on first use,
    /// so missing credentials for an unused processor do not block startup.
    #[must_use]
    pub fn new(config: ServerConfig, store: Arc<dyn PaymentStore>) -> Self {
        let stripe: Arc<dyn StripeApi> = Arc::new(StripeHttpClient::new(config.stripe.clone()));
        Self::with_stripe_api(config, store, stripe)
    }

    /// Wire the graph with an externally supplied Stripe seam (tests)
    #[must_use]
    pub fn with_stripe_api(
        config: ServerConfig,
        store: Arc<dyn PaymentStore>,
        stripe: Arc<dyn StripeApi>,
    ) -> Self {
        let connect = Arc::new(ConnectAccountManager::new(
            store.clone(),
            stripe.clone(),
            config.stripe.connect_refresh_url.clone(),
            config.stripe.connect_return_url.clone(),
        ));
        let vault = Arc::new(CustomerVaultManager::new(store.clone(), stripe.clone()));

        let paysafe_api = Arc::new(PaysafeHttpClient::new(config.paysafe.clone()));
        let mut registry = GatewayRegistry::new(ProcessorKind::Stripe);
        registry.register(
            ProcessorKind::Stripe,
            Arc::new(StripeGateway::new(
                stripe,
                vault.clone(),
                connect.clone(),
                config.currency.clone(),
            )),
        );
        registry.register(
            ProcessorKind::Paysafe,
            Arc::new(PaysafeGateway::new(
                paysafe_api,
                config.paysafe.account_id.clone(),
                config.currency.clone(),
            )),
        );

        let resolver = Arc::new(GatewayResolver::new(store.clone(), registry));
        let webhooks = Arc::new(WebhookProcessor::new(
            config.stripe.webhook_secret.clone(),
            connect.clone(),
            Arc::new(LoggingWebhookHandler),
        ));

        Self {
            store,
            resolver,
            connect,
            vault,
            webhooks,
            config,
        }
    }

    /// Assemble the full router
    #[must_use]
    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .merge(HealthRoutes::routes())
            .merge(WebhookRoutes::routes(self.clone()))
            .merge(ConnectRoutes::routes(self.clone()))
            .merge(CustomerRoutes::routes(self.clone()))
            .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }
}

/// Parse a required UUID header (`x-business-id`, `x-user-id`).
///
/// Tenant/user resolution proper is upstream middleware's job; this core
/// only validates the propagated reference.
pub(crate) fn require_uuid_header(headers: &HeaderMap, name: &str) -> AppResult<Uuid> {
    let raw = headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::invalid_input(format!("missing {name} header")))?;
    Uuid::parse_str(raw)
        .map_err(|_| AppError::invalid_input(format!("invalid {name} header: {raw}")))
}
