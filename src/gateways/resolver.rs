// ABOUTME: Gateway resolver - maps a tenant to its configured payment gateway
// ABOUTME: Falls back to the default gateway on unrecognized processor kinds
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

//! Tenant → gateway resolution.
//!
//! Availability over strictness: a business configured with a processor
//! kind this deployment does not route (or a future kind it does not know)
//! resolves to the default gateway with a warning, rather than failing the
//! payment flow outright. Missing or explicitly disabled configuration, by
//! contrast, is an error with actionable guidance.

use super::{GatewayRegistry, PaymentGateway};
use crate::errors::{AppError, AppResult};
use crate::models::ProcessorConfig;
use crate::storage::PaymentStore;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Resolves the configured gateway for a tenant
pub struct GatewayResolver {
    store: Arc<dyn PaymentStore>,
    registry: GatewayRegistry,
}

impl GatewayResolver {
    /// Create a resolver over the store and a populated registry
    #[must_use]
    pub fn new(store: Arc<dyn PaymentStore>, registry: GatewayRegistry) -> Self {
        Self { store, registry }
    }

    /// Load the processor configuration for a tenant or fail with guidance
    async fn load_config(&self, business_id: Uuid) -> AppResult<ProcessorConfig> {
        let business = self
            .store
            .get_business(business_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| {
                AppError::not_configured(format!(
                    "no business found for tenant {business_id}; configure a payment processor in settings"
                ))
            })?;

        if business.processor_config_id.is_none() {
            return Err(AppError::not_configured(format!(
                "business {business_id} has no payment processor; configure a payment processor in settings"
            )));
        }

        let config = self
            .store
            .get_processor_config_for_business(business_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| {
                AppError::not_configured(format!(
                    "processor configuration missing for business {business_id}; configure a payment processor in settings"
                ))
            })?;

        if !config.enabled {
            return Err(AppError::not_configured(format!(
                "payment processor is disabled for business {business_id}; enable the payment processor in settings"
            )));
        }

        Ok(config)
    }

    /// Resolve the gateway for a tenant.
    ///
    /// # Errors
    ///
    /// `NotConfigured` when the business is missing, carries no processor
    /// reference, or its processor is disabled. An unrecognized or
    /// unregistered kind is NOT an error; it falls back to the default
    /// gateway with a warning.
    pub async fn resolve(&self, business_id: Uuid) -> AppResult<Arc<dyn PaymentGateway>> {
        let config = self.load_config(business_id).await?;

        if let Some(gateway) = self.registry.get(config.kind) {
            return Ok(gateway);
        }

        warn!(
            business_id = %business_id,
            kind = %config.kind,
            fallback = %self.registry.default_kind(),
            "no gateway registered for processor kind, falling back to default"
        );
        self.registry.default_gateway().ok_or_else(|| {
            AppError::config("no default payment gateway registered".to_string())
        })
    }

    /// Pre-flight check used by workflows that create billable records
    /// before attempting payment: same checks as [`Self::resolve`], no
    /// gateway returned.
    pub async fn assert_configured(&self, business_id: Uuid) -> AppResult<()> {
        self.load_config(business_id).await.map(|_| ())
    }
}
