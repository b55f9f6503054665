// ABOUTME: Uniform payment gateway contract and the processor-keyed registry
// ABOUTME: One PaymentGateway implementation per processor, registered by ProcessorKind
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

//! Payment gateway abstraction.
//!
//! Every processor implements [`PaymentGateway`]; callers obtain the right
//! implementation for a tenant through the [`resolver`]. Adding a processor
//! is a matter of registering a new implementation in the
//! [`GatewayRegistry`], not editing a central conditional.

use crate::errors::AppResult;
use crate::models::{CardInfo, CustomerResult, IntentResult, ProcessorKind, UserProfile};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub mod paysafe;
pub mod resolver;
pub mod stripe;

/// Parameters for creating (and optionally confirming) a charge.
///
/// Amounts are integer minor units; no floating-point money anywhere in
/// this core.
#[derive(Debug, Clone, Default)]
pub struct PaymentIntentRequest {
    /// Charge amount in minor units (cents)
    pub amount_cents: i64,
    /// Processor-side customer the charge is for, when one exists
    pub customer_id: Option<String>,
    /// Payment method or single-use token to charge
    pub payment_method_id: Option<String>,
    /// ISO currency code; defaults to the platform base currency
    pub currency: Option<String>,
    /// Confirm the intent immediately
    pub confirm: bool,
    /// Caller metadata forwarded to the processor
    pub metadata: Option<serde_json::Value>,
    /// Tenant whose Connect routing should apply, when any
    pub business_id: Option<Uuid>,
    /// Platform commission in minor units; only applied when the tenant's
    /// Connect account is complete
    pub application_fee_cents: Option<i64>,
}

/// Uniform contract over heterogeneous payment processors.
///
/// Implementations must treat every operation as a bounded, retry-free
/// remote call; retries belong to the caller's workflow.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Processor name for logging
    fn name(&self) -> &'static str;

    /// Resolve (or lazily create) the processor-side customer for a user.
    ///
    /// Idempotent: repeat calls for the same user must return the same
    /// customer ID and must not create duplicate remote customers.
    async fn create_or_get_customer(
        &self,
        user: &UserProfile,
        business_id: Option<Uuid>,
    ) -> AppResult<CustomerResult>;

    /// Create and optionally confirm a charge.
    ///
    /// When the request's tenant has a complete Connect account and a
    /// positive `application_fee_cents`, the charge is routed on behalf of
    /// that sub-account with the fee attached; otherwise the charge still
    /// succeeds with no fee split.
    async fn create_payment_intent(&self, request: PaymentIntentRequest)
        -> AppResult<IntentResult>;

    /// Best-effort card metadata for a payment-method token.
    ///
    /// Returns `Ok(None)` when the token carries no card details; callers
    /// must not fail a payment flow over missing card metadata.
    async fn card_info_from_payment_method(
        &self,
        payment_method_id: &str,
        business_id: Option<Uuid>,
    ) -> AppResult<Option<CardInfo>>;

    /// Attach a payment method to a customer, optionally as the default.
    ///
    /// A documented no-op for processors with no durable customer vault;
    /// callers must not assume attachment implies persistence.
    async fn attach_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
        set_as_default: bool,
        business_id: Option<Uuid>,
    ) -> AppResult<()>;
}

impl std::fmt::Debug for dyn PaymentGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentGateway")
            .field("name", &self.name())
            .finish()
    }
}

/// Registry of gateway implementations keyed by processor kind
pub struct GatewayRegistry {
    gateways: HashMap<ProcessorKind, Arc<dyn PaymentGateway>>,
    default_kind: ProcessorKind,
}

impl GatewayRegistry {
    /// Create a registry whose fallback is `default_kind`
    #[must_use]
    pub fn new(default_kind: ProcessorKind) -> Self {
        Self {
            gateways: HashMap::new(),
            default_kind,
        }
    }

    /// Register a gateway for a processor kind
    pub fn register(&mut self, kind: ProcessorKind, gateway: Arc<dyn PaymentGateway>) {
        self.gateways.insert(kind, gateway);
    }

    /// Look up the gateway for a kind, if one is registered
    #[must_use]
    pub fn get(&self, kind: ProcessorKind) -> Option<Arc<dyn PaymentGateway>> {
        self.gateways.get(&kind).cloned()
    }

    /// The registry's fallback gateway
    #[must_use]
    pub fn default_gateway(&self) -> Option<Arc<dyn PaymentGateway>> {
        self.get(self.default_kind)
    }

    /// The fallback processor kind
    #[must_use]
    pub fn default_kind(&self) -> ProcessorKind {
        self.default_kind
    }
}
