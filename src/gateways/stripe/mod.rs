// ABOUTME: Stripe implementation of the PaymentGateway contract
// ABOUTME: Durable customer vault, Connect fee routing, and payment-intent confirmation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

//! Stripe gateway (durable-customer variant).
//!
//! Customer resolution delegates to the vault; charge creation consults the
//! Connect manager to decide whether the charge runs on behalf of a
//! tenant's sub-account with a platform fee attached.

pub mod api;
pub mod client;

use super::{PaymentGateway, PaymentIntentRequest};
use crate::connect::ConnectAccountManager;
use crate::errors::AppResult;
use crate::models::{CardInfo, CustomerResult, IntentResult, UserProfile};
use crate::vault::CustomerVaultManager;
use api::{IntentParams, StripeApi};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Stripe gateway over the vault, Connect manager, and API seam
pub struct StripeGateway {
    stripe: Arc<dyn StripeApi>,
    vault: Arc<CustomerVaultManager>,
    connect: Arc<ConnectAccountManager>,
    default_currency: String,
}

impl StripeGateway {
    /// Create the gateway
    #[must_use]
    pub fn new(
        stripe: Arc<dyn StripeApi>,
        vault: Arc<CustomerVaultManager>,
        connect: Arc<ConnectAccountManager>,
        default_currency: impl Into<String>,
    ) -> Self {
        Self {
            stripe,
            vault,
            connect,
            default_currency: default_currency.into(),
        }
    }

    /// Decide the connection context and fee for a charge.
    ///
    /// Fee routing requires both a complete Connect account and a positive
    /// fee; otherwise the charge runs in the platform context with no fee
    /// split, and still succeeds.
    async fn fee_routing(
        &self,
        business_id: Option<Uuid>,
        application_fee_cents: Option<i64>,
    ) -> AppResult<(Option<String>, Option<i64>)> {
        let fee = application_fee_cents.filter(|fee| *fee > 0);
        let Some(business_id) = business_id else {
            return Ok((None, None));
        };
        let Some(fee) = fee else {
            return Ok((None, None));
        };

        match self.connect.routing_for(business_id).await? {
            Some(routing) if routing.is_complete => {
                debug!(
                    business_id = %business_id,
                    remote_account_id = %routing.remote_account_id,
                    application_fee_cents = fee,
                    "routing charge on behalf of Connect account"
                );
                Ok((Some(routing.remote_account_id), Some(fee)))
            }
            _ => Ok((None, None)),
        }
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn create_or_get_customer(
        &self,
        user: &UserProfile,
        _business_id: Option<Uuid>,
    ) -> AppResult<CustomerResult> {
        let record = self.vault.get_or_create(user).await?;
        Ok(CustomerResult {
            customer_id: record.remote_customer_id,
            metadata: record.metadata,
        })
    }

    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> AppResult<IntentResult> {
        let (stripe_account, application_fee_amount) = self
            .fee_routing(request.business_id, request.application_fee_cents)
            .await?;

        let intent = self
            .stripe
            .create_payment_intent(IntentParams {
                amount: request.amount_cents,
                currency: request
                    .currency
                    .unwrap_or_else(|| self.default_currency.clone()),
                customer: request.customer_id,
                payment_method: request.payment_method_id,
                confirm: request.confirm,
                metadata: request.metadata,
                application_fee_amount,
                stripe_account,
            })
            .await?;

        Ok(IntentResult {
            id: intent.id,
            status: intent.status,
            metadata: intent.metadata,
        })
    }

    async fn card_info_from_payment_method(
        &self,
        payment_method_id: &str,
        business_id: Option<Uuid>,
    ) -> AppResult<Option<CardInfo>> {
        let stripe_account = match business_id {
            Some(business_id) => self
                .connect
                .routing_for(business_id)
                .await?
                .map(|routing| routing.remote_account_id),
            None => None,
        };

        let method = self
            .stripe
            .retrieve_payment_method(payment_method_id, stripe_account.as_deref())
            .await?;

        // Non-card methods carry no card block; that is not an error.
        Ok(method.card.map(|card| CardInfo {
            brand: Some(card.brand),
            last4: card.last4,
            exp_month: Some(card.exp_month),
            exp_year: Some(card.exp_year),
        }))
    }

    async fn attach_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
        set_as_default: bool,
        _business_id: Option<Uuid>,
    ) -> AppResult<()> {
        self.stripe
            .attach_payment_method(payment_method_id, customer_id)
            .await?;
        if set_as_default {
            self.stripe
                .set_default_payment_method(customer_id, payment_method_id)
                .await?;
        }
        Ok(())
    }
}
