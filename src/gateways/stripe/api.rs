// ABOUTME: Stripe API seam - trait over the remote calls the managers need, plus wire types
// ABOUTME: Implemented by the HTTP client in client.rs and by test doubles
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

//! Outbound Stripe surface.
//!
//! The Connect and vault managers depend on this trait rather than on the
//! HTTP client directly. Calls that must run on behalf of a marketplace
//! sub-account take the sub-account's remote ID as connection context;
//! everything else runs in the platform's own context.

use crate::errors::AppResult;
use async_trait::async_trait;
use serde::Deserialize;

/// Remote account representation (subset this core reads)
#[derive(Debug, Clone, Deserialize)]
pub struct StripeAccount {
    /// Account ID (`acct_...`)
    pub id: String,
    /// Account can accept charges
    #[serde(default)]
    pub charges_enabled: bool,
    /// Onboarding details submitted
    #[serde(default)]
    pub details_submitted: bool,
    /// Payouts enabled
    #[serde(default)]
    pub payouts_enabled: bool,
    /// Contact email, when set
    #[serde(default)]
    pub email: Option<String>,
}

/// Single-use onboarding link
#[derive(Debug, Clone, Deserialize)]
pub struct StripeAccountLink {
    /// Hosted onboarding URL
    pub url: String,
    /// Unix expiry of the link
    #[serde(default)]
    pub expires_at: i64,
}

/// Customer invoice settings (default payment method lives here)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeInvoiceSettings {
    /// Default payment method for invoicing
    #[serde(default)]
    pub default_payment_method: Option<String>,
}

/// Remote customer representation.
///
/// Stripe returns `"deleted": true` stubs for customers removed
/// out-of-band; the vault's reconcile step checks that flag.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomer {
    /// Customer ID (`cus_...`)
    pub id: String,
    /// Deleted-stub marker
    #[serde(default)]
    pub deleted: bool,
    /// Email, when set
    #[serde(default)]
    pub email: Option<String>,
    /// Display name, when set
    #[serde(default)]
    pub name: Option<String>,
    /// Billing address (country is the only field this core reads)
    #[serde(default)]
    pub address: Option<StripeAddress>,
    /// Unix creation time
    #[serde(default)]
    pub created: i64,
    /// Invoice settings
    #[serde(default)]
    pub invoice_settings: Option<StripeInvoiceSettings>,
    /// Metadata attached at creation
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Billing address subset
#[derive(Debug, Clone, Deserialize)]
pub struct StripeAddress {
    /// ISO country code
    #[serde(default)]
    pub country: Option<String>,
}

/// Card block on a payment method
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCard {
    /// Card brand
    pub brand: String,
    /// Last four digits
    pub last4: String,
    /// Expiry month
    pub exp_month: u32,
    /// Expiry year
    pub exp_year: u32,
}

/// Remote payment method representation
#[derive(Debug, Clone, Deserialize)]
pub struct StripePaymentMethod {
    /// Payment method ID (`pm_...`)
    pub id: String,
    /// Owning customer, when attached
    #[serde(default)]
    pub customer: Option<String>,
    /// Card details; absent for non-card methods
    #[serde(default)]
    pub card: Option<StripeCard>,
}

/// Remote payment intent representation
#[derive(Debug, Clone, Deserialize)]
pub struct StripePaymentIntent {
    /// Intent ID (`pi_...`)
    pub id: String,
    /// Intent status in Stripe's canonical vocabulary
    pub status: String,
    /// Metadata echoed back by the processor
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Parameters for creating a payment intent
#[derive(Debug, Clone, Default)]
pub struct IntentParams {
    /// Amount in minor units
    pub amount: i64,
    /// ISO currency code
    pub currency: String,
    /// Customer to charge
    pub customer: Option<String>,
    /// Payment method to use
    pub payment_method: Option<String>,
    /// Confirm immediately
    pub confirm: bool,
    /// Metadata forwarded to the processor
    pub metadata: Option<serde_json::Value>,
    /// Platform commission in minor units
    pub application_fee_amount: Option<i64>,
    /// Sub-account connection context (`Stripe-Account` header)
    pub stripe_account: Option<String>,
}

/// Parameters for creating a marketplace sub-account
#[derive(Debug, Clone)]
pub struct AccountParams<'a> {
    /// Account kind (`express` or `standard`)
    pub kind: &'a str,
    /// ISO country code
    pub country: &'a str,
    /// Contact email
    pub email: &'a str,
}

/// The remote Stripe calls this core performs.
#[async_trait]
pub trait StripeApi: Send + Sync {
    /// Create a marketplace sub-account
    async fn create_account(&self, params: AccountParams<'_>) -> AppResult<StripeAccount>;

    /// Create a fresh single-use onboarding link for a sub-account
    async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> AppResult<StripeAccountLink>;

    /// Fetch the latest sub-account flags
    async fn retrieve_account(&self, account_id: &str) -> AppResult<StripeAccount>;

    /// Delete a sub-account (disconnect, or rollback of a failed create)
    async fn delete_account(&self, account_id: &str) -> AppResult<()>;

    /// Create a customer
    async fn create_customer(
        &self,
        email: &str,
        name: Option<&str>,
        metadata: Option<&serde_json::Value>,
    ) -> AppResult<StripeCustomer>;

    /// Retrieve a customer; deleted customers come back as stubs with
    /// `deleted == true`, not as errors
    async fn retrieve_customer(&self, customer_id: &str) -> AppResult<StripeCustomer>;

    /// Set a customer's default payment method for invoicing
    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> AppResult<()>;

    /// Create (and optionally confirm) a payment intent
    async fn create_payment_intent(&self, params: IntentParams) -> AppResult<StripePaymentIntent>;

    /// Retrieve a payment method, optionally in a sub-account's context
    async fn retrieve_payment_method(
        &self,
        payment_method_id: &str,
        stripe_account: Option<&str>,
    ) -> AppResult<StripePaymentMethod>;

    /// Attach a payment method to a customer
    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> AppResult<StripePaymentMethod>;

    /// Detach a payment method from its customer
    async fn detach_payment_method(&self, payment_method_id: &str) -> AppResult<()>;

    /// List a customer's card payment methods
    async fn list_payment_methods(&self, customer_id: &str)
        -> AppResult<Vec<StripePaymentMethod>>;
}
