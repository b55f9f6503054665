// ABOUTME: Domain models for payment routing, processor accounts, and customer records
// ABOUTME: Persisted rows (Business, ConnectAccount, CustomerRecord) and ephemeral value objects
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

//! Core data model.
//!
//! Persisted entities live in the payment store (§ `storage`); the value
//! objects at the bottom of this module are returned by gateway calls and
//! never written to disk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which external payment processor a business is configured to use.
///
/// Unknown future values deserialize via [`ProcessorKind::parse`] so the
/// resolver can apply its fallback policy instead of failing the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessorKind {
    /// Stripe - durable customer vault, Connect sub-accounts, payment intents
    #[serde(rename = "STRIPE")]
    Stripe,
    /// Paysafe - single-use payment-handle token flow, no customer vault
    #[serde(rename = "PAYSAFE")]
    Paysafe,
    /// Cash handling outside any processor; no gateway is registered for it
    #[serde(rename = "CASH")]
    Cash,
    /// Catch-all for processors this core does not route
    #[serde(rename = "OTHER")]
    Other,
}

impl ProcessorKind {
    /// Parse a stored processor kind, preserving unknown values as `None`
    /// so callers can apply the fallback policy explicitly.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "STRIPE" => Some(Self::Stripe),
            "PAYSAFE" => Some(Self::Paysafe),
            "CASH" => Some(Self::Cash),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }

    /// Stable string form written to the database
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stripe => "STRIPE",
            Self::Paysafe => "PAYSAFE",
            Self::Cash => "CASH",
            Self::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-tenant processor configuration row.
///
/// Owned by tenant settings; read-only to this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Row ID
    pub id: Uuid,
    /// Active processor for the owning business
    pub kind: ProcessorKind,
    /// Whether payments are enabled for the tenant; the resolver refuses
    /// to route while this is false
    pub enabled: bool,
    /// Free-form description shown in admin tooling
    pub description: Option<String>,
}

/// Minimal tenant projection this core reads and (for the Connect
/// back-reference) writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    /// Tenant ID
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Reference to the tenant's processor configuration
    pub processor_config_id: Option<Uuid>,
    /// Denormalized reference to the tenant's Connect account, cleared on disconnect
    pub connect_account_id: Option<Uuid>,
}

/// Marketplace sub-account kind offered during onboarding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Processor-hosted onboarding and dashboard
    Express,
    /// Full standalone processor account
    Standard,
}

impl AccountKind {
    /// Stable string form written to the database and sent to the processor
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Express => "express",
            Self::Standard => "standard",
        }
    }

    /// Parse the stored form
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "express" => Some(Self::Express),
            "standard" => Some(Self::Standard),
            _ => None,
        }
    }
}

/// A tenant's marketplace sub-account on the split-payment processor.
///
/// At most one per business, enforced by a pre-check on create plus a
/// UNIQUE constraint on `business_id` (the race between the two is a known
/// gap; the losing writer's remote account becomes an orphan for external
/// reconciliation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectAccount {
    /// Local row ID
    pub id: Uuid,
    /// Processor-side account ID (e.g. `acct_...`)
    pub remote_account_id: String,
    /// Sub-account kind chosen at onboarding
    pub account_kind: AccountKind,
    /// ISO country code supplied at creation
    pub country_code: String,
    /// Contact email supplied at creation
    pub contact_email: String,
    /// Processor flag: account can accept charges
    pub charges_enabled: bool,
    /// Processor flag: onboarding details submitted
    pub details_submitted: bool,
    /// Processor flag: payouts enabled
    pub payouts_enabled: bool,
    /// Owning tenant
    pub business_id: Uuid,
    /// Row creation time
    pub created_at: DateTime<Utc>,
    /// Last status sync time
    pub updated_at: DateTime<Utc>,
}

impl ConnectAccount {
    /// Whether the account can receive routed charges with a platform fee
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.details_submitted && self.charges_enabled
    }
}

/// Lifecycle status of a processor-side customer record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    /// Remote customer exists
    Active,
    /// Remote customer was deleted out-of-band
    Deleted,
}

impl CustomerStatus {
    /// Stable string form written to the database
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Deleted => "deleted",
        }
    }

    /// Parse the stored form, defaulting unknown values to `Active`
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "deleted" => Self::Deleted,
            _ => Self::Active,
        }
    }
}

/// Local cache of the processor-side customer for one user.
///
/// One per user (UNIQUE on `user_id`). Refreshed, not recreated, while the
/// remote customer still exists; overwritten when the remote customer was
/// deleted out-of-band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRecord {
    /// Local row ID
    pub id: Uuid,
    /// Processor-side customer ID (e.g. `cus_...`)
    pub remote_customer_id: String,
    /// Owning user
    pub user_id: Uuid,
    /// Cached email
    pub email: String,
    /// Cached display name
    pub display_name: Option<String>,
    /// Cached country code
    pub country_code: Option<String>,
    /// Remote lifecycle status at last reconcile
    pub status: CustomerStatus,
    /// When the remote customer was created
    pub remote_created_at: Option<DateTime<Utc>>,
    /// Cached remote metadata
    pub metadata: serde_json::Value,
    /// Row creation time
    pub created_at: DateTime<Utc>,
    /// Last reconcile time
    pub updated_at: DateTime<Utc>,
}

/// Minimal projection of a platform user needed to create remote customers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// User ID
    pub id: Uuid,
    /// Email address
    pub email: String,
    /// Display name
    pub display_name: Option<String>,
    /// ISO country code, when known
    pub country_code: Option<String>,
}

// ── Ephemeral value objects returned by gateway calls ────────────────────

/// Result of resolving a processor-side customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerResult {
    /// Processor-side customer ID (synthetic for token-flow processors)
    pub customer_id: String,
    /// Processor-side metadata, when available
    pub metadata: serde_json::Value,
}

/// Result of creating (and optionally confirming) a payment intent.
///
/// `status` uses the canonical Stripe vocabulary; other processors' native
/// statuses are normalized before this value is returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResult {
    /// Processor-side intent/payment ID
    pub id: String,
    /// Canonical status (`succeeded`, `processing`, `requires_confirmation`, ...)
    pub status: String,
    /// Processor-side metadata, when available
    pub metadata: serde_json::Value,
}

/// Card metadata extracted from a payment-method token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardInfo {
    /// Card brand (`visa`, `mastercard`, ...) when the token carries it
    pub brand: Option<String>,
    /// Last four digits
    pub last4: String,
    /// Expiry month
    pub exp_month: Option<u32>,
    /// Expiry year
    pub exp_year: Option<u32>,
}

/// A vaulted card as listed to the frontend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardSummary {
    /// Payment-method ID
    pub id: String,
    /// Card brand
    pub brand: Option<String>,
    /// Last four digits
    pub last4: String,
    /// Expiry month
    pub exp_month: Option<u32>,
    /// Expiry year
    pub exp_year: Option<u32>,
    /// Whether this card is the customer's default for invoicing
    pub is_default: bool,
}
