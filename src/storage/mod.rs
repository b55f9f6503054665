// ABOUTME: Persistence abstraction for payment-routing state
// ABOUTME: PaymentStore trait over businesses, processor configs, Connect accounts, and customer records
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

//! Database abstraction layer.
//!
//! All persistence flows through [`PaymentStore`] so managers can be tested
//! against doubles and a second backend can be added without touching the
//! domain layer. The shipped implementation is SQLite via `sqlx`.

use crate::models::{Business, ConnectAccount, CustomerRecord, ProcessorConfig, UserProfile};
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

pub mod sqlite;

pub use sqlite::SqlitePaymentStore;

/// Core persistence trait for the payment subsystem.
///
/// Implementations must be safe for concurrent use; the uniqueness
/// constraints on `connect_accounts.business_id` and
/// `customer_records.user_id` are the last line of defense against the
/// check-then-create races described in the concurrency model.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Run schema migrations
    async fn migrate(&self) -> Result<()>;

    // ================================
    // Businesses (tenant projection)
    // ================================

    /// Insert a business row (used by provisioning and tests)
    async fn create_business(&self, business: &Business) -> Result<()>;

    /// Fetch a business by ID
    async fn get_business(&self, business_id: Uuid) -> Result<Option<Business>>;

    /// Set or clear the denormalized Connect account reference
    async fn set_business_connect_account(
        &self,
        business_id: Uuid,
        connect_account_id: Option<Uuid>,
    ) -> Result<()>;

    // ================================
    // Processor configuration (read-mostly)
    // ================================

    /// Insert or replace a processor configuration row
    async fn upsert_processor_config(&self, config: &ProcessorConfig) -> Result<()>;

    /// Fetch the processor configuration referenced by a business
    async fn get_processor_config_for_business(
        &self,
        business_id: Uuid,
    ) -> Result<Option<ProcessorConfig>>;

    // ================================
    // Connect accounts
    // ================================

    /// Insert a Connect account row; fails on a duplicate `business_id`
    async fn insert_connect_account(&self, account: &ConnectAccount) -> Result<()>;

    /// Fetch a business's Connect account
    async fn get_connect_account_by_business(
        &self,
        business_id: Uuid,
    ) -> Result<Option<ConnectAccount>>;

    /// Fetch a Connect account by its processor-side account ID
    async fn get_connect_account_by_remote_id(
        &self,
        remote_account_id: &str,
    ) -> Result<Option<ConnectAccount>>;

    /// Persist refreshed processor flags after a status sync
    async fn update_connect_account_flags(
        &self,
        account_id: Uuid,
        charges_enabled: bool,
        details_submitted: bool,
        payouts_enabled: bool,
    ) -> Result<()>;

    /// Delete a Connect account row
    async fn delete_connect_account(&self, account_id: Uuid) -> Result<()>;

    // ================================
    // Customer records
    // ================================

    /// Insert or replace the customer record for its `user_id`
    async fn upsert_customer_record(&self, record: &CustomerRecord) -> Result<()>;

    /// Fetch the customer record for a user
    async fn get_customer_record_by_user(&self, user_id: Uuid)
        -> Result<Option<CustomerRecord>>;

    // ================================
    // Users (minimal projection)
    // ================================

    /// Insert a user projection row (used by provisioning and tests)
    async fn create_user(&self, user: &UserProfile) -> Result<()>;

    /// Fetch a user projection
    async fn get_user(&self, user_id: Uuid) -> Result<Option<UserProfile>>;
}
