// ABOUTME: Customer vault manager - maps local users to processor-side customers
// ABOUTME: Explicit reconcile against remote truth plus guarded card operations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

//! Customer vault.
//!
//! The local `CustomerRecord` is a cache of remote truth; remote customers
//! can be deleted out-of-band (processor dashboard) without notice, so
//! every financial use of a cached record goes through an explicit
//! [`CustomerVaultManager::reconcile`] step first. Card mutations verify
//! remote ownership before touching anything.

use crate::errors::{AppError, AppResult};
use crate::gateways::stripe::api::{StripeApi, StripeCustomer};
use crate::models::{CardSummary, CustomerRecord, CustomerStatus, UserProfile};
use crate::storage::PaymentStore;
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Owns the user ↔ remote-customer mapping and the card vault
pub struct CustomerVaultManager {
    store: Arc<dyn PaymentStore>,
    stripe: Arc<dyn StripeApi>,
}

impl CustomerVaultManager {
    /// Create a manager over the given store and Stripe seam
    #[must_use]
    pub fn new(store: Arc<dyn PaymentStore>, stripe: Arc<dyn StripeApi>) -> Self {
        Self { store, stripe }
    }

    /// Resolve the customer record for a user, creating remote and local
    /// state as needed.
    ///
    /// Trust-but-verify: a cached record is reconciled against the remote
    /// customer before being returned; a remote customer deleted
    /// out-of-band triggers recreation and overwrites the stale row. The
    /// check-then-create window here is not locked; the UNIQUE constraint
    /// on `user_id` is the backstop and the losing writer's remote
    /// customer is an accepted orphan.
    pub async fn get_or_create(&self, user: &UserProfile) -> AppResult<CustomerRecord> {
        if let Some(record) = self
            .store
            .get_customer_record_by_user(user.id)
            .await
            .map_err(AppError::from)?
        {
            if let Some(refreshed) = self.reconcile(&record).await? {
                return Ok(refreshed);
            }
            info!(
                user_id = %user.id,
                remote_customer_id = %record.remote_customer_id,
                "remote customer missing or deleted, recreating"
            );
        }

        self.create_remote_and_persist(user).await
    }

    /// Verify a cached record against remote truth.
    ///
    /// Returns the refreshed record while the remote customer exists, or
    /// `None` when it was deleted out-of-band and must be recreated.
    pub async fn reconcile(&self, record: &CustomerRecord) -> AppResult<Option<CustomerRecord>> {
        let remote = match self
            .stripe
            .retrieve_customer(&record.remote_customer_id)
            .await
        {
            Ok(remote) => remote,
            Err(err) => {
                // `resource_missing` means the customer is gone; other
                // remote failures must propagate rather than silently
                // recreating a second customer.
                if err.remote_code_is("resource_missing") {
                    return Ok(None);
                }
                return Err(err);
            }
        };

        if remote.deleted {
            return Ok(None);
        }

        let refreshed = refresh_record(record.clone(), &remote);
        self.store
            .upsert_customer_record(&refreshed)
            .await
            .map_err(AppError::from)?;
        Ok(Some(refreshed))
    }

    async fn create_remote_and_persist(&self, user: &UserProfile) -> AppResult<CustomerRecord> {
        let metadata = serde_json::json!({ "forma_user_id": user.id.to_string() });
        let remote = self
            .stripe
            .create_customer(&user.email, user.display_name.as_deref(), Some(&metadata))
            .await?;

        let now = Utc::now();
        let record = CustomerRecord {
            id: Uuid::new_v4(),
            remote_customer_id: remote.id.clone(),
            user_id: user.id,
            email: remote.email.clone().unwrap_or_else(|| user.email.clone()),
            display_name: remote.name.clone().or_else(|| user.display_name.clone()),
            country_code: remote
                .address
                .as_ref()
                .and_then(|a| a.country.clone())
                .or_else(|| user.country_code.clone()),
            status: CustomerStatus::Active,
            remote_created_at: Utc.timestamp_opt(remote.created, 0).single(),
            metadata: remote.metadata.clone(),
            created_at: now,
            updated_at: now,
        };

        self.store
            .upsert_customer_record(&record)
            .await
            .map_err(AppError::from)?;

        info!(
            user_id = %user.id,
            remote_customer_id = %record.remote_customer_id,
            "created processor customer"
        );
        Ok(record)
    }

    /// Resolve the record for a user or fail; card operations never create
    async fn resolve_record(&self, user_id: Uuid) -> AppResult<CustomerRecord> {
        self.store
            .get_customer_record_by_user(user_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::not_found(format!("customer record for user {user_id}")))
    }

    /// Verify a payment method's remote owner matches the resolved customer
    async fn verify_ownership(
        &self,
        record: &CustomerRecord,
        payment_method_id: &str,
    ) -> AppResult<()> {
        let method = self
            .stripe
            .retrieve_payment_method(payment_method_id, None)
            .await?;
        match method.customer.as_deref() {
            Some(owner) if owner == record.remote_customer_id => Ok(()),
            other => {
                warn!(
                    payment_method_id,
                    expected = %record.remote_customer_id,
                    actual = ?other,
                    "payment method ownership mismatch"
                );
                Err(AppError::ownership_mismatch(format!(
                    "payment method {payment_method_id} does not belong to this customer"
                )))
            }
        }
    }

    /// Attach a card to the user's customer, optionally as default
    pub async fn add_payment_method(
        &self,
        user: &UserProfile,
        payment_method_id: &str,
        set_default: bool,
    ) -> AppResult<()> {
        let record = self.get_or_create(user).await?;
        self.stripe
            .attach_payment_method(payment_method_id, &record.remote_customer_id)
            .await?;
        if set_default {
            self.stripe
                .set_default_payment_method(&record.remote_customer_id, payment_method_id)
                .await?;
        }
        Ok(())
    }

    /// Make a card the customer's default for future invoicing.
    ///
    /// # Errors
    ///
    /// `OwnershipMismatch` when the method belongs to a different customer.
    pub async fn set_default_payment_method(
        &self,
        user_id: Uuid,
        payment_method_id: &str,
    ) -> AppResult<()> {
        let record = self.resolve_record(user_id).await?;
        self.verify_ownership(&record, payment_method_id).await?;
        self.stripe
            .set_default_payment_method(&record.remote_customer_id, payment_method_id)
            .await
    }

    /// Detach a card from the customer.
    ///
    /// # Errors
    ///
    /// `OwnershipMismatch` for a foreign method; `InvalidInput` with
    /// guidance when the card is the current default, which must be
    /// replaced before deletion rather than silently leaving the customer
    /// with no default.
    pub async fn delete_payment_method(
        &self,
        user_id: Uuid,
        payment_method_id: &str,
    ) -> AppResult<()> {
        let record = self.resolve_record(user_id).await?;
        self.verify_ownership(&record, payment_method_id).await?;

        if let Some(default_id) = self.default_payment_method_id(&record).await? {
            if default_id == payment_method_id {
                return Err(AppError::invalid_input(
                    "this card is the current default; set a different default payment method first",
                ));
            }
        }

        self.stripe.detach_payment_method(payment_method_id).await
    }

    /// The customer's default card, when one is set
    pub async fn get_default_payment_method(
        &self,
        user_id: Uuid,
    ) -> AppResult<Option<CardSummary>> {
        let record = self.resolve_record(user_id).await?;
        let Some(default_id) = self.default_payment_method_id(&record).await? else {
            return Ok(None);
        };
        let method = self
            .stripe
            .retrieve_payment_method(&default_id, None)
            .await?;
        Ok(Some(to_card_summary(&method.id, method.card.as_ref(), true)))
    }

    /// All of the customer's vaulted cards
    pub async fn list_payment_methods(&self, user_id: Uuid) -> AppResult<Vec<CardSummary>> {
        let record = self.resolve_record(user_id).await?;
        let default_id = self.default_payment_method_id(&record).await?;
        let methods = self
            .stripe
            .list_payment_methods(&record.remote_customer_id)
            .await?;
        Ok(methods
            .iter()
            .map(|m| {
                let is_default = default_id.as_deref() == Some(m.id.as_str());
                to_card_summary(&m.id, m.card.as_ref(), is_default)
            })
            .collect())
    }

    async fn default_payment_method_id(
        &self,
        record: &CustomerRecord,
    ) -> AppResult<Option<String>> {
        let remote = self
            .stripe
            .retrieve_customer(&record.remote_customer_id)
            .await?;
        Ok(remote
            .invoice_settings
            .and_then(|s| s.default_payment_method))
    }
}

/// Refresh the cached fields of a record from the remote customer
fn refresh_record(mut record: CustomerRecord, remote: &StripeCustomer) -> CustomerRecord {
    if let Some(email) = &remote.email {
        record.email.clone_from(email);
    }
    record.display_name = remote.name.clone().or(record.display_name);
    record.country_code = remote
        .address
        .as_ref()
        .and_then(|a| a.country.clone())
        .or(record.country_code);
    record.status = CustomerStatus::Active;
    record.metadata = remote.metadata.clone();
    record.updated_at = Utc::now();
    record
}

fn to_card_summary(
    id: &str,
    card: Option<&crate::gateways::stripe::api::StripeCard>,
    is_default: bool,
) -> CardSummary {
    CardSummary {
        id: id.to_string(),
        brand: card.map(|c| c.brand.clone()),
        last4: card.map(|c| c.last4.clone()).unwrap_or_default(),
        exp_month: card.map(|c| c.exp_month),
        exp_year: card.map(|c| c.exp_year),
        is_default,
    }
}
