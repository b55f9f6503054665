// ABOUTME: Connect account manager - lifecycle of a tenant's marketplace sub-account
// ABOUTME: Create with rollback, status sync, onboarding links, and guarded disconnect
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

//! Marketplace sub-account lifecycle.
//!
//! States: `NONE -> PENDING_ONBOARDING -> (INCOMPLETE | COMPLETE) ->
//! DISCONNECTED`. Only [`ConnectAccountManager::sync_status`] transitions an
//! account to complete, by pulling the latest flags from the processor.
//!
//! Two compensation rules hold here and nowhere else in this core: a failed
//! creation deletes the just-created remote account along with any
//! half-persisted local state, and a failed remote deletion blocks local
//! deletion so the only reference to a live remote account is never lost.

use crate::errors::{AppError, AppResult};
use crate::gateways::stripe::api::{AccountParams, StripeApi};
use crate::models::{AccountKind, ConnectAccount};
use crate::storage::PaymentStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Request body for opting a tenant into split-payment onboarding
#[derive(Debug, Clone, Deserialize)]
pub struct CreateConnectAccount {
    /// Sub-account kind
    pub account_kind: AccountKind,
    /// ISO country code for the sub-account
    pub country_code: String,
}

/// Connect status as reported to the frontend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectStatus {
    /// Whether a Connect account exists for the tenant
    pub connected: bool,
    /// Derived: details submitted and charges enabled
    pub is_complete: bool,
    /// Processor flag
    pub charges_enabled: bool,
    /// Processor flag
    pub details_submitted: bool,
    /// Processor flag
    pub payouts_enabled: bool,
    /// Remote account ID, when connected
    pub remote_account_id: Option<String>,
}

impl ConnectStatus {
    fn disconnected() -> Self {
        Self {
            connected: false,
            is_complete: false,
            charges_enabled: false,
            details_submitted: false,
            payouts_enabled: false,
            remote_account_id: None,
        }
    }

    fn from_account(account: &ConnectAccount) -> Self {
        Self {
            connected: true,
            is_complete: account.is_complete(),
            charges_enabled: account.charges_enabled,
            details_submitted: account.details_submitted,
            payouts_enabled: account.payouts_enabled,
            remote_account_id: Some(account.remote_account_id.clone()),
        }
    }
}

/// Routing decision handed to the Stripe gateway for fee splitting
#[derive(Debug, Clone)]
pub struct ChargeRouting {
    /// Sub-account the charge would run on behalf of
    pub remote_account_id: String,
    /// Whether the sub-account may receive routed charges
    pub is_complete: bool,
}

/// Owns the lifecycle of tenants' marketplace sub-accounts
pub struct ConnectAccountManager {
    store: Arc<dyn PaymentStore>,
    stripe: Arc<dyn StripeApi>,
    refresh_url: String,
    return_url: String,
}

impl ConnectAccountManager {
    /// Create a manager over the given store and Stripe seam
    #[must_use]
    pub fn new(
        store: Arc<dyn PaymentStore>,
        stripe: Arc<dyn StripeApi>,
        refresh_url: impl Into<String>,
        return_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            stripe,
            refresh_url: refresh_url.into(),
            return_url: return_url.into(),
        }
    }

    /// Opt a tenant into split-payment onboarding.
    ///
    /// Pre-checks for an existing account before the remote call (shrinking
    /// the check-then-create race window; the UNIQUE constraint on
    /// `business_id` closes the rest, with the losing writer's remote
    /// account becoming an orphan for external reconciliation). Any failure
    /// after remote creation rolls the remote account back.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` when the business already has a Connect account,
    /// `NotFound` when the business does not exist, `RemoteUnavailable` on
    /// processor failure.
    pub async fn create(
        &self,
        business_id: Uuid,
        request: CreateConnectAccount,
    ) -> AppResult<String> {
        let business = self
            .store
            .get_business(business_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::not_found(format!("business {business_id}")))?;

        if self
            .store
            .get_connect_account_by_business(business_id)
            .await
            .map_err(AppError::from)?
            .is_some()
        {
            return Err(AppError::already_exists(format!(
                "business {business_id} already has a Connect account"
            )));
        }

        let contact_email = format!("billing+{}@forma.fit", business_id.simple());
        let remote = self
            .stripe
            .create_account(AccountParams {
                kind: request.account_kind.as_str(),
                country: &request.country_code,
                email: &contact_email,
            })
            .await?;

        info!(
            business_id = %business_id,
            remote_account_id = %remote.id,
            "created Connect account, generating onboarding link"
        );

        // Everything from here on compensates by deleting the remote
        // account and any half-persisted local state, so a failure cannot
        // strand an orphaned marketplace account or wedge the tenant.
        let onboarding = match self.finish_create(&business.id, &request, &remote.id).await {
            Ok(url) => url,
            Err(err) => {
                error!(
                    business_id = %business_id,
                    remote_account_id = %remote.id,
                    error = %err,
                    "Connect account creation failed after remote create, rolling back"
                );
                self.rollback_create(business_id, &remote.id).await;
                return Err(err);
            }
        };

        Ok(onboarding)
    }

    /// Best-effort compensation for a failed `create`.
    ///
    /// The local row goes first: a dangling row pointing at a deleted
    /// remote account would make the tenant unrecoverable (`create` sees
    /// `AlreadyExists`, `disconnect` cannot delete the remote side). The
    /// remote account goes second; if that deletion fails it is an orphan
    /// for external reconciliation, which is the lesser failure mode.
    async fn rollback_create(&self, business_id: Uuid, remote_account_id: &str) {
        match self.store.get_connect_account_by_business(business_id).await {
            Ok(Some(account)) => {
                if let Err(err) = self.store.delete_connect_account(account.id).await {
                    error!(
                        business_id = %business_id,
                        error = %err,
                        "rollback of local Connect account row failed"
                    );
                }
                if let Err(err) = self
                    .store
                    .set_business_connect_account(business_id, None)
                    .await
                {
                    error!(
                        business_id = %business_id,
                        error = %err,
                        "rollback of Connect back-reference failed"
                    );
                }
            }
            Ok(None) => {}
            Err(err) => {
                error!(
                    business_id = %business_id,
                    error = %err,
                    "could not inspect local state during Connect rollback"
                );
            }
        }

        if let Err(err) = self.stripe.delete_account(remote_account_id).await {
            // Orphaned remote account; reconciliation job territory.
            error!(
                remote_account_id = %remote_account_id,
                error = %err,
                "rollback of remote Connect account failed"
            );
        }
    }

    /// Link generation plus local persistence, separated out so `create`
    /// can compensate on any failure in this tail.
    async fn finish_create(
        &self,
        business_id: &Uuid,
        request: &CreateConnectAccount,
        remote_account_id: &str,
    ) -> AppResult<String> {
        let link = self
            .stripe
            .create_account_link(remote_account_id, &self.refresh_url, &self.return_url)
            .await?;

        let now = Utc::now();
        let account = ConnectAccount {
            id: Uuid::new_v4(),
            remote_account_id: remote_account_id.to_string(),
            account_kind: request.account_kind,
            country_code: request.country_code.clone(),
            contact_email: format!("billing+{}@forma.fit", business_id.simple()),
            charges_enabled: false,
            details_submitted: false,
            payouts_enabled: false,
            business_id: *business_id,
            created_at: now,
            updated_at: now,
        };

        self.store
            .insert_connect_account(&account)
            .await
            .map_err(AppError::from)?;
        self.store
            .set_business_connect_account(*business_id, Some(account.id))
            .await
            .map_err(AppError::from)?;

        Ok(link.url)
    }

    /// Pull the latest flags from the processor and persist them.
    ///
    /// The only path that transitions `PENDING_ONBOARDING -> COMPLETE`.
    ///
    /// # Errors
    ///
    /// `NotFound` when the business has no Connect account.
    pub async fn sync_status(&self, business_id: Uuid) -> AppResult<ConnectStatus> {
        let mut account = self
            .store
            .get_connect_account_by_business(business_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| {
                AppError::not_found(format!("Connect account for business {business_id}"))
            })?;

        let remote = self
            .stripe
            .retrieve_account(&account.remote_account_id)
            .await?;

        self.store
            .update_connect_account_flags(
                account.id,
                remote.charges_enabled,
                remote.details_submitted,
                remote.payouts_enabled,
            )
            .await
            .map_err(AppError::from)?;

        account.charges_enabled = remote.charges_enabled;
        account.details_submitted = remote.details_submitted;
        account.payouts_enabled = remote.payouts_enabled;

        Ok(ConnectStatus::from_account(&account))
    }

    /// Tolerant status read: no account means "not connected", not an error
    pub async fn get_status(&self, business_id: Uuid) -> AppResult<ConnectStatus> {
        match self
            .store
            .get_connect_account_by_business(business_id)
            .await
            .map_err(AppError::from)?
        {
            Some(_) => self.sync_status(business_id).await,
            None => Ok(ConnectStatus::disconnected()),
        }
    }

    /// Regenerate a fresh onboarding link; links expire and are single-use.
    ///
    /// # Errors
    ///
    /// `NotFound` when the business has no Connect account.
    pub async fn onboarding_link(&self, business_id: Uuid) -> AppResult<String> {
        let account = self
            .store
            .get_connect_account_by_business(business_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| {
                AppError::not_found(format!("Connect account for business {business_id}"))
            })?;

        let link = self
            .stripe
            .create_account_link(&account.remote_account_id, &self.refresh_url, &self.return_url)
            .await?;
        Ok(link.url)
    }

    /// Disconnect a tenant from split payments.
    ///
    /// Remote deletion runs first; if it fails the local record is kept so
    /// the reference to the still-existing remote account survives. On
    /// success the local row and the business back-reference both go.
    pub async fn disconnect(&self, business_id: Uuid) -> AppResult<()> {
        let account = self
            .store
            .get_connect_account_by_business(business_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| {
                AppError::not_found(format!("Connect account for business {business_id}"))
            })?;

        if let Err(err) = self.stripe.delete_account(&account.remote_account_id).await {
            warn!(
                business_id = %business_id,
                remote_account_id = %account.remote_account_id,
                error = %err,
                "remote Connect account deletion failed; keeping local record"
            );
            return Err(err);
        }

        self.store
            .delete_connect_account(account.id)
            .await
            .map_err(AppError::from)?;
        self.store
            .set_business_connect_account(business_id, None)
            .await
            .map_err(AppError::from)?;

        info!(business_id = %business_id, "Connect account disconnected");
        Ok(())
    }

    /// Routing decision for the Stripe gateway: `None` when the tenant has
    /// no Connect account at all.
    pub async fn routing_for(&self, business_id: Uuid) -> AppResult<Option<ChargeRouting>> {
        Ok(self
            .store
            .get_connect_account_by_business(business_id)
            .await
            .map_err(AppError::from)?
            .map(|account| ChargeRouting {
                remote_account_id: account.remote_account_id.clone(),
                is_complete: account.is_complete(),
            }))
    }

    /// Refresh flags for the account matching a remote account ID, if any.
    ///
    /// Used by the webhook processor on `account.updated` events.
    pub async fn refresh_by_remote_id(&self, remote_account_id: &str) -> AppResult<()> {
        if let Some(account) = self
            .store
            .get_connect_account_by_remote_id(remote_account_id)
            .await
            .map_err(AppError::from)?
        {
            self.sync_status(account.business_id).await?;
        }
        Ok(())
    }
}
