// ABOUTME: Shared test fixtures - in-memory mock of the Stripe seam and database helpers
// ABOUTME: Provides MockStripeApi, FailingStore, and seed helpers used across integration tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

#![allow(dead_code, clippy::unwrap_used)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use forma_payments::connect::ConnectAccountManager;
use forma_payments::errors::{AppError, AppResult};
use forma_payments::gateways::stripe::api::{
    AccountParams, IntentParams, StripeAccount, StripeAccountLink, StripeApi, StripeCard,
    StripeCustomer, StripeInvoiceSettings, StripePaymentIntent, StripePaymentMethod,
};
use forma_payments::models::{
    Business, ConnectAccount, CustomerRecord, ProcessorConfig, ProcessorKind, UserProfile,
};
use forma_payments::storage::{PaymentStore, SqlitePaymentStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use uuid::Uuid;

/// In-memory double for the Stripe seam.
///
/// Remote state lives in hash maps; call counters let tests assert on
/// idempotency and compensation behavior.
#[derive(Default)]
pub struct MockStripeApi {
    accounts: Mutex<HashMap<String, StripeAccount>>,
    customers: Mutex<HashMap<String, StripeCustomer>>,
    methods: Mutex<HashMap<String, StripePaymentMethod>>,
    /// Last payment intent parameters seen by `create_payment_intent`
    pub last_intent: Mutex<Option<IntentParams>>,
    /// Number of `create_customer` calls
    pub customer_creates: AtomicUsize,
    /// Number of `create_account` calls
    pub account_creates: AtomicUsize,
    /// Number of `delete_account` calls
    pub account_deletes: AtomicUsize,
    /// Force `create_account` to fail
    pub fail_create_account: AtomicBool,
    /// Force `create_account_link` to fail
    pub fail_account_link: AtomicBool,
    /// Force `delete_account` to fail
    pub fail_delete_account: AtomicBool,
    /// Force `retrieve_customer` to fail without a remote error code
    pub fail_retrieve_customer: AtomicBool,
    seq: AtomicUsize,
}

impl MockStripeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{prefix}_{}", self.seq.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Simulate onboarding progress on the remote account
    pub fn set_account_flags(
        &self,
        account_id: &str,
        charges_enabled: bool,
        details_submitted: bool,
        payouts_enabled: bool,
    ) {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.get_mut(account_id).unwrap();
        account.charges_enabled = charges_enabled;
        account.details_submitted = details_submitted;
        account.payouts_enabled = payouts_enabled;
    }

    /// Simulate an out-of-band hard deletion (retrieval becomes a 404)
    pub fn remove_customer(&self, customer_id: &str) {
        self.customers.lock().unwrap().remove(customer_id);
    }

    /// Simulate an out-of-band soft deletion (retrieval returns a stub)
    pub fn mark_customer_deleted(&self, customer_id: &str) {
        let mut customers = self.customers.lock().unwrap();
        let customer = customers.get_mut(customer_id).unwrap();
        customer.deleted = true;
    }

    /// Register a card payment method, optionally attached to a customer
    pub fn insert_card(&self, payment_method_id: &str, customer: Option<&str>, last4: &str) {
        self.methods.lock().unwrap().insert(
            payment_method_id.to_string(),
            StripePaymentMethod {
                id: payment_method_id.to_string(),
                customer: customer.map(ToString::to_string),
                card: Some(StripeCard {
                    brand: "visa".to_string(),
                    last4: last4.to_string(),
                    exp_month: 12,
                    exp_year: 2030,
                }),
            },
        );
    }

    pub fn account_exists(&self, account_id: &str) -> bool {
        self.accounts.lock().unwrap().contains_key(account_id)
    }

    pub fn account_count(&self) -> usize {
        self.accounts.lock().unwrap().len()
    }

    pub fn customer_count(&self) -> usize {
        self.customers.lock().unwrap().len()
    }
}

#[async_trait]
impl StripeApi for MockStripeApi {
    async fn create_account(&self, params: AccountParams<'_>) -> AppResult<StripeAccount> {
        if self.fail_create_account.load(Ordering::SeqCst) {
            return Err(AppError::remote_unavailable(
                "create_account",
                "simulated outage",
            ));
        }
        self.account_creates.fetch_add(1, Ordering::SeqCst);
        let account = StripeAccount {
            id: self.next_id("acct"),
            charges_enabled: false,
            details_submitted: false,
            payouts_enabled: false,
            email: Some(params.email.to_string()),
        };
        self.accounts
            .lock()
            .unwrap()
            .insert(account.id.clone(), account.clone());
        Ok(account)
    }

    async fn create_account_link(
        &self,
        account_id: &str,
        _refresh_url: &str,
        _return_url: &str,
    ) -> AppResult<StripeAccountLink> {
        if self.fail_account_link.load(Ordering::SeqCst) {
            return Err(AppError::remote_unavailable(
                "create_account_link",
                "simulated outage",
            ));
        }
        Ok(StripeAccountLink {
            url: format!("https://connect.stripe.test/onboard/{account_id}"),
            expires_at: 1_900_000_000,
        })
    }

    async fn retrieve_account(&self, account_id: &str) -> AppResult<StripeAccount> {
        self.accounts
            .lock()
            .unwrap()
            .get(account_id)
            .cloned()
            .ok_or_else(|| {
                AppError::remote_unavailable(
                    "retrieve_account",
                    format!("invalid_request_error: No such account: '{account_id}'"),
                )
                .with_remote_code("resource_missing")
            })
    }

    async fn delete_account(&self, account_id: &str) -> AppResult<()> {
        self.account_deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete_account.load(Ordering::SeqCst) {
            return Err(AppError::remote_unavailable(
                "delete_account",
                "simulated outage",
            ));
        }
        self.accounts.lock().unwrap().remove(account_id);
        Ok(())
    }

    async fn create_customer(
        &self,
        email: &str,
        name: Option<&str>,
        metadata: Option<&serde_json::Value>,
    ) -> AppResult<StripeCustomer> {
        self.customer_creates.fetch_add(1, Ordering::SeqCst);
        let customer = StripeCustomer {
            id: self.next_id("cus"),
            deleted: false,
            email: Some(email.to_string()),
            name: name.map(ToString::to_string),
            address: None,
            created: 1_700_000_000,
            invoice_settings: Some(StripeInvoiceSettings::default()),
            metadata: metadata.cloned().unwrap_or(serde_json::Value::Null),
        };
        self.customers
            .lock()
            .unwrap()
            .insert(customer.id.clone(), customer.clone());
        Ok(customer)
    }

    async fn retrieve_customer(&self, customer_id: &str) -> AppResult<StripeCustomer> {
        if self.fail_retrieve_customer.load(Ordering::SeqCst) {
            return Err(AppError::remote_unavailable(
                "retrieve_customer",
                "simulated outage",
            ));
        }
        self.customers
            .lock()
            .unwrap()
            .get(customer_id)
            .cloned()
            .ok_or_else(|| {
                AppError::remote_unavailable(
                    "retrieve_customer",
                    format!("invalid_request_error: No such customer: '{customer_id}'"),
                )
                .with_remote_code("resource_missing")
            })
    }

    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> AppResult<()> {
        let mut customers = self.customers.lock().unwrap();
        let customer = customers.get_mut(customer_id).ok_or_else(|| {
            AppError::remote_unavailable(
                "set_default_payment_method",
                format!("invalid_request_error: No such customer: '{customer_id}'"),
            )
            .with_remote_code("resource_missing")
        })?;
        customer.invoice_settings = Some(StripeInvoiceSettings {
            default_payment_method: Some(payment_method_id.to_string()),
        });
        Ok(())
    }

    async fn create_payment_intent(&self, params: IntentParams) -> AppResult<StripePaymentIntent> {
        let status = if params.confirm {
            "succeeded"
        } else {
            "requires_confirmation"
        };
        let metadata = params.metadata.clone().unwrap_or(serde_json::Value::Null);
        *self.last_intent.lock().unwrap() = Some(params);
        Ok(StripePaymentIntent {
            id: self.next_id("pi"),
            status: status.to_string(),
            metadata,
        })
    }

    async fn retrieve_payment_method(
        &self,
        payment_method_id: &str,
        _stripe_account: Option<&str>,
    ) -> AppResult<StripePaymentMethod> {
        self.methods
            .lock()
            .unwrap()
            .get(payment_method_id)
            .cloned()
            .ok_or_else(|| {
                AppError::remote_unavailable(
                    "retrieve_payment_method",
                    format!("invalid_request_error: No such payment_method: '{payment_method_id}'"),
                )
                .with_remote_code("resource_missing")
            })
    }

    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> AppResult<StripePaymentMethod> {
        let mut methods = self.methods.lock().unwrap();
        let method = methods
            .entry(payment_method_id.to_string())
            .or_insert_with(|| StripePaymentMethod {
                id: payment_method_id.to_string(),
                customer: None,
                card: Some(StripeCard {
                    brand: "visa".to_string(),
                    last4: "4242".to_string(),
                    exp_month: 12,
                    exp_year: 2030,
                }),
            });
        method.customer = Some(customer_id.to_string());
        Ok(method.clone())
    }

    async fn detach_payment_method(&self, payment_method_id: &str) -> AppResult<()> {
        let mut methods = self.methods.lock().unwrap();
        let method = methods.get_mut(payment_method_id).ok_or_else(|| {
            AppError::remote_unavailable(
                "detach_payment_method",
                format!("invalid_request_error: No such payment_method: '{payment_method_id}'"),
            )
            .with_remote_code("resource_missing")
        })?;
        method.customer = None;
        Ok(())
    }

    async fn list_payment_methods(
        &self,
        customer_id: &str,
    ) -> AppResult<Vec<StripePaymentMethod>> {
        Ok(self
            .methods
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.customer.as_deref() == Some(customer_id))
            .cloned()
            .collect())
    }
}

/// Store wrapper that fails individual writes on demand, for exercising
/// the create-rollback paths.
pub struct FailingStore {
    inner: Arc<SqlitePaymentStore>,
    /// When set, `insert_connect_account` fails
    pub fail_insert_connect_account: AtomicBool,
    /// When set, writing `Some(_)` to the business back-reference fails
    pub fail_set_business_connect_account: AtomicBool,
}

impl FailingStore {
    pub fn new(inner: Arc<SqlitePaymentStore>) -> Self {
        Self {
            inner,
            fail_insert_connect_account: AtomicBool::new(false),
            fail_set_business_connect_account: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl PaymentStore for FailingStore {
    async fn migrate(&self) -> Result<()> {
        self.inner.migrate().await
    }

    async fn create_business(&self, business: &Business) -> Result<()> {
        self.inner.create_business(business).await
    }

    async fn get_business(&self, business_id: Uuid) -> Result<Option<Business>> {
        self.inner.get_business(business_id).await
    }

    async fn set_business_connect_account(
        &self,
        business_id: Uuid,
        connect_account_id: Option<Uuid>,
    ) -> Result<()> {
        // Clearing the back-reference (None) stays writable so rollback
        // itself is not sabotaged.
        if connect_account_id.is_some()
            && self.fail_set_business_connect_account.load(Ordering::SeqCst)
        {
            return Err(anyhow!("simulated back-reference write failure"));
        }
        self.inner
            .set_business_connect_account(business_id, connect_account_id)
            .await
    }

    async fn upsert_processor_config(&self, config: &ProcessorConfig) -> Result<()> {
        self.inner.upsert_processor_config(config).await
    }

    async fn get_processor_config_for_business(
        &self,
        business_id: Uuid,
    ) -> Result<Option<ProcessorConfig>> {
        self.inner.get_processor_config_for_business(business_id).await
    }

    async fn insert_connect_account(&self, account: &ConnectAccount) -> Result<()> {
        if self.fail_insert_connect_account.load(Ordering::SeqCst) {
            return Err(anyhow!("simulated insert failure"));
        }
        self.inner.insert_connect_account(account).await
    }

    async fn get_connect_account_by_business(
        &self,
        business_id: Uuid,
    ) -> Result<Option<ConnectAccount>> {
        self.inner.get_connect_account_by_business(business_id).await
    }

    async fn get_connect_account_by_remote_id(
        &self,
        remote_account_id: &str,
    ) -> Result<Option<ConnectAccount>> {
        self.inner
            .get_connect_account_by_remote_id(remote_account_id)
            .await
    }

    async fn update_connect_account_flags(
        &self,
        account_id: Uuid,
        charges_enabled: bool,
        details_submitted: bool,
        payouts_enabled: bool,
    ) -> Result<()> {
        self.inner
            .update_connect_account_flags(
                account_id,
                charges_enabled,
                details_submitted,
                payouts_enabled,
            )
            .await
    }

    async fn delete_connect_account(&self, account_id: Uuid) -> Result<()> {
        self.inner.delete_connect_account(account_id).await
    }

    async fn upsert_customer_record(&self, record: &CustomerRecord) -> Result<()> {
        self.inner.upsert_customer_record(record).await
    }

    async fn get_customer_record_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<CustomerRecord>> {
        self.inner.get_customer_record_by_user(user_id).await
    }

    async fn create_user(&self, user: &UserProfile) -> Result<()> {
        self.inner.create_user(user).await
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
        self.inner.get_user(user_id).await
    }
}

/// Fresh migrated store on a temp-file database.
///
/// The TempDir must stay alive for the duration of the test.
pub async fn test_store() -> (Arc<SqlitePaymentStore>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("payments.db").display()
    );
    let store = SqlitePaymentStore::new(&url).await.unwrap();
    store.migrate().await.unwrap();
    (Arc::new(store), dir)
}

/// Insert a business, optionally with a processor configuration
pub async fn seed_business(store: &dyn PaymentStore, kind: Option<ProcessorKind>) -> Uuid {
    let business_id = Uuid::new_v4();
    let processor_config_id = match kind {
        Some(kind) => {
            let config = ProcessorConfig {
                id: Uuid::new_v4(),
                kind,
                enabled: true,
                description: None,
            };
            store.upsert_processor_config(&config).await.unwrap();
            Some(config.id)
        }
        None => None,
    };
    store
        .create_business(&Business {
            id: business_id,
            name: "Iron Temple Gym".to_string(),
            processor_config_id,
            connect_account_id: None,
        })
        .await
        .unwrap();
    business_id
}

/// Insert a member the vault can create customers for
pub async fn seed_user(store: &dyn PaymentStore) -> UserProfile {
    let id = Uuid::new_v4();
    let user = UserProfile {
        id,
        email: format!("member+{}@forma.fit", id.simple()),
        display_name: Some("Jordan Reyes".to_string()),
        country_code: Some("US".to_string()),
    };
    store.create_user(&user).await.unwrap();
    user
}

/// Connect manager with the standard test onboarding URLs
pub fn connect_manager(
    store: Arc<dyn PaymentStore>,
    stripe: Arc<dyn StripeApi>,
) -> Arc<ConnectAccountManager> {
    Arc::new(ConnectAccountManager::new(
        store,
        stripe,
        "https://app.forma.test/payments/refresh",
        "https://app.forma.test/payments/complete",
    ))
}
