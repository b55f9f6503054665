// ABOUTME: HTTP implementation of the StripeApi trait over the form-encoded Stripe REST API
// ABOUTME: Lazily initializes the underlying client behind a single-flight lock
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

//! Stripe HTTP client.
//!
//! The underlying `reqwest` client is built on first use behind a
//! `tokio::sync::Mutex`, modeled as an explicit `Uninitialized -> Ready ->
//! Failed` state machine so concurrent first-callers cannot race to
//! construct duplicate clients. A `Failed` client re-attempts
//! initialization on the next call rather than staying wedged.

use super::api::{
    AccountParams, IntentParams, StripeAccount, StripeAccountLink, StripeApi, StripeCustomer,
    StripePaymentIntent, StripePaymentMethod,
};
use crate::config::StripeSettings;
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Bounded timeout for every remote call; retries belong to callers
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Initialization state of the shared client
enum ClientState {
    /// No initialization attempted yet
    Uninitialized,
    /// Client constructed and usable
    Ready(reqwest::Client),
    /// Last initialization attempt failed; retried on next call
    Failed(String),
}

/// Error envelope Stripe returns on non-2xx responses
#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
    #[serde(rename = "type")]
    error_type: Option<String>,
    /// Machine-readable code, e.g. `resource_missing`
    code: Option<String>,
}

/// Process-wide Stripe client with lazy single-flight initialization
pub struct StripeHttpClient {
    settings: StripeSettings,
    state: Mutex<ClientState>,
}

impl StripeHttpClient {
    /// Create an (uninitialized) client from settings
    #[must_use]
    pub fn new(settings: StripeSettings) -> Self {
        Self {
            settings,
            state: Mutex::new(ClientState::Uninitialized),
        }
    }

    /// Get the initialized HTTP client or fail.
    ///
    /// Serialized behind the state lock; only one caller constructs the
    /// client, everyone else observes `Ready` or the recorded failure.
    async fn client(&self) -> AppResult<reqwest::Client> {
        let mut state = self.state.lock().await;
        match &*state {
            ClientState::Ready(client) => Ok(client.clone()),
            ClientState::Uninitialized | ClientState::Failed(_) => {
                if let ClientState::Failed(last) = &*state {
                    warn!(error = %last, "re-attempting Stripe client initialization");
                }
                match self.build_client() {
                    Ok(client) => {
                        debug!("Stripe client initialized");
                        *state = ClientState::Ready(client.clone());
                        Ok(client)
                    }
                    Err(err) => {
                        *state = ClientState::Failed(err.message.clone());
                        Err(err)
                    }
                }
            }
        }
    }

    fn build_client(&self) -> AppResult<reqwest::Client> {
        if self.settings.secret_key.is_empty() {
            return Err(AppError::config(
                "STRIPE_SECRET_KEY is not set; cannot initialize Stripe client",
            ));
        }
        reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::config(format!("failed to build HTTP client: {e}")))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.settings.api_base)
    }

    /// Decode a response, mapping Stripe error envelopes to `RemoteUnavailable`
    async fn decode<T: for<'de> Deserialize<'de>>(
        operation: &str,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        if status.is_success() {
            response.json::<T>().await.map_err(|e| {
                AppError::remote_unavailable(operation, format!("invalid response body: {e}"))
            })
        } else {
            let (message, remote_code) = match response.json::<StripeErrorEnvelope>().await {
                Ok(envelope) => {
                    let detail = envelope.error;
                    let kind = detail.error_type.unwrap_or_else(|| "api_error".into());
                    let message = format!(
                        "{kind}: {}",
                        detail.message.unwrap_or_else(|| status.to_string())
                    );
                    (message, detail.code)
                }
                Err(_) => (status.to_string(), None),
            };
            warn!(operation, status = %status, error = %message, "Stripe API call failed");
            let mut err = AppError::remote_unavailable(operation, message);
            if let Some(code) = remote_code {
                err = err.with_remote_code(code);
            }
            Err(err)
        }
    }

    async fn post_form(
        &self,
        operation: &str,
        path: &str,
        params: &[(String, String)],
        stripe_account: Option<&str>,
    ) -> AppResult<reqwest::Response> {
        let client = self.client().await?;
        let mut request = client
            .post(self.url(path))
            .bearer_auth(&self.settings.secret_key)
            .form(params);
        if let Some(account) = stripe_account {
            request = request.header("Stripe-Account", account);
        }
        request
            .send()
            .await
            .map_err(|e| AppError::remote_unavailable(operation, e.to_string()))
    }

    async fn get(
        &self,
        operation: &str,
        path: &str,
        stripe_account: Option<&str>,
    ) -> AppResult<reqwest::Response> {
        let client = self.client().await?;
        let mut request = client
            .get(self.url(path))
            .bearer_auth(&self.settings.secret_key);
        if let Some(account) = stripe_account {
            request = request.header("Stripe-Account", account);
        }
        request
            .send()
            .await
            .map_err(|e| AppError::remote_unavailable(operation, e.to_string()))
    }

    async fn delete(&self, operation: &str, path: &str) -> AppResult<reqwest::Response> {
        let client = self.client().await?;
        client
            .delete(self.url(path))
            .bearer_auth(&self.settings.secret_key)
            .send()
            .await
            .map_err(|e| AppError::remote_unavailable(operation, e.to_string()))
    }
}

/// Flatten a JSON object into Stripe's `metadata[key]=value` form fields
fn metadata_params(metadata: &serde_json::Value, params: &mut Vec<(String, String)>) {
    if let Some(map) = metadata.as_object() {
        for (key, value) in map {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            params.push((format!("metadata[{key}]"), rendered));
        }
    }
}

#[async_trait]
impl StripeApi for StripeHttpClient {
    async fn create_account(&self, params: AccountParams<'_>) -> AppResult<StripeAccount> {
        let form = vec![
            ("type".to_string(), params.kind.to_string()),
            ("country".to_string(), params.country.to_string()),
            ("email".to_string(), params.email.to_string()),
        ];
        let response = self
            .post_form("create_account", "/accounts", &form, None)
            .await?;
        Self::decode("create_account", response).await
    }

    async fn create_account_link(
        &self,
        account_id: &str,
        refresh_url: &str,
        return_url: &str,
    ) -> AppResult<StripeAccountLink> {
        let form = vec![
            ("account".to_string(), account_id.to_string()),
            ("refresh_url".to_string(), refresh_url.to_string()),
            ("return_url".to_string(), return_url.to_string()),
            ("type".to_string(), "account_onboarding".to_string()),
        ];
        let response = self
            .post_form("create_account_link", "/account_links", &form, None)
            .await?;
        Self::decode("create_account_link", response).await
    }

    async fn retrieve_account(&self, account_id: &str) -> AppResult<StripeAccount> {
        let response = self
            .get("retrieve_account", &format!("/accounts/{account_id}"), None)
            .await?;
        Self::decode("retrieve_account", response).await
    }

    async fn delete_account(&self, account_id: &str) -> AppResult<()> {
        let response = self
            .delete("delete_account", &format!("/accounts/{account_id}"))
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(AppError::remote_unavailable(
                "delete_account",
                status.to_string(),
            ))
        }
    }

    async fn create_customer(
        &self,
        email: &str,
        name: Option<&str>,
        metadata: Option<&serde_json::Value>,
    ) -> AppResult<StripeCustomer> {
        let mut form = vec![("email".to_string(), email.to_string())];
        if let Some(name) = name {
            form.push(("name".to_string(), name.to_string()));
        }
        if let Some(metadata) = metadata {
            metadata_params(metadata, &mut form);
        }
        let response = self
            .post_form("create_customer", "/customers", &form, None)
            .await?;
        Self::decode("create_customer", response).await
    }

    async fn retrieve_customer(&self, customer_id: &str) -> AppResult<StripeCustomer> {
        let response = self
            .get(
                "retrieve_customer",
                &format!("/customers/{customer_id}"),
                None,
            )
            .await?;
        Self::decode("retrieve_customer", response).await
    }

    async fn set_default_payment_method(
        &self,
        customer_id: &str,
        payment_method_id: &str,
    ) -> AppResult<()> {
        let form = vec![(
            "invoice_settings[default_payment_method]".to_string(),
            payment_method_id.to_string(),
        )];
        let response = self
            .post_form(
                "set_default_payment_method",
                &format!("/customers/{customer_id}"),
                &form,
                None,
            )
            .await?;
        Self::decode::<StripeCustomer>("set_default_payment_method", response).await?;
        Ok(())
    }

    async fn create_payment_intent(&self, params: IntentParams) -> AppResult<StripePaymentIntent> {
        let mut form = vec![
            ("amount".to_string(), params.amount.to_string()),
            ("currency".to_string(), params.currency.clone()),
        ];
        if let Some(customer) = &params.customer {
            form.push(("customer".to_string(), customer.clone()));
        }
        if let Some(payment_method) = &params.payment_method {
            form.push(("payment_method".to_string(), payment_method.clone()));
        }
        if params.confirm {
            form.push(("confirm".to_string(), "true".to_string()));
        }
        if let Some(fee) = params.application_fee_amount {
            form.push(("application_fee_amount".to_string(), fee.to_string()));
        }
        if let Some(metadata) = &params.metadata {
            metadata_params(metadata, &mut form);
        }
        let response = self
            .post_form(
                "create_payment_intent",
                "/payment_intents",
                &form,
                params.stripe_account.as_deref(),
            )
            .await?;
        Self::decode("create_payment_intent", response).await
    }

    async fn retrieve_payment_method(
        &self,
        payment_method_id: &str,
        stripe_account: Option<&str>,
    ) -> AppResult<StripePaymentMethod> {
        let response = self
            .get(
                "retrieve_payment_method",
                &format!("/payment_methods/{payment_method_id}"),
                stripe_account,
            )
            .await?;
        Self::decode("retrieve_payment_method", response).await
    }

    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> AppResult<StripePaymentMethod> {
        let form = vec![("customer".to_string(), customer_id.to_string())];
        let response = self
            .post_form(
                "attach_payment_method",
                &format!("/payment_methods/{payment_method_id}/attach"),
                &form,
                None,
            )
            .await?;
        Self::decode("attach_payment_method", response).await
    }

    async fn detach_payment_method(&self, payment_method_id: &str) -> AppResult<()> {
        let response = self
            .post_form(
                "detach_payment_method",
                &format!("/payment_methods/{payment_method_id}/detach"),
                &[],
                None,
            )
            .await?;
        Self::decode::<StripePaymentMethod>("detach_payment_method", response).await?;
        Ok(())
    }

    async fn list_payment_methods(
        &self,
        customer_id: &str,
    ) -> AppResult<Vec<StripePaymentMethod>> {
        #[derive(Debug, Deserialize)]
        struct StripeList {
            data: Vec<StripePaymentMethod>,
        }

        let response = self
            .get(
                "list_payment_methods",
                &format!("/payment_methods?customer={customer_id}&type=card"),
                None,
            )
            .await?;
        let list: StripeList = Self::decode("list_payment_methods", response).await?;
        Ok(list.data)
    }
}
