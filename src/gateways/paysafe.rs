// ABOUTME: Paysafe implementation of the PaymentGateway contract (single-use-token flow)
// ABOUTME: One-shot settle-with-auth charges, synthetic customers, status normalization
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

//! Paysafe gateway (single-use-token variant).
//!
//! Paysafe has no durable customer vault in this integration: the caller
//! supplies a single-use payment-handle token per charge. Customer
//! resolution returns a synthetic placeholder, card attachment is a
//! documented no-op, and Paysafe's native status vocabulary (`COMPLETED`)
//! is normalized to the canonical one (`succeeded`) before returning.

use super::{PaymentGateway, PaymentIntentRequest};
use crate::config::PaysafeSettings;
use crate::errors::{AppError, AppResult};
use crate::models::{CardInfo, CustomerResult, IntentResult, UserProfile};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One-shot payment request (Paysafe wire format, camelCase)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaysafePaymentRequest {
    /// Caller-supplied idempotency reference
    pub merchant_ref_num: String,
    /// Amount in minor units
    pub amount: i64,
    /// ISO currency code, uppercased
    pub currency_code: String,
    /// Single-use payment-handle token from the client SDK
    pub payment_handle_token: String,
    /// Capture immediately instead of authorize-only
    pub settle_with_auth: bool,
    /// Merchant account the charge is booked against
    pub account_id: String,
}

/// Payment response subset this core reads
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaysafePaymentResponse {
    /// Payment ID
    pub id: String,
    /// Native status (`COMPLETED`, `PENDING`, `PROCESSING`, `FAILED`, ...)
    pub status: String,
    /// Echoed merchant reference
    #[serde(default)]
    pub merchant_ref_num: Option<String>,
}

/// The single remote call the token flow needs
#[async_trait]
pub trait PaysafeApi: Send + Sync {
    /// Process a one-shot payment from a single-use token
    async fn process_payment(
        &self,
        request: &PaysafePaymentRequest,
    ) -> AppResult<PaysafePaymentResponse>;
}

enum ClientState {
    Uninitialized,
    Ready(reqwest::Client),
    Failed(String),
}

/// HTTP implementation with the same lazy single-flight initialization as
/// the Stripe client
pub struct PaysafeHttpClient {
    settings: PaysafeSettings,
    state: Mutex<ClientState>,
}

impl PaysafeHttpClient {
    /// Create an (uninitialized) client from settings
    #[must_use]
    pub fn new(settings: PaysafeSettings) -> Self {
        Self {
            settings,
            state: Mutex::new(ClientState::Uninitialized),
        }
    }

    async fn client(&self) -> AppResult<reqwest::Client> {
        let mut state = self.state.lock().await;
        match &*state {
            ClientState::Ready(client) => Ok(client.clone()),
            ClientState::Uninitialized | ClientState::Failed(_) => {
                if let ClientState::Failed(last) = &*state {
                    warn!(error = %last, "re-attempting Paysafe client initialization");
                }
                let result = if self.settings.api_key.is_empty() {
                    Err(AppError::config(
                        "PAYSAFE_API_KEY is not set; cannot initialize Paysafe client",
                    ))
                } else {
                    reqwest::Client::builder()
                        .timeout(REQUEST_TIMEOUT)
                        .build()
                        .map_err(|e| AppError::config(format!("failed to build HTTP client: {e}")))
                };
                match result {
                    Ok(client) => {
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
}

#[async_trait]
impl PaysafeApi for PaysafeHttpClient {
    async fn process_payment(
        &self,
        request: &PaysafePaymentRequest,
    ) -> AppResult<PaysafePaymentResponse> {
        let client = self.client().await?;
        let response = client
            .post(format!("{}/payments", self.settings.api_base))
            .header("Authorization", format!("Basic {}", self.settings.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::remote_unavailable("process_payment", e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            response.json::<PaysafePaymentResponse>().await.map_err(|e| {
                AppError::remote_unavailable("process_payment", format!("invalid response: {e}"))
            })
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Paysafe payment failed");
            Err(AppError::remote_unavailable(
                "process_payment",
                format!("{status}: {body}"),
            ))
        }
    }
}

/// Map Paysafe's native status vocabulary to the canonical one
#[must_use]
pub fn normalize_status(native: &str) -> String {
    match native {
        "COMPLETED" => "succeeded".to_string(),
        "PENDING" | "PROCESSING" | "RECEIVED" => "processing".to_string(),
        "FAILED" | "CANCELLED" => "failed".to_string(),
        other => other.to_lowercase(),
    }
}

/// Paysafe gateway over the one-call API seam
pub struct PaysafeGateway {
    api: Arc<dyn PaysafeApi>,
    account_id: String,
    default_currency: String,
}

impl PaysafeGateway {
    /// Create the gateway
    #[must_use]
    pub fn new(
        api: Arc<dyn PaysafeApi>,
        account_id: impl Into<String>,
        default_currency: impl Into<String>,
    ) -> Self {
        Self {
            api,
            account_id: account_id.into(),
            default_currency: default_currency.into(),
        }
    }

    /// Caller reference from metadata, falling back to a timestamp-derived one
    fn merchant_ref_num(metadata: Option<&serde_json::Value>) -> String {
        metadata
            .and_then(|m| m.get("merchantRefNum"))
            .and_then(|v| v.as_str())
            .map_or_else(
                || format!("forma-{}", Utc::now().timestamp_millis()),
                ToString::to_string,
            )
    }
}

#[async_trait]
impl PaymentGateway for PaysafeGateway {
    fn name(&self) -> &'static str {
        "paysafe"
    }

    /// No remote customer exists in the token flow; callers get a
    /// synthetic placeholder keyed by user ID.
    async fn create_or_get_customer(
        &self,
        user: &UserProfile,
        _business_id: Option<Uuid>,
    ) -> AppResult<CustomerResult> {
        Ok(CustomerResult {
            customer_id: format!("paysafe-{}", user.id),
            metadata: serde_json::json!({ "synthetic": true }),
        })
    }

    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> AppResult<IntentResult> {
        let token = request.payment_method_id.ok_or_else(|| {
            AppError::invalid_input("Paysafe payments require a single-use payment-handle token")
        })?;

        let wire = PaysafePaymentRequest {
            merchant_ref_num: Self::merchant_ref_num(request.metadata.as_ref()),
            amount: request.amount_cents,
            currency_code: request
                .currency
                .unwrap_or_else(|| self.default_currency.clone())
                .to_uppercase(),
            payment_handle_token: token,
            settle_with_auth: true,
            account_id: self.account_id.clone(),
        };

        debug!(merchant_ref_num = %wire.merchant_ref_num, "processing Paysafe payment");
        let response = self.api.process_payment(&wire).await?;

        Ok(IntentResult {
            id: response.id,
            status: normalize_status(&response.status),
            metadata: serde_json::json!({
                "merchantRefNum": response.merchant_ref_num,
            }),
        })
    }

    /// Single-use tokens are not card-vaulted; no metadata is available
    async fn card_info_from_payment_method(
        &self,
        _payment_method_id: &str,
        _business_id: Option<Uuid>,
    ) -> AppResult<Option<CardInfo>> {
        Ok(None)
    }

    /// No durable customer vault exists; attachment is a documented no-op
    async fn attach_payment_method(
        &self,
        _customer_id: &str,
        _payment_method_id: &str,
        _set_as_default: bool,
        _business_id: Option<Uuid>,
    ) -> AppResult<()> {
        Ok(())
    }
}
