// ABOUTME: Inbound webhook processor - signature verification and event dispatch
// ABOUTME: Verifies HMAC-SHA256 signatures and routes recognized event types downstream
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

//! Webhook processing.
//!
//! A webhook must carry both a non-empty body and a signature header; the
//! signature is `t=<unix>,v1=<hex hmac-sha256("t.payload")>` with the
//! platform webhook secret. Verification failures are always rejections.
//! Unrecognized event types are logged and acknowledged, because
//! processors expect a 200 even for ignored events to avoid endless
//! retries.

use crate::connect::ConnectAccountManager;
use crate::errors::{AppError, AppResult};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

type HmacSha256 = Hmac<Sha256>;

/// Acknowledgement body returned for every accepted webhook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    /// Always true; processors only need the 200
    pub received: bool,
}

/// Parsed webhook envelope (the subset this core reads)
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Event ID
    pub id: String,
    /// Event type tag (`checkout.session.completed`, ...)
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event payload
    pub data: WebhookEventData,
}

/// Payload wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    /// The affected object
    pub object: serde_json::Value,
}

/// Downstream collaborator for recognized business events
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    /// A checkout session finished; fulfillment belongs to the caller's
    /// workflow, not this core
    async fn on_checkout_completed(&self, object: &serde_json::Value) -> AppResult<()>;

    /// A payment intent settled
    async fn on_payment_succeeded(&self, object: &serde_json::Value) -> AppResult<()>;
}

/// Default handler: logs recognized events and nothing else
pub struct LoggingWebhookHandler;

#[async_trait]
impl WebhookHandler for LoggingWebhookHandler {
    async fn on_checkout_completed(&self, object: &serde_json::Value) -> AppResult<()> {
        info!(
            session_id = object.get("id").and_then(|v| v.as_str()).unwrap_or("unknown"),
            "checkout session completed"
        );
        Ok(())
    }

    async fn on_payment_succeeded(&self, object: &serde_json::Value) -> AppResult<()> {
        info!(
            intent_id = object.get("id").and_then(|v| v.as_str()).unwrap_or("unknown"),
            "payment intent succeeded"
        );
        Ok(())
    }
}

/// Verifies and dispatches inbound processor webhooks
pub struct WebhookProcessor {
    secret: String,
    connect: Arc<ConnectAccountManager>,
    handler: Arc<dyn WebhookHandler>,
}

impl WebhookProcessor {
    /// Create a processor with the platform webhook secret
    #[must_use]
    pub fn new(
        secret: impl Into<String>,
        connect: Arc<ConnectAccountManager>,
        handler: Arc<dyn WebhookHandler>,
    ) -> Self {
        Self {
            secret: secret.into(),
            connect,
            handler,
        }
    }

    /// Verify and dispatch one webhook.
    ///
    /// # Errors
    ///
    /// `InvalidInput` on a missing body or signature; `InvalidWebhook` on a
    /// signature that does not verify; `ConfigError` when no webhook secret
    /// is configured.
    pub async fn handle(&self, raw_body: &[u8], signature_header: &str) -> AppResult<WebhookAck> {
        if raw_body.is_empty() {
            return Err(AppError::invalid_input("missing webhook payload"));
        }
        if signature_header.trim().is_empty() {
            return Err(AppError::invalid_input("missing webhook signature"));
        }

        self.verify_signature(raw_body, signature_header)?;

        let event: WebhookEvent = serde_json::from_slice(raw_body)
            .map_err(|e| AppError::invalid_input(format!("malformed webhook payload: {e}")))?;

        self.dispatch(&event).await?;
        Ok(WebhookAck { received: true })
    }

    /// Check the `t=...,v1=...` signature against the configured secret
    fn verify_signature(&self, payload: &[u8], header: &str) -> AppResult<()> {
        if self.secret.is_empty() {
            return Err(AppError::config(
                "STRIPE_WEBHOOK_SECRET is not set; cannot verify webhooks",
            ));
        }

        let mut timestamp = None;
        let mut signature = None;
        for part in header.split(',') {
            match part.split_once('=') {
                Some(("t", value)) => timestamp = Some(value),
                Some(("v1", value)) => signature = Some(value),
                _ => {}
            }
        }
        let (timestamp, signature) = match (timestamp, signature) {
            (Some(t), Some(v)) => (t, v),
            _ => return Err(AppError::invalid_webhook("malformed signature header")),
        };

        let claimed = hex::decode(signature)
            .map_err(|_| AppError::invalid_webhook("signature is not valid hex"))?;

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| AppError::config("webhook secret is unusable as an HMAC key"))?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        if expected.ct_eq(&claimed).into() {
            Ok(())
        } else {
            warn!("webhook signature verification failed");
            Err(AppError::invalid_webhook("signature verification failed"))
        }
    }

    /// Route a verified event by its type tag
    async fn dispatch(&self, event: &WebhookEvent) -> AppResult<()> {
        match event.event_type.as_str() {
            "checkout.session.completed" => {
                self.handler.on_checkout_completed(&event.data.object).await
            }
            "payment_intent.succeeded" => {
                self.handler.on_payment_succeeded(&event.data.object).await
            }
            "account.updated" => {
                if let Some(remote_account_id) =
                    event.data.object.get("id").and_then(|v| v.as_str())
                {
                    self.connect.refresh_by_remote_id(remote_account_id).await?;
                }
                Ok(())
            }
            other => {
                // Acknowledge unknown types so the processor stops retrying.
                debug!(event_id = %event.id, event_type = %other, "ignoring unrecognized webhook event");
                Ok(())
            }
        }
    }
}

/// Compute a signature header for a payload; used by tests and local tools
#[must_use]
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    // HMAC accepts keys of any length; this cannot fail in practice.
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let signature = hex::encode(mac.finalize().into_bytes());
    format!("t={timestamp},v1={signature}")
}
