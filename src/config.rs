// ABOUTME: Environment-based configuration for the payments service
// ABOUTME: Reads processor secrets, database URL, and HTTP settings from the environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

//! Environment-only configuration.
//!
//! Secrets are supplied by the deployment environment and held in memory as
//! plain strings; they are never logged. Processor clients initialize lazily
//! from these settings on first use.

use crate::errors::{AppError, AppResult};
use std::env;
use url::Url;

/// Default HTTP port when `HTTP_PORT` is unset
const DEFAULT_HTTP_PORT: u16 = 8081;

/// Platform base currency when `PLATFORM_CURRENCY` is unset
const DEFAULT_CURRENCY: &str = "usd";

/// Stripe production API base
const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Paysafe production API base
const PAYSAFE_API_BASE: &str = "https://api.paysafe.com/paymenthub/v1";

/// Stripe credentials and endpoints
#[derive(Debug, Clone)]
pub struct StripeSettings {
    /// Secret API key (`sk_...`)
    pub secret_key: String,
    /// Webhook signing secret (`whsec_...`)
    pub webhook_secret: String,
    /// API base URL, overridable for tests
    pub api_base: String,
    /// URL the processor redirects to when an onboarding link expires
    pub connect_refresh_url: String,
    /// URL the processor redirects to after onboarding completes
    pub connect_return_url: String,
}

/// Paysafe credentials and endpoints
#[derive(Debug, Clone)]
pub struct PaysafeSettings {
    /// Base64 API key used for basic auth
    pub api_key: String,
    /// Merchant account ID charges are booked against
    pub account_id: String,
    /// API base URL, overridable for tests
    pub api_base: String,
}

/// Top-level service configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// SQLite database URL
    pub database_url: String,
    /// Platform base currency for intents that omit one
    pub currency: String,
    /// Stripe settings
    pub stripe: StripeSettings,
    /// Paysafe settings
    pub paysafe: PaysafeSettings,
}

impl ServerConfig {
    /// Load configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns a config error when `HTTP_PORT` is present but unparseable.
    /// Missing processor secrets are tolerated here; the lazy client
    /// initialization surfaces them on first use so that deployments which
    /// only serve one processor do not need both sets of credentials.
    pub fn from_env() -> AppResult<Self> {
        let http_port = match env::var("HTTP_PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|e| AppError::config(format!("invalid HTTP_PORT '{raw}': {e}")))?,
            Err(_) => DEFAULT_HTTP_PORT,
        };

        Ok(Self {
            http_port,
            database_url: env_or("DATABASE_URL", "sqlite:forma_payments.db"),
            currency: env_or("PLATFORM_CURRENCY", DEFAULT_CURRENCY),
            stripe: StripeSettings {
                secret_key: env_or("STRIPE_SECRET_KEY", ""),
                webhook_secret: env_or("STRIPE_WEBHOOK_SECRET", ""),
                api_base: valid_url("STRIPE_API_BASE", env_or("STRIPE_API_BASE", STRIPE_API_BASE))?,
                connect_refresh_url: valid_url(
                    "CONNECT_REFRESH_URL",
                    env_or(
                        "CONNECT_REFRESH_URL",
                        "https://app.forma.fit/settings/payments/refresh",
                    ),
                )?,
                connect_return_url: valid_url(
                    "CONNECT_RETURN_URL",
                    env_or(
                        "CONNECT_RETURN_URL",
                        "https://app.forma.fit/settings/payments/complete",
                    ),
                )?,
            },
            paysafe: PaysafeSettings {
                api_key: env_or("PAYSAFE_API_KEY", ""),
                account_id: env_or("PAYSAFE_ACCOUNT_ID", ""),
                api_base: valid_url(
                    "PAYSAFE_API_BASE",
                    env_or("PAYSAFE_API_BASE", PAYSAFE_API_BASE),
                )?,
            },
        })
    }
}

/// Reject unparseable URLs at startup instead of on the first remote call
fn valid_url(key: &str, value: String) -> AppResult<String> {
    Url::parse(&value).map_err(|e| AppError::config(format!("invalid {key} '{value}': {e}")))?;
    Ok(value)
}

/// Read an environment variable with a default fallback
fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
