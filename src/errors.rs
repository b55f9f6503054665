// ABOUTME: Unified error handling for the Forma payments service
// ABOUTME: Defines error codes, the AppError type, and HTTP response formatting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

//! # Unified Error Handling
//!
//! Central error types for the payment-routing core. Every module surfaces
//! failures as [`AppError`] carrying a stable [`ErrorCode`] so the HTTP layer
//! can map them to consistent status codes and response bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Standard error codes used throughout the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Configuration (1000-1999)
    #[serde(rename = "NOT_CONFIGURED")]
    NotConfigured = 1000,
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError = 1001,

    // Validation (2000-2999)
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 2000,
    #[serde(rename = "INVALID_WEBHOOK")]
    InvalidWebhook = 2001,

    // Resource management (3000-3999)
    #[serde(rename = "NOT_FOUND")]
    NotFound = 3000,
    #[serde(rename = "ALREADY_EXISTS")]
    AlreadyExists = 3001,
    #[serde(rename = "OWNERSHIP_MISMATCH")]
    OwnershipMismatch = 3002,

    // External processors (4000-4999)
    #[serde(rename = "REMOTE_UNAVAILABLE")]
    RemoteUnavailable = 4000,

    // Internal (9000-9999)
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError = 9001,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidInput | Self::InvalidWebhook | Self::NotConfigured => {
                StatusCode::BAD_REQUEST
            }
            Self::OwnershipMismatch => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AlreadyExists => StatusCode::CONFLICT,
            Self::RemoteUnavailable => StatusCode::BAD_GATEWAY,
            Self::ConfigError | Self::InternalError | Self::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Human-readable description of the error class
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotConfigured => "Payment processor not configured",
            Self::ConfigError => "Configuration error",
            Self::InvalidInput => "Invalid input",
            Self::InvalidWebhook => "Webhook verification failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::OwnershipMismatch => "Resource belongs to a different owner",
            Self::RemoteUnavailable => "Payment processor unavailable",
            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
        }
    }
}

/// Application error type carrying a stable code and a user-facing message
#[derive(Debug, Error)]
#[error("{}: {}", .code.description(), .message)]
pub struct AppError {
    /// Stable error classification
    pub code: ErrorCode,
    /// User-facing message
    pub message: String,
    /// Machine-readable error code from the remote processor, when it
    /// supplied one (e.g. Stripe's `resource_missing`)
    pub remote_code: Option<String>,
    /// Optional source error for chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new error with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            remote_code: None,
            source: None,
        }
    }

    /// Attach a source error for chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Attach the processor's machine-readable error code
    #[must_use]
    pub fn with_remote_code(mut self, remote_code: impl Into<String>) -> Self {
        self.remote_code = Some(remote_code.into());
        self
    }

    /// Whether the remote processor classified this failure with the
    /// given code
    #[must_use]
    pub fn remote_code_is(&self, remote_code: &str) -> bool {
        self.remote_code.as_deref() == Some(remote_code)
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    /// Tenant has no business record or no processor reference
    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotConfigured, message)
    }

    /// Duplicate resource creation attempt
    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AlreadyExists, message)
    }

    /// Missing Connect account, customer, or payment method
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::NotFound,
            format!("Resource not found: {}", resource.into()),
        )
    }

    /// Payment method does not belong to the resolved customer
    pub fn ownership_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::OwnershipMismatch, message)
    }

    /// A remote processor API call failed
    pub fn remote_unavailable(operation: &str, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::RemoteUnavailable,
            format!("{operation} failed: {}", message.into()),
        )
    }

    /// Inbound webhook is missing or carries an unverifiable signature
    pub fn invalid_webhook(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidWebhook, message)
    }

    /// Request validation failure
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Service misconfiguration (missing secrets, bad URLs)
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Local persistence failure
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Unexpected internal failure
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::database(err.to_string())
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// HTTP error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error payload
    pub error: ErrorResponseDetails,
}

/// Body of an HTTP error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseDetails {
    /// Stable error code
    pub code: ErrorCode,
    /// User-facing message
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(error: &AppError) -> Self {
        Self {
            error: ErrorResponseDetails {
                code: error.code,
                message: error.message.clone(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let body = ErrorResponse::from(&self);
        (status, Json(body)).into_response()
    }
}
