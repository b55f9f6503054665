// ABOUTME: Main library entry point for the Forma payments service
// ABOUTME: Payment routing, processor account lifecycle, and customer vault for a multi-tenant gym SaaS
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

#![deny(unsafe_code)]

//! # Forma Payments
//!
//! The payment-routing and processor-account-lifecycle subsystem of the
//! Forma fitness platform. Every tenant ("business") runs its own billing
//! relationship with an external card-payment processor; this crate:
//!
//! - resolves the right [`gateways::PaymentGateway`] for a tenant and
//!   exposes one uniform contract over heterogeneous processors,
//! - manages the onboarding/disconnection lifecycle of marketplace
//!   sub-accounts so the platform can take a commission on charges
//!   processed on a tenant's behalf ([`connect`]),
//! - keeps a local cache of remote customer state reconciled with the
//!   processor's source of truth ([`vault`]),
//! - verifies and dispatches inbound processor webhooks ([`webhook`]).
//!
//! It is a thin but failure-aware orchestration layer: no ledger
//! accounting, no currency conversion, no dispute handling. Amounts are
//! always integer minor units.

/// Environment-based service configuration
pub mod config;

/// Connect account manager: marketplace sub-account lifecycle
pub mod connect;

/// Unified error handling
pub mod errors;

/// Payment gateway contract, implementations, registry, and resolver
pub mod gateways;

/// Structured logging setup
pub mod logging;

/// Domain models and value objects
pub mod models;

/// HTTP routes and server wiring
pub mod routes;

/// Persistence abstraction and SQLite backend
pub mod storage;

/// Customer vault manager
pub mod vault;

/// Webhook verification and dispatch
pub mod webhook;
