// ABOUTME: Integration tests for platform fee routing through the Stripe gateway
// ABOUTME: Fees attach only for complete Connect accounts with a positive fee
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

#![allow(clippy::unwrap_used)]

mod common;

use common::{connect_manager, seed_business, seed_user, test_store, MockStripeApi};
use forma_payments::connect::CreateConnectAccount;
use forma_payments::gateways::stripe::StripeGateway;
use forma_payments::gateways::{PaymentGateway, PaymentIntentRequest};
use forma_payments::models::{AccountKind, ProcessorKind};
use forma_payments::storage::{PaymentStore, SqlitePaymentStore};
use forma_payments::vault::CustomerVaultManager;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

struct Fixture {
    gateway: StripeGateway,
    stripe: Arc<MockStripeApi>,
    store: Arc<SqlitePaymentStore>,
    _db: TempDir,
}

async fn fixture() -> Fixture {
    let (store, _db) = test_store().await;
    let stripe = MockStripeApi::new();
    let connect = connect_manager(store.clone(), stripe.clone());
    let vault = Arc::new(CustomerVaultManager::new(store.clone(), stripe.clone()));
    let gateway = StripeGateway::new(stripe.clone(), vault, connect, "usd");
    Fixture {
        gateway,
        stripe,
        store,
        _db,
    }
}

/// Onboard a business and optionally complete its Connect account
async fn onboarded_business(fixture: &Fixture, complete: bool) -> Uuid {
    let business_id = seed_business(fixture.store.as_ref(), Some(ProcessorKind::Stripe)).await;
    let connect = connect_manager(fixture.store.clone(), fixture.stripe.clone());
    connect
        .create(
            business_id,
            CreateConnectAccount {
                account_kind: AccountKind::Express,
                country_code: "US".to_string(),
            },
        )
        .await
        .unwrap();
    if complete {
        let account = fixture
            .store
            .get_connect_account_by_business(business_id)
            .await
            .unwrap()
            .unwrap();
        fixture
            .stripe
            .set_account_flags(&account.remote_account_id, true, true, true);
        connect.sync_status(business_id).await.unwrap();
    }
    business_id
}

fn intent_for(business_id: Option<Uuid>, fee: Option<i64>) -> PaymentIntentRequest {
    PaymentIntentRequest {
        amount_cents: 4500,
        customer_id: Some("cus_member".to_string()),
        payment_method_id: Some("pm_visa".to_string()),
        currency: None,
        confirm: true,
        metadata: None,
        business_id,
        application_fee_cents: fee,
    }
}

#[tokio::test]
async fn complete_account_with_fee_routes_on_behalf_of_the_tenant() {
    let fixture = fixture().await;
    let business_id = onboarded_business(&fixture, true).await;

    let result = fixture
        .gateway
        .create_payment_intent(intent_for(Some(business_id), Some(500)))
        .await
        .unwrap();
    assert_eq!(result.status, "succeeded");

    let params = fixture.stripe.last_intent.lock().unwrap().clone().unwrap();
    assert_eq!(params.application_fee_amount, Some(500));
    assert!(params.stripe_account.is_some());
    assert_eq!(params.amount, 4500);
    assert_eq!(params.currency, "usd");
}

#[tokio::test]
async fn incomplete_account_charges_without_a_fee_split() {
    let fixture = fixture().await;
    let business_id = onboarded_business(&fixture, false).await;

    let result = fixture
        .gateway
        .create_payment_intent(intent_for(Some(business_id), Some(500)))
        .await
        .unwrap();

    // The charge still succeeds; only the split is dropped.
    assert_eq!(result.status, "succeeded");
    let params = fixture.stripe.last_intent.lock().unwrap().clone().unwrap();
    assert_eq!(params.application_fee_amount, None);
    assert_eq!(params.stripe_account, None);
}

#[tokio::test]
async fn zero_or_absent_fees_never_route() {
    let fixture = fixture().await;
    let business_id = onboarded_business(&fixture, true).await;

    for fee in [None, Some(0), Some(-100)] {
        fixture
            .gateway
            .create_payment_intent(intent_for(Some(business_id), fee))
            .await
            .unwrap();
        let params = fixture.stripe.last_intent.lock().unwrap().clone().unwrap();
        assert_eq!(params.application_fee_amount, None, "fee {fee:?}");
        assert_eq!(params.stripe_account, None, "fee {fee:?}");
    }
}

#[tokio::test]
async fn charges_without_a_tenant_run_in_the_platform_context() {
    let fixture = fixture().await;

    fixture
        .gateway
        .create_payment_intent(intent_for(None, Some(500)))
        .await
        .unwrap();
    let params = fixture.stripe.last_intent.lock().unwrap().clone().unwrap();
    assert_eq!(params.application_fee_amount, None);
    assert_eq!(params.stripe_account, None);
}

#[tokio::test]
async fn explicit_currency_overrides_the_platform_default() {
    let fixture = fixture().await;

    let mut request = intent_for(None, None);
    request.currency = Some("cad".to_string());
    fixture.gateway.create_payment_intent(request).await.unwrap();

    let params = fixture.stripe.last_intent.lock().unwrap().clone().unwrap();
    assert_eq!(params.currency, "cad");
}

#[tokio::test]
async fn customer_resolution_flows_through_the_vault() {
    let fixture = fixture().await;
    let user = seed_user(fixture.store.as_ref()).await;

    let first = fixture
        .gateway
        .create_or_get_customer(&user, None)
        .await
        .unwrap();
    let second = fixture
        .gateway
        .create_or_get_customer(&user, None)
        .await
        .unwrap();
    assert_eq!(first.customer_id, second.customer_id);
    assert!(first.customer_id.starts_with("cus_"));
}

#[tokio::test]
async fn card_info_is_best_effort() {
    let fixture = fixture().await;

    fixture.stripe.insert_card("pm_visa", None, "4242");
    let info = fixture
        .gateway
        .card_info_from_payment_method("pm_visa", None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(info.last4, "4242");
    assert_eq!(info.brand.as_deref(), Some("visa"));
}
