// ABOUTME: Integration tests for the SQLite payment store
// ABOUTME: Row round-trips, uniqueness backstops, and upsert-overwrite semantics
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

#![allow(clippy::unwrap_used)]

mod common;

use chrono::Utc;
use common::{seed_business, seed_user, test_store};
use forma_payments::models::{
    AccountKind, ConnectAccount, CustomerRecord, CustomerStatus, ProcessorKind,
};
use forma_payments::storage::PaymentStore;
use uuid::Uuid;

fn connect_account(business_id: Uuid, remote_account_id: &str) -> ConnectAccount {
    let now = Utc::now();
    ConnectAccount {
        id: Uuid::new_v4(),
        remote_account_id: remote_account_id.to_string(),
        account_kind: AccountKind::Express,
        country_code: "US".to_string(),
        contact_email: "billing@gym.example".to_string(),
        charges_enabled: false,
        details_submitted: false,
        payouts_enabled: false,
        business_id,
        created_at: now,
        updated_at: now,
    }
}

fn customer_record(user_id: Uuid, remote_customer_id: &str) -> CustomerRecord {
    let now = Utc::now();
    CustomerRecord {
        id: Uuid::new_v4(),
        remote_customer_id: remote_customer_id.to_string(),
        user_id,
        email: "member@forma.fit".to_string(),
        display_name: Some("Jordan Reyes".to_string()),
        country_code: Some("US".to_string()),
        status: CustomerStatus::Active,
        remote_created_at: Some(now),
        metadata: serde_json::json!({ "forma_user_id": user_id.to_string() }),
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn connect_accounts_round_trip_with_both_lookups() {
    let (store, _db) = test_store().await;
    let business_id = seed_business(store.as_ref(), Some(ProcessorKind::Stripe)).await;

    let account = connect_account(business_id, "acct_rt");
    store.insert_connect_account(&account).await.unwrap();

    let by_business = store
        .get_connect_account_by_business(business_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_business.id, account.id);
    assert_eq!(by_business.account_kind, AccountKind::Express);
    assert_eq!(by_business.country_code, "US");

    let by_remote = store
        .get_connect_account_by_remote_id("acct_rt")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_remote.id, account.id);

    store
        .update_connect_account_flags(account.id, true, true, false)
        .await
        .unwrap();
    let refreshed = store
        .get_connect_account_by_business(business_id)
        .await
        .unwrap()
        .unwrap();
    assert!(refreshed.is_complete());
    assert!(!refreshed.payouts_enabled);
}

#[tokio::test]
async fn one_connect_account_per_business_is_enforced() {
    let (store, _db) = test_store().await;
    let business_id = seed_business(store.as_ref(), Some(ProcessorKind::Stripe)).await;

    store
        .insert_connect_account(&connect_account(business_id, "acct_first"))
        .await
        .unwrap();

    // The UNIQUE constraint is the backstop behind the manager's pre-check
    let result = store
        .insert_connect_account(&connect_account(business_id, "acct_second"))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn customer_records_upsert_by_user() {
    let (store, _db) = test_store().await;
    let user = seed_user(store.as_ref()).await;

    store
        .upsert_customer_record(&customer_record(user.id, "cus_old"))
        .await
        .unwrap();

    // Recreation after out-of-band deletion overwrites rather than duplicating
    let replacement = customer_record(user.id, "cus_new");
    store.upsert_customer_record(&replacement).await.unwrap();

    let stored = store
        .get_customer_record_by_user(user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.remote_customer_id, "cus_new");
    assert_eq!(stored.status, CustomerStatus::Active);
    assert_eq!(
        stored.metadata.get("forma_user_id").and_then(|v| v.as_str()),
        Some(user.id.to_string().as_str())
    );
}

#[tokio::test]
async fn processor_config_lookup_follows_the_business_reference() {
    let (store, _db) = test_store().await;
    let configured = seed_business(store.as_ref(), Some(ProcessorKind::Paysafe)).await;
    let unconfigured = seed_business(store.as_ref(), None).await;

    let config = store
        .get_processor_config_for_business(configured)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(config.kind, ProcessorKind::Paysafe);
    assert!(config.enabled);

    assert!(store
        .get_processor_config_for_business(unconfigured)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn business_back_reference_can_be_set_and_cleared() {
    let (store, _db) = test_store().await;
    let business_id = seed_business(store.as_ref(), Some(ProcessorKind::Stripe)).await;
    let account = connect_account(business_id, "acct_ref");
    store.insert_connect_account(&account).await.unwrap();

    store
        .set_business_connect_account(business_id, Some(account.id))
        .await
        .unwrap();
    let business = store.get_business(business_id).await.unwrap().unwrap();
    assert_eq!(business.connect_account_id, Some(account.id));

    store
        .set_business_connect_account(business_id, None)
        .await
        .unwrap();
    let business = store.get_business(business_id).await.unwrap().unwrap();
    assert_eq!(business.connect_account_id, None);
}
