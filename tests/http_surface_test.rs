// ABOUTME: Integration tests for the assembled HTTP surface
// ABOUTME: Routing, header validation, error mapping, and environment configuration
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Forma Fitness Platform

#![allow(clippy::unwrap_used)]

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::{seed_business, seed_user, test_store, MockStripeApi};
use forma_payments::config::{PaysafeSettings, ServerConfig, StripeSettings};
use forma_payments::models::ProcessorKind;
use forma_payments::routes::ServerResources;
use forma_payments::webhook::sign_payload;
use http_body_util::BodyExt;
use serial_test::serial;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

const WEBHOOK_SECRET: &str = "whsec_router_test";

fn test_config() -> ServerConfig {
    ServerConfig {
        http_port: 0,
        database_url: "sqlite::memory:".to_string(),
        currency: "usd".to_string(),
        stripe: StripeSettings {
            secret_key: "sk_test".to_string(),
            webhook_secret: WEBHOOK_SECRET.to_string(),
            api_base: "https://api.stripe.test/v1".to_string(),
            connect_refresh_url: "https://app.forma.test/payments/refresh".to_string(),
            connect_return_url: "https://app.forma.test/payments/complete".to_string(),
        },
        paysafe: PaysafeSettings {
            api_key: String::new(),
            account_id: "acct-1001".to_string(),
            api_base: "https://api.paysafe.test/v1".to_string(),
        },
    }
}

struct Fixture {
    router: Router,
    store: Arc<forma_payments::storage::SqlitePaymentStore>,
    _db: TempDir,
}

async fn fixture() -> Fixture {
    let (store, _db) = test_store().await;
    let stripe = MockStripeApi::new();
    let resources = Arc::new(ServerResources::with_stripe_api(
        test_config(),
        store.clone(),
        stripe,
    ));
    Fixture {
        router: resources.router(),
        store,
        _db,
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let fixture = fixture().await;
    let response = fixture
        .router
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn webhook_without_a_signature_is_a_bad_request() {
    let fixture = fixture().await;
    let response = fixture
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/payments/webhook")
                .body(Body::from(r#"{"id":"evt_1","type":"x","data":{"object":{}}}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn signed_webhooks_round_trip_through_the_router() {
    let fixture = fixture().await;
    let payload =
        serde_json::to_vec(&serde_json::json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": { "object": { "id": "pi_1" } },
        }))
        .unwrap();
    let signature = sign_payload(WEBHOOK_SECRET, 1_700_000_000, &payload);

    let response = fixture
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/payments/webhook")
                .header("signature", signature)
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["received"], true);
}

#[tokio::test]
async fn tenant_routes_require_the_business_header() {
    let fixture = fixture().await;
    let response = fixture
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/connect/accounts")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"account_kind":"express","country_code":"US"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn connect_onboarding_flows_through_the_http_surface() {
    let fixture = fixture().await;
    let business_id =
        seed_business(fixture.store.as_ref(), Some(ProcessorKind::Stripe)).await;

    let response = fixture
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/connect/accounts")
                .header("content-type", "application/json")
                .header("x-business-id", business_id.to_string())
                .body(Body::from(
                    r#"{"account_kind":"express","country_code":"US"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert!(body["onboarding_url"]
        .as_str()
        .unwrap()
        .starts_with("https://connect.stripe.test/"));

    // A second attempt maps AlreadyExists to 409
    let response = fixture
        .router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/connect/accounts")
                .header("content-type", "application/json")
                .header("x-business-id", business_id.to_string())
                .body(Body::from(
                    r#"{"account_kind":"express","country_code":"US"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_members_get_a_404() {
    let fixture = fixture().await;
    let response = fixture
        .router
        .oneshot(
            Request::builder()
                .uri("/customers/me")
                .header("x-user-id", Uuid::new_v4().to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn members_resolve_their_customer_record() {
    let fixture = fixture().await;
    let user = seed_user(fixture.store.as_ref()).await;

    let response = fixture
        .router
        .oneshot(
            Request::builder()
                .uri("/customers/me")
                .header("x-user-id", user.id.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["email"], user.email);
    assert!(body["remote_customer_id"]
        .as_str()
        .unwrap()
        .starts_with("cus_"));
}

#[tokio::test]
#[serial]
async fn environment_overrides_apply() {
    std::env::set_var("HTTP_PORT", "9099");
    std::env::set_var("PLATFORM_CURRENCY", "cad");
    let config = ServerConfig::from_env().unwrap();
    assert_eq!(config.http_port, 9099);
    assert_eq!(config.currency, "cad");

    std::env::set_var("HTTP_PORT", "not-a-port");
    assert!(ServerConfig::from_env().is_err());

    std::env::remove_var("HTTP_PORT");
    std::env::remove_var("PLATFORM_CURRENCY");
    let config = ServerConfig::from_env().unwrap();
    assert_eq!(config.http_port, 8081);
}
