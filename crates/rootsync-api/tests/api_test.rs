//! HTTP API tests.
//!
//! Drives the router in-process against the in-memory store and a scripted
//! ledger, checking status codes, payload shapes, and error mapping.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use std::{sync::Arc, time::Duration};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use rootsync_api::{create_router, AppState};
use rootsync_core::{storage::mock::MemoryAddressStore, TestClock};
use rootsync_publisher::{
    ledger::mock::{MockLedger, MockOutcome},
    PublishError, PublisherConfig, RetryPolicy, RootPublisher,
};
use rootsync_whitelist::WhitelistService;
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    ledger: MockLedger,
}

async fn test_app() -> TestApp {
    let ledger = MockLedger::new();
    let clock = Arc::new(TestClock::new());
    let publisher = RootPublisher::with_clock(
        Arc::new(ledger.clone()),
        PublisherConfig {
            attempt_timeout: Duration::from_secs(1),
            retry_policy: RetryPolicy { max_attempts: 2, jitter_factor: 0.0, ..RetryPolicy::default() },
        },
        clock.clone(),
    );
    let service = WhitelistService::load(Arc::new(MemoryAddressStore::new()), publisher)
        .await
        .expect("service should load");

    let state = AppState::new(Arc::new(service), clock);
    TestApp { router: create_router(state, Duration::from_secs(30)), ledger }
}

async fn send(app: &TestApp, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.expect("failed to make request");
    let status = response.status();
    assert!(response.headers().contains_key("x-request-id"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

#[tokio::test]
async fn add_list_and_prove() {
    let app = test_app().await;

    let (status, body) = send(&app, "POST", "/whitelist", Some(json!({ "address": "0xAA" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["addresses"], json!(["0xaa"]));
    assert_eq!(body["publication"]["status"], "confirmed");

    send(&app, "POST", "/whitelist", Some(json!({ "address": "0xbb" }))).await;

    let (status, list) = send(&app, "GET", "/whitelist", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["count"], 2);

    let (status, proof) = send(&app, "GET", "/whitelist/0xBB/proof", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(proof["address"], "0xbb");
    assert_eq!(proof["root"], list["root"]);

    let (status, verdict) = send(
        &app,
        "POST",
        "/proofs/verify",
        Some(json!({ "address": "0xbb", "proof": proof["proof"].clone() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verdict["valid"], true);

    let (_, verdict) = send(
        &app,
        "POST",
        "/proofs/verify",
        Some(json!({ "address": "0xaa", "proof": proof["proof"].clone() })),
    )
    .await;
    assert_eq!(verdict["valid"], false);
}

#[tokio::test]
async fn replace_and_remove() {
    let app = test_app().await;
    send(&app, "POST", "/whitelist", Some(json!({ "address": "0x01" }))).await;
    send(&app, "POST", "/whitelist", Some(json!({ "address": "0x02" }))).await;

    let (status, body) =
        send(&app, "PUT", "/whitelist/0x01", Some(json!({ "new_address": "0x03" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["addresses"], json!(["0x03", "0x02"]));

    let (status, body) = send(&app, "DELETE", "/whitelist/0x02", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["addresses"], json!(["0x03"]));

    let (status, _) = send(&app, "GET", "/whitelist/0x02/proof", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn errors_map_to_status_codes() {
    let app = test_app().await;
    send(&app, "POST", "/whitelist", Some(json!({ "address": "0xaa" }))).await;

    let (status, body) = send(&app, "POST", "/whitelist", Some(json!({ "address": "0xzz" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_address");

    let (status, body) = send(&app, "POST", "/whitelist", Some(json!({ "address": "0xAA" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "duplicate_address");

    let (status, body) = send(&app, "DELETE", "/whitelist/0xbb", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn divergence_reported_and_repaired() {
    let app = test_app().await;
    app.ledger.set_fallback(MockOutcome::Fail(PublishError::transient("node down")));

    let (status, body) = send(&app, "POST", "/whitelist", Some(json!({ "address": "0xaa" }))).await;
    assert_eq!(status, StatusCode::CREATED, "mutation succeeds despite ledger failure");
    assert_eq!(body["publication"]["status"], "diverged");
    assert_eq!(body["publication"]["category"], "transient");

    let (_, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(health["status"], "degraded");

    let (_, sync) = send(&app, "GET", "/sync", None).await;
    assert_eq!(sync["in_sync"], false);
    assert_eq!(sync["last_confirmed_root"], Value::Null);
    assert_eq!(sync["last_error_category"], "transient");

    let (status, body) = send(&app, "POST", "/sync/resync", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "ledger_unavailable");

    app.ledger.set_fallback(MockOutcome::Confirm);
    let (status, body) = send(&app, "POST", "/sync/resync", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["publication"]["status"], "confirmed");
    assert_eq!(body["status"]["in_sync"], true);

    let (_, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn rejected_root_maps_to_bad_gateway() {
    let app = test_app().await;
    app.ledger.set_fallback(MockOutcome::Fail(PublishError::permanent("caller is not the owner")));
    send(&app, "POST", "/whitelist", Some(json!({ "address": "0xaa" }))).await;

    let (status, body) = send(&app, "POST", "/sync/resync", None).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "ledger_rejected");
}

#[tokio::test]
async fn empty_whitelist_is_healthy() {
    let app = test_app().await;

    let (status, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");

    let (_, list) = send(&app, "GET", "/whitelist", None).await;
    assert_eq!(list["root"], format!("0x{}", "00".repeat(32)));
    assert_eq!(list["count"], 0);
}
