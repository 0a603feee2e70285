//! Integration tests for the JSON-RPC ledger client.
//!
//! Runs the client against a wiremock node to check the transaction it
//! sends, receipt polling, and how each failure mode is classified.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::{sync::Arc, time::Duration};

use rootsync_core::{Root, TestClock};
use rootsync_publisher::{
    client::set_root_calldata, JsonRpcLedger, Ledger, LedgerConfig, PublishError, PublisherConfig,
    RetryPolicy, RootPublisher,
};
use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, method},
    Mock, MockServer, ResponseTemplate,
};

const TX_HASH: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

fn ledger_config(server: &MockServer) -> LedgerConfig {
    LedgerConfig {
        rpc_url: server.uri(),
        contract_address: format!("0x{}", "c0".repeat(20)),
        signer_address: format!("0x{}", "5e".repeat(20)),
        request_timeout: Duration::from_millis(500),
        receipt_poll_interval: Duration::from_millis(10),
        receipt_timeout: Duration::from_secs(2),
    }
}

fn rpc_result(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
}

fn rpc_error(code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": { "code": code, "message": message }
    }))
}

async fn mock_send(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_sendTransaction" })))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mock_receipt(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_getTransactionReceipt" })))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn publishes_root_and_waits_for_receipt() {
    let server = MockServer::start().await;
    let root = Root([0x42; 32]);

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "eth_sendTransaction",
            "params": [{
                "from": format!("0x{}", "5e".repeat(20)),
                "to": format!("0x{}", "c0".repeat(20)),
                "data": set_root_calldata(&root),
            }]
        })))
        .respond_with(rpc_result(json!(TX_HASH)))
        .expect(1)
        .mount(&server)
        .await;

    // First poll: not mined yet. Afterwards: mined successfully.
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_getTransactionReceipt", "params": [TX_HASH] })))
        .respond_with(rpc_result(serde_json::Value::Null))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mock_receipt(&server, rpc_result(json!({ "transactionHash": TX_HASH, "status": "0x1" }))).await;

    let ledger = JsonRpcLedger::new(ledger_config(&server)).expect("valid config");
    let confirmation = ledger.set_root(root).await.expect("root should be published");

    assert_eq!(confirmation.root, root);
    assert_eq!(confirmation.confirmation_id, TX_HASH);
}

#[tokio::test]
async fn reverted_receipt_is_permanent() {
    let server = MockServer::start().await;
    mock_send(&server, rpc_result(json!(TX_HASH))).await;
    mock_receipt(&server, rpc_result(json!({ "transactionHash": TX_HASH, "status": "0x0" }))).await;

    let ledger = JsonRpcLedger::new(ledger_config(&server)).unwrap();
    let err = ledger.set_root(Root([1; 32])).await.unwrap_err();

    assert!(matches!(err, PublishError::PermanentFailure { .. }), "got {err:?}");
}

#[tokio::test]
async fn execution_reverted_rpc_error_is_permanent() {
    let server = MockServer::start().await;
    mock_send(&server, rpc_error(3, "execution reverted: caller is not the owner")).await;

    let ledger = JsonRpcLedger::new(ledger_config(&server)).unwrap();
    let err = ledger.set_root(Root([1; 32])).await.unwrap_err();

    assert!(!err.is_retryable());
    assert!(err.to_string().contains("caller is not the owner"));
}

#[tokio::test]
async fn server_errors_and_rate_limits_are_transient() {
    for status in [500, 502, 503, 429] {
        let server = MockServer::start().await;
        mock_send(&server, ResponseTemplate::new(status)).await;

        let ledger = JsonRpcLedger::new(ledger_config(&server)).unwrap();
        let err = ledger.set_root(Root([1; 32])).await.unwrap_err();

        assert!(
            matches!(err, PublishError::TransientFailure { .. }),
            "HTTP {status} should be transient, got {err:?}"
        );
    }
}

#[tokio::test]
async fn client_errors_are_permanent() {
    let server = MockServer::start().await;
    mock_send(&server, ResponseTemplate::new(401)).await;

    let ledger = JsonRpcLedger::new(ledger_config(&server)).unwrap();
    let err = ledger.set_root(Root([1; 32])).await.unwrap_err();

    assert!(matches!(err, PublishError::PermanentFailure { .. }), "got {err:?}");
}

#[tokio::test]
async fn slow_node_times_out() {
    let server = MockServer::start().await;
    mock_send(&server, rpc_result(json!(TX_HASH)).set_delay(Duration::from_secs(2))).await;

    let ledger = JsonRpcLedger::new(ledger_config(&server)).unwrap();
    let err = ledger.set_root(Root([1; 32])).await.unwrap_err();

    assert!(matches!(err, PublishError::Timeout { .. }), "got {err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unmined_transaction_times_out() {
    let server = MockServer::start().await;
    mock_send(&server, rpc_result(json!(TX_HASH))).await;
    mock_receipt(&server, rpc_result(serde_json::Value::Null)).await;

    let config = LedgerConfig { receipt_timeout: Duration::from_millis(100), ..ledger_config(&server) };
    let ledger = JsonRpcLedger::new(config).unwrap();
    let err = ledger.set_root(Root([1; 32])).await.unwrap_err();

    assert!(matches!(err, PublishError::Timeout { timeout_ms: 100 }), "got {err:?}");
}

#[tokio::test]
async fn unreachable_node_is_transient() {
    let config = LedgerConfig {
        rpc_url: "http://127.0.0.1:1".to_string(),
        contract_address: format!("0x{}", "c0".repeat(20)),
        signer_address: format!("0x{}", "5e".repeat(20)),
        request_timeout: Duration::from_millis(500),
        ..LedgerConfig::default()
    };
    let ledger = JsonRpcLedger::new(config).unwrap();

    let err = ledger.set_root(Root([1; 32])).await.unwrap_err();
    assert!(err.is_retryable(), "got {err:?}");
}

#[tokio::test]
async fn publisher_recovers_after_outage() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_sendTransaction" })))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    mock_send(&server, rpc_result(json!(TX_HASH))).await;
    mock_receipt(&server, rpc_result(json!({ "status": "0x1" }))).await;

    let ledger = JsonRpcLedger::new(ledger_config(&server)).unwrap();
    let clock = TestClock::new();
    let publisher = RootPublisher::with_clock(
        Arc::new(ledger),
        PublisherConfig {
            attempt_timeout: Duration::from_secs(5),
            retry_policy: RetryPolicy { max_attempts: 5, jitter_factor: 0.0, ..RetryPolicy::default() },
        },
        Arc::new(clock.clone()),
    );

    let receipt = publisher.publish(Root([9; 32])).await.expect("publisher should retry through 503s");

    assert_eq!(receipt.attempts, 3);
    assert_eq!(receipt.confirmation_id, TX_HASH);
    assert_eq!(clock.total_slept(), Duration::from_secs(3));
}
