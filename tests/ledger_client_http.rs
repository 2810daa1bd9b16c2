//! tests/ledger_client_http.rs
//!
//! `HttpLedgerClient` against a mocked ledger REST API.

use httpmock::{Method, MockServer};
use serde_json::json;

use hd_hot_wallet::blockchain::{HttpLedgerClient, LedgerClient};
use hd_hot_wallet::core::amount::Amount;
use hd_hot_wallet::core::config::LedgerConfig;
use hd_hot_wallet::core::errors::WalletError;
use hd_hot_wallet::core::wallet_info::SignedTransaction;

fn client(server: &MockServer) -> HttpLedgerClient {
    let config = LedgerConfig {
        base_url: server.base_url(),
        api_version: "v1".into(),
        timeout_secs: 5,
    };
    HttpLedgerClient::new(&config).unwrap()
}

fn signed() -> SignedTransaction {
    SignedTransaction {
        signature: "ab".repeat(64),
        from: "Hfrom".into(),
        to: "Hto".into(),
        amount: "1.5".into(),
        fee: "0.001".into(),
        nonce: 7,
        recovery: 1,
    }
}

#[tokio::test]
async fn snapshot_parses_balance_nonce_and_pendings() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(Method::GET).path("/api/v1/address/Habc");
        then.status(200).json_body(json!({
            "hash": "Habc",
            "balance": "100",
            "nonce": 4,
            "pendings": [{ "amount": "10", "fee": "1", "nonce": 5 }]
        }));
    });

    let snapshot = client(&server).address_snapshot("Habc").await.unwrap();
    mock.assert();
    assert_eq!(snapshot.balance, "100".parse::<Amount>().unwrap());
    assert_eq!(snapshot.confirmed_nonce, 4);
    assert_eq!(snapshot.pending.len(), 1);
    assert_eq!(snapshot.pending[0].nonce, 5);
}

#[tokio::test]
async fn broadcast_posts_signed_body_and_returns_hash() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(Method::POST).path("/api/v1/tx").json_body(json!({
            "signature": "ab".repeat(64),
            "from": "Hfrom",
            "to": "Hto",
            "amount": "1.5",
            "fee": "0.001",
            "nonce": 7,
            "recovery": 1
        }));
        then.status(200).json_body(json!({ "txHash": "deadbeef" }));
    });

    let hash = client(&server).broadcast(&signed()).await.unwrap();
    mock.assert();
    assert_eq!(hash, "deadbeef");
}

#[tokio::test]
async fn broadcast_error_envelope_is_submission_failure() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(Method::POST).path("/api/v1/tx");
        then.status(400).json_body(json!({
            "status": 400,
            "timestamp": 1_700_000_000,
            "error": "Bad Request",
            "message": "nonce too low"
        }));
    });

    match client(&server).broadcast(&signed()).await {
        Err(WalletError::SubmissionFailed(message)) => assert_eq!(message, "nonce too low"),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn transaction_lookup() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(Method::GET).path("/api/v1/tx/deadbeef");
        then.status(200).json_body(json!({
            "hash": "deadbeef",
            "from": "Hfrom",
            "amount": "1.5",
            "blockHash": "0011"
        }));
    });

    let info = client(&server).transaction("deadbeef").await.unwrap();
    assert_eq!(info.hash, "deadbeef");
    assert!(info.is_confirmed());
    assert_eq!(info.to, None);
}

#[tokio::test]
async fn missing_address_is_network_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(Method::GET).path("/api/v1/address/Hnone");
        then.status(404).json_body(json!({ "status": 404, "error": "Not Found", "message": "unknown address" }));
    });

    let result = client(&server).address_snapshot("Hnone").await;
    assert!(matches!(result, Err(WalletError::NetworkError(_))));
}
