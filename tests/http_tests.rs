mod common;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use common::{Fault, FaultyStore, committed, seeded_store};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wallet_service::application::WalletService;
use wallet_service::domain::account::AccountId;
use wallet_service::domain::ports::SharedAccountStore;
use wallet_service::infrastructure::in_memory::InMemoryAccountStore;
use wallet_service::interfaces::http::{AppState, router};

fn app_with(store: SharedAccountStore, timeout: Duration) -> Router {
    router(AppState::new(WalletService::new(store), timeout))
}

async fn seeded_app(accounts: &[(i64, Decimal)]) -> (Router, Arc<InMemoryAccountStore>) {
    let store = seeded_store(accounts).await;
    (app_with(store.clone(), Duration::from_secs(5)), store)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _store) = seeded_app(&[]).await;
    let (status, _) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_get_balance() {
    let (app, _store) = seeded_app(&[(1, dec!(100.00))]).await;

    let (status, body) = send(app, get("/balance?user_id=1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], 1);
    assert_eq!(body["balance"].as_f64(), Some(100.0));
}

#[tokio::test]
async fn test_get_balance_unknown_user() {
    let (app, _store) = seeded_app(&[(1, dec!(100.00))]).await;

    let (status, body) = send(app, get("/balance?user_id=2")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "account_not_found");
}

#[tokio::test]
async fn test_get_balance_requires_numeric_user_id() {
    for uri in ["/balance", "/balance?user_id=abc"] {
        let (app, _store) = seeded_app(&[(1, dec!(100.00))]).await;
        let (status, body) = send(app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], "invalid_request");
    }
}

#[tokio::test]
async fn test_withdraw_success() {
    let (app, store) = seeded_app(&[(1, dec!(100.00))]).await;

    let (status, body) = send(
        app,
        post_json("/withdraw", json!({"user_id": 1, "amount": 50.0})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["new_balance"].as_f64(), Some(50.0));
    assert_eq!(committed(&store, 1).await, dec!(50.00));
}

#[tokio::test]
async fn test_withdraw_fractional_amount() {
    let (app, store) = seeded_app(&[(1, dec!(100.00))]).await;

    let (status, body) = send(
        app,
        post_json("/withdraw", json!({"user_id": 1, "amount": 0.01})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_balance"].as_f64(), Some(99.99));
    assert_eq!(committed(&store, 1).await, dec!(99.99));
}

#[tokio::test]
async fn test_withdraw_rejections() {
    let cases = [
        (json!({"user_id": 1, "amount": -10}), StatusCode::BAD_REQUEST, "invalid_amount"),
        (json!({"user_id": 1, "amount": 0}), StatusCode::BAD_REQUEST, "invalid_amount"),
        (json!({"user_id": 1, "amount": 200}), StatusCode::BAD_REQUEST, "insufficient_funds"),
        (json!({"user_id": 9, "amount": 1}), StatusCode::NOT_FOUND, "account_not_found"),
        (json!({"user_id": 1}), StatusCode::BAD_REQUEST, "invalid_request"),
        (json!({"amount": 10}), StatusCode::BAD_REQUEST, "invalid_request"),
    ];

    for (payload, expected_status, expected_code) in cases {
        let (app, store) = seeded_app(&[(1, dec!(100.00))]).await;
        let (status, body) = send(app, post_json("/withdraw", payload.clone())).await;

        assert_eq!(status, expected_status, "{payload}");
        assert_eq!(body["error"], expected_code, "{payload}");
        assert_eq!(committed(&store, 1).await, dec!(100.00));
    }
}

#[tokio::test]
async fn test_withdraw_malformed_body() {
    let (app, _store) = seeded_app(&[(1, dec!(100.00))]).await;

    let request = Request::builder()
        .method("POST")
        .uri("/withdraw")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn test_storage_failure_is_internal_error() {
    let inner = seeded_store(&[(1, dec!(100.00))]).await;
    let app = app_with(
        Arc::new(FaultyStore::new(inner.clone(), Fault::Write)),
        Duration::from_secs(5),
    );

    let (status, body) = send(
        app,
        post_json("/withdraw", json!({"user_id": 1, "amount": 10})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal_error");
    // Backend details are not exposed to clients.
    assert!(!body["message"].as_str().unwrap().contains("injected"));
    assert_eq!(committed(&inner, 1).await, dec!(100.00));
}

#[tokio::test]
async fn test_withdraw_timeout_rolls_back() {
    let inner = seeded_store(&[(1, dec!(100.00))]).await;
    let app = app_with(
        Arc::new(FaultyStore::new(inner.clone(), Fault::StallOnWrite)),
        Duration::from_millis(50),
    );

    let (status, body) = send(
        app,
        post_json("/withdraw", json!({"user_id": 1, "amount": 10})),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "timeout");
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("outcome is unknown"), "{message}");
    assert!(message.contains("re-check the balance"), "{message}");
    assert_eq!(committed(&inner, 1).await, dec!(100.00));

    let retried = tokio::time::timeout(
        Duration::from_secs(1),
        WalletService::new(inner.clone()).withdraw(AccountId(1), dec!(10)),
    )
    .await
    .expect("timed-out request kept its row lock");
    assert_eq!(retried.unwrap().value(), dec!(90));
}
