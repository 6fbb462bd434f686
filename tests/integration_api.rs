//! API Integration Tests

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use depositaja::api::{self, AppState};
use depositaja::codec::{Codec, FlagEventCodec};
use depositaja::emitter::Emitter;
use depositaja::event_log::{partition_for, EventLog};
use depositaja::handlers::{CheckHandler, DepositHandler};
use depositaja::view::View;
use depositaja::{Direction, FlagEvent, DEPOSIT_STREAM, FLAG_STREAM};

mod common;

use common::{eventually, FailingLog, Pipeline, PARTITIONS};

fn post_deposit(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/deposit")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn check(app: &Router, wallet_id: &str) -> Value {
    let request = Request::builder()
        .uri(format!("/check/{}", wallet_id))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

async fn deposit(app: &Router, wallet_id: &str, amount: f64) {
    let body = json!({ "wallet_id": wallet_id, "amount": amount }).to_string();
    let (status, body) = send(app, post_deposit(body)).await;
    assert_eq!(status, StatusCode::OK, "deposit failed: {:?}", String::from_utf8_lossy(&body));
    assert!(body.is_empty());
}

async fn balance_becomes(app: &Router, wallet_id: &str, expected: Value) -> bool {
    eventually(|| {
        let expected = expected.clone();
        async move { check(app, wallet_id).await == expected }
    })
    .await
}

#[tokio::test]
async fn test_health() {
    let pipeline = Pipeline::start().await;
    let app = pipeline.app(Direction::Deposit).await;

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
    pipeline.stop().await;
}

#[tokio::test]
async fn test_deposit_then_check_e2e() {
    let pipeline = Pipeline::start().await;
    let app = pipeline.app(Direction::Deposit).await;

    deposit(&app, "w1", 100.0).await;

    let expected = json!({ "wallet_id": "w1", "balance": 100.0, "above_threshold": false });
    assert!(balance_becomes(&app, "w1", expected).await, "balance never reached 100");
    pipeline.stop().await;
}

#[tokio::test]
async fn test_withdraw_service_reduces_balance() {
    let pipeline = Pipeline::start().await;
    let deposits = pipeline.app(Direction::Deposit).await;
    let withdrawals = pipeline.app(Direction::Withdraw).await;

    deposit(&deposits, "w1", 100.0).await;
    deposit(&deposits, "w1", 50.0).await;
    deposit(&withdrawals, "w1", 30.0).await;

    let expected = json!({ "wallet_id": "w1", "balance": 120.0, "above_threshold": false });
    assert!(balance_becomes(&deposits, "w1", expected).await, "balance never reached 120");
    pipeline.stop().await;
}

#[tokio::test]
async fn test_rejected_deposits_emit_nothing() {
    let pipeline = Pipeline::start().await;
    let app = pipeline.app(Direction::Deposit).await;

    let bodies = [
        json!({ "wallet_id": "w1", "amount": 0 }).to_string(),
        json!({ "wallet_id": "w1", "amount": -5 }).to_string(),
        json!({ "wallet_id": "w1" }).to_string(),
        json!({ "wallet_id": "w1", "amount": "ten" }).to_string(),
        "not json".to_string(),
        String::new(),
    ];

    for body in bodies {
        let (status, response) = send(&app, post_deposit(body.clone())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "body {:?}", body);

        let error: Value = serde_json::from_slice(&response).unwrap();
        assert!(error["error"].as_str().is_some_and(|e| !e.is_empty()));
    }

    for partition in 0..PARTITIONS {
        assert_eq!(pipeline.log.end_offset(DEPOSIT_STREAM, partition).await.unwrap(), 0);
    }
    pipeline.stop().await;
}

#[tokio::test]
async fn test_non_positive_amount_error_body() {
    let pipeline = Pipeline::start().await;
    let app = pipeline.app(Direction::Deposit).await;

    let body = json!({ "wallet_id": "w1", "amount": 0 }).to_string();
    let (status, response) = send(&app, post_deposit(body)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let error: Value = serde_json::from_slice(&response).unwrap();
    assert_eq!(error["error"], "amount must be more than 0");
    assert_eq!(error["error_code"], "invalid_amount");
    pipeline.stop().await;
}

#[tokio::test]
async fn test_body_parsed_without_content_type() {
    let pipeline = Pipeline::start().await;
    let app = pipeline.app(Direction::Deposit).await;

    let request = Request::builder()
        .method("POST")
        .uri("/deposit")
        .body(Body::from(r#"{"wallet_id":"w2","amount":5}"#))
        .unwrap();
    let (status, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    pipeline.stop().await;
}

#[tokio::test]
async fn test_emit_failure_is_server_error() {
    let log = Arc::new(FailingLog);
    let emitter = Emitter::new(log.clone(), DEPOSIT_STREAM, PARTITIONS).await.unwrap();
    let app = api::build_router(AppState::new(
        DepositHandler::new(emitter, Direction::Deposit),
        CheckHandler::new(
            View::new(log.clone(), common::processor_config()),
            View::new(log, common::processor_config()),
        ),
    ));

    let body = json!({ "wallet_id": "w1", "amount": 10 }).to_string();
    let (status, response) = send(&app, post_deposit(body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error: Value = serde_json::from_slice(&response).unwrap();
    assert_eq!(error["error_code"], "emit_failed");
    assert!(error["error"].as_str().unwrap().contains("emit"));
}

#[tokio::test]
async fn test_unknown_wallet_reads_zero() {
    let pipeline = Pipeline::start().await;
    let app = pipeline.app(Direction::Deposit).await;

    let body = check(&app, "nobody").await;

    assert_eq!(body, json!({ "wallet_id": "nobody", "balance": 0.0, "above_threshold": false }));
    pipeline.stop().await;
}

#[tokio::test]
async fn test_flagged_wallet_is_above_threshold() {
    let pipeline = Pipeline::start().await;
    let app = pipeline.app(Direction::Deposit).await;

    deposit(&app, "w1", 100.0).await;

    pipeline.log.ensure_topic(FLAG_STREAM, PARTITIONS).await.unwrap();
    pipeline
        .log
        .append(
            FLAG_STREAM,
            partition_for("w1", PARTITIONS),
            "w1",
            FlagEventCodec::encode(&FlagEvent::raise(1_700_000_000)),
        )
        .await
        .unwrap();

    let expected = json!({ "wallet_id": "w1", "balance": 100.0, "above_threshold": true });
    assert!(balance_becomes(&app, "w1", expected).await, "wallet never flagged");
    pipeline.stop().await;
}
