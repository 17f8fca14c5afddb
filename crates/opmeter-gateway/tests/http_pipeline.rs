//! Request pipeline tests: middleware + dispatcher emit measurement records.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use opmeter_core::{ContextRegistry, MemorySink};
use opmeter_gateway::{app_state::AppState, config, router};

fn app(yaml: &str) -> (Router, Arc<MemorySink>) {
    let cfg = config::load_from_str(yaml).unwrap();
    let sink = Arc::new(MemorySink::new());
    let state = AppState::with_registry(cfg, ContextRegistry::new(sink.clone())).unwrap();
    (router::build_router(state), sink)
}

fn default_app() -> (Router, Arc<MemorySink>) {
    app("version: 1\nmetrics:\n  identity_header: \"x-identity-user-id\"\n")
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-identity-user-id", "user-7")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn record<'a>(records: &'a [Value], name: &str) -> &'a Value {
    records
        .iter()
        .find(|r| r["name"] == name)
        .unwrap_or_else(|| panic!("no record named {name}: {records:?}"))
}

#[tokio::test]
async fn healthz_emits_one_request_record() {
    let (app, sink) = default_app();
    let resp = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let recs = sink.records();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0]["name"], "/healthz");
    assert_eq!(recs[0]["counters"], json!({ "requests": 1, "status_200": 1 }));
    assert_eq!(recs[0]["exceptions"], json!({}));
    assert_eq!(recs[0]["identity_user_id"], Value::Null);
}

#[tokio::test]
async fn checkout_records_items_and_shares_correlation_id() {
    let (app, sink) = default_app();
    let cart = json!({ "items": [ { "sku": "a", "qty": 3 }, { "sku": "b", "qty": 2 } ] });
    let resp = app.oneshot(post("/v1/ops/checkout", cart)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({ "lines": 2, "items": 5 }));

    let recs = sink.records();
    assert_eq!(recs.len(), 2);
    let op = record(&recs, "checkout");
    let req = record(&recs, "/v1/ops/:svc");
    assert_eq!(op["counters"], json!({ "items": 5, "lines": 2 }));
    assert_eq!(op["identity_user_id"], "user-7");
    assert_eq!(req["identity_user_id"], "user-7");
    assert_eq!(op["GUID"], req["GUID"]);
    assert!(req["counters"].get("items").is_none());
}

#[tokio::test]
async fn failing_operation_is_tallied_and_still_errors() {
    let (app, sink) = default_app();
    let resp = app
        .oneshot(post("/v1/ops/checkout", json!({ "items": [] })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "BAD_REQUEST");

    let recs = sink.records();
    let op = record(&recs, "checkout");
    assert_eq!(op["exceptions"], json!({ "ValueError": 1, "BAD_REQUEST": 1 }));
    let req = record(&recs, "/v1/ops/:svc");
    assert_eq!(req["counters"]["status_400"], 1);
}

#[tokio::test]
async fn overflowing_cart_is_rejected_and_tallied() {
    let (app, sink) = default_app();
    let cart = json!({ "items": [
        { "sku": "a", "qty": i64::MAX },
        { "sku": "b", "qty": 1 }
    ] });
    let resp = app.oneshot(post("/v1/ops/checkout", cart)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let recs = sink.records();
    let op = record(&recs, "checkout");
    assert_eq!(op["counters"]["items"], i64::MAX);
    assert_eq!(op["exceptions"], json!({ "OverflowError": 1, "BAD_REQUEST": 1 }));
}

#[tokio::test]
async fn unknown_operation_returns_404_without_operation_record() {
    let (app, sink) = default_app();
    let resp = app.oneshot(post("/v1/ops/nope", json!({}))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["error"], "UNKNOWN_OPERATION");

    let recs = sink.records();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0]["counters"]["status_404"], 1);
}

#[tokio::test]
async fn echo_counts_bytes_and_name_by_path() {
    let (app, sink) = app("version: 1\nmetrics:\n  name_by: path\n");
    let input = json!({ "hello": "world" });
    let resp = app.oneshot(post("/v1/ops/echo", input.clone())).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, input);

    let recs = sink.records();
    let op = record(&recs, "echo");
    assert_eq!(op["counters"]["bytes"], input.to_string().len());
    let req = record(&recs, "/v1/ops/echo");
    assert_eq!(req["identity_user_id"], Value::Null);
}

#[tokio::test]
async fn separate_requests_get_separate_correlation_ids() {
    let (app, sink) = default_app();
    for _ in 0..2 {
        let resp = app
            .clone()
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
    let recs = sink.records();
    assert_eq!(recs.len(), 2);
    assert_ne!(recs[0]["GUID"], recs[1]["GUID"]);
}
