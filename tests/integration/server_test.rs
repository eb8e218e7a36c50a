//! Status surface tests: routes exercised against a running engine

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration as ChronoDuration, Utc};
use common::{build_engine, market, FakeCatalog, FakePrices};
use poly_edge::config::TradeConfig;
use poly_edge::engine::EngineHandle;
use poly_edge::server::router;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tower::ServiceExt;

struct Harness {
    app: Router,
    handle: EngineHandle,
    _shutdown: watch::Sender<bool>,
}

fn harness() -> Harness {
    let end = Utc::now() + ChronoDuration::hours(2);
    let catalog = Arc::new(FakeCatalog::new(vec![
        market("a", "btc-above-70000", end),
        market("b", "btc-below-70000", end),
    ]));
    let prices = Arc::new(FakePrices::default());
    prices.set("a-yes", dec!(0.41));
    prices.set("b-yes", dec!(0.57));

    let trade = TradeConfig {
        scan_interval_ms: 100,
        ..TradeConfig::default()
    };
    let engine = build_engine(&catalog, &prices, trade);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (handle, _task) = engine.spawn(shutdown_rx);

    Harness {
        app: router(handle.clone(), true),
        handle,
        _shutdown: shutdown_tx,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn sync_until(app: &Router, done: impl Fn(&Value) -> bool) -> Value {
    let mut last = Value::Null;
    for _ in 0..100 {
        let (status, body) = send(app, get("/sync")).await;
        assert_eq!(status, StatusCode::OK);
        last = serde_json::from_slice(&body).unwrap();
        if done(&last) {
            return last;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached, last snapshot: {last}");
}

#[tokio::test]
async fn test_sync_returns_full_snapshot() {
    let h = harness();
    let snapshot = sync_until(&h.app, |s| s["rounds"].as_array().is_some_and(|r| !r.is_empty())).await;

    for key in ["config", "stats", "rounds", "logs", "orders", "tick", "generatedAt"] {
        assert!(snapshot.get(key).is_some(), "missing {key}");
    }
    let round = &snapshot["rounds"][0];
    assert_eq!(round["kind"], "CROSS");
    assert_eq!(round["state"], "SCANNING");
    assert_eq!(round["legA"]["ask"], 0.41);
    assert_eq!(round["legB"]["ask"], 0.57);
    assert_eq!(round["combinedCost"], 0.98);
    assert_eq!(snapshot["stats"]["balance"], 5000.0);
    assert_eq!(snapshot["config"]["engineActive"], true);
}

#[tokio::test]
async fn test_config_patch_is_merged_and_applied() {
    let h = harness();
    let (status, body) = send(&h.app, post("/config", r#"{"sumTarget": 0.97, "betAmount": "15"}"#)).await;
    assert_eq!(status, StatusCode::OK);

    let response: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(response["success"], true);
    assert_eq!(response["config"]["sumTarget"], 0.97);
    assert_eq!(response["config"]["betAmount"], 15.0);
    assert_eq!(response["config"]["dropThreshold"], 3.0);
    assert!(response["warnings"].as_array().unwrap().is_empty());

    let snapshot = sync_until(&h.app, |s| s["config"]["sumTarget"] == 0.97).await;
    let logs = snapshot["logs"].as_array().unwrap();
    assert!(logs
        .iter()
        .any(|l| l["level"] == "WARN" && l["message"].as_str().unwrap().contains("remote config update")));
}

#[tokio::test]
async fn test_config_patch_reports_unprofitable_target() {
    let h = harness();
    let (status, body) = send(&h.app, post("/config", r#"{"sumTarget": 1.05}"#)).await;
    assert_eq!(status, StatusCode::OK);

    let response: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(response["warnings"].as_array().unwrap().len(), 1);
    assert_eq!(h.handle.trade_config().sum_target, dec!(1.05));
}

#[tokio::test]
async fn test_config_rejects_non_object_bodies() {
    let h = harness();
    for body in ["[1, 2]", "\"text\"", "not json", ""] {
        let (status, raw) = send(&h.app, post("/config", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body:?}");
        let error: Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(error["error"], "bad_request");
    }
    assert_eq!(h.handle.trade_config(), TradeConfig {
        scan_interval_ms: 100,
        ..TradeConfig::default()
    });
}

#[tokio::test]
async fn test_control_toggles_and_sets_engine() {
    let h = harness();

    let (status, body) = send(&h.app, post("/control", "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!({ "enabled": false }));

    let (_, body) = send(&h.app, post("/control", r#"{"enabled": true}"#)).await;
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!({ "enabled": true }));

    let (status, _) = send(&h.app, post("/control", r#"{"enabled": "maybe"}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(h.handle.trade_config().engine_active);
}

#[tokio::test]
async fn test_cors_preflight_allows_any_origin() {
    let h = harness();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/config")
        .header(header::ORIGIN, "http://dashboard.local:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();

    let response = h.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_health_and_unknown_routes() {
    let h = harness();
    let (status, body) = send(&h.app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");

    let (status, _) = send(&h.app, get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
