//! Integration tests for muster-server API endpoints
//!
//! Tests cover:
//! - Health endpoint
//! - Snapshot sync (last write wins, no merge)
//! - Push subscription registration and validation
//! - Report preview
//! - CORS origin restriction

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use muster_server::store::{DATA_FILE, SUBSCRIBERS_FILE};
use muster_server::{build_router, AppState, BackendStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: app over an empty store in a temp folder
fn setup_app() -> (TempDir, Arc<BackendStore>, Router) {
    let dir = TempDir::new().expect("Should create temp dir");
    let store = Arc::new(BackendStore::load(dir.path()));
    let app = build_router(AppState::new(store.clone()));
    (dir, store, app)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

fn snapshot_body(names_and_statuses: &[(&str, &str)], stamp: &str) -> Value {
    let scan_log: Vec<Value> = names_and_statuses
        .iter()
        .map(|(name, status)| {
            json!({
                "barcode": format!("bc-{}", name),
                "name": name,
                "status": status,
                "timestamp": stamp,
            })
        })
        .collect();
    let associations: serde_json::Map<String, Value> = names_and_statuses
        .iter()
        .map(|(name, _)| (format!("bc-{}", name), json!({"name": name, "phase": "1"})))
        .collect();
    json!({ "barcodeAssociations": associations, "scanLog": scan_log })
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, _store, app) = setup_app();

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "muster-server");
    assert!(body["version"].is_string());
}

// =============================================================================
// Snapshot sync
// =============================================================================

#[tokio::test]
async fn test_update_data_stores_snapshot() {
    let (dir, store, app) = setup_app();

    let body = snapshot_body(&[("Ann", "in"), ("Bob", "out")], "1/1/2026, 8:00:00 AM");
    let response = app
        .oneshot(json_request("POST", "/api/update-data", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let reply = extract_json(response.into_body()).await;
    assert_eq!(reply["message"], "Data updated successfully.");

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.scan_log.len(), 2);
    assert_eq!(snapshot.barcode_associations["bc-Ann"].name, "Ann");

    // Persisted under the documented file name
    let on_disk: Value =
        serde_json::from_slice(&std::fs::read(dir.path().join(DATA_FILE)).unwrap()).unwrap();
    assert_eq!(on_disk["scanLog"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_update_data_last_write_wins() {
    let (_dir, store, app) = setup_app();

    // S1 is the newer data, S2 is older but arrives second
    let s1 = snapshot_body(&[("Ann", "in"), ("Bob", "in")], "1/2/2026, 9:00:00 PM");
    let s2 = snapshot_body(&[("Ann", "out")], "1/1/2026, 8:00:00 AM");

    let first = app
        .clone()
        .oneshot(json_request("POST", "/api/update-data", s1))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(json_request("POST", "/api/update-data", s2))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.scan_log.len(), 1);
    assert_eq!(snapshot.scan_log[0].status, "out");
    assert_eq!(snapshot.scan_log[0].timestamp, "1/1/2026, 8:00:00 AM");
    assert!(!snapshot.barcode_associations.contains_key("bc-Bob"));
}

#[tokio::test]
async fn test_update_data_missing_fields_store_empty() {
    let (_dir, store, app) = setup_app();

    let seeded = snapshot_body(&[("Ann", "in")], "1/1/2026, 8:00:00 AM");
    app.clone()
        .oneshot(json_request("POST", "/api/update-data", seeded))
        .await
        .unwrap();

    let response = app
        .oneshot(json_request("POST", "/api/update-data", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(store.snapshot().await.scan_log.is_empty());
}

// =============================================================================
// Push subscriptions
// =============================================================================

#[tokio::test]
async fn test_subscribe_push_created() {
    let (dir, store, app) = setup_app();

    let body = json!({
        "endpoint": "https://push.example/sub/1",
        "expirationTime": null,
        "keys": {"p256dh": "key", "auth": "secret"}
    });
    let response = app
        .oneshot(json_request("POST", "/api/subscribe-push", body.clone()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let reply = extract_json(response.into_body()).await;
    assert_eq!(reply["message"], "Push subscription received.");

    let subscribers = store.subscribers().await;
    assert_eq!(subscribers.len(), 1);

    let on_disk: Value =
        serde_json::from_slice(&std::fs::read(dir.path().join(SUBSCRIBERS_FILE)).unwrap())
            .unwrap();
    assert_eq!(on_disk, json!([body]));
}

#[tokio::test]
async fn test_subscribe_push_missing_endpoint() {
    let (_dir, store, app) = setup_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/subscribe-push",
            json!({"keys": {"auth": "x"}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let reply = extract_json(response.into_body()).await;
    assert_eq!(reply["message"], "Invalid subscription.");
    assert!(store.subscribers().await.is_empty());
}

#[tokio::test]
async fn test_subscribe_push_keeps_duplicates() {
    let (_dir, store, app) = setup_app();

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/subscribe-push",
                json!({"endpoint": "https://push.example/same"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    assert_eq!(store.subscribers().await.len(), 2);
}

// =============================================================================
// Report preview
// =============================================================================

#[tokio::test]
async fn test_report_preview_empty() {
    let (_dir, _store, app) = setup_app();

    let response = app.oneshot(get_request("/api/report")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["message"], "No scanning activity to report.");
}

#[tokio::test]
async fn test_report_preview_after_sync() {
    let (_dir, _store, app) = setup_app();

    let body = json!({
        "barcodeAssociations": {},
        "scanLog": [
            {"barcode": "1", "name": "A", "status": "in", "timestamp": "t1"},
            {"barcode": "1", "name": "A", "status": "out", "timestamp": "t2"},
            {"barcode": "2", "name": "B", "status": "on crew rest", "timestamp": "t3"}
        ]
    });
    app.clone()
        .oneshot(json_request("POST", "/api/update-data", body))
        .await
        .unwrap();

    let response = app.oneshot(get_request("/api/report")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(
        body["message"],
        "Report: 1 people are IN or ON CREW REST.\nMarked as OUT: A."
    );
    assert_eq!(body["report"]["in_or_crew_rest"], 1);
    assert_eq!(body["report"]["out"], json!(["A"]));
}

// =============================================================================
// CORS
// =============================================================================

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(BackendStore::load(dir.path()));
    let state = AppState::new(store)
        .with_allowed_origin("http://127.0.0.1:5500".parse().unwrap());
    let app = build_router(state);

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .header("origin", "http://127.0.0.1:5500")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://127.0.0.1:5500"
    );
}
