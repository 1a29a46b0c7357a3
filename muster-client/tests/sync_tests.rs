//! Client to backend sync against a live muster-server router

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use muster_client::config::Variant;
use muster_client::{LocalStorage, ScanStore, SyncClient};
use muster_common::model::Snapshot;
use muster_server::{build_router, AppState, BackendStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Serve the backend router on an ephemeral loopback port
async fn spawn_backend(dir: &TempDir) -> (String, Arc<BackendStore>) {
    let store = Arc::new(BackendStore::load(dir.path()));
    let app = build_router(AppState::new(store.clone()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Should bind");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), store)
}

#[tokio::test]
async fn test_mutations_reach_backend() {
    let backend_dir = TempDir::new().unwrap();
    let (url, backend) = spawn_backend(&backend_dir).await;

    let client_dir = TempDir::new().unwrap();
    let sync = Arc::new(SyncClient::new(&url).unwrap());
    let storage = LocalStorage::open(client_dir.path().join("local-storage.json")).unwrap();
    let mut store = ScanStore::open(storage, Variant::Roster).with_sink(sync.clone());

    store.upsert("100", "Ann", Some("12"), "2").unwrap();
    assert_eq!(sync.flush().await, 0);

    store.record_scan("100", Some("out")).unwrap();
    assert_eq!(sync.flush().await, 0);

    let snapshot = backend.snapshot().await;
    assert_eq!(snapshot.barcode_associations["100"].name, "Ann");
    assert_eq!(snapshot.scan_log.len(), 2);
    assert_eq!(snapshot.scan_log[1].status, "out");

    let report = backend.report().await;
    assert_eq!(report.out, vec!["Ann".to_string()]);
}

#[tokio::test]
async fn test_explicit_send() {
    let backend_dir = TempDir::new().unwrap();
    let (url, backend) = spawn_backend(&backend_dir).await;

    let client_dir = TempDir::new().unwrap();
    let storage = LocalStorage::open(client_dir.path().join("local-storage.json")).unwrap();
    let mut store = ScanStore::open(storage, Variant::Basic);
    store.upsert("100", "Ann", None, "In").unwrap();
    store.record_scan("100", None).unwrap();

    let sync = SyncClient::new(&url).unwrap();
    sync.send(&store.snapshot()).await.unwrap();

    assert_eq!(backend.snapshot().await.scan_log.len(), 1);
}

/// Backend stand-in whose first answer is slow; keeps the last body received
#[derive(Default)]
struct SlowBackend {
    requests: AtomicUsize,
    latest: Mutex<Option<Snapshot>>,
}

async fn slow_update(
    State(backend): State<Arc<SlowBackend>>,
    Json(snapshot): Json<Snapshot>,
) -> StatusCode {
    if backend.requests.fetch_add(1, Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(300)).await;
    }
    *backend.latest.lock().unwrap() = Some(snapshot);
    StatusCode::OK
}

async fn spawn_slow_backend() -> (String, Arc<SlowBackend>) {
    let backend = Arc::new(SlowBackend::default());
    let app = Router::new()
        .route("/api/update-data", post(slow_update))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), backend)
}

fn roster_store(dir: &TempDir, sync: Arc<SyncClient>) -> ScanStore {
    let storage = LocalStorage::open(dir.path().join("local-storage.json")).unwrap();
    ScanStore::open(storage, Variant::Roster).with_sink(sync)
}

#[tokio::test]
async fn test_roster_save_uploads_once_with_check_in() {
    let (url, backend) = spawn_slow_backend().await;
    let dir = TempDir::new().unwrap();
    let sync = Arc::new(SyncClient::new(&url).unwrap());
    let mut store = roster_store(&dir, sync.clone());

    store.upsert("100", "Ann", None, "1").unwrap();
    assert_eq!(sync.flush().await, 0);

    assert_eq!(backend.requests.load(Ordering::SeqCst), 1);
    let latest = backend.latest.lock().unwrap().clone().unwrap();
    assert_eq!(latest.scan_log.len(), 1);
    assert_eq!(latest.scan_log[0].status, "In");
}

#[tokio::test]
async fn test_slow_upload_does_not_overwrite_newer_snapshot() {
    let (url, backend) = spawn_slow_backend().await;
    let dir = TempDir::new().unwrap();
    let sync = Arc::new(SyncClient::new(&url).unwrap());
    let mut store = roster_store(&dir, sync.clone());

    // The first upload is held for 300 ms while later changes queue up
    store.upsert("100", "Ann", None, "1").unwrap();
    store.record_scan("100", Some("Out")).unwrap();
    store.record_scan("100", Some("In")).unwrap();
    assert_eq!(sync.flush().await, 0);

    let latest = backend.latest.lock().unwrap().clone().unwrap();
    assert_eq!(latest, store.snapshot());
    assert_eq!(latest.scan_log.len(), 3);
}
