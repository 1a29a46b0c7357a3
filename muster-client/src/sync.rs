//! Snapshot upload to the backend
//!
//! Every store mutation POSTs the full data set to `/api/update-data`.
//! Uploads are fire-and-forget for the store: a failure is logged and the
//! local change stands, with no retry. They go out one at a time through a
//! single worker so the backend always ends on the newest snapshot.

use crate::store::SnapshotSink;
use muster_common::model::Snapshot;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Path of the snapshot endpoint under the backend base URL
pub const UPDATE_DATA_PATH: &str = "/api/update-data";

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend returned {0}")]
    Backend(u16),
}

/// Upload queue and the task draining it
#[derive(Debug)]
struct UploadWorker {
    queue: mpsc::UnboundedSender<Snapshot>,
    /// Resolves to the number of failed uploads once the queue closes
    task: JoinHandle<usize>,
}

#[derive(Debug)]
pub struct SyncClient {
    http_client: reqwest::Client,
    endpoint: String,
    worker: Mutex<Option<UploadWorker>>,
}

impl SyncClient {
    pub fn new(backend_url: &str) -> Result<Self, SyncError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SyncError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: format!("{}{}", backend_url.trim_end_matches('/'), UPDATE_DATA_PATH),
            worker: Mutex::new(None),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Upload one snapshot and wait for the answer
    pub async fn send(&self, snapshot: &Snapshot) -> Result<(), SyncError> {
        post_snapshot(&self.http_client, &self.endpoint, snapshot).await
    }

    /// Wait until every queued snapshot has been handled
    ///
    /// Returns the number of uploads that failed. The next change starts a
    /// fresh worker.
    pub async fn flush(&self) -> usize {
        let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(UploadWorker { queue, task }) = worker else {
            return 0;
        };

        drop(queue);
        match task.await {
            Ok(failed) => failed,
            Err(e) => {
                error!("Sync worker panicked: {}", e);
                1
            }
        }
    }

    fn start_worker(&self, runtime: &Handle) -> UploadWorker {
        let (queue, mut pending) = mpsc::unbounded_channel::<Snapshot>();
        let http_client = self.http_client.clone();
        let endpoint = self.endpoint.clone();

        let task = runtime.spawn(async move {
            let mut failed = 0;
            while let Some(mut snapshot) = pending.recv().await {
                // Anything queued meanwhile supersedes this snapshot
                while let Ok(newer) = pending.try_recv() {
                    snapshot = newer;
                }
                if post_snapshot(&http_client, &endpoint, &snapshot).await.is_err() {
                    failed += 1;
                }
            }
            failed
        });

        UploadWorker { queue, task }
    }
}

impl SnapshotSink for SyncClient {
    fn snapshot_changed(&self, snapshot: Snapshot) {
        let Ok(runtime) = Handle::try_current() else {
            warn!("No async runtime; snapshot not sent to backend");
            return;
        };

        let mut worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        let worker = worker.get_or_insert_with(|| self.start_worker(&runtime));
        if worker.queue.send(snapshot).is_err() {
            error!("Sync worker stopped; snapshot not sent to backend");
        }
    }
}

async fn post_snapshot(
    http_client: &reqwest::Client,
    endpoint: &str,
    snapshot: &Snapshot,
) -> Result<(), SyncError> {
    debug!(
        endpoint,
        log_entries = snapshot.scan_log.len(),
        "Sending snapshot"
    );

    let result = match http_client.post(endpoint).json(snapshot).send().await {
        Ok(response) if response.status().is_success() => Ok(()),
        Ok(response) => Err(SyncError::Backend(response.status().as_u16())),
        Err(e) => Err(SyncError::Network(e.to_string())),
    };

    match &result {
        Ok(()) => info!("Data successfully sent to backend."),
        Err(e) => error!("Failed to send data to backend: {}", e),
    }
    result
}
