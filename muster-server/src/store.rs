//! Backend store
//!
//! Holds the latest client snapshot and the push subscriber list, each
//! mirrored to its own JSON file in the data folder. Both files are
//! rewritten whole on every change.
//!
//! Snapshot replacement is last-writer-wins: there is no version check, so a
//! delayed request carrying older data overwrites newer data.

use muster_common::json_file::read_json;
use muster_common::model::{LogEntry, PushSubscription, Snapshot};
use muster_common::reconcile::StatusReport;
use muster_common::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Snapshot file name inside the data folder
pub const DATA_FILE: &str = "app-data.json";

/// Subscriber list file name inside the data folder
pub const SUBSCRIBERS_FILE: &str = "push-subscribers.json";

pub struct BackendStore {
    data_path: PathBuf,
    subscribers_path: PathBuf,
    snapshot: RwLock<Snapshot>,
    subscribers: RwLock<Vec<PushSubscription>>,
}

impl BackendStore {
    /// Load both files from `data_dir`
    ///
    /// Missing files start empty. Unreadable files are logged and also start
    /// empty; they are only overwritten by the next successful write.
    pub fn load(data_dir: &Path) -> Self {
        let data_path = data_dir.join(DATA_FILE);
        let subscribers_path = data_dir.join(SUBSCRIBERS_FILE);

        let snapshot: Snapshot = load_or_empty(&data_path);
        let subscribers: Vec<PushSubscription> = load_or_empty(&subscribers_path);

        info!(
            associations = snapshot.barcode_associations.len(),
            log_entries = snapshot.scan_log.len(),
            subscribers = subscribers.len(),
            "Backend store loaded from {}",
            data_dir.display()
        );

        Self {
            data_path,
            subscribers_path,
            snapshot: RwLock::new(snapshot),
            subscribers: RwLock::new(subscribers),
        }
    }

    /// Replace the stored snapshot unconditionally
    ///
    /// The file is written before memory is updated, so a failed write
    /// leaves both untouched.
    pub async fn replace_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        let mut current = self.snapshot.write().await;
        write_whole(&self.data_path, &snapshot).await?;
        *current = snapshot;
        Ok(())
    }

    /// Append a subscription and persist the whole list
    ///
    /// No deduplication: registering the same endpoint twice stores it twice.
    /// Returns the new subscriber count.
    pub async fn add_subscription(&self, subscription: PushSubscription) -> Result<usize> {
        let mut subscribers = self.subscribers.write().await;
        let mut updated = subscribers.clone();
        updated.push(subscription);
        write_whole(&self.subscribers_path, &updated).await?;
        *subscribers = updated;
        Ok(subscribers.len())
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.snapshot.read().await.clone()
    }

    pub async fn scan_log(&self) -> Vec<LogEntry> {
        self.snapshot.read().await.scan_log.clone()
    }

    pub async fn subscribers(&self) -> Vec<PushSubscription> {
        self.subscribers.read().await.clone()
    }

    /// Report over the current scan log
    pub async fn report(&self) -> StatusReport {
        StatusReport::from_log(&self.snapshot.read().await.scan_log)
    }
}

fn load_or_empty<T>(path: &Path) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    match read_json(path) {
        Ok(Some(value)) => value,
        Ok(None) => T::default(),
        Err(e) => {
            warn!("Ignoring unreadable {}: {}", path.display(), e);
            T::default()
        }
    }
}

async fn write_whole<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| Error::Internal(format!("Failed to write {}: {}", path.display(), e)))
}
