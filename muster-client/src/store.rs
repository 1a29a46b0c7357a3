//! Association store, scan log and current status cache
//!
//! [`ScanStore`] is loaded once from [`LocalStorage`] and is the only way to
//! mutate the station's data. Each mutating method persists the collections
//! it touched before returning and then hands a full [`Snapshot`] to the
//! configured [`SnapshotSink`].

use crate::config::{StorageKeys, Variant};
use crate::storage::LocalStorage;
use muster_common::model::{Association, CurrentStatus, LogEntry, Snapshot, StatusFilter};
use muster_common::reconcile::{self, StatusRow};
use muster_common::time::now_display;
use muster_common::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Maximum entries kept by the basic variant's log
pub const BASIC_LOG_CAPACITY: usize = 500;

/// Status logged when a roster association is saved, and the roster default
pub const CHECK_IN_STATUS: &str = "In";

/// Receives a snapshot after every mutation
pub trait SnapshotSink: Send + Sync {
    fn snapshot_changed(&self, snapshot: Snapshot);
}

/// Append-only scan log
///
/// Basic variant: stored newest-first, oldest dropped past
/// [`BASIC_LOG_CAPACITY`]. Roster variant: stored oldest-first, unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanLog {
    entries: Vec<LogEntry>,
    newest_first: bool,
    capacity: Option<usize>,
}

impl ScanLog {
    pub fn for_variant(variant: Variant, entries: Vec<LogEntry>) -> Self {
        let mut log = match variant {
            Variant::Basic => Self {
                entries,
                newest_first: true,
                capacity: Some(BASIC_LOG_CAPACITY),
            },
            Variant::Roster => Self {
                entries,
                newest_first: false,
                capacity: None,
            },
        };
        log.truncate_to_capacity();
        log
    }

    pub fn append(&mut self, entry: LogEntry) {
        if self.newest_first {
            self.entries.insert(0, entry);
        } else {
            self.entries.push(entry);
        }
        self.truncate_to_capacity();
    }

    fn truncate_to_capacity(&mut self) {
        let Some(capacity) = self.capacity else {
            return;
        };
        if self.entries.len() <= capacity {
            return;
        }
        if self.newest_first {
            self.entries.truncate(capacity);
        } else {
            let excess = self.entries.len() - capacity;
            self.entries.drain(..excess);
        }
    }

    /// Entries for display, most recent first
    pub fn newest_first(&self) -> Vec<&LogEntry> {
        if self.newest_first {
            self.entries.iter().collect()
        } else {
            self.entries.iter().rev().collect()
        }
    }

    /// Entries oldest first, the order snapshots carry
    pub fn chronological(&self) -> Vec<LogEntry> {
        if self.newest_first {
            self.entries.iter().rev().cloned().collect()
        } else {
            self.entries.clone()
        }
    }

    /// Entries in storage order
    pub fn stored(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of recording one scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub entry: LogEntry,
    /// Operator-facing line, e.g. `Ann checked In.`
    pub message: String,
}

pub struct ScanStore {
    storage: LocalStorage,
    variant: Variant,
    keys: StorageKeys,
    associations: BTreeMap<String, Association>,
    current_status: BTreeMap<String, CurrentStatus>,
    log: ScanLog,
    sink: Option<Arc<dyn SnapshotSink>>,
}

impl ScanStore {
    /// Load every collection from storage; absent keys start empty
    pub fn open(storage: LocalStorage, variant: Variant) -> Self {
        let keys = variant.storage_keys();
        let associations = storage.get_json(keys.associations).unwrap_or_default();
        let current_status = storage.get_json(keys.current_status).unwrap_or_default();
        let entries = storage.get_json(keys.scan_log).unwrap_or_default();

        let store = Self {
            storage,
            variant,
            keys,
            associations,
            current_status,
            log: ScanLog::for_variant(variant, entries),
            sink: None,
        };
        debug!(
            associations = store.associations.len(),
            log_entries = store.log.len(),
            "Scan store loaded"
        );
        store
    }

    pub fn with_sink(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Create or fully replace the association for `barcode`
    ///
    /// Barcode, name and phase are required (after trimming); an empty room
    /// is stored as absent. In the roster variant the save is followed by an
    /// automatic check-in, whose outcome is returned.
    pub fn upsert(
        &mut self,
        barcode: &str,
        name: &str,
        room: Option<&str>,
        phase: &str,
    ) -> Result<Option<ScanOutcome>> {
        let barcode = barcode.trim();
        let name = name.trim();
        let phase = phase.trim();
        if barcode.is_empty() || name.is_empty() || phase.is_empty() {
            return Err(Error::InvalidInput(
                "Please enter a barcode, name, and phase.".to_string(),
            ));
        }
        let room = room
            .map(str::trim)
            .filter(|room| !room.is_empty())
            .map(str::to_string);

        self.associations
            .insert(barcode.to_string(), Association::new(name, room, phase));
        self.storage
            .set_json(self.keys.associations, &self.associations)?;

        // One snapshot per save, taken after the roster check-in
        let outcome = match self.variant {
            Variant::Roster => Some(self.apply_scan(barcode, Some(CHECK_IN_STATUS))?),
            Variant::Basic => None,
        };
        self.notify();
        Ok(outcome)
    }

    /// Stored association, or the `Unknown`/`N/A` sentinel
    pub fn lookup(&self, barcode: &str) -> Association {
        self.associations
            .get(barcode)
            .cloned()
            .unwrap_or_else(Association::unknown)
    }

    /// Stored association only, for pre-filling an edit
    pub fn association(&self, barcode: &str) -> Option<&Association> {
        self.associations.get(barcode)
    }

    pub fn associations(&self) -> &BTreeMap<String, Association> {
        &self.associations
    }

    pub fn current_status(&self) -> &BTreeMap<String, CurrentStatus> {
        &self.current_status
    }

    /// Log a scan of `barcode`
    ///
    /// Status: the explicit one if given, else the association's phase
    /// (basic) or `In` (roster). Unknown barcodes are logged under the
    /// sentinel identity.
    pub fn record_scan(&mut self, barcode: &str, status: Option<&str>) -> Result<ScanOutcome> {
        let outcome = self.apply_scan(barcode, status)?;
        self.notify();
        Ok(outcome)
    }

    fn apply_scan(&mut self, barcode: &str, status: Option<&str>) -> Result<ScanOutcome> {
        let barcode = barcode.trim();
        if barcode.is_empty() {
            return Err(Error::InvalidInput("Barcode is empty.".to_string()));
        }

        let association = self.lookup(barcode);
        let status = match (status.map(str::trim), self.variant) {
            (Some(status), _) if !status.is_empty() => status.to_string(),
            (_, Variant::Basic) => association.phase.clone(),
            (_, Variant::Roster) => CHECK_IN_STATUS.to_string(),
        };

        let entry = LogEntry {
            barcode: barcode.to_string(),
            name: association.name.clone(),
            room: association.room.clone(),
            phase: Some(association.phase.clone()),
            status,
            timestamp: now_display(),
        };

        self.current_status
            .insert(barcode.to_string(), CurrentStatus::from(&entry));
        self.log.append(entry.clone());
        self.storage
            .set_json(self.keys.current_status, &self.current_status)?;
        self.storage.set_json(self.keys.scan_log, self.log.stored())?;

        let message = format!("{} checked {}.", entry.name, entry.status);
        Ok(ScanOutcome { entry, message })
    }

    /// Log entries, most recent first
    pub fn log_entries(&self) -> Vec<&LogEntry> {
        self.log.newest_first()
    }

    pub fn scan_log(&self) -> &ScanLog {
        &self.log
    }

    /// Discard every log entry and the persisted copy
    ///
    /// The current status cache is left alone.
    pub fn clear_log(&mut self) -> Result<()> {
        self.log.clear();
        self.storage.remove_item(self.keys.scan_log)?;
        self.notify();
        Ok(())
    }

    pub fn current_status_of(&self, barcode: &str) -> StatusRow {
        reconcile::current_status_of(barcode, &self.associations, &self.current_status)
    }

    pub fn list_statuses(&self, filter: StatusFilter) -> Vec<StatusRow> {
        reconcile::list_statuses(&self.associations, &self.current_status, filter)
    }

    /// Full data set in backend wire form
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            barcode_associations: self.associations.clone(),
            scan_log: self.log.chronological(),
        }
    }

    fn notify(&self) {
        if let Some(sink) = &self.sink {
            sink.snapshot_changed(self.snapshot());
        }
    }
}
