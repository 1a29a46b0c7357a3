//! Status reconciliation
//!
//! Two views of "who is in":
//! - **Per barcode** (scanning client): the cached [`CurrentStatus`] for a
//!   barcode, defaulting to `Out` for associated barcodes never scanned.
//! - **Per name** (backend report): the last log entry seen for each person
//!   name, bucketed into in/on-crew-rest versus out.
//!
//! The per-name view aliases different barcodes that share a name. That is
//! how the report has always been computed; [`StatusReport`] keeps it but
//! records every aliased name so it can be flagged.

use crate::model::{
    Association, CurrentStatus, LogEntry, StatusFilter, DEFAULT_STATUS, NOT_AVAILABLE,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// Report status literal counted as present
pub const STATUS_IN: &str = "in";
/// Report status literal counted as present
pub const STATUS_CREW_REST: &str = "on crew rest";
/// Report status literal listed by name
pub const STATUS_OUT: &str = "out";

/// Message sent when the log holds no entries at all
pub const EMPTY_LOG_MESSAGE: &str = "No scanning activity to report.";

/// One row of the current status view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRow {
    pub barcode: String,
    pub name: String,
    pub room: String,
    pub phase: String,
    pub status: String,
}

/// Current status of a single barcode
///
/// A cached [`CurrentStatus`] wins. Otherwise the status is `Out` and the
/// identity comes from the association, or the `Unknown`/`N/A` sentinel when
/// the barcode was never associated.
pub fn current_status_of(
    barcode: &str,
    associations: &BTreeMap<String, Association>,
    current: &BTreeMap<String, CurrentStatus>,
) -> StatusRow {
    if let Some(cached) = current.get(barcode) {
        return StatusRow {
            barcode: barcode.to_string(),
            name: cached.name.clone(),
            room: or_not_available(cached.room.as_deref()),
            phase: or_not_available(cached.phase.as_deref()),
            status: cached.status.clone(),
        };
    }

    let association = associations
        .get(barcode)
        .cloned()
        .unwrap_or_else(Association::unknown);
    StatusRow {
        barcode: barcode.to_string(),
        name: association.name,
        room: or_not_available(association.room.as_deref()),
        phase: association.phase,
        status: DEFAULT_STATUS.to_string(),
    }
}

/// Rows for every associated barcode, filtered
///
/// Identity columns come from the association; only the status comes from
/// the cache. [`StatusFilter::Out`] keeps rows whose status is exactly
/// `"Out"`, so `"out"`, `"In"` or `"on crew rest"` rows are dropped.
pub fn list_statuses(
    associations: &BTreeMap<String, Association>,
    current: &BTreeMap<String, CurrentStatus>,
    filter: StatusFilter,
) -> Vec<StatusRow> {
    associations
        .iter()
        .map(|(barcode, association)| {
            let status = current
                .get(barcode)
                .map(|cached| cached.status.clone())
                .unwrap_or_else(|| DEFAULT_STATUS.to_string());
            StatusRow {
                barcode: barcode.clone(),
                name: association.name.clone(),
                room: association.room.clone().unwrap_or_default(),
                phase: association.phase.clone(),
                status,
            }
        })
        .filter(|row| filter == StatusFilter::All || row.status == DEFAULT_STATUS)
        .collect()
}

fn or_not_available(value: Option<&str>) -> String {
    value.unwrap_or(NOT_AVAILABLE).to_string()
}

/// Latest status per person name, in order of each name's first appearance
///
/// `log` must be chronological (oldest first); later entries overwrite
/// earlier ones.
pub fn latest_status_by_name(log: &[LogEntry]) -> Vec<(String, String)> {
    let mut order: Vec<String> = Vec::new();
    let mut latest: HashMap<&str, &str> = HashMap::new();

    for entry in log {
        if latest.insert(entry.name.as_str(), entry.status.as_str()).is_none() {
            order.push(entry.name.clone());
        }
    }

    order
        .into_iter()
        .map(|name| {
            let status = latest.get(name.as_str()).copied().unwrap_or_default().to_string();
            (name, status)
        })
        .collect()
}

/// Point-in-time report used for the scheduled notification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Log entries the report was computed from
    pub entries_scanned: usize,
    /// People whose latest status is `in` or `on crew rest`
    pub in_or_crew_rest: usize,
    /// People whose latest status is `out`
    pub out: Vec<String>,
    /// `(name, status)` pairs whose status matched none of the literals
    pub unrecognized: Vec<(String, String)>,
    /// Names that appeared under more than one barcode
    pub aliased_names: Vec<String>,
}

impl StatusReport {
    /// Build the report from a chronological log
    pub fn from_log(log: &[LogEntry]) -> Self {
        let mut report = Self {
            entries_scanned: log.len(),
            ..Self::default()
        };

        for (name, status) in latest_status_by_name(log) {
            match status.as_str() {
                STATUS_IN | STATUS_CREW_REST => report.in_or_crew_rest += 1,
                STATUS_OUT => report.out.push(name),
                _ => {
                    debug!(name = %name, status = %status, "Status excluded from report");
                    report.unrecognized.push((name, status));
                }
            }
        }

        report.aliased_names = aliased_names(log);
        report
    }

    /// Notification body text
    pub fn message(&self) -> String {
        if self.entries_scanned == 0 {
            return EMPTY_LOG_MESSAGE.to_string();
        }

        let mut message = format!(
            "Report: {} people are IN or ON CREW REST.\n",
            self.in_or_crew_rest
        );
        if self.out.is_empty() {
            message.push_str("No people are currently marked as OUT.");
        } else {
            message.push_str(&format!("Marked as OUT: {}.", self.out.join(", ")));
        }
        message
    }
}

/// Names that map to more than one barcode in the log
///
/// Each aliased name is logged at warn level with the barcodes involved.
fn aliased_names(log: &[LogEntry]) -> Vec<String> {
    let mut barcodes_by_name: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for entry in log {
        barcodes_by_name
            .entry(entry.name.as_str())
            .or_default()
            .insert(entry.barcode.as_str());
    }

    barcodes_by_name
        .into_iter()
        .filter(|(_, barcodes)| barcodes.len() > 1)
        .map(|(name, barcodes)| {
            let barcodes: Vec<&str> = barcodes.into_iter().collect();
            warn!(
                name = %name,
                barcodes = %barcodes.join(","),
                "Report merges several barcodes under one name"
            );
            name.to_string()
        })
        .collect()
}

/// Convenience wrapper: report message for a chronological log
pub fn report_message(log: &[LogEntry]) -> String {
    StatusReport::from_log(log).message()
}
