//! Data model shared by the scanning client and the backend
//!
//! Field names on the wire follow the JSON blobs the scanning pages have
//! always written (`barcodeAssociations`, `scanLog`, `expirationTime`), so
//! snapshots from older clients still deserialize.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Name recorded for a barcode with no association
pub const UNKNOWN_NAME: &str = "Unknown";

/// Room/phase recorded for a barcode with no association
pub const NOT_AVAILABLE: &str = "N/A";

/// Status assumed for an associated barcode that has never been scanned
pub const DEFAULT_STATUS: &str = "Out";

/// Static mapping of a barcode to a person
///
/// Keyed by barcode in [`Snapshot::barcode_associations`]; the barcode itself
/// is not repeated inside the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    #[serde(default)]
    pub name: String,

    /// Room number, absent for associations made without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,

    /// Phase (roster pages) or status (basic page)
    #[serde(default, alias = "status")]
    pub phase: String,
}

impl Association {
    pub fn new(name: impl Into<String>, room: Option<String>, phase: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            room,
            phase: phase.into(),
        }
    }

    /// Sentinel returned for barcodes nobody has associated yet
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN_NAME.to_string(),
            room: Some(NOT_AVAILABLE.to_string()),
            phase: NOT_AVAILABLE.to_string(),
        }
    }
}

/// One check-in/check-out event. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub barcode: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default)]
    pub status: String,
    /// Local display time of the scan, as shown to the operator
    #[serde(default)]
    pub timestamp: String,
}

/// Cached latest status for a barcode
///
/// Overwritten whenever a log entry is created for the barcode; never
/// recomputed from the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentStatus {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    pub status: String,
    pub timestamp: String,
}

impl From<&LogEntry> for CurrentStatus {
    fn from(entry: &LogEntry) -> Self {
        Self {
            name: entry.name.clone(),
            room: entry.room.clone(),
            phase: entry.phase.clone(),
            status: entry.status.clone(),
            timestamp: entry.timestamp.clone(),
        }
    }
}

/// Full data set pushed from a client to the backend
///
/// `scan_log` is in chronological order (oldest first).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub barcode_associations: BTreeMap<String, Association>,
    #[serde(default)]
    pub scan_log: Vec<LogEntry>,
}

/// Opaque push endpoint descriptor registered by a browser
///
/// Only `endpoint` is interpreted; every other field (`keys`,
/// `expirationTime`, ...) is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub endpoint: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PushSubscription {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            extra: Map::new(),
        }
    }

    /// Accept a registration body only if it carries a non-empty string endpoint
    pub fn from_value(value: Value) -> Option<Self> {
        let has_endpoint = value
            .get("endpoint")
            .and_then(Value::as_str)
            .is_some_and(|endpoint| !endpoint.is_empty());
        if !has_endpoint {
            return None;
        }
        serde_json::from_value(value).ok()
    }
}

/// Row filter for the current status view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    /// Only rows whose status is exactly [`DEFAULT_STATUS`]
    Out,
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "out" => Ok(Self::Out),
            other => Err(format!("unknown status filter '{}' (expected 'all' or 'out')", other)),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Out => write!(f, "out"),
        }
    }
}
