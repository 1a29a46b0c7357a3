//! # Muster Common Library
//!
//! Shared code for the muster check-in tracker:
//! - Data model (associations, scan log entries, current status, snapshots)
//! - Status reconciliation and the notification report
//! - CSV export formatting
//! - Configuration loading and root folder resolution
//! - Logging initialisation
//! - Whole-file JSON persistence helpers

pub mod config;
pub mod csv;
pub mod error;
pub mod json_file;
pub mod logging;
pub mod model;
pub mod reconcile;
pub mod time;

pub use error::{Error, Result};
pub use model::{Association, CurrentStatus, LogEntry, PushSubscription, Snapshot, StatusFilter};
