//! muster-client library
//!
//! The scanning station: associates barcodes with people, records
//! check-ins and check-outs, exports CSV, and mirrors every change to the
//! backend as a full snapshot.

pub mod config;
pub mod export;
pub mod storage;
pub mod store;
pub mod sync;

pub use config::{ClientConfig, Variant};
pub use storage::LocalStorage;
pub use store::{ScanOutcome, ScanStore, SnapshotSink};
pub use sync::SyncClient;
