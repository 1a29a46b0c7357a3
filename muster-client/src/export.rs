//! CSV exports of the association table and the scan log

use crate::config::Variant;
use crate::store::ScanStore;
use muster_common::csv::to_csv;
use muster_common::model::StatusFilter;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExportError {
    #[error("No data to export!")]
    NothingToExport,
}

/// Associations (basic) or computed current status (roster) as CSV
pub fn status_csv(store: &ScanStore) -> Result<String, ExportError> {
    if store.associations().is_empty() {
        return Err(ExportError::NothingToExport);
    }

    let variant = store.variant();
    let rows: Vec<Vec<String>> = match variant {
        Variant::Basic => store
            .associations()
            .iter()
            .map(|(barcode, association)| {
                vec![
                    barcode.clone(),
                    association.name.clone(),
                    association.phase.clone(),
                ]
            })
            .collect(),
        Variant::Roster => store
            .list_statuses(StatusFilter::All)
            .into_iter()
            .map(|row| vec![row.barcode, row.name, row.room, row.phase, row.status])
            .collect(),
    };
    Ok(to_csv(variant.status_headers(), rows))
}

/// Scan log as CSV, in stored order
pub fn log_csv(store: &ScanStore) -> Result<String, ExportError> {
    let log = store.scan_log();
    if log.is_empty() {
        return Err(ExportError::NothingToExport);
    }

    let variant = store.variant();
    let rows = log.stored().iter().map(|entry| {
        let room = entry.room.clone().unwrap_or_default();
        let phase = entry.phase.clone().unwrap_or_default();
        match variant {
            Variant::Basic => vec![
                entry.timestamp.clone(),
                entry.barcode.clone(),
                entry.name.clone(),
                entry.status.clone(),
            ],
            Variant::Roster => vec![
                entry.barcode.clone(),
                entry.name.clone(),
                room,
                phase,
                entry.status.clone(),
                entry.timestamp.clone(),
            ],
        }
    });
    Ok(to_csv(variant.log_headers(), rows))
}
