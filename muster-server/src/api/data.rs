//! Snapshot sync and report preview

use axum::{extract::State, Json};
use muster_common::model::Snapshot;
use muster_common::reconcile::StatusReport;
use serde::Serialize;
use tracing::info;

use super::MessageResponse;
use crate::error::ApiResult;
use crate::AppState;

/// POST /api/update-data
///
/// Replaces the stored snapshot with the request body, whatever it held
/// before. Absent `barcodeAssociations`/`scanLog` fields are stored empty.
pub async fn update_data(
    State(state): State<AppState>,
    Json(snapshot): Json<Snapshot>,
) -> ApiResult<Json<MessageResponse>> {
    let associations = snapshot.barcode_associations.len();
    let log_entries = snapshot.scan_log.len();

    state.store.replace_snapshot(snapshot).await?;
    info!(associations, log_entries, "Snapshot replaced");

    Ok(Json(MessageResponse::new("Data updated successfully.")))
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    /// Text the next scheduled notification would carry
    pub message: String,
    pub report: StatusReport,
}

/// GET /api/report
pub async fn get_report(State(state): State<AppState>) -> Json<ReportResponse> {
    let report = state.store.report().await;
    Json(ReportResponse {
        message: report.message(),
        report,
    })
}
