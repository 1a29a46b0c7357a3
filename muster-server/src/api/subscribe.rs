//! Push subscription registration

use axum::{extract::State, http::StatusCode, Json};
use muster_common::model::PushSubscription;
use serde_json::Value;
use tracing::info;

use super::MessageResponse;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /api/subscribe-push
///
/// 400 unless the body has a non-empty `endpoint`; otherwise the
/// subscription is appended (duplicates included) and 201 returned.
pub async fn subscribe_push(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let subscription = PushSubscription::from_value(body)
        .ok_or_else(|| ApiError::BadRequest("Invalid subscription.".to_string()))?;

    let endpoint = subscription.endpoint.clone();
    let count = state.store.add_subscription(subscription).await?;
    info!(subscribers = count, "New push subscriber added: {}", endpoint);

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Push subscription received.")),
    ))
}
