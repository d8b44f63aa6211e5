//! HTTP handlers for expiry alerts

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::expiry::{AlertDetail, AlertFilter, ExpiryService};
use crate::AppState;

/// Result of a bulk mark-read
#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub count: u64,
}

/// List expiry alerts
pub async fn list_alerts(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<AlertFilter>,
) -> AppResult<Json<Vec<AlertDetail>>> {
    let service = ExpiryService::new(state.db);
    let alerts = service
        .list_alerts(current_user.0.user_id, Utc::now().date_naive(), filter)
        .await?;
    Ok(Json(alerts))
}

/// Unread expiry alerts
pub async fn unread_alerts(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<AlertDetail>>> {
    let service = ExpiryService::new(state.db);
    let alerts = service
        .unread_alerts(current_user.0.user_id, Utc::now().date_naive())
        .await?;
    Ok(Json(alerts))
}

/// Mark one alert as read
pub async fn mark_alert_read(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(alert_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = ExpiryService::new(state.db);
    service.mark_read(current_user.0.user_id, alert_id).await?;
    Ok(Json(()))
}

/// Mark all alerts as read
pub async fn mark_all_alerts_read(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<MarkAllReadResponse>> {
    let service = ExpiryService::new(state.db);
    let count = service.mark_all_read(current_user.0.user_id).await?;
    Ok(Json(MarkAllReadResponse { count }))
}
