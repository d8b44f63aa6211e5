//! HTTP handlers for stock batches, movements, and consumption

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::auth::AuthService;
use crate::services::stock::{
    BatchFilter, ConsumeBatchOutcome, ConsumeInput, ConsumeOutcome, ConsumptionStat,
    CreateBatchInput, MovementFilter, RecordMovementInput, StockService, StockSummary,
};
use crate::AppState;
use shared::models::{StockBatch, StockMovement};

/// Day-window query parameter
#[derive(Debug, Deserialize)]
pub struct DaysQuery {
    pub days: Option<i64>,
}

/// Create a batch with its initial IN movement
pub async fn create_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateBatchInput>,
) -> AppResult<Json<StockBatch>> {
    let service = StockService::new(state.db);
    let batch = service
        .create_batch(current_user.0.user_id, input, Utc::now())
        .await?;
    Ok(Json(batch))
}

/// List batches, optionally filtered by product or location
pub async fn list_batches(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<BatchFilter>,
) -> AppResult<Json<Vec<StockBatch>>> {
    let service = StockService::new(state.db);
    let batches = service.list_batches(current_user.0.user_id, filter).await?;
    Ok(Json(batches))
}

/// Get one batch
pub async fn get_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<StockBatch>> {
    let service = StockService::new(state.db);
    let batch = service.get_batch(current_user.0.user_id, batch_id).await?;
    Ok(Json(batch))
}

/// Consume a quantity from one batch
pub async fn consume_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
    Json(input): Json<ConsumeInput>,
) -> AppResult<Json<ConsumeBatchOutcome>> {
    let service = StockService::new(state.db);
    let outcome = service
        .consume_batch(current_user.0.user_id, batch_id, input, Utc::now())
        .await?;
    Ok(Json(outcome))
}

/// Consume a quantity of a product across its batches
pub async fn consume_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<ConsumeInput>,
) -> AppResult<Json<ConsumeOutcome>> {
    let service = StockService::new(state.db);
    let outcome = service
        .consume(current_user.0.user_id, product_id, input, Utc::now())
        .await?;
    Ok(Json(outcome))
}

/// Batches expiring within the warning window (default 7 days)
pub async fn expiring_soon(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<DaysQuery>,
) -> AppResult<Json<Vec<StockBatch>>> {
    let service = StockService::new(state.db);
    let batches = service
        .expiring_soon(
            current_user.0.user_id,
            Utc::now().date_naive(),
            query.days.unwrap_or(7),
        )
        .await?;
    Ok(Json(batches))
}

/// Batches already past their expiry date
pub async fn expired(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<StockBatch>>> {
    let service = StockService::new(state.db);
    let batches = service
        .expired(current_user.0.user_id, Utc::now().date_naive())
        .await?;
    Ok(Json(batches))
}

/// Perishable batches to consume first
pub async fn to_consume_first(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<StockBatch>>> {
    let service = StockService::new(state.db);
    let batches = service.to_consume_first(current_user.0.user_id).await?;
    Ok(Json(batches))
}

/// Record a stock movement
pub async fn record_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordMovementInput>,
) -> AppResult<Json<StockMovement>> {
    let service = StockService::new(state.db);
    let movement = service
        .record_movement(current_user.0.user_id, input, Utc::now())
        .await?;
    Ok(Json(movement))
}

/// List movements, newest first
pub async fn list_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<MovementFilter>,
) -> AppResult<Json<Vec<StockMovement>>> {
    let service = StockService::new(state.db);
    let movements = service.list_movements(current_user.0.user_id, filter).await?;
    Ok(Json(movements))
}

/// Movements of the last days (default 30)
pub async fn recent_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<DaysQuery>,
) -> AppResult<Json<Vec<StockMovement>>> {
    let service = StockService::new(state.db);
    let movements = service
        .recent_movements(current_user.0.user_id, Utc::now(), query.days.unwrap_or(30))
        .await?;
    Ok(Json(movements))
}

/// Global stock overview for the dashboard
pub async fn stock_summary(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<StockSummary>> {
    // The expiry window comes from the user's own notification settings
    let auth = AuthService::new(state.db.clone(), &state.config);
    let user = auth.get_profile(current_user.0.user_id).await?;

    let service = StockService::new(state.db);
    let summary = service
        .summary(
            current_user.0.user_id,
            Utc::now().date_naive(),
            user.notification_expiry_days as i64,
        )
        .await?;
    Ok(Json(summary))
}

/// Most consumed products (default window 30 days)
pub async fn consumption_stats(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<DaysQuery>,
) -> AppResult<Json<Vec<ConsumptionStat>>> {
    let service = StockService::new(state.db);
    let stats = service
        .consumption_stats(current_user.0.user_id, Utc::now(), query.days.unwrap_or(30))
        .await?;
    Ok(Json(stats))
}
