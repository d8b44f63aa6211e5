//! HTTP handlers for shopping lists and items

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::shopping::{
    AddItemInput, CompleteInput, CompleteOutcome, CreateListInput, GenerateOutcome,
    ItemWithProduct, SetActualInput, ShoppingListDetail, ShoppingListSummary, ShoppingService,
};
use crate::AppState;
use shared::models::ListStatus;

/// Status filter query parameter
#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<ListStatus>,
}

/// List shopping lists
pub async fn list_shopping_lists(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<StatusQuery>,
) -> AppResult<Json<Vec<ShoppingListSummary>>> {
    let service = ShoppingService::new(state.db);
    let lists = service
        .list_lists(current_user.0.user_id, query.status)
        .await?;
    Ok(Json(lists))
}

/// Create an empty draft list
pub async fn create_shopping_list(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateListInput>,
) -> AppResult<Json<ShoppingListSummary>> {
    let service = ShoppingService::new(state.db);
    let list = service.create_list(current_user.0.user_id, input).await?;
    Ok(Json(list))
}

/// Get a list with its items
pub async fn get_shopping_list(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(list_id): Path<Uuid>,
) -> AppResult<Json<ShoppingListDetail>> {
    let service = ShoppingService::new(state.db);
    let list = service.get_list(current_user.0.user_id, list_id).await?;
    Ok(Json(list))
}

/// Delete a draft list
pub async fn delete_shopping_list(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(list_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = ShoppingService::new(state.db);
    service.delete_list(current_user.0.user_id, list_id).await?;
    Ok(Json(()))
}

/// Generate a list from the current restock state
pub async fn generate_shopping_list(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<GenerateOutcome>> {
    let service = ShoppingService::new(state.db);
    let outcome = service
        .generate(current_user.0.user_id, Utc::now().date_naive())
        .await?;
    Ok(Json(outcome))
}

/// Activate a draft list
pub async fn activate_shopping_list(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(list_id): Path<Uuid>,
) -> AppResult<Json<ShoppingListSummary>> {
    let service = ShoppingService::new(state.db);
    let list = service.activate(current_user.0.user_id, list_id).await?;
    Ok(Json(list))
}

/// Archive an active or completed list
pub async fn archive_shopping_list(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(list_id): Path<Uuid>,
) -> AppResult<Json<ShoppingListSummary>> {
    let service = ShoppingService::new(state.db);
    let list = service.archive(current_user.0.user_id, list_id).await?;
    Ok(Json(list))
}

/// Complete a list, optionally feeding checked items back into stock
pub async fn complete_shopping_list(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(list_id): Path<Uuid>,
    Json(input): Json<CompleteInput>,
) -> AppResult<Json<CompleteOutcome>> {
    let service = ShoppingService::new(state.db);
    let outcome = service
        .complete(current_user.0.user_id, list_id, input, Utc::now())
        .await?;
    Ok(Json(outcome))
}

/// Add an item to a list
pub async fn add_shopping_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(list_id): Path<Uuid>,
    Json(input): Json<AddItemInput>,
) -> AppResult<Json<ItemWithProduct>> {
    let service = ShoppingService::new(state.db);
    let item = service
        .add_item(current_user.0.user_id, list_id, input)
        .await?;
    Ok(Json(item))
}

/// Check or uncheck an item
pub async fn toggle_shopping_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<ItemWithProduct>> {
    let service = ShoppingService::new(state.db);
    let item = service.toggle_check(current_user.0.user_id, item_id).await?;
    Ok(Json(item))
}

/// Record what was actually bought for an item
pub async fn set_shopping_item_actual(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<SetActualInput>,
) -> AppResult<Json<ItemWithProduct>> {
    let service = ShoppingService::new(state.db);
    let item = service
        .set_actual(current_user.0.user_id, item_id, input)
        .await?;
    Ok(Json(item))
}

/// Remove an item from a list
pub async fn remove_shopping_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = ShoppingService::new(state.db);
    service.remove_item(current_user.0.user_id, item_id).await?;
    Ok(Json(()))
}
