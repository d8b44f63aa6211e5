//! HTTP handlers for the product catalog and restock views

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::product::{
    CreateLocationInput, CreateProductInput, ProductService, ProductWithStock, UpdateProductInput,
};
use crate::AppState;
use shared::models::{Category, Location, RestockState};

/// List the fixed product categories
pub async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    let service = ProductService::new(state.db);
    let categories = service.list_categories().await?;
    Ok(Json(categories))
}

/// List the current user's storage locations
pub async fn list_locations(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Location>>> {
    let service = ProductService::new(state.db);
    let locations = service.list_locations(current_user.0.user_id).await?;
    Ok(Json(locations))
}

/// Create a storage location
pub async fn create_location(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateLocationInput>,
) -> AppResult<Json<Location>> {
    let service = ProductService::new(state.db);
    let location = service.create_location(current_user.0.user_id, input).await?;
    Ok(Json(location))
}

/// Delete a storage location
pub async fn delete_location(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(location_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = ProductService::new(state.db);
    service
        .delete_location(current_user.0.user_id, location_id)
        .await?;
    Ok(Json(()))
}

/// List products with their stock state
pub async fn list_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<ProductWithStock>>> {
    let service = ProductService::new(state.db);
    let products = service.list_products(current_user.0.user_id).await?;
    Ok(Json(products))
}

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<Json<ProductWithStock>> {
    let service = ProductService::new(state.db);
    let product = service.create_product(current_user.0.user_id, input).await?;
    Ok(Json(product))
}

/// Get a product with its stock state
pub async fn get_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ProductWithStock>> {
    let service = ProductService::new(state.db);
    let product = service.get_product(current_user.0.user_id, product_id).await?;
    Ok(Json(product))
}

/// Update a product
pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<ProductWithStock>> {
    let service = ProductService::new(state.db);
    let product = service
        .update_product(current_user.0.user_id, product_id, input)
        .await?;
    Ok(Json(product))
}

/// Delete a product
pub async fn delete_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = ProductService::new(state.db);
    service
        .delete_product(current_user.0.user_id, product_id)
        .await?;
    Ok(Json(()))
}

/// Restock state of every product
pub async fn restock_states(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<RestockState>>> {
    let service = ProductService::new(state.db);
    let states = service.evaluate_restock(current_user.0.user_id).await?;
    Ok(Json(states))
}

/// Products that need restocking
pub async fn to_restock(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<ProductWithStock>>> {
    let service = ProductService::new(state.db);
    let products = service.to_restock(current_user.0.user_id).await?;
    Ok(Json(products))
}

/// Products below threshold but not at zero
pub async fn low_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<ProductWithStock>>> {
    let service = ProductService::new(state.db);
    let products = service.low_stock(current_user.0.user_id).await?;
    Ok(Json(products))
}

/// Products with no stock at all
pub async fn out_of_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<ProductWithStock>>> {
    let service = ProductService::new(state.db);
    let products = service.out_of_stock(current_user.0.user_id).await?;
    Ok(Json(products))
}
