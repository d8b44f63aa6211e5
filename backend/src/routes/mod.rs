//! Route definitions for the HomeStock API

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Protected routes - product catalog
        .nest("/products", product_routes())
        .nest("/categories", category_routes())
        .nest("/locations", location_routes())
        // Protected routes - stock ledger
        .nest("/stocks", stock_routes())
        // Protected routes - shopping lists
        .nest("/shopping", shopping_routes())
        // Protected routes - periodic task triggers
        .nest("/tasks", task_routes())
}

/// Authentication routes (register/login public, profile protected)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .nest("/profile", profile_routes())
}

/// Profile routes (protected)
fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::me).put(handlers::update_settings))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Category routes (protected)
fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_categories))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Location routes (protected)
fn location_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_locations).post(handlers::create_location),
        )
        .route("/:location_id", delete(handlers::delete_location))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Product catalog and restock routes (protected)
fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route("/restock-states", get(handlers::restock_states))
        .route("/to-restock", get(handlers::to_restock))
        .route("/low-stock", get(handlers::low_stock))
        .route("/out-of-stock", get(handlers::out_of_stock))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route("/:product_id/consume", post(handlers::consume_product))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Stock ledger routes (protected)
fn stock_routes() -> Router<AppState> {
    Router::new()
        // Batches
        .route(
            "/batches",
            get(handlers::list_batches).post(handlers::create_batch),
        )
        .route("/batches/expiring-soon", get(handlers::expiring_soon))
        .route("/batches/expired", get(handlers::expired))
        .route("/batches/to-consume-first", get(handlers::to_consume_first))
        .route("/batches/:batch_id", get(handlers::get_batch))
        .route("/batches/:batch_id/consume", post(handlers::consume_batch))
        // Movements
        .route(
            "/movements",
            get(handlers::list_movements).post(handlers::record_movement),
        )
        .route("/movements/recent", get(handlers::recent_movements))
        // Expiry alerts
        .route("/alerts", get(handlers::list_alerts))
        .route("/alerts/unread", get(handlers::unread_alerts))
        .route("/alerts/mark-all-read", post(handlers::mark_all_alerts_read))
        .route("/alerts/:alert_id/read", post(handlers::mark_alert_read))
        // Dashboard
        .route("/summary", get(handlers::stock_summary))
        .route("/consumption-stats", get(handlers::consumption_stats))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Shopping list routes (protected)
fn shopping_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/lists",
            get(handlers::list_shopping_lists).post(handlers::create_shopping_list),
        )
        .route("/lists/generate", post(handlers::generate_shopping_list))
        .route(
            "/lists/:list_id",
            get(handlers::get_shopping_list).delete(handlers::delete_shopping_list),
        )
        .route("/lists/:list_id/activate", post(handlers::activate_shopping_list))
        .route("/lists/:list_id/complete", post(handlers::complete_shopping_list))
        .route("/lists/:list_id/archive", post(handlers::archive_shopping_list))
        .route("/lists/:list_id/items", post(handlers::add_shopping_item))
        .route("/items/:item_id/toggle", post(handlers::toggle_shopping_item))
        .route(
            "/items/:item_id/actual",
            put(handlers::set_shopping_item_actual),
        )
        .route("/items/:item_id", delete(handlers::remove_shopping_item))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Periodic task trigger routes (protected)
fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/check-expiry", post(handlers::check_expiry))
        .route("/generate-lists", post(handlers::generate_lists))
        .route("/cleanup", post(handlers::cleanup))
        .route_layer(middleware::from_fn(auth_middleware))
}
