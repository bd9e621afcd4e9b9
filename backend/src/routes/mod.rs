//! Route definitions for the Inventory Management System

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Protected routes
        .nest("/users", user_routes())
        .nest("/products", product_routes())
        .nest("/categories", category_routes())
        .nest("/suppliers", supplier_routes())
        .nest("/warehouses", warehouse_routes())
        .nest("/movements", movement_routes())
        .nest("/stock", stock_routes())
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh))
        .merge(
            Router::new()
                .route("/me", get(handlers::auth::me))
                .route_layer(middleware::from_fn(auth_middleware)),
        )
}

/// User administration routes (protected, Admin-only in the handlers)
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::users::list_users))
        .route("/:user_id/role", axum::routing::put(handlers::users::update_user_role))
        .route(
            "/:user_id/toggle-status",
            axum::routing::put(handlers::users::toggle_user_status),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Product catalog routes (protected)
fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/:product_id",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .route("/:product_id/stock", get(handlers::products::get_product_stock))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Category routes (protected)
fn category_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::categories::list_categories).post(handlers::categories::create_category),
        )
        .route(
            "/:category_id",
            get(handlers::categories::get_category)
                .put(handlers::categories::update_category)
                .delete(handlers::categories::delete_category),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Supplier routes (protected)
fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::suppliers::list_suppliers).post(handlers::suppliers::create_supplier),
        )
        .route(
            "/:supplier_id",
            get(handlers::suppliers::get_supplier)
                .put(handlers::suppliers::update_supplier)
                .delete(handlers::suppliers::delete_supplier),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Warehouse routes (protected)
fn warehouse_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::warehouses::list_warehouses).post(handlers::warehouses::create_warehouse),
        )
        .route(
            "/:warehouse_id",
            get(handlers::warehouses::get_warehouse)
                .put(handlers::warehouses::update_warehouse)
                .delete(handlers::warehouses::delete_warehouse),
        )
        .route("/:warehouse_id/stock", get(handlers::warehouses::get_warehouse_stock))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Stock movement routes (protected)
fn movement_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::movements::movement_history))
        .route("/purchase", post(handlers::movements::process_purchase))
        .route("/sale", post(handlers::movements::process_sale))
        .route("/transfer", post(handlers::movements::transfer_stock))
        .route("/adjustment", post(handlers::movements::process_adjustment))
        .route(
            "/:movement_id",
            axum::routing::delete(handlers::movements::delete_movement),
        )
        .route("/:movement_id/restore", post(handlers::movements::restore_movement))
        .route_layer(middleware::from_fn(auth_middleware))
}

/// Derived stock routes (protected)
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:product_id/:warehouse_id",
            get(handlers::movements::stock_level),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}
