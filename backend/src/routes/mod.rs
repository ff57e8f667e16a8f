//! Route definitions for the injera back-office API

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::{
    handlers,
    middleware::{auth_middleware, require_admin},
    AppState,
};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public login)
        .route("/auth/login", post(handlers::login))
        // Public order form
        .route("/orders", post(handlers::create_order))
        // Protected routes
        .merge(protected_routes(state.clone()))
        // Admin-only account management
        .nest("/users", user_routes(state))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(handlers::me))
        .nest("/stocks", stock_routes())
        .route("/orders", get(handlers::list_orders))
        .route("/orders/stats", get(handlers::order_stats))
        .route(
            "/orders/:id",
            get(handlers::get_order)
                .put(handlers::update_order)
                .delete(handlers::delete_order),
        )
        .nest("/stock-settings", settings_routes())
        .nest("/activity-logs", activity_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Stock management routes (protected)
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stocks).post(handlers::create_stock))
        .route("/low-stock", get(handlers::low_stock))
        .route("/stats", get(handlers::stock_stats))
        .route(
            "/:id",
            get(handlers::get_stock)
                .put(handlers::update_stock)
                .delete(handlers::delete_stock),
        )
        .route("/:id/quantity", patch(handlers::adjust_quantity))
        .route("/:id/quick-adjust", post(handlers::quick_adjust))
        .route("/:id/transactions", get(handlers::stock_transactions))
}

/// Stock settings routes (protected, writes admin only)
fn settings_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_settings))
        .route(
            "/:category",
            get(handlers::get_setting).put(handlers::update_setting),
        )
}

/// Activity log routes (protected)
fn activity_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_activity))
        .route("/stock/:id", get(handlers::stock_activity))
        .route("/order/:id", get(handlers::order_activity))
}

/// User management routes (admin)
fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
