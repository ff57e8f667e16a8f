//! Injera Back-Office - Backend
//!
//! Stock and order management for an injera producer: inventory with an
//! append-only ledger, a public order form, per-category low-stock policy and
//! an activity log for the staff dashboard.

use std::sync::Arc;

use axum::{http::header::CONTENT_RANGE, routing::get, Router};
use shared::DefaultThresholds;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};

use services::{
    notifier_from_config, AuditRecorder, AuditService, AuthService, Notifier, OrderService,
    SettingsService, StockAdjuster, StockService, TimeoutNotifier,
};
use store::Stores;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub config: Arc<Config>,
    pub notifier: Arc<dyn Notifier>,
    pub thresholds: DefaultThresholds,
}

impl AppState {
    /// Build the state, taking thresholds and the notifier from configuration
    pub fn new(stores: Stores, config: Config) -> AppResult<Self> {
        let thresholds = config.inventory.default_thresholds()?;
        let notifier = notifier_from_config(&config.notification)?;
        let limit = config.notification.delivery_timeout();
        Ok(Self {
            stores,
            config: Arc::new(config),
            notifier: Arc::new(TimeoutNotifier::new(notifier, limit)),
            thresholds,
        })
    }

    /// Replace the notification channel; deliveries stay bounded by the configured timeout
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        let limit = self.config.notification.delivery_timeout();
        self.notifier = Arc::new(TimeoutNotifier::new(notifier, limit));
        self
    }

    pub fn recorder(&self) -> AuditRecorder {
        AuditRecorder::new(self.stores.audit.clone())
    }

    pub fn adjuster(&self) -> StockAdjuster {
        StockAdjuster::new(self.stores.stocks.clone(), self.recorder(), self.notifier.clone())
    }

    pub fn audit_service(&self) -> AuditService {
        AuditService::new(self.stores.audit.clone(), self.stores.stocks.clone())
    }

    pub fn settings_service(&self) -> SettingsService {
        SettingsService::new(self.stores.settings.clone(), self.thresholds.clone(), self.recorder())
    }

    pub fn stock_service(&self) -> StockService {
        StockService::new(
            self.stores.stocks.clone(),
            self.adjuster(),
            self.recorder(),
            self.settings_service(),
            self.audit_service(),
        )
    }

    pub fn order_service(&self) -> OrderService {
        OrderService::new(
            self.stores.orders.clone(),
            self.stores.stocks.clone(),
            self.adjuster(),
            self.recorder(),
            self.notifier.clone(),
        )
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(self.stores.users.clone(), self.recorder(), &self.config)
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // The dashboard reads Content-Range for pagination
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([CONTENT_RANGE]);

    Router::new()
        .route("/", get(root))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Injera Back-Office API v1"
}
