//! Business logic services for the injera back-office

pub mod adjuster;
pub mod audit;
pub mod auth;
pub mod notification;
pub mod order;
pub mod settings;
pub mod stock;

pub use adjuster::{AdjustedStock, AdjustmentRequest, StockAdjuster};
pub use audit::{AuditRecorder, AuditService};
pub use auth::AuthService;
pub use notification::{notifier_from_config, LogNotifier, Notifier, TimeoutNotifier, WebhookNotifier};
pub use order::OrderService;
pub use settings::SettingsService;
pub use stock::StockService;
