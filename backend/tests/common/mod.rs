//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use injera_backend::{
    config::Config,
    services::{auth::CreateUserInput, order::CreateOrderInput, stock::CreateStockInput, Notifier},
    store::{ActivityQuery, AuditStore, NewStock, StockChanges, StockQuery, StockStore, Stores, UpdatedStock},
    AppError, AppResult, AppState,
};
use rust_decimal::Decimal;
use shared::{
    ActivityLog, ListRange, NewActivity, NewStockTransaction, Order, Page, StockCategory, StockItem,
    StockStats, StockTransaction, User, UserRole,
};

pub const JWT_SECRET: &str = "test-secret";

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn test_state() -> AppState {
    AppState::new(Stores::in_memory(), Config::in_memory(JWT_SECRET)).unwrap()
}

pub fn stock_input(name: &str, category: StockCategory, quantity: i32, threshold: Option<i32>) -> CreateStockInput {
    CreateStockInput {
        name: name.to_string(),
        description: None,
        quantity,
        unit: Some("piece".to_string()),
        price: dec("2.50"),
        category,
        is_active: None,
        minimum_threshold: threshold,
    }
}

pub fn order_input(product: Option<&str>, quantity: Option<i32>) -> CreateOrderInput {
    CreateOrderInput {
        customer_name: "Almaz Bekele".to_string(),
        customer_email: "almaz@example.com".to_string(),
        customer_phone: Some("+251 911 000 111".to_string()),
        business_type: None,
        product: product.map(str::to_string),
        quantity,
        message: None,
    }
}

pub async fn create_user(state: &AppState, email: &str, role: UserRole) -> User {
    state
        .auth_service()
        .create_user(
            CreateUserInput {
                email: email.to_string(),
                name: "Test User".to_string(),
                password: "correct-horse".to_string(),
                role,
            },
            None,
        )
        .await
        .unwrap()
}

pub async fn create_stock(state: &AppState, name: &str, quantity: i32, threshold: Option<i32>) -> StockItem {
    state
        .stock_service()
        .create(stock_input(name, StockCategory::Injera, quantity, threshold), None)
        .await
        .unwrap()
}

pub async fn ledger(state: &AppState, stock_id: i64) -> Vec<StockTransaction> {
    state
        .stock_service()
        .transactions(stock_id, ListRange { offset: 0, limit: 500 })
        .await
        .unwrap()
        .items
}

/// Remembers every event it is asked to send
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<String>>,
}

#[axum::async_trait]
impl Notifier for RecordingNotifier {
    async fn order_placed(&self, order: &Order) -> AppResult<()> {
        self.events.lock().unwrap().push(format!("order:{}", order.id));
        Ok(())
    }

    async fn low_stock(&self, stock: &StockItem) -> AppResult<()> {
        self.events.lock().unwrap().push(format!("low:{}", stock.id));
        Ok(())
    }
}

/// A relay that is always down
pub struct FailingNotifier;

#[axum::async_trait]
impl Notifier for FailingNotifier {
    async fn order_placed(&self, _order: &Order) -> AppResult<()> {
        Err(AppError::Internal("relay unreachable".to_string()))
    }

    async fn low_stock(&self, _stock: &StockItem) -> AppResult<()> {
        Err(AppError::Internal("relay unreachable".to_string()))
    }
}

/// An audit store whose writes always fail
pub struct FailingAudit;

#[axum::async_trait]
impl AuditStore for FailingAudit {
    async fn insert_transaction(&self, _tx: NewStockTransaction) -> AppResult<StockTransaction> {
        Err(AppError::Internal("audit store down".to_string()))
    }

    async fn list_transactions(&self, _stock_id: i64, range: ListRange) -> AppResult<Page<StockTransaction>> {
        Ok(Page::new(Vec::new(), 0, range.offset))
    }

    async fn insert_activity(&self, _entry: NewActivity) -> AppResult<ActivityLog> {
        Err(AppError::Internal("audit store down".to_string()))
    }

    async fn list_activity(&self, query: &ActivityQuery) -> AppResult<Page<ActivityLog>> {
        Ok(Page::new(Vec::new(), 0, query.range.offset))
    }
}

pub fn state_with_failing_audit() -> AppState {
    let mut stores = Stores::in_memory();
    stores.audit = Arc::new(FailingAudit);
    AppState::new(stores, Config::in_memory(JWT_SECRET)).unwrap()
}

/// Accepts the call and never answers
pub struct StalledNotifier;

#[axum::async_trait]
impl Notifier for StalledNotifier {
    async fn order_placed(&self, _order: &Order) -> AppResult<()> {
        std::future::pending().await
    }

    async fn low_stock(&self, _stock: &StockItem) -> AppResult<()> {
        std::future::pending().await
    }
}

/// State whose notification deliveries give up after `timeout`
pub fn state_with_notifier_timeout(notifier: Arc<dyn Notifier>, timeout: Duration) -> AppState {
    let mut config = Config::in_memory(JWT_SECRET);
    config.notification.timeout_ms = timeout.as_millis() as u64;
    AppState::new(Stores::in_memory(), config)
        .unwrap()
        .with_notifier(notifier)
}

/// Delegates to the memory store, except that quantity changes fail
pub struct BrokenAdjustments {
    inner: Arc<dyn StockStore>,
}

#[axum::async_trait]
impl StockStore for BrokenAdjustments {
    async fn find_stock(&self, id: i64) -> AppResult<Option<StockItem>> {
        self.inner.find_stock(id).await
    }

    async fn find_stock_by_name(&self, name: &str) -> AppResult<Option<StockItem>> {
        self.inner.find_stock_by_name(name).await
    }

    async fn list_stocks(&self, query: &StockQuery) -> AppResult<Page<StockItem>> {
        self.inner.list_stocks(query).await
    }

    async fn insert_stock(&self, stock: NewStock) -> AppResult<StockItem> {
        self.inner.insert_stock(stock).await
    }

    async fn update_stock(&self, id: i64, changes: StockChanges) -> AppResult<Option<UpdatedStock>> {
        self.inner.update_stock(id, changes).await
    }

    async fn adjust_quantity(
        &self,
        _id: i64,
        _adjustment: i32,
        _actor: Option<i64>,
    ) -> AppResult<Option<StockItem>> {
        Err(AppError::Internal("connection reset".to_string()))
    }

    async fn deactivate_stock(&self, id: i64) -> AppResult<Option<StockItem>> {
        self.inner.deactivate_stock(id).await
    }

    async fn low_stock_items(&self) -> AppResult<Vec<StockItem>> {
        self.inner.low_stock_items().await
    }

    async fn stock_stats(&self) -> AppResult<StockStats> {
        self.inner.stock_stats().await
    }
}

pub fn state_with_broken_adjustments() -> AppState {
    let mut stores = Stores::in_memory();
    stores.stocks = Arc::new(BrokenAdjustments {
        inner: stores.stocks.clone(),
    });
    AppState::new(stores, Config::in_memory(JWT_SECRET)).unwrap()
}
