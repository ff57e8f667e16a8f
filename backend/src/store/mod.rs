//! Ledger store: persistence traits and their implementations
//!
//! Every query the services need goes through one of the traits below.
//! [`PgStore`] is the production implementation; [`MemoryStore`] keeps the
//! same guarantees in process for development and tests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    ActivityLog, BusinessType, ListRange, NewActivity, NewStockTransaction, Order, OrderStats,
    OrderStatus, Page, SortOrder, SortSpec, StatusChange, StockCategory, StockItem, StockSetting,
    StockStats, StockTransaction, User, UserRole,
};

use crate::error::AppResult;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub const STOCK_SORT_FIELDS: &[&str] = &[
    "id",
    "name",
    "quantity",
    "price",
    "category",
    "minimum_threshold",
    "is_low_stock",
    "is_active",
    "created_at",
    "updated_at",
];

pub const ORDER_SORT_FIELDS: &[&str] = &[
    "id",
    "customer_name",
    "product",
    "quantity",
    "status",
    "total_price",
    "created_at",
    "updated_at",
];

pub const ACTIVITY_SORT_FIELDS: &[&str] = &["id", "created_at", "action_type", "entity_type"];

pub const USER_SORT_FIELDS: &[&str] = &["id", "email", "name", "role", "created_at"];

/// Default ordering: newest first
pub fn newest_first() -> SortSpec {
    SortSpec::new("id", SortOrder::Desc)
}

// ============================================================================
// Inputs and queries
// ============================================================================

#[derive(Debug, Clone)]
pub struct StockQuery {
    pub category: Option<StockCategory>,
    pub is_active: Option<bool>,
    pub is_low_stock: Option<bool>,
    /// Case-insensitive substring of name or description
    pub search: Option<String>,
    pub sort: SortSpec,
    pub range: ListRange,
}

impl Default for StockQuery {
    fn default() -> Self {
        Self {
            category: None,
            is_active: None,
            is_low_stock: None,
            search: None,
            sort: newest_first(),
            range: ListRange::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewStock {
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub unit: String,
    pub price: Decimal,
    pub category: StockCategory,
    pub is_active: bool,
    pub minimum_threshold: i32,
    pub created_by: Option<i64>,
}

/// Field edits; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct StockChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i32>,
    pub unit: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<StockCategory>,
    pub is_active: Option<bool>,
    pub minimum_threshold: Option<i32>,
}

/// Result of a field update, with the quantity the row held just before it
#[derive(Debug, Clone)]
pub struct UpdatedStock {
    pub stock: StockItem,
    pub previous_quantity: i32,
}

#[derive(Debug, Clone)]
pub struct ActivityQuery {
    pub action_type: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub user_id: Option<i64>,
    pub sort: SortSpec,
    pub range: ListRange,
}

impl Default for ActivityQuery {
    fn default() -> Self {
        Self {
            action_type: None,
            entity_type: None,
            entity_id: None,
            user_id: None,
            sort: newest_first(),
            range: ListRange::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub business_type: BusinessType,
    pub product: String,
    pub quantity: i32,
    pub total_price: Option<Decimal>,
    pub message: Option<String>,
    pub initial_history: StatusChange,
}

#[derive(Debug, Clone, Default)]
pub struct OrderChanges {
    pub status: Option<OrderStatus>,
    pub notes: Option<String>,
    pub total_price: Option<Decimal>,
    /// Appended to `status_history` when present
    pub history_entry: Option<StatusChange>,
    pub updated_by: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub product: Option<String>,
    /// Case-insensitive substring of customer name or email
    pub search: Option<String>,
    pub sort: SortSpec,
    pub range: ListRange,
}

impl Default for OrderQuery {
    fn default() -> Self {
        Self {
            status: None,
            product: None,
            search: None,
            sort: newest_first(),
            range: ListRange::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: UserRole,
}

/// A user together with the stored password hash
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

// ============================================================================
// Traits
// ============================================================================

#[axum::async_trait]
pub trait StockStore: Send + Sync {
    async fn find_stock(&self, id: i64) -> AppResult<Option<StockItem>>;

    /// Exact, case-sensitive name match; active items first, then lowest id
    async fn find_stock_by_name(&self, name: &str) -> AppResult<Option<StockItem>>;

    async fn list_stocks(&self, query: &StockQuery) -> AppResult<Page<StockItem>>;

    async fn insert_stock(&self, stock: NewStock) -> AppResult<StockItem>;

    async fn update_stock(&self, id: i64, changes: StockChanges) -> AppResult<Option<UpdatedStock>>;

    /// Apply `quantity + adjustment` if and only if the result is not negative.
    ///
    /// The check and the write happen as one conditional statement. `None`
    /// covers both an unknown id and a rejected adjustment.
    async fn adjust_quantity(
        &self,
        id: i64,
        adjustment: i32,
        actor: Option<i64>,
    ) -> AppResult<Option<StockItem>>;

    async fn deactivate_stock(&self, id: i64) -> AppResult<Option<StockItem>>;

    /// Active items below their threshold, lowest quantity first
    async fn low_stock_items(&self) -> AppResult<Vec<StockItem>>;

    async fn stock_stats(&self) -> AppResult<StockStats>;
}

/// Append-only ledger and activity log
#[axum::async_trait]
pub trait AuditStore: Send + Sync {
    async fn insert_transaction(&self, tx: NewStockTransaction) -> AppResult<StockTransaction>;

    /// Ledger entries for one item, newest first
    async fn list_transactions(
        &self,
        stock_id: i64,
        range: ListRange,
    ) -> AppResult<Page<StockTransaction>>;

    async fn insert_activity(&self, entry: NewActivity) -> AppResult<ActivityLog>;

    async fn list_activity(&self, query: &ActivityQuery) -> AppResult<Page<ActivityLog>>;
}

#[axum::async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, order: NewOrder) -> AppResult<Order>;

    async fn find_order(&self, id: i64) -> AppResult<Option<Order>>;

    async fn list_orders(&self, query: &OrderQuery) -> AppResult<Page<Order>>;

    async fn update_order(&self, id: i64, changes: OrderChanges) -> AppResult<Option<Order>>;

    async fn delete_order(&self, id: i64) -> AppResult<bool>;

    async fn order_stats(&self) -> AppResult<OrderStats>;
}

#[axum::async_trait]
pub trait SettingsStore: Send + Sync {
    async fn find_setting(&self, category: StockCategory) -> AppResult<Option<StockSetting>>;

    async fn list_settings(&self) -> AppResult<Vec<StockSetting>>;

    async fn upsert_setting(
        &self,
        category: StockCategory,
        minimum_threshold: i32,
        updated_by: Option<i64>,
    ) -> AppResult<StockSetting>;
}

#[axum::async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: i64) -> AppResult<Option<User>>;

    async fn find_credentials(&self, email: &str) -> AppResult<Option<UserCredentials>>;

    /// Fails with a conflict when the e-mail is taken
    async fn insert_user(&self, user: NewUser) -> AppResult<User>;

    async fn list_users(&self, sort: &SortSpec, range: ListRange) -> AppResult<Page<User>>;

    async fn count_users(&self) -> AppResult<i64>;

    async fn record_login(&self, id: i64, at: DateTime<Utc>) -> AppResult<()>;
}

#[axum::async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> AppResult<()>;
}

/// The store handles held by the application state.
///
/// Usually every field points at the same backend; tests swap single fields.
#[derive(Clone)]
pub struct Stores {
    pub stocks: Arc<dyn StockStore>,
    pub audit: Arc<dyn AuditStore>,
    pub orders: Arc<dyn OrderStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub users: Arc<dyn UserStore>,
    pub health: Arc<dyn StoreHealth>,
}

impl Stores {
    pub fn from_backend<S>(store: Arc<S>) -> Self
    where
        S: StockStore + AuditStore + OrderStore + SettingsStore + UserStore + StoreHealth + 'static,
    {
        Self {
            stocks: store.clone(),
            audit: store.clone(),
            orders: store.clone(),
            settings: store.clone(),
            users: store.clone(),
            health: store,
        }
    }

    pub fn in_memory() -> Self {
        Self::from_backend(Arc::new(MemoryStore::new()))
    }
}
