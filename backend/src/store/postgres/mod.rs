//! PostgreSQL ledger store

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    ActivityLog, BusinessType, Order, OrderStatus, SortSpec, StatusChange, StockCategory,
    StockItem, StockSetting, StockTransaction, TransactionType, UnknownVariant, User, UserRole,
};
use sqlx::{types::Json, FromRow, PgPool};

use super::StoreHealth;
use crate::error::{AppError, AppResult};

/// Columns selected for every stock query
macro_rules! stock_columns {
    () => {
        "id, name, description, quantity, unit, price, category, is_active, minimum_threshold, \
         is_low_stock, last_restocked_by, last_restocked_at, created_at, updated_at"
    };
}

macro_rules! order_columns {
    () => {
        "id, customer_name, customer_email, customer_phone, business_type, product, quantity, \
         status, total_price, message, notes, status_history, updated_by, created_at, updated_at"
    };
}

macro_rules! user_columns {
    () => {
        "id, email, name, role, is_active, created_at, last_login_at"
    };
}

// Declared after the column macros so they are in textual scope.
mod audit;
mod order;
mod settings;
mod stock;
mod user;

/// Ledger store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[axum::async_trait]
impl StoreHealth for PgStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}

/// Parse a text column holding one of our closed enums
fn parse_column<T>(value: &str) -> AppResult<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    value
        .parse()
        .map_err(|e: UnknownVariant| AppError::Internal(format!("corrupt row: {}", e)))
}

/// `ORDER BY` clause for a whitelisted sort; unknown fields sort by id
fn order_by(sort: &SortSpec, allowed: &[&str]) -> String {
    let field = if allowed.contains(&sort.field.as_str()) {
        sort.field.as_str()
    } else {
        "id"
    };
    let direction = sort.order.as_sql();
    if field == "id" {
        format!(" ORDER BY id {}", direction)
    } else {
        format!(" ORDER BY {} {}, id {}", field, direction, direction)
    }
}

fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct StockRow {
    id: i64,
    name: String,
    description: Option<String>,
    quantity: i32,
    unit: String,
    price: Decimal,
    category: String,
    is_active: bool,
    minimum_threshold: i32,
    is_low_stock: bool,
    last_restocked_by: Option<i64>,
    last_restocked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<StockRow> for StockItem {
    type Error = AppError;

    fn try_from(row: StockRow) -> AppResult<Self> {
        Ok(StockItem {
            id: row.id,
            name: row.name,
            description: row.description,
            quantity: row.quantity,
            unit: row.unit,
            price: row.price,
            category: parse_column::<StockCategory>(&row.category)?,
            is_active: row.is_active,
            minimum_threshold: row.minimum_threshold,
            is_low_stock: row.is_low_stock,
            last_restocked_by: row.last_restocked_by,
            last_restocked_at: row.last_restocked_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: i64,
    stock_id: i64,
    #[sqlx(rename = "type")]
    transaction_type: String,
    quantity_change: i32,
    quantity_before: i32,
    quantity_after: i32,
    performed_by: Option<i64>,
    reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for StockTransaction {
    type Error = AppError;

    fn try_from(row: TransactionRow) -> AppResult<Self> {
        Ok(StockTransaction {
            id: row.id,
            stock_id: row.stock_id,
            transaction_type: parse_column::<TransactionType>(&row.transaction_type)?,
            quantity_change: row.quantity_change,
            quantity_before: row.quantity_before,
            quantity_after: row.quantity_after,
            performed_by: row.performed_by,
            reason: row.reason,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: i64,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    business_type: String,
    product: String,
    quantity: i32,
    status: String,
    total_price: Option<Decimal>,
    message: Option<String>,
    notes: Option<String>,
    status_history: Json<Vec<StatusChange>>,
    updated_by: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = AppError;

    fn try_from(row: OrderRow) -> AppResult<Self> {
        Ok(Order {
            id: row.id,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            customer_phone: row.customer_phone,
            business_type: parse_column::<BusinessType>(&row.business_type)?,
            product: row.product,
            quantity: row.quantity,
            status: parse_column::<OrderStatus>(&row.status)?,
            total_price: row.total_price,
            message: row.message,
            notes: row.notes,
            status_history: row.status_history.0,
            updated_by: row.updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ActivityRow {
    id: i64,
    user_id: Option<i64>,
    action_type: String,
    entity_type: String,
    entity_id: Option<i64>,
    details: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl From<ActivityRow> for ActivityLog {
    fn from(row: ActivityRow) -> Self {
        ActivityLog {
            id: row.id,
            user_id: row.user_id,
            action_type: row.action_type,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            details: row.details,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SettingRow {
    category: String,
    minimum_threshold: i32,
    updated_by: Option<i64>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SettingRow> for StockSetting {
    type Error = AppError;

    fn try_from(row: SettingRow) -> AppResult<Self> {
        Ok(StockSetting {
            category: parse_column::<StockCategory>(&row.category)?,
            minimum_threshold: row.minimum_threshold,
            updated_by: row.updated_by,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    email: String,
    name: String,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> AppResult<Self> {
        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            role: parse_column::<UserRole>(&row.role)?,
            is_active: row.is_active,
            created_at: row.created_at,
            last_login_at: row.last_login_at,
        })
    }
}

/// Convert every row, failing on the first corrupt one
fn convert_all<R, T>(rows: Vec<R>) -> AppResult<Vec<T>>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}
