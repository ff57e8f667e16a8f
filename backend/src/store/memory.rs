//! In-process ledger store
//!
//! All state sits behind one mutex and every operation holds it for its whole
//! duration, so the conditional quantity update is as atomic here as the
//! single `UPDATE ... WHERE` statement is in PostgreSQL.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    is_low_stock, ActivityLog, CategoryStats, ListRange, NewActivity, NewStockTransaction, Order,
    OrderStats, OrderStatus, Page, SortOrder, SortSpec, StatusCount, StockCategory, StockItem,
    StockSetting, StockStats, StockTransaction, User,
};

use super::{
    ActivityQuery, AuditStore, NewOrder, NewStock, NewUser, OrderChanges, OrderQuery, OrderStore,
    SettingsStore, StockChanges, StockQuery, StockStore, StoreHealth, UpdatedStock,
    UserCredentials, UserStore,
};
use crate::error::{AppError, AppResult};

#[derive(Default)]
struct MemoryState {
    stocks: BTreeMap<i64, StockItem>,
    transactions: Vec<StockTransaction>,
    orders: BTreeMap<i64, Order>,
    activity: Vec<ActivityLog>,
    settings: BTreeMap<StockCategory, StockSetting>,
    users: BTreeMap<i64, UserCredentials>,
    last_stock_id: i64,
    last_transaction_id: i64,
    last_order_id: i64,
    last_activity_id: i64,
    last_user_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

/// Ledger store kept entirely in memory
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fill in the derived low-stock flag on the way out
fn derived(mut item: StockItem) -> StockItem {
    item.is_low_stock = is_low_stock(item.quantity, item.minimum_threshold);
    item
}

fn paginate<T>(items: Vec<T>, range: ListRange) -> Page<T> {
    let total = items.len() as i64;
    let items = items
        .into_iter()
        .skip(range.offset as usize)
        .take(range.limit as usize)
        .collect();
    Page::new(items, total, range.offset)
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

fn compare_stock(a: &StockItem, b: &StockItem, sort: &SortSpec) -> Ordering {
    let ordering = match sort.field.as_str() {
        "name" => a.name.cmp(&b.name),
        "quantity" => a.quantity.cmp(&b.quantity),
        "price" => a.price.cmp(&b.price),
        "category" => a.category.as_str().cmp(b.category.as_str()),
        "minimum_threshold" => a.minimum_threshold.cmp(&b.minimum_threshold),
        "is_low_stock" => a.is_low_stock.cmp(&b.is_low_stock),
        "is_active" => a.is_active.cmp(&b.is_active),
        "created_at" => a.created_at.cmp(&b.created_at),
        "updated_at" => a.updated_at.cmp(&b.updated_at),
        _ => Ordering::Equal,
    };
    directed(ordering.then(a.id.cmp(&b.id)), sort.order)
}

fn compare_order(a: &Order, b: &Order, sort: &SortSpec) -> Ordering {
    let ordering = match sort.field.as_str() {
        "customer_name" => a.customer_name.cmp(&b.customer_name),
        "product" => a.product.cmp(&b.product),
        "quantity" => a.quantity.cmp(&b.quantity),
        "status" => a.status.as_str().cmp(b.status.as_str()),
        "total_price" => a.total_price.cmp(&b.total_price),
        "created_at" => a.created_at.cmp(&b.created_at),
        "updated_at" => a.updated_at.cmp(&b.updated_at),
        _ => Ordering::Equal,
    };
    directed(ordering.then(a.id.cmp(&b.id)), sort.order)
}

fn compare_activity(a: &ActivityLog, b: &ActivityLog, sort: &SortSpec) -> Ordering {
    let ordering = match sort.field.as_str() {
        "action_type" => a.action_type.cmp(&b.action_type),
        "entity_type" => a.entity_type.cmp(&b.entity_type),
        _ => Ordering::Equal,
    };
    directed(ordering.then(a.id.cmp(&b.id)), sort.order)
}

fn compare_user(a: &User, b: &User, sort: &SortSpec) -> Ordering {
    let ordering = match sort.field.as_str() {
        "email" => a.email.cmp(&b.email),
        "name" => a.name.cmp(&b.name),
        "role" => a.role.as_str().cmp(b.role.as_str()),
        "created_at" => a.created_at.cmp(&b.created_at),
        _ => Ordering::Equal,
    };
    directed(ordering.then(a.id.cmp(&b.id)), sort.order)
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[axum::async_trait]
impl StockStore for MemoryStore {
    async fn find_stock(&self, id: i64) -> AppResult<Option<StockItem>> {
        Ok(self.state().stocks.get(&id).cloned().map(derived))
    }

    async fn find_stock_by_name(&self, name: &str) -> AppResult<Option<StockItem>> {
        let state = self.state();
        let found = state
            .stocks
            .values()
            .filter(|item| item.name == name)
            .min_by_key(|item| (!item.is_active, item.id))
            .cloned()
            .map(derived);
        Ok(found)
    }

    async fn list_stocks(&self, query: &StockQuery) -> AppResult<Page<StockItem>> {
        let state = self.state();
        let mut items: Vec<StockItem> = state
            .stocks
            .values()
            .cloned()
            .map(derived)
            .filter(|item| query.category.map_or(true, |c| item.category == c))
            .filter(|item| query.is_active.map_or(true, |a| item.is_active == a))
            .filter(|item| query.is_low_stock.map_or(true, |l| item.is_low_stock == l))
            .filter(|item| {
                query.search.as_deref().map_or(true, |q| {
                    contains_ci(&item.name, q)
                        || item.description.as_deref().map_or(false, |d| contains_ci(d, q))
                })
            })
            .collect();
        items.sort_by(|a, b| compare_stock(a, b, &query.sort));
        Ok(paginate(items, query.range))
    }

    async fn insert_stock(&self, stock: NewStock) -> AppResult<StockItem> {
        let mut state = self.state();
        let now = Utc::now();
        let id = next_id(&mut state.last_stock_id);
        let item = StockItem {
            id,
            name: stock.name,
            description: stock.description,
            quantity: stock.quantity,
            unit: stock.unit,
            price: stock.price,
            category: stock.category,
            is_active: stock.is_active,
            minimum_threshold: stock.minimum_threshold,
            is_low_stock: false,
            last_restocked_by: (stock.quantity > 0).then_some(stock.created_by).flatten(),
            last_restocked_at: (stock.quantity > 0).then_some(now),
            created_at: now,
            updated_at: now,
        };
        state.stocks.insert(id, item.clone());
        Ok(derived(item))
    }

    async fn update_stock(&self, id: i64, changes: StockChanges) -> AppResult<Option<UpdatedStock>> {
        let mut state = self.state();
        let Some(item) = state.stocks.get_mut(&id) else {
            return Ok(None);
        };

        if changes.quantity.map_or(false, |q| q < 0) {
            return Err(AppError::validation("quantity", "Quantity cannot be negative"));
        }

        let previous_quantity = item.quantity;
        if let Some(name) = changes.name {
            item.name = name;
        }
        if let Some(description) = changes.description {
            item.description = Some(description);
        }
        if let Some(quantity) = changes.quantity {
            item.quantity = quantity;
        }
        if let Some(unit) = changes.unit {
            item.unit = unit;
        }
        if let Some(price) = changes.price {
            item.price = price;
        }
        if let Some(category) = changes.category {
            item.category = category;
        }
        if let Some(is_active) = changes.is_active {
            item.is_active = is_active;
        }
        if let Some(threshold) = changes.minimum_threshold {
            item.minimum_threshold = threshold;
        }
        item.updated_at = Utc::now();

        Ok(Some(UpdatedStock {
            stock: derived(item.clone()),
            previous_quantity,
        }))
    }

    async fn adjust_quantity(
        &self,
        id: i64,
        adjustment: i32,
        actor: Option<i64>,
    ) -> AppResult<Option<StockItem>> {
        let mut state = self.state();
        let Some(item) = state.stocks.get_mut(&id) else {
            return Ok(None);
        };
        let Some(quantity) = item.quantity.checked_add(adjustment).filter(|q| *q >= 0) else {
            return Ok(None);
        };

        let now = Utc::now();
        item.quantity = quantity;
        item.updated_at = now;
        if adjustment > 0 {
            item.last_restocked_at = Some(now);
            item.last_restocked_by = actor;
        }
        Ok(Some(derived(item.clone())))
    }

    async fn deactivate_stock(&self, id: i64) -> AppResult<Option<StockItem>> {
        let mut state = self.state();
        Ok(state.stocks.get_mut(&id).map(|item| {
            item.is_active = false;
            item.updated_at = Utc::now();
            derived(item.clone())
        }))
    }

    async fn low_stock_items(&self) -> AppResult<Vec<StockItem>> {
        let state = self.state();
        let mut items: Vec<StockItem> = state
            .stocks
            .values()
            .cloned()
            .map(derived)
            .filter(|item| item.is_active && item.is_low_stock)
            .collect();
        items.sort_by_key(|item| (item.quantity, item.id));
        Ok(items)
    }

    async fn stock_stats(&self) -> AppResult<StockStats> {
        let state = self.state();
        let items: Vec<StockItem> = state.stocks.values().cloned().map(derived).collect();

        let active: Vec<&StockItem> = items.iter().filter(|i| i.is_active).collect();
        let by_category = StockCategory::ALL
            .into_iter()
            .filter_map(|category| {
                let in_category: Vec<&&StockItem> =
                    active.iter().filter(|i| i.category == category).collect();
                (!in_category.is_empty()).then(|| CategoryStats {
                    category,
                    items: in_category.len() as i64,
                    quantity: in_category.iter().map(|i| i64::from(i.quantity)).sum(),
                    low_stock_count: in_category.iter().filter(|i| i.is_low_stock).count() as i64,
                })
            })
            .collect();

        Ok(StockStats {
            total_items: items.len() as i64,
            active_items: active.len() as i64,
            low_stock_count: active.iter().filter(|i| i.is_low_stock).count() as i64,
            total_quantity: active.iter().map(|i| i64::from(i.quantity)).sum(),
            total_value: active
                .iter()
                .fold(Decimal::ZERO, |acc, i| acc.saturating_add(i.stock_value())),
            by_category,
        })
    }
}

#[axum::async_trait]
impl AuditStore for MemoryStore {
    async fn insert_transaction(&self, tx: NewStockTransaction) -> AppResult<StockTransaction> {
        let mut state = self.state();
        if !state.stocks.contains_key(&tx.stock_id) {
            return Err(AppError::not_found("Stock", tx.stock_id));
        }
        let id = next_id(&mut state.last_transaction_id);
        let record = StockTransaction {
            id,
            stock_id: tx.stock_id,
            transaction_type: tx.transaction_type,
            quantity_change: tx.quantity_change,
            quantity_before: tx.quantity_before,
            quantity_after: tx.quantity_after,
            performed_by: tx.performed_by,
            reason: tx.reason,
            created_at: Utc::now(),
        };
        state.transactions.push(record.clone());
        Ok(record)
    }

    async fn list_transactions(
        &self,
        stock_id: i64,
        range: ListRange,
    ) -> AppResult<Page<StockTransaction>> {
        let state = self.state();
        let items: Vec<StockTransaction> = state
            .transactions
            .iter()
            .rev()
            .filter(|tx| tx.stock_id == stock_id)
            .cloned()
            .collect();
        Ok(paginate(items, range))
    }

    async fn insert_activity(&self, entry: NewActivity) -> AppResult<ActivityLog> {
        let mut state = self.state();
        let id = next_id(&mut state.last_activity_id);
        let record = ActivityLog {
            id,
            user_id: entry.user_id,
            action_type: entry.action_type,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            details: entry.details,
            created_at: Utc::now(),
        };
        state.activity.push(record.clone());
        Ok(record)
    }

    async fn list_activity(&self, query: &ActivityQuery) -> AppResult<Page<ActivityLog>> {
        let state = self.state();
        let mut items: Vec<ActivityLog> = state
            .activity
            .iter()
            .filter(|a| query.action_type.as_deref().map_or(true, |t| a.action_type == t))
            .filter(|a| query.entity_type.as_deref().map_or(true, |t| a.entity_type == t))
            .filter(|a| query.entity_id.map_or(true, |id| a.entity_id == Some(id)))
            .filter(|a| query.user_id.map_or(true, |id| a.user_id == Some(id)))
            .cloned()
            .collect();
        items.sort_by(|a, b| compare_activity(a, b, &query.sort));
        Ok(paginate(items, query.range))
    }
}

#[axum::async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: NewOrder) -> AppResult<Order> {
        let mut state = self.state();
        let now = Utc::now();
        let id = next_id(&mut state.last_order_id);
        let record = Order {
            id,
            customer_name: order.customer_name,
            customer_email: order.customer_email,
            customer_phone: order.customer_phone,
            business_type: order.business_type,
            product: order.product,
            quantity: order.quantity,
            status: OrderStatus::Pending,
            total_price: order.total_price,
            message: order.message,
            notes: None,
            status_history: vec![order.initial_history],
            updated_by: None,
            created_at: now,
            updated_at: now,
        };
        state.orders.insert(id, record.clone());
        Ok(record)
    }

    async fn find_order(&self, id: i64) -> AppResult<Option<Order>> {
        Ok(self.state().orders.get(&id).cloned())
    }

    async fn list_orders(&self, query: &OrderQuery) -> AppResult<Page<Order>> {
        let state = self.state();
        let mut items: Vec<Order> = state
            .orders
            .values()
            .filter(|o| query.status.map_or(true, |s| o.status == s))
            .filter(|o| query.product.as_deref().map_or(true, |p| o.product == p))
            .filter(|o| {
                query.search.as_deref().map_or(true, |q| {
                    contains_ci(&o.customer_name, q) || contains_ci(&o.customer_email, q)
                })
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| compare_order(a, b, &query.sort));
        Ok(paginate(items, query.range))
    }

    async fn update_order(&self, id: i64, changes: OrderChanges) -> AppResult<Option<Order>> {
        let mut state = self.state();
        let Some(order) = state.orders.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(status) = changes.status {
            order.status = status;
        }
        if let Some(notes) = changes.notes {
            order.notes = Some(notes);
        }
        if let Some(total_price) = changes.total_price {
            order.total_price = Some(total_price);
        }
        if let Some(entry) = changes.history_entry {
            order.status_history.push(entry);
        }
        order.updated_by = changes.updated_by;
        order.updated_at = Utc::now();
        Ok(Some(order.clone()))
    }

    async fn delete_order(&self, id: i64) -> AppResult<bool> {
        Ok(self.state().orders.remove(&id).is_some())
    }

    async fn order_stats(&self) -> AppResult<OrderStats> {
        let state = self.state();
        let orders: Vec<&Order> = state.orders.values().collect();

        let by_status = OrderStatus::ALL
            .into_iter()
            .map(|status| StatusCount {
                status,
                count: orders.iter().filter(|o| o.status == status).count() as i64,
            })
            .filter(|c| c.count > 0)
            .collect();

        Ok(OrderStats {
            total_orders: orders.len() as i64,
            by_status,
            total_revenue: orders
                .iter()
                .filter(|o| o.status != OrderStatus::Cancelled)
                .filter_map(|o| o.total_price)
                .sum::<Decimal>(),
            unpriced_orders: orders.iter().filter(|o| o.total_price.is_none()).count() as i64,
        })
    }
}

#[axum::async_trait]
impl SettingsStore for MemoryStore {
    async fn find_setting(&self, category: StockCategory) -> AppResult<Option<StockSetting>> {
        Ok(self.state().settings.get(&category).cloned())
    }

    async fn list_settings(&self) -> AppResult<Vec<StockSetting>> {
        Ok(self.state().settings.values().cloned().collect())
    }

    async fn upsert_setting(
        &self,
        category: StockCategory,
        minimum_threshold: i32,
        updated_by: Option<i64>,
    ) -> AppResult<StockSetting> {
        let setting = StockSetting {
            category,
            minimum_threshold,
            updated_by,
            updated_at: Utc::now(),
        };
        self.state().settings.insert(category, setting.clone());
        Ok(setting)
    }
}

#[axum::async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.state().users.get(&id).map(|c| c.user.clone()))
    }

    async fn find_credentials(&self, email: &str) -> AppResult<Option<UserCredentials>> {
        let state = self.state();
        Ok(state.users.values().find(|c| c.user.email == email).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> AppResult<User> {
        let mut state = self.state();
        if state.users.values().any(|c| c.user.email == user.email) {
            return Err(AppError::Conflict {
                resource: "email".to_string(),
                message: "A user with this email already exists".to_string(),
            });
        }
        let id = next_id(&mut state.last_user_id);
        let record = User {
            id,
            email: user.email,
            name: user.name,
            role: user.role,
            is_active: true,
            created_at: Utc::now(),
            last_login_at: None,
        };
        state.users.insert(
            id,
            UserCredentials {
                user: record.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(record)
    }

    async fn list_users(&self, sort: &SortSpec, range: ListRange) -> AppResult<Page<User>> {
        let state = self.state();
        let mut users: Vec<User> = state.users.values().map(|c| c.user.clone()).collect();
        users.sort_by(|a, b| compare_user(a, b, sort));
        Ok(paginate(users, range))
    }

    async fn count_users(&self) -> AppResult<i64> {
        Ok(self.state().users.len() as i64)
    }

    async fn record_login(&self, id: i64, at: DateTime<Utc>) -> AppResult<()> {
        if let Some(credentials) = self.state().users.get_mut(&id) {
            credentials.user.last_login_at = Some(at);
        }
        Ok(())
    }
}

#[axum::async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
