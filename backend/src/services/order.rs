//! Order placement and order management
//!
//! Placing an order never fails because of stock: an unknown product is
//! accepted unpriced, and a product without enough stock is accepted with its
//! stock left untouched.

use std::borrow::Cow;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    actions, entities, normalize_product, normalize_quantity, plan_stock_effect, price_order,
    validation, BusinessType, NewActivity, Order, OrderStats, OrderStatus, Page, StatusChange,
    StockEffect, TransactionType,
};
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};
use crate::services::adjuster::StockAdjuster;
use crate::services::audit::AuditRecorder;
use crate::services::notification::Notifier;
use crate::store::{NewOrder, OrderChanges, OrderQuery, OrderStore, StockStore};

fn validate_phone_field(phone: &str) -> Result<(), ValidationError> {
    validation::validate_phone(phone).map_err(|message| {
        let mut error = ValidationError::new("phone");
        error.message = Some(Cow::Borrowed(message));
        error
    })
}

/// Public order form
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderInput {
    #[validate(length(min = 1, max = 255, message = "Customer name is required"))]
    pub customer_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub customer_email: String,
    #[validate(custom = "validate_phone_field")]
    pub customer_phone: Option<String>,
    pub business_type: Option<BusinessType>,
    /// Blank means the default product
    pub product: Option<String>,
    /// Values below 1 are raised to 1
    pub quantity: Option<i32>,
    #[validate(length(max = 2000, message = "Message is too long"))]
    pub message: Option<String>,
}

/// Staff edits to an existing order
#[derive(Debug, Default, Deserialize)]
pub struct UpdateOrderInput {
    pub status: Option<OrderStatus>,
    pub notes: Option<String>,
    pub total_price: Option<Decimal>,
    /// Stored on the status-history entry when the status changes
    pub status_note: Option<String>,
}

/// What happened to stock when an order was placed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockOutcome {
    Unpriced,
    Decremented,
    Backordered,
    /// Enough stock at lookup time, but a concurrent change won the race
    DecrementRefused,
    /// The stock store failed during the decrement
    DecrementFailed,
}

impl StockOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockOutcome::Unpriced => "unpriced",
            StockOutcome::Decremented => "decremented",
            StockOutcome::Backordered => "backordered",
            StockOutcome::DecrementRefused => "decrement_refused",
            StockOutcome::DecrementFailed => "decrement_failed",
        }
    }
}

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    stocks: Arc<dyn StockStore>,
    adjuster: StockAdjuster,
    recorder: AuditRecorder,
    notifier: Arc<dyn Notifier>,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        stocks: Arc<dyn StockStore>,
        adjuster: StockAdjuster,
        recorder: AuditRecorder,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            orders,
            stocks,
            adjuster,
            recorder,
            notifier,
        }
    }

    /// Place an order from the public form
    pub async fn place(&self, input: CreateOrderInput) -> AppResult<Order> {
        input.validate()?;

        let quantity = normalize_quantity(input.quantity);
        let product = normalize_product(input.product.as_deref());

        let stock = self.stocks.find_stock_by_name(&product).await?;
        let total_price = stock.as_ref().and_then(|s| {
            let total = price_order(s.price, quantity);
            if total.is_none() {
                tracing::warn!(stock_id = s.id, quantity, "Order total out of range; order left unpriced");
            }
            total
        });
        let effect = plan_stock_effect(stock.as_ref(), quantity);

        let order = self
            .orders
            .insert_order(NewOrder {
                customer_name: input.customer_name.trim().to_string(),
                customer_email: input.customer_email.trim().to_string(),
                customer_phone: input.customer_phone,
                business_type: input.business_type.unwrap_or_default(),
                product,
                quantity,
                total_price,
                message: input.message,
                initial_history: StatusChange {
                    status: OrderStatus::Pending,
                    changed_at: Utc::now(),
                    changed_by: None,
                    note: Some("Order placed".to_string()),
                },
            })
            .await?;

        tracing::info!(
            order_id = order.id,
            product = %order.product,
            quantity = order.quantity,
            priced = order.total_price.is_some(),
            "Order placed"
        );

        let outcome = self.apply_stock_effect(&order, effect).await;

        self.recorder
            .record_activity(
                NewActivity::new(actions::ORDER_CREATED, entities::ORDER, Some(order.id)).details(
                    serde_json::json!({
                        "customer_name": order.customer_name,
                        "product": order.product,
                        "quantity": order.quantity,
                        "total_price": order.total_price,
                        "stock": outcome.as_str(),
                    }),
                ),
            )
            .await;

        if let Err(e) = self.notifier.order_placed(&order).await {
            tracing::warn!(order_id = order.id, "Failed to send order notification: {}", e);
        }

        Ok(order)
    }

    /// The order row already exists here, so stock problems are logged, not returned
    async fn apply_stock_effect(&self, order: &Order, effect: StockEffect) -> StockOutcome {
        match effect {
            StockEffect::Unpriced => {
                tracing::info!(
                    order_id = order.id,
                    product = %order.product,
                    "No stock item matches the ordered product; order left unpriced"
                );
                StockOutcome::Unpriced
            }
            StockEffect::Backorder {
                stock_id,
                available,
                requested,
            } => {
                tracing::warn!(
                    order_id = order.id,
                    stock_id,
                    available,
                    requested,
                    "Insufficient stock for order; stock left unchanged"
                );
                StockOutcome::Backordered
            }
            StockEffect::Decrement { stock_id, quantity } => {
                match self.adjuster.apply(stock_id, -quantity, None).await {
                    Ok(Some(updated)) => {
                        self.adjuster
                            .after_change(
                                &updated,
                                -quantity,
                                TransactionType::Out,
                                None,
                                Some(format!("Order #{}", order.id)),
                            )
                            .await;
                        StockOutcome::Decremented
                    }
                    Ok(None) => {
                        tracing::warn!(
                            order_id = order.id,
                            stock_id,
                            quantity,
                            "Stock decrement refused after lookup; stock left unchanged"
                        );
                        StockOutcome::DecrementRefused
                    }
                    Err(e) => {
                        tracing::warn!(
                            order_id = order.id,
                            stock_id,
                            quantity,
                            "Stock decrement failed; stock left unchanged: {}",
                            e
                        );
                        StockOutcome::DecrementFailed
                    }
                }
            }
        }
    }

    pub async fn get(&self, id: i64) -> AppResult<Order> {
        self.orders
            .find_order(id)
            .await?
            .ok_or_else(|| AppError::not_found("Order", id))
    }

    pub async fn list(&self, query: &OrderQuery) -> AppResult<Page<Order>> {
        self.orders.list_orders(query).await
    }

    pub async fn stats(&self) -> AppResult<OrderStats> {
        self.orders.order_stats().await
    }

    /// Update status, notes or price. Any status may follow any other.
    pub async fn update(&self, id: i64, input: UpdateOrderInput, actor: Option<i64>) -> AppResult<Order> {
        if let Some(price) = input.total_price {
            validation::validate_price(price).map_err(|m| AppError::validation("total_price", m))?;
        }

        let current = self.get(id).await?;
        let status_change = input.status.filter(|s| *s != current.status);

        let history_entry = status_change.map(|status| StatusChange {
            status,
            changed_at: Utc::now(),
            changed_by: actor,
            note: input.status_note.clone(),
        });

        let updated = self
            .orders
            .update_order(
                id,
                OrderChanges {
                    status: status_change,
                    notes: input.notes,
                    total_price: input.total_price,
                    history_entry,
                    updated_by: actor,
                },
            )
            .await?
            .ok_or_else(|| AppError::not_found("Order", id))?;

        let activity = match status_change {
            Some(status) => {
                tracing::info!(order_id = id, from = %current.status, to = %status, "Order status changed");
                NewActivity::new(actions::ORDER_STATUS_CHANGED, entities::ORDER, Some(id)).details(
                    serde_json::json!({ "from": current.status, "to": status }),
                )
            }
            None => NewActivity::new(actions::ORDER_UPDATED, entities::ORDER, Some(id)).details(
                serde_json::json!({
                    "notes": updated.notes,
                    "total_price": updated.total_price,
                }),
            ),
        };
        self.recorder.record_activity(activity.by(actor)).await;

        Ok(updated)
    }

    pub async fn delete(&self, id: i64, actor: Option<i64>) -> AppResult<()> {
        let order = self.get(id).await?;
        if !self.orders.delete_order(id).await? {
            return Err(AppError::not_found("Order", id));
        }

        tracing::info!(order_id = id, "Order deleted");

        self.recorder
            .record_activity(
                NewActivity::new(actions::ORDER_DELETED, entities::ORDER, Some(id))
                    .by(actor)
                    .details(serde_json::json!({
                        "customer_name": order.customer_name,
                        "product": order.product,
                        "quantity": order.quantity,
                        "status": order.status,
                    })),
            )
            .await;

        Ok(())
    }
}
