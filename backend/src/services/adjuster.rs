//! Stock quantity adjuster
//!
//! Every quantity change that can race with another request goes through
//! [`StockAdjuster::apply`], a single conditional write that refuses to take
//! an item below zero. The bookkeeping that follows a successful change
//! (ledger entry, low-stock alert) lives in [`StockAdjuster::after_change`].

use std::sync::Arc;

use serde::Serialize;
use shared::{crossed_into_low_stock, NewStockTransaction, StockItem, StockTransaction, TransactionType};

use crate::error::{AppError, AppResult};
use crate::services::audit::AuditRecorder;
use crate::services::notification::Notifier;
use crate::store::StockStore;

/// A requested change to one item's quantity
#[derive(Debug, Clone)]
pub struct AdjustmentRequest {
    pub stock_id: i64,
    pub change: i32,
    pub transaction_type: TransactionType,
    pub reason: Option<String>,
    pub performed_by: Option<i64>,
}

/// The item after a successful adjustment and the ledger entry written for it
#[derive(Debug, Clone, Serialize)]
pub struct AdjustedStock {
    pub stock: StockItem,
    /// Absent when the ledger write failed; the adjustment itself stands
    pub transaction: Option<StockTransaction>,
}

#[derive(Clone)]
pub struct StockAdjuster {
    stocks: Arc<dyn StockStore>,
    recorder: AuditRecorder,
    notifier: Arc<dyn Notifier>,
}

impl StockAdjuster {
    pub fn new(stocks: Arc<dyn StockStore>, recorder: AuditRecorder, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            stocks,
            recorder,
            notifier,
        }
    }

    /// Apply `quantity + change` when the result stays non-negative.
    ///
    /// `None` means the id is unknown or the change was refused.
    pub async fn apply(&self, stock_id: i64, change: i32, actor: Option<i64>) -> AppResult<Option<StockItem>> {
        self.stocks.adjust_quantity(stock_id, change, actor).await
    }

    /// Apply a change and record it, telling a missing item apart from a refused change
    pub async fn adjust(&self, request: AdjustmentRequest) -> AppResult<AdjustedStock> {
        let Some(updated) = self
            .apply(request.stock_id, request.change, request.performed_by)
            .await?
        else {
            return Err(self.explain_refusal(request.stock_id, request.change).await);
        };

        let transaction = self
            .after_change(
                &updated,
                request.change,
                request.transaction_type,
                request.performed_by,
                request.reason,
            )
            .await;

        Ok(AdjustedStock {
            stock: updated,
            transaction,
        })
    }

    /// Ledger entry and low-stock alert for a change that already committed
    pub async fn after_change(
        &self,
        updated: &StockItem,
        change: i32,
        transaction_type: TransactionType,
        performed_by: Option<i64>,
        reason: Option<String>,
    ) -> Option<StockTransaction> {
        let entry = NewStockTransaction::after_change(updated, change, transaction_type, performed_by, reason);
        let crossed = crossed_into_low_stock(entry.quantity_before, entry.quantity_after, updated.minimum_threshold);

        let transaction = self.recorder.record_transaction(entry).await;

        if crossed && updated.is_active {
            tracing::info!(
                stock_id = updated.id,
                quantity = updated.quantity,
                minimum_threshold = updated.minimum_threshold,
                "Stock item is now below its threshold"
            );
            if let Err(e) = self.notifier.low_stock(updated).await {
                tracing::warn!(stock_id = updated.id, "Failed to send low-stock alert: {}", e);
            }
        }

        transaction
    }

    async fn explain_refusal(&self, stock_id: i64, change: i32) -> AppError {
        match self.stocks.find_stock(stock_id).await {
            Ok(Some(current)) => {
                tracing::debug!(stock_id, quantity = current.quantity, change, "Adjustment refused");
                AppError::InsufficientStock(format!(
                    "{} has {} {} on hand; cannot apply {}",
                    current.name, current.quantity, current.unit, change
                ))
            }
            Ok(None) => AppError::not_found("Stock", stock_id),
            Err(e) => e,
        }
    }
}
