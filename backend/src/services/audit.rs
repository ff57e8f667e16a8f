//! Ledger and activity log: best-effort writes and paginated reads

use std::sync::Arc;

use shared::{
    ActivityLog, ListRange, NewActivity, NewStockTransaction, Page, StockTransaction,
};

use crate::error::{AppError, AppResult};
use crate::store::{ActivityQuery, AuditStore, StockStore};

/// Appends ledger entries and activity rows after a change has committed.
///
/// Failures are logged and swallowed: the change they describe already happened.
#[derive(Clone)]
pub struct AuditRecorder {
    audit: Arc<dyn AuditStore>,
}

impl AuditRecorder {
    pub fn new(audit: Arc<dyn AuditStore>) -> Self {
        Self { audit }
    }

    pub async fn record_transaction(&self, tx: NewStockTransaction) -> Option<StockTransaction> {
        if !tx.is_consistent() {
            tracing::warn!(stock_id = tx.stock_id, "Refusing inconsistent ledger entry: {:?}", tx);
            return None;
        }

        let stock_id = tx.stock_id;
        match self.audit.insert_transaction(tx).await {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(stock_id, "Failed to record stock transaction: {}", e);
                None
            }
        }
    }

    pub async fn record_activity(&self, entry: NewActivity) -> Option<ActivityLog> {
        let action = entry.action_type.clone();
        match self.audit.insert_activity(entry).await {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(action = %action, "Failed to record activity: {}", e);
                None
            }
        }
    }
}

/// Read side of the audit trail
#[derive(Clone)]
pub struct AuditService {
    audit: Arc<dyn AuditStore>,
    stocks: Arc<dyn StockStore>,
}

impl AuditService {
    pub fn new(audit: Arc<dyn AuditStore>, stocks: Arc<dyn StockStore>) -> Self {
        Self { audit, stocks }
    }

    pub async fn list_activity(&self, query: &ActivityQuery) -> AppResult<Page<ActivityLog>> {
        self.audit.list_activity(query).await
    }

    /// Activity for one entity, e.g. every change to a stock item
    pub async fn activity_for(
        &self,
        entity_type: &str,
        entity_id: i64,
        mut query: ActivityQuery,
    ) -> AppResult<Page<ActivityLog>> {
        query.entity_type = Some(entity_type.to_string());
        query.entity_id = Some(entity_id);
        self.audit.list_activity(&query).await
    }

    /// Ledger of one stock item, newest first
    pub async fn transactions_for(
        &self,
        stock_id: i64,
        range: ListRange,
    ) -> AppResult<Page<StockTransaction>> {
        if self.stocks.find_stock(stock_id).await?.is_none() {
            return Err(AppError::not_found("Stock", stock_id));
        }
        self.audit.list_transactions(stock_id, range).await
    }
}
