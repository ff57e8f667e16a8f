//! Stock item management: catalogue edits, quantity changes and dashboards

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    actions, entities, validation, ListRange, NewActivity, NewStockTransaction, Page, StockCategory,
    StockItem, StockStats, StockTransaction, TransactionType,
};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::adjuster::{AdjustedStock, AdjustmentRequest, StockAdjuster};
use crate::services::audit::{AuditRecorder, AuditService};
use crate::services::settings::SettingsService;
use crate::store::{NewStock, StockChanges, StockQuery, StockStore};

const DEFAULT_UNIT: &str = "piece";

/// Input for creating a stock item
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStockInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: i32,
    #[validate(length(min = 1, max = 50, message = "Unit must be 1-50 characters"))]
    pub unit: Option<String>,
    pub price: Decimal,
    pub category: StockCategory,
    pub is_active: Option<bool>,
    /// Falls back to the category setting, then the default table
    pub minimum_threshold: Option<i32>,
}

/// Field edits; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateStockInput {
    #[validate(length(min = 1, max = 255, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i32>,
    #[validate(length(min = 1, max = 50, message = "Unit must be 1-50 characters"))]
    pub unit: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<StockCategory>,
    pub is_active: Option<bool>,
    pub minimum_threshold: Option<i32>,
    /// Ledger reason when the quantity changes
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustQuantityInput {
    pub adjustment: i32,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuickOperation {
    Add,
    Subtract,
}

#[derive(Debug, Deserialize)]
pub struct QuickAdjustInput {
    pub amount: i32,
    pub operation: QuickOperation,
    pub reason: Option<String>,
}

impl QuickAdjustInput {
    /// Signed change and the ledger type it is recorded under
    fn signed_change(&self) -> AppResult<(i32, TransactionType)> {
        if self.amount <= 0 {
            return Err(AppError::validation("amount", "Amount must be greater than zero"));
        }
        Ok(match self.operation {
            QuickOperation::Add => (self.amount, TransactionType::In),
            QuickOperation::Subtract => (-self.amount, TransactionType::Out),
        })
    }
}

#[derive(Clone)]
pub struct StockService {
    stocks: Arc<dyn StockStore>,
    adjuster: StockAdjuster,
    recorder: AuditRecorder,
    settings: SettingsService,
    audit: AuditService,
}

impl StockService {
    pub fn new(
        stocks: Arc<dyn StockStore>,
        adjuster: StockAdjuster,
        recorder: AuditRecorder,
        settings: SettingsService,
        audit: AuditService,
    ) -> Self {
        Self {
            stocks,
            adjuster,
            recorder,
            settings,
            audit,
        }
    }

    pub async fn get(&self, id: i64) -> AppResult<StockItem> {
        self.stocks
            .find_stock(id)
            .await?
            .ok_or_else(|| AppError::not_found("Stock", id))
    }

    pub async fn list(&self, query: &StockQuery) -> AppResult<Page<StockItem>> {
        self.stocks.list_stocks(query).await
    }

    pub async fn low_stock(&self) -> AppResult<Vec<StockItem>> {
        self.stocks.low_stock_items().await
    }

    pub async fn stats(&self) -> AppResult<StockStats> {
        self.stocks.stock_stats().await
    }

    pub async fn transactions(&self, id: i64, range: ListRange) -> AppResult<Page<StockTransaction>> {
        self.audit.transactions_for(id, range).await
    }

    /// Create an item, seeding its threshold and opening the ledger
    pub async fn create(&self, input: CreateStockInput, actor: Option<i64>) -> AppResult<StockItem> {
        input.validate()?;
        validation::validate_quantity(input.quantity).map_err(|m| AppError::validation("quantity", m))?;
        validation::validate_price(input.price).map_err(|m| AppError::validation("price", m))?;
        if let Some(threshold) = input.minimum_threshold {
            validation::validate_threshold(threshold)
                .map_err(|m| AppError::validation("minimum_threshold", m))?;
        }

        let threshold = self
            .settings
            .threshold_for(input.category, input.minimum_threshold)
            .await?;

        let created = self
            .stocks
            .insert_stock(NewStock {
                name: input.name.trim().to_string(),
                description: input.description,
                quantity: input.quantity,
                unit: input.unit.unwrap_or_else(|| DEFAULT_UNIT.to_string()),
                price: input.price,
                category: input.category,
                is_active: input.is_active.unwrap_or(true),
                minimum_threshold: threshold.minimum_threshold,
                created_by: actor,
            })
            .await?;

        tracing::info!(
            stock_id = created.id,
            name = %created.name,
            minimum_threshold = created.minimum_threshold,
            threshold_source = ?threshold.source,
            "Stock item created"
        );

        if created.quantity > 0 {
            self.recorder
                .record_transaction(NewStockTransaction::initial(&created, actor))
                .await;
        }

        self.recorder
            .record_activity(
                NewActivity::new(actions::STOCK_CREATED, entities::STOCK, Some(created.id))
                    .by(actor)
                    .details(serde_json::json!({
                        "name": created.name,
                        "category": created.category,
                        "quantity": created.quantity,
                        "minimum_threshold": created.minimum_threshold,
                        "threshold_source": threshold.source,
                    })),
            )
            .await;

        Ok(created)
    }

    /// Edit fields; a quantity change is recorded as an in/out ledger entry
    pub async fn update(&self, id: i64, input: UpdateStockInput, actor: Option<i64>) -> AppResult<StockItem> {
        input.validate()?;
        if let Some(quantity) = input.quantity {
            validation::validate_quantity(quantity).map_err(|m| AppError::validation("quantity", m))?;
        }
        if let Some(price) = input.price {
            validation::validate_price(price).map_err(|m| AppError::validation("price", m))?;
        }
        if let Some(threshold) = input.minimum_threshold {
            validation::validate_threshold(threshold)
                .map_err(|m| AppError::validation("minimum_threshold", m))?;
        }

        let reason = input.reason.clone();
        let changes = StockChanges {
            name: input.name.map(|n| n.trim().to_string()),
            description: input.description,
            quantity: input.quantity,
            unit: input.unit,
            price: input.price,
            category: input.category,
            is_active: input.is_active,
            minimum_threshold: input.minimum_threshold,
        };
        let changed_fields = changed_field_names(&changes);

        let updated = self
            .stocks
            .update_stock(id, changes)
            .await?
            .ok_or_else(|| AppError::not_found("Stock", id))?;
        let stock = updated.stock;
        let difference = stock.quantity - updated.previous_quantity;

        if difference != 0 {
            self.adjuster
                .after_change(
                    &stock,
                    difference,
                    TransactionType::for_change(difference),
                    actor,
                    Some(reason.unwrap_or_else(|| "Manual update".to_string())),
                )
                .await;
        }

        self.recorder
            .record_activity(
                NewActivity::new(actions::STOCK_UPDATED, entities::STOCK, Some(stock.id))
                    .by(actor)
                    .details(serde_json::json!({
                        "fields": changed_fields,
                        "quantity_before": updated.previous_quantity,
                        "quantity_after": stock.quantity,
                    })),
            )
            .await;

        Ok(stock)
    }

    /// Direct signed adjustment, recorded as `adjustment`
    pub async fn adjust(&self, id: i64, input: AdjustQuantityInput, actor: Option<i64>) -> AppResult<AdjustedStock> {
        validation::validate_adjustment(input.adjustment)
            .map_err(|m| AppError::validation("adjustment", m))?;

        self.apply(AdjustmentRequest {
            stock_id: id,
            change: input.adjustment,
            transaction_type: TransactionType::Adjustment,
            reason: input.reason,
            performed_by: actor,
        })
        .await
    }

    /// Add or subtract a positive amount, recorded as `in` or `out`
    pub async fn quick_adjust(&self, id: i64, input: QuickAdjustInput, actor: Option<i64>) -> AppResult<AdjustedStock> {
        let (change, transaction_type) = input.signed_change()?;

        self.apply(AdjustmentRequest {
            stock_id: id,
            change,
            transaction_type,
            reason: input.reason,
            performed_by: actor,
        })
        .await
    }

    /// Soft delete; the ledger stays intact
    pub async fn deactivate(&self, id: i64, actor: Option<i64>) -> AppResult<StockItem> {
        let stock = self
            .stocks
            .deactivate_stock(id)
            .await?
            .ok_or_else(|| AppError::not_found("Stock", id))?;

        tracing::info!(stock_id = id, "Stock item deactivated");

        self.recorder
            .record_activity(
                NewActivity::new(actions::STOCK_DEACTIVATED, entities::STOCK, Some(id))
                    .by(actor)
                    .details(serde_json::json!({ "name": stock.name })),
            )
            .await;

        Ok(stock)
    }

    async fn apply(&self, request: AdjustmentRequest) -> AppResult<AdjustedStock> {
        let change = request.change;
        let transaction_type = request.transaction_type;
        let reason = request.reason.clone();
        let actor = request.performed_by;

        let adjusted = self.adjuster.adjust(request).await?;

        self.recorder
            .record_activity(
                NewActivity::new(actions::STOCK_ADJUSTED, entities::STOCK, Some(adjusted.stock.id))
                    .by(actor)
                    .details(serde_json::json!({
                        "type": transaction_type,
                        "change": change,
                        "quantity_before": adjusted.stock.quantity - change,
                        "quantity_after": adjusted.stock.quantity,
                        "reason": reason,
                    })),
            )
            .await;

        Ok(adjusted)
    }
}

fn changed_field_names(changes: &StockChanges) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if changes.name.is_some() {
        fields.push("name");
    }
    if changes.description.is_some() {
        fields.push("description");
    }
    if changes.quantity.is_some() {
        fields.push("quantity");
    }
    if changes.unit.is_some() {
        fields.push("unit");
    }
    if changes.price.is_some() {
        fields.push("price");
    }
    if changes.category.is_some() {
        fields.push("category");
    }
    if changes.is_active.is_some() {
        fields.push("is_active");
    }
    if changes.minimum_threshold.is_some() {
        fields.push("minimum_threshold");
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quick_adjust_direction() {
        let add = QuickAdjustInput {
            amount: 5,
            operation: QuickOperation::Add,
            reason: None,
        };
        assert_eq!(add.signed_change().unwrap(), (5, TransactionType::In));

        let subtract = QuickAdjustInput {
            amount: 5,
            operation: QuickOperation::Subtract,
            reason: None,
        };
        assert_eq!(subtract.signed_change().unwrap(), (-5, TransactionType::Out));
    }

    #[test]
    fn test_quick_adjust_rejects_non_positive_amount() {
        let input = QuickAdjustInput {
            amount: 0,
            operation: QuickOperation::Add,
            reason: None,
        };
        assert!(input.signed_change().is_err());
    }

    #[test]
    fn test_changed_field_names() {
        let changes = StockChanges {
            quantity: Some(3),
            price: Some(Decimal::ONE),
            ..Default::default()
        };
        assert_eq!(changed_field_names(&changes), vec!["quantity", "price"]);
    }
}
