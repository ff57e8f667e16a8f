//! Stock item and stock ledger models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::UnknownVariant;

/// A single inventory SKU
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockItem {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub unit: String,
    pub price: Decimal,
    pub category: StockCategory,
    pub is_active: bool,
    pub minimum_threshold: i32,
    /// Always `quantity < minimum_threshold`; never set on its own
    pub is_low_stock: bool,
    pub last_restocked_by: Option<i64>,
    pub last_restocked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockItem {
    /// Value of the stock on hand at the current unit price
    pub fn stock_value(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.quantity))
    }
}

/// Product categories. The set is closed; thresholds are configured per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StockCategory {
    #[serde(rename = "Injera")]
    Injera,
    #[serde(rename = "Teff Flour")]
    TeffFlour,
    #[serde(rename = "Ingredients")]
    Ingredients,
    #[serde(rename = "Packaging")]
    Packaging,
}

impl StockCategory {
    pub const ALL: [StockCategory; 4] = [
        StockCategory::Injera,
        StockCategory::TeffFlour,
        StockCategory::Ingredients,
        StockCategory::Packaging,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StockCategory::Injera => "Injera",
            StockCategory::TeffFlour => "Teff Flour",
            StockCategory::Ingredients => "Ingredients",
            StockCategory::Packaging => "Packaging",
        }
    }
}

impl std::fmt::Display for StockCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StockCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StockCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("stock category", s))
    }
}

/// Kind of quantity change recorded in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    In,
    Out,
    Adjustment,
    Initial,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::In => "in",
            TransactionType::Out => "out",
            TransactionType::Adjustment => "adjustment",
            TransactionType::Initial => "initial",
        }
    }

    /// `in` for additions, `out` for removals
    pub fn for_change(quantity_change: i32) -> Self {
        if quantity_change > 0 {
            TransactionType::In
        } else {
            TransactionType::Out
        }
    }
}

impl FromStr for TransactionType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(TransactionType::In),
            "out" => Ok(TransactionType::Out),
            "adjustment" => Ok(TransactionType::Adjustment),
            "initial" => Ok(TransactionType::Initial),
            other => Err(UnknownVariant::new("transaction type", other)),
        }
    }
}

/// Immutable ledger entry for one quantity change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockTransaction {
    pub id: i64,
    pub stock_id: i64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub quantity_change: i32,
    pub quantity_before: i32,
    pub quantity_after: i32,
    pub performed_by: Option<i64>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A ledger entry waiting to be appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStockTransaction {
    pub stock_id: i64,
    pub transaction_type: TransactionType,
    pub quantity_change: i32,
    pub quantity_before: i32,
    pub quantity_after: i32,
    pub performed_by: Option<i64>,
    pub reason: Option<String>,
}

impl NewStockTransaction {
    /// Build the entry for a change that has already been applied.
    ///
    /// `updated` is the row as returned by the conditional update, so
    /// `quantity_after` is exactly the stored quantity and `quantity_before`
    /// is derived from it.
    pub fn after_change(
        updated: &StockItem,
        quantity_change: i32,
        transaction_type: TransactionType,
        performed_by: Option<i64>,
        reason: Option<String>,
    ) -> Self {
        Self {
            stock_id: updated.id,
            transaction_type,
            quantity_change,
            quantity_before: updated.quantity - quantity_change,
            quantity_after: updated.quantity,
            performed_by,
            reason,
        }
    }

    /// Entry for the opening balance of a newly created item
    pub fn initial(created: &StockItem, performed_by: Option<i64>) -> Self {
        Self::after_change(
            created,
            created.quantity,
            TransactionType::Initial,
            performed_by,
            Some("Initial stock".to_string()),
        )
    }

    pub fn is_consistent(&self) -> bool {
        self.quantity_before.checked_add(self.quantity_change) == Some(self.quantity_after)
    }
}

/// Aggregate figures for the stock dashboard
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StockStats {
    pub total_items: i64,
    pub active_items: i64,
    pub low_stock_count: i64,
    pub total_quantity: i64,
    pub total_value: Decimal,
    pub by_category: Vec<CategoryStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryStats {
    pub category: StockCategory,
    pub items: i64,
    pub quantity: i64,
    pub low_stock_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i32) -> StockItem {
        let now = Utc::now();
        StockItem {
            id: 7,
            name: "Injera".to_string(),
            description: None,
            quantity,
            unit: "pieces".to_string(),
            price: Decimal::new(250, 2),
            category: StockCategory::Injera,
            is_active: true,
            minimum_threshold: 50,
            is_low_stock: quantity < 50,
            last_restocked_by: None,
            last_restocked_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_category_round_trips_display_name() {
        for category in StockCategory::ALL {
            assert_eq!(category.as_str().parse::<StockCategory>().unwrap(), category);
        }
        assert!("injera".parse::<StockCategory>().is_err());
    }

    #[test]
    fn test_category_serializes_with_spaces() {
        let json = serde_json::to_string(&StockCategory::TeffFlour).unwrap();
        assert_eq!(json, "\"Teff Flour\"");
    }

    #[test]
    fn test_transaction_type_for_change() {
        assert_eq!(TransactionType::for_change(5), TransactionType::In);
        assert_eq!(TransactionType::for_change(-5), TransactionType::Out);
    }

    #[test]
    fn test_after_change_derives_before() {
        let updated = item(40);
        let tx = NewStockTransaction::after_change(
            &updated,
            -60,
            TransactionType::Adjustment,
            Some(1),
            None,
        );
        assert_eq!(tx.quantity_before, 100);
        assert_eq!(tx.quantity_after, 40);
        assert!(tx.is_consistent());
    }

    #[test]
    fn test_initial_transaction() {
        let created = item(30);
        let tx = NewStockTransaction::initial(&created, None);
        assert_eq!(tx.transaction_type, TransactionType::Initial);
        assert_eq!(tx.quantity_before, 0);
        assert_eq!(tx.quantity_change, 30);
    }

    #[test]
    fn test_stock_value() {
        assert_eq!(item(4).stock_value(), Decimal::new(1000, 2));

        let mut oversized = item(2);
        oversized.price = Decimal::MAX;
        assert_eq!(oversized.stock_value(), Decimal::MAX);
    }
}
