//! Order normalisation and pricing rules

use rust_decimal::Decimal;

use crate::models::StockItem;
use crate::validation::max_price;

/// Product ordered when the form leaves the field blank
pub const DEFAULT_PRODUCT: &str = "Injera";

/// Requested quantity, at least 1
pub fn normalize_quantity(requested: Option<i32>) -> i32 {
    requested.unwrap_or(1).max(1)
}

/// Product name as submitted, or [`DEFAULT_PRODUCT`] when blank.
///
/// Non-blank names are kept verbatim; stock lookup is an exact, case-sensitive match.
pub fn normalize_product(product: Option<&str>) -> String {
    match product {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => DEFAULT_PRODUCT.to_string(),
    }
}

/// Order total, or `None` when it does not fit a stored price
pub fn price_order(unit_price: Decimal, quantity: i32) -> Option<Decimal> {
    unit_price
        .checked_mul(Decimal::from(quantity))
        .filter(|total| *total <= max_price())
}

/// What placing an order does to stock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockEffect {
    /// No stock item carries the product name
    Unpriced,
    /// Enough stock on hand; decrement by the ordered quantity
    Decrement { stock_id: i64, quantity: i32 },
    /// Not enough stock; the order is accepted and stock is left alone
    Backorder {
        stock_id: i64,
        available: i32,
        requested: i32,
    },
}

pub fn plan_stock_effect(stock: Option<&StockItem>, quantity: i32) -> StockEffect {
    match stock {
        None => StockEffect::Unpriced,
        Some(item) if item.quantity >= quantity => StockEffect::Decrement {
            stock_id: item.id,
            quantity,
        },
        Some(item) => StockEffect::Backorder {
            stock_id: item.id,
            available: item.quantity,
            requested: quantity,
        },
    }
}
