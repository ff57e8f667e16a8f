//! Low-stock policy and threshold resolution

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::StockCategory;

/// Whether an item with this quantity is below its threshold.
///
/// A threshold of 0 never reports low stock since quantities are never negative.
pub fn is_low_stock(quantity: i32, minimum_threshold: i32) -> bool {
    quantity < minimum_threshold
}

/// True when a change moved an item from above its threshold to below it
pub fn crossed_into_low_stock(quantity_before: i32, quantity_after: i32, minimum_threshold: i32) -> bool {
    !is_low_stock(quantity_before, minimum_threshold) && is_low_stock(quantity_after, minimum_threshold)
}

/// Threshold table used when a category has no stored setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultThresholds {
    thresholds: BTreeMap<StockCategory, i32>,
}

impl Default for DefaultThresholds {
    fn default() -> Self {
        Self {
            thresholds: BTreeMap::from([
                (StockCategory::Injera, 100),
                (StockCategory::TeffFlour, 50),
                (StockCategory::Ingredients, 20),
                (StockCategory::Packaging, 200),
            ]),
        }
    }
}

impl DefaultThresholds {
    /// A table with no entries; every lookup falls through to 0
    pub fn empty() -> Self {
        Self {
            thresholds: BTreeMap::new(),
        }
    }

    pub fn get(&self, category: StockCategory) -> Option<i32> {
        self.thresholds.get(&category).copied()
    }

    /// Replace the default for one category. Negative values are clamped to 0.
    pub fn with(mut self, category: StockCategory, threshold: i32) -> Self {
        self.thresholds.insert(category, threshold.max(0));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (StockCategory, i32)> + '_ {
        self.thresholds.iter().map(|(c, t)| (*c, *t))
    }
}

/// Where a resolved threshold came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdSource {
    Explicit,
    Setting,
    Default,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedThreshold {
    pub category: StockCategory,
    pub minimum_threshold: i32,
    pub source: ThresholdSource,
}

/// Resolve the threshold for a category: explicit value, stored setting,
/// default table, then 0.
pub fn resolve_threshold(
    category: StockCategory,
    explicit: Option<i32>,
    stored: Option<i32>,
    defaults: &DefaultThresholds,
) -> ResolvedThreshold {
    let (minimum_threshold, source) = if let Some(value) = explicit {
        (value, ThresholdSource::Explicit)
    } else if let Some(value) = stored {
        (value, ThresholdSource::Setting)
    } else if let Some(value) = defaults.get(category) {
        (value, ThresholdSource::Default)
    } else {
        (0, ThresholdSource::Fallback)
    };

    ResolvedThreshold {
        category,
        minimum_threshold,
        source,
    }
}
