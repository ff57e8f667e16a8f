//! Per-category stock settings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StockCategory;

/// Stored threshold override for one category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockSetting {
    pub category: StockCategory,
    pub minimum_threshold: i32,
    pub updated_by: Option<i64>,
    pub updated_at: DateTime<Utc>,
}
