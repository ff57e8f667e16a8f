//! Activity log models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A generic audit trail entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityLog {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action_type: String,
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// An activity entry waiting to be appended
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub user_id: Option<i64>,
    pub action_type: String,
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub details: serde_json::Value,
}

impl NewActivity {
    pub fn new(action_type: &str, entity_type: &str, entity_id: Option<i64>) -> Self {
        Self {
            user_id: None,
            action_type: action_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            details: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn by(mut self, user_id: Option<i64>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Action tags written by the back-office
pub mod actions {
    pub const STOCK_CREATED: &str = "stock_created";
    pub const STOCK_UPDATED: &str = "stock_updated";
    pub const STOCK_ADJUSTED: &str = "stock_adjusted";
    pub const STOCK_DEACTIVATED: &str = "stock_deactivated";
    pub const ORDER_CREATED: &str = "order_created";
    pub const ORDER_UPDATED: &str = "order_updated";
    pub const ORDER_STATUS_CHANGED: &str = "order_status_changed";
    pub const ORDER_DELETED: &str = "order_deleted";
    pub const SETTING_UPDATED: &str = "stock_setting_updated";
    pub const USER_CREATED: &str = "user_created";
}

/// Entity type tags
pub mod entities {
    pub const STOCK: &str = "stock";
    pub const ORDER: &str = "order";
    pub const STOCK_SETTING: &str = "stock_setting";
    pub const USER: &str = "user";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let entry = NewActivity::new(actions::STOCK_CREATED, entities::STOCK, Some(3))
            .by(Some(9))
            .details(serde_json::json!({ "name": "Injera" }));

        assert_eq!(entry.action_type, "stock_created");
        assert_eq!(entry.entity_id, Some(3));
        assert_eq!(entry.user_id, Some(9));
        assert_eq!(entry.details["name"], "Injera");
    }

    #[test]
    fn test_default_details_is_empty_object() {
        let entry = NewActivity::new(actions::ORDER_DELETED, entities::ORDER, Some(1));
        assert!(entry.details.as_object().map(|o| o.is_empty()).unwrap_or(false));
    }
}
