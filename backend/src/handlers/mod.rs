//! HTTP handlers for the injera back-office API
//!
//! List endpoints follow the React-Admin simple REST protocol: `range`,
//! `sort` and `filter` arrive as JSON-encoded query parameters and the
//! response carries a `Content-Range` header.

use std::collections::HashMap;

use axum::{
    http::header::CONTENT_RANGE,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared::{filter_bool, filter_str, parse_filter, ListRange, Page, SortSpec};

use crate::error::AppResult;

pub mod activity;
pub mod auth;
pub mod health;
pub mod order;
pub mod settings;
pub mod stock;

pub use activity::*;
pub use auth::*;
pub use health::*;
pub use order::*;
pub use settings::*;
pub use stock::*;

/// Raw list query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub range: Option<String>,
    pub sort: Option<String>,
    pub filter: Option<String>,
    /// Plain parameters such as `isLowStock=true`; merged over `filter`
    #[serde(flatten)]
    pub extra: HashMap<String, String>,
}

/// Parsed list query
#[derive(Debug, Clone)]
pub struct ListRequest {
    pub range: ListRange,
    pub sort: SortSpec,
    pub filter: Map<String, Value>,
}

impl ListParams {
    /// Parse the parameters, keeping `sort` only for a whitelisted field
    pub fn parse(self, allowed_sort: &[&str], fallback: SortSpec) -> AppResult<ListRequest> {
        let range = ListRange::parse(self.range.as_deref())?;
        let sort = SortSpec::restrict(SortSpec::parse(self.sort.as_deref())?, allowed_sort, fallback);

        let mut filter = parse_filter(self.filter.as_deref())?;
        for (key, value) in self.extra {
            filter.insert(key, Value::String(value));
        }

        Ok(ListRequest { range, sort, filter })
    }
}

/// Boolean filter under the first of `keys` that is present
pub(crate) fn bool_filter(filter: &Map<String, Value>, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|key| filter_bool(filter, key))
}

/// String filter under the first of `keys` that is present
pub(crate) fn str_filter<'a>(filter: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| filter_str(filter, key))
}

/// JSON array response with a `Content-Range` header
pub fn paginated<T: Serialize>(page: Page<T>, resource: &str) -> Response {
    let content_range = page.content_range(resource);
    ([(CONTENT_RANGE, content_range)], Json(page.items)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::SortOrder;

    #[test]
    fn test_plain_params_override_filter() {
        let params = ListParams {
            range: Some("[0,9]".to_string()),
            sort: None,
            filter: Some(r#"{"isLowStock":false,"category":"Injera"}"#.to_string()),
            extra: HashMap::from([("isLowStock".to_string(), "true".to_string())]),
        };
        let request = params
            .parse(&["id"], SortSpec::new("id", SortOrder::Desc))
            .unwrap();
        assert_eq!(request.range.limit, 10);
        assert_eq!(shared::filter_bool(&request.filter, "isLowStock"), Some(true));
        assert_eq!(shared::filter_str(&request.filter, "category"), Some("Injera"));
    }

    #[test]
    fn test_unknown_sort_field_falls_back() {
        let params = ListParams {
            sort: Some(r#"["password_hash","ASC"]"#.to_string()),
            ..Default::default()
        };
        let request = params
            .parse(&["id", "name"], SortSpec::new("id", SortOrder::Desc))
            .unwrap();
        assert_eq!(request.sort, SortSpec::new("id", SortOrder::Desc));
    }
}
