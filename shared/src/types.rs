//! List query types shared by every collection endpoint
//!
//! The admin dashboard speaks the React-Admin "simple REST" dialect:
//! `range=[0,24]`, `sort=["id","DESC"]` and `filter={...}` as JSON-encoded
//! query parameters, answered with a `Content-Range` header.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: i64 = 25;
pub const MAX_PAGE_SIZE: i64 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListParamError {
    #[error("invalid range: {0}")]
    InvalidRange(String),
    #[error("invalid sort: {0}")]
    InvalidSort(String),
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
}

/// Offset/limit window requested by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRange {
    pub offset: i64,
    pub limit: i64,
}

impl Default for ListRange {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ListRange {
    /// Parse an inclusive `[start,end]` pair
    pub fn parse(raw: Option<&str>) -> Result<Self, ListParamError> {
        let Some(raw) = raw else {
            return Ok(Self::default());
        };

        let [start, end]: [i64; 2] =
            serde_json::from_str(raw).map_err(|_| ListParamError::InvalidRange(raw.to_string()))?;

        if start < 0 || end < start {
            return Err(ListParamError::InvalidRange(raw.to_string()));
        }

        Ok(Self {
            offset: start,
            limit: end.saturating_sub(start).saturating_add(1).min(MAX_PAGE_SIZE),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Requested sort column and direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(field: &str, order: SortOrder) -> Self {
        Self {
            field: field.to_string(),
            order,
        }
    }

    /// Parse `["field","ASC"|"DESC"]`
    pub fn parse(raw: Option<&str>) -> Result<Option<Self>, ListParamError> {
        let Some(raw) = raw else {
            return Ok(None);
        };

        let (field, order): (String, String) =
            serde_json::from_str(raw).map_err(|_| ListParamError::InvalidSort(raw.to_string()))?;

        let order = match order.to_ascii_uppercase().as_str() {
            "ASC" => SortOrder::Asc,
            "DESC" => SortOrder::Desc,
            _ => return Err(ListParamError::InvalidSort(raw.to_string())),
        };

        Ok(Some(Self { field, order }))
    }

    /// Keep this sort only if the field is one of `allowed`, else use `fallback`
    pub fn restrict(spec: Option<Self>, allowed: &[&str], fallback: Self) -> Self {
        match spec {
            Some(spec) if allowed.contains(&spec.field.as_str()) => spec,
            _ => fallback,
        }
    }
}

/// Parse the JSON `filter` object; absent means no filters
pub fn parse_filter(raw: Option<&str>) -> Result<Map<String, Value>, ListParamError> {
    match raw {
        None => Ok(Map::new()),
        Some(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(ListParamError::InvalidFilter(raw.to_string())),
        },
    }
}

/// Read a boolean filter that may arrive as `true` or as `"true"`
pub fn filter_bool(filter: &Map<String, Value>, key: &str) -> Option<bool> {
    match filter.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

pub fn filter_str<'a>(filter: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    filter.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

pub fn filter_i64(filter: &Map<String, Value>, key: &str) -> Option<i64> {
    match filter.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// One page of a collection
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub offset: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, offset: i64) -> Self {
        Self { items, total, offset }
    }

    /// Value for the `Content-Range` header, e.g. `stocks 0-24/310`
    pub fn content_range(&self, resource: &str) -> String {
        if self.items.is_empty() {
            return format!("{} */{}", resource, self.total);
        }
        let end = self.offset + self.items.len() as i64 - 1;
        format!("{} {}-{}/{}", resource, self.offset, end, self.total)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            offset: self.offset,
        }
    }
}
