//! Activity log handlers

use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use serde_json::{Map, Value};
use shared::{entities, filter_i64, filter_str};

use super::{paginated, ListParams, ListRequest};
use crate::error::AppResult;
use crate::store::{newest_first, ActivityQuery, ACTIVITY_SORT_FIELDS};
use crate::AppState;

fn activity_query(request: ListRequest) -> ActivityQuery {
    let filter: &Map<String, Value> = &request.filter;
    ActivityQuery {
        action_type: filter_str(filter, "action_type").map(str::to_string),
        entity_type: filter_str(filter, "entity_type").map(str::to_string),
        entity_id: filter_i64(filter, "entity_id"),
        user_id: filter_i64(filter, "user_id"),
        sort: request.sort,
        range: request.range,
    }
}

pub async fn list_activity(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Response> {
    let query = activity_query(params.parse(ACTIVITY_SORT_FIELDS, newest_first())?);
    let page = state.audit_service().list_activity(&query).await?;
    Ok(paginated(page, "activity-logs"))
}

pub async fn stock_activity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<ListParams>,
) -> AppResult<Response> {
    let query = activity_query(params.parse(ACTIVITY_SORT_FIELDS, newest_first())?);
    let page = state
        .audit_service()
        .activity_for(entities::STOCK, id, query)
        .await?;
    Ok(paginated(page, "activity-logs"))
}

pub async fn order_activity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<ListParams>,
) -> AppResult<Response> {
    let query = activity_query(params.parse(ACTIVITY_SORT_FIELDS, newest_first())?);
    let page = state
        .audit_service()
        .activity_for(entities::ORDER, id, query)
        .await?;
    Ok(paginated(page, "activity-logs"))
}
