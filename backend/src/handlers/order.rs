//! HTTP handlers for orders

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use shared::{Order, OrderStats, OrderStatus};

use super::{paginated, str_filter, ListParams, ListRequest};
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::order::{CreateOrderInput, UpdateOrderInput};
use crate::store::{newest_first, OrderQuery, ORDER_SORT_FIELDS};
use crate::AppState;

fn order_query(request: ListRequest) -> AppResult<OrderQuery> {
    let filter = &request.filter;
    let status = str_filter(filter, &["status"])
        .map(str::parse::<OrderStatus>)
        .transpose()?;

    Ok(OrderQuery {
        status,
        product: str_filter(filter, &["product"]).map(str::to_string),
        search: str_filter(filter, &["q", "search"]).map(str::to_string),
        sort: request.sort,
        range: request.range,
    })
}

/// Public order form submission
pub async fn create_order(
    State(state): State<AppState>,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let order = state.order_service().place(input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Response> {
    let query = order_query(params.parse(ORDER_SORT_FIELDS, newest_first())?)?;
    let page = state.order_service().list(&query).await?;
    Ok(paginated(page, "orders"))
}

pub async fn get_order(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Order>> {
    let order = state.order_service().get(id).await?;
    Ok(Json(order))
}

pub async fn update_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateOrderInput>,
) -> AppResult<Json<Order>> {
    let order = state.order_service().update(id, input, current_user.id()).await?;
    Ok(Json(order))
}

/// Delete an order (admin only)
pub async fn delete_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    current_user.0.ensure_admin()?;
    state.order_service().delete(id, current_user.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn order_stats(State(state): State<AppState>) -> AppResult<Json<OrderStats>> {
    let stats = state.order_service().stats().await?;
    Ok(Json(stats))
}
