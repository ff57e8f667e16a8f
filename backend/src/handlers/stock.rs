//! HTTP handlers for stock items

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use shared::{StockCategory, StockItem, StockStats};

use super::{bool_filter, paginated, str_filter, ListParams, ListRequest};
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::stock::{AdjustQuantityInput, CreateStockInput, QuickAdjustInput, UpdateStockInput};
use crate::services::AdjustedStock;
use crate::store::{newest_first, StockQuery, STOCK_SORT_FIELDS};
use crate::AppState;

fn stock_query(request: ListRequest) -> AppResult<StockQuery> {
    let filter = &request.filter;
    let category = str_filter(filter, &["category"])
        .map(str::parse::<StockCategory>)
        .transpose()?;

    Ok(StockQuery {
        category,
        is_active: bool_filter(filter, &["is_active", "isActive"]),
        is_low_stock: bool_filter(filter, &["is_low_stock", "isLowStock"]),
        search: str_filter(filter, &["q", "search"]).map(str::to_string),
        sort: request.sort,
        range: request.range,
    })
}

/// List stock items; `isLowStock=true` narrows to items below threshold
pub async fn list_stocks(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Response> {
    let query = stock_query(params.parse(STOCK_SORT_FIELDS, newest_first())?)?;
    let page = state.stock_service().list(&query).await?;
    Ok(paginated(page, "stocks"))
}

pub async fn get_stock(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<StockItem>> {
    let stock = state.stock_service().get(id).await?;
    Ok(Json(stock))
}

pub async fn create_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateStockInput>,
) -> AppResult<(StatusCode, Json<StockItem>)> {
    let stock = state.stock_service().create(input, current_user.id()).await?;
    Ok((StatusCode::CREATED, Json(stock)))
}

pub async fn update_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateStockInput>,
) -> AppResult<Json<StockItem>> {
    let stock = state.stock_service().update(id, input, current_user.id()).await?;
    Ok(Json(stock))
}

/// Soft delete (admin only)
pub async fn delete_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<StockItem>> {
    current_user.0.ensure_admin()?;
    let stock = state.stock_service().deactivate(id, current_user.id()).await?;
    Ok(Json(stock))
}

/// Apply a signed adjustment
pub async fn adjust_quantity(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<AdjustQuantityInput>,
) -> AppResult<Json<AdjustedStock>> {
    let adjusted = state.stock_service().adjust(id, input, current_user.id()).await?;
    Ok(Json(adjusted))
}

pub async fn quick_adjust(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<QuickAdjustInput>,
) -> AppResult<Json<AdjustedStock>> {
    let adjusted = state
        .stock_service()
        .quick_adjust(id, input, current_user.id())
        .await?;
    Ok(Json(adjusted))
}

pub async fn low_stock(State(state): State<AppState>) -> AppResult<Json<Vec<StockItem>>> {
    let items = state.stock_service().low_stock().await?;
    Ok(Json(items))
}

pub async fn stock_stats(State(state): State<AppState>) -> AppResult<Json<StockStats>> {
    let stats = state.stock_service().stats().await?;
    Ok(Json(stats))
}

/// Ledger of one item, newest first
pub async fn stock_transactions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<ListParams>,
) -> AppResult<Response> {
    let request = params.parse(&["id"], newest_first())?;
    let page = state.stock_service().transactions(id, request.range).await?;
    Ok(paginated(page, "stock-transactions"))
}
