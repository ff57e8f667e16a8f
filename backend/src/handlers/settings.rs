//! HTTP handlers for per-category stock settings

use axum::{
    extract::{Path, State},
    Json,
};
use shared::{StockCategory, StockSetting};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::settings::{CategoryThreshold, UpdateSettingInput};
use crate::AppState;

pub async fn list_settings(State(state): State<AppState>) -> AppResult<Json<Vec<CategoryThreshold>>> {
    let settings = state.settings_service().list().await?;
    Ok(Json(settings))
}

pub async fn get_setting(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> AppResult<Json<CategoryThreshold>> {
    let category: StockCategory = category.parse()?;
    let setting = state.settings_service().get(category).await?;
    Ok(Json(setting))
}

/// Store a category threshold (admin only)
pub async fn update_setting(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(category): Path<String>,
    Json(input): Json<UpdateSettingInput>,
) -> AppResult<Json<StockSetting>> {
    current_user.0.ensure_admin()?;
    let category: StockCategory = category.parse()?;
    let setting = state
        .settings_service()
        .update(category, input, current_user.id())
        .await?;
    Ok(Json(setting))
}
