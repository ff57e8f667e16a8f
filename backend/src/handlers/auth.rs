//! Authentication and staff account handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use shared::User;

use super::{paginated, ListParams};
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::auth::{AuthToken, CreateUserInput, LoginInput};
use crate::store::{newest_first, USER_SORT_FIELDS};
use crate::AppState;

/// Login endpoint handler
pub async fn login(State(state): State<AppState>, Json(body): Json<LoginInput>) -> AppResult<Json<AuthToken>> {
    let token = state.auth_service().login(body).await?;
    Ok(Json(token))
}

/// The account behind the bearer token
pub async fn me(State(state): State<AppState>, current_user: CurrentUser) -> AppResult<Json<User>> {
    let user = state.auth_service().current_user(current_user.0.user_id).await?;
    Ok(Json(user))
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Response> {
    let request = params.parse(USER_SORT_FIELDS, newest_first())?;
    let page = state
        .auth_service()
        .list_users(&request.sort, request.range)
        .await?;
    Ok(paginated(page, "users"))
}

pub async fn create_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(body): Json<CreateUserInput>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.auth_service().create_user(body, current_user.id()).await?;
    Ok((StatusCode::CREATED, Json(user)))
}
