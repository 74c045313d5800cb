use axum::{extract::rejection::JsonRejection, extract::State, Json};

use crate::api::format::{TokenView, UserView};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{Credentials, UserPayload};
use crate::state::AppState;

/// POST /user/create/ - register a new account
///
/// Returns 201 with `{email, name}`; the password never leaves the server.
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult<UserView> {
    let Json(payload) = payload?;
    let user = state.users.register(payload).await?;
    Ok(ApiResponse::created(UserView::from(user)))
}

/// POST /user/token/ - exchange email and password for the account's token
pub async fn token(
    State(state): State<AppState>,
    credentials: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<TokenView> {
    let Json(credentials) = credentials?;
    let token = state.tokens.obtain_token(credentials).await?;
    Ok(ApiResponse::success(TokenView { token: token.key }))
}
