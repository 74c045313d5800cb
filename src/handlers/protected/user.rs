use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};

use crate::api::format::UserView;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::UserPayload;
use crate::state::AppState;
use crate::types::Action;

/// GET /user/me/ - profile of the acting user, as loaded by the auth middleware
pub async fn get(Extension(auth): Extension<AuthUser>) -> ApiResult<UserView> {
    Ok(ApiResponse::success(UserView::from(auth)))
}

/// PUT /user/me/ - replace email, password and name
pub async fn put(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult<UserView> {
    update(state, auth, payload, Action::Update).await
}

/// PATCH /user/me/ - change only the supplied fields
pub async fn patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult<UserView> {
    update(state, auth, payload, Action::PartialUpdate).await
}

async fn update(
    state: AppState,
    auth: AuthUser,
    payload: Result<Json<UserPayload>, JsonRejection>,
    action: Action,
) -> ApiResult<UserView> {
    let Json(payload) = payload?;
    let user = state.users.update_profile(auth.user_id, payload, action).await?;
    Ok(ApiResponse::success(UserView::from(user)))
}
