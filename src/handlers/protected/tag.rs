use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Extension, Json,
};

use crate::api::format::TagView;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::TagPayload;
use crate::state::AppState;
use crate::types::Action;

type TagId = Result<Path<i64>, PathRejection>;
type Body = Result<Json<TagPayload>, JsonRejection>;

/// GET /recipe/tags/ - the acting user's tags, ordered by name descending
pub async fn list(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<Vec<TagView>> {
    let tags = state.recipes.list_tags(auth.user_id).await?;
    Ok(ApiResponse::success(tags.into_iter().map(TagView::from).collect()))
}

pub async fn get(State(state): State<AppState>, Extension(auth): Extension<AuthUser>, id: TagId) -> ApiResult<TagView> {
    let Path(id) = id?;
    let tag = state.recipes.get_tag(auth.user_id, id).await?;
    Ok(ApiResponse::success(TagView::from(tag)))
}

pub async fn put(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    id: TagId,
    payload: Body,
) -> ApiResult<TagView> {
    rename(state, auth, id, payload, Action::Update).await
}

pub async fn patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    id: TagId,
    payload: Body,
) -> ApiResult<TagView> {
    rename(state, auth, id, payload, Action::PartialUpdate).await
}

/// DELETE /recipe/tags/:id/ - detaches the tag from every recipe first
pub async fn delete(State(state): State<AppState>, Extension(auth): Extension<AuthUser>, id: TagId) -> ApiResult<()> {
    let Path(id) = id?;
    state.recipes.delete_tag(auth.user_id, id).await?;
    Ok(ApiResponse::for_action((), Action::Delete))
}

async fn rename(state: AppState, auth: AuthUser, id: TagId, payload: Body, action: Action) -> ApiResult<TagView> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let tag = state.recipes.update_tag(auth.user_id, id, payload, action).await?;
    Ok(ApiResponse::success(TagView::from(tag)))
}
