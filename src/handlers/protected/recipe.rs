use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Extension, Json,
};

use crate::api::format::RecipeView;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::RecipePayload;
use crate::state::AppState;
use crate::types::Action;

type RecipeId = Result<Path<i64>, PathRejection>;
type Body = Result<Json<RecipePayload>, JsonRejection>;

/// GET /recipe/recipes/ - the acting user's recipes, newest first
pub async fn list(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<Vec<RecipeView>> {
    let recipes = state.recipes.list_recipes(auth.user_id).await?;
    Ok(ApiResponse::success(RecipeView::render_all(recipes)))
}

/// POST /recipe/recipes/ - create a recipe owned by the acting user
///
/// Any `user` key in the body is ignored; ownership always comes from the token.
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Body,
) -> ApiResult<RecipeView> {
    let Json(payload) = payload?;
    let recipe = state.recipes.create_recipe(auth.user_id, payload).await?;
    Ok(ApiResponse::for_action(RecipeView::render(recipe, Action::Create), Action::Create))
}

/// GET /recipe/recipes/:id/
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    id: RecipeId,
) -> ApiResult<RecipeView> {
    let Path(id) = id?;
    let recipe = state.recipes.get_recipe(auth.user_id, id).await?;
    Ok(ApiResponse::success(RecipeView::render(recipe, Action::Retrieve)))
}

/// PUT /recipe/recipes/:id/
pub async fn put(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    id: RecipeId,
    payload: Body,
) -> ApiResult<RecipeView> {
    update(state, auth, id, payload, Action::Update).await
}

/// PATCH /recipe/recipes/:id/
pub async fn patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    id: RecipeId,
    payload: Body,
) -> ApiResult<RecipeView> {
    update(state, auth, id, payload, Action::PartialUpdate).await
}

/// DELETE /recipe/recipes/:id/ - 204 on success, 404 for missing or foreign ids
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    id: RecipeId,
) -> ApiResult<()> {
    let Path(id) = id?;
    state.recipes.delete_recipe(auth.user_id, id).await?;
    Ok(ApiResponse::for_action((), Action::Delete))
}

async fn update(state: AppState, auth: AuthUser, id: RecipeId, payload: Body, action: Action) -> ApiResult<RecipeView> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let recipe = state.recipes.update_recipe(auth.user_id, id, payload, action).await?;
    Ok(ApiResponse::for_action(RecipeView::render(recipe, action), action))
}
