use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post, MethodRouter},
    Json, Router,
};
use serde_json::json;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::handlers::{method_not_allowed, protected, public};
use crate::middleware::{token_auth_middleware, ApiResponse};
use crate::state::AppState;

/// Build the full HTTP application: public routes, token-protected routes and global layers.
pub fn app(state: AppState, config: &AppConfig) -> Router {
    let router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    let router = match cors_layer(config) {
        Some(cors) => router.layer(cors),
        None => router,
    };
    let router = if config.server.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

fn public_routes() -> Router<AppState> {
    let router = Router::new();
    let router = resource(router, "/user/create/", post(public::user_create));
    resource(router, "/user/token/", post(public::user_token))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    let router = Router::new();
    let router = resource(
        router,
        "/user/me/",
        get(protected::me_get).put(protected::me_put).patch(protected::me_patch),
    );
    let router = resource(
        router,
        "/recipe/recipes/",
        get(protected::recipe_list).post(protected::recipe_create),
    );
    let router = resource(
        router,
        "/recipe/recipes/:id/",
        get(protected::recipe_get)
            .put(protected::recipe_put)
            .patch(protected::recipe_patch)
            .delete(protected::recipe_delete),
    );
    let router = resource(router, "/recipe/tags/", get(protected::tag_list));
    let router = resource(
        router,
        "/recipe/tags/:id/",
        get(protected::tag_get)
            .put(protected::tag_put)
            .patch(protected::tag_patch)
            .delete(protected::tag_delete),
    );

    router.route_layer(from_fn_with_state(state, token_auth_middleware))
}

/// Register `path` with and without its trailing slash; unsupported verbs answer 405.
fn resource(router: Router<AppState>, path: &str, methods: MethodRouter<AppState>) -> Router<AppState> {
    let methods = methods.fallback(method_not_allowed);
    let bare = path.trim_end_matches('/');
    router.route(path, methods.clone()).route(bare, methods)
}

fn cors_layer(config: &AppConfig) -> Option<CorsLayer> {
    if !config.security.enable_cors {
        return None;
    }
    let origins = &config.security.cors_origins;
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return Some(CorsLayer::permissive());
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    )
}

async fn root() -> impl IntoResponse {
    ApiResponse::success(json!({
        "name": "Recipe API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Recipe and tag management API built with Rust (Axum)",
        "endpoints": {
            "user": "/user/create/, /user/token/ (public), /user/me/ (token)",
            "recipes": "/recipe/recipes/[:id/] (token)",
            "tags": "/recipe/tags/[:id/] (token)",
            "health": "/health (public)",
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    async fn send(app: Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Token {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn setup() -> (Router, String) {
        let state = testing::state();
        let user = testing::create_user(&state, "me@example.com").await;
        let token = state
            .store
            .get_or_create_token(user.id, "0123456789abcdef")
            .await
            .unwrap();
        (app(state, &testing::config()), token.key)
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _) = setup().await;
        let (status, body) = send(app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn protected_routes_require_token() {
        let (app, _) = setup().await;
        let (status, body) = send(app.clone(), Method::GET, "/recipe/recipes/", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");

        let (status, _) = send(app, Method::GET, "/user/me/", Some("bogus"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unsupported_verb_is_405() {
        let (app, token) = setup().await;
        let (status, body) = send(app, Method::POST, "/user/me/", Some(&token), Some(json!({}))).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["code"], "METHOD_NOT_ALLOWED");
    }

    #[tokio::test]
    async fn paths_without_trailing_slash_resolve() {
        let (app, token) = setup().await;
        let (status, body) = send(app, Method::GET, "/user/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["email"], "me@example.com");
    }

    #[tokio::test]
    async fn malformed_ids_and_bodies_are_rejected() {
        let (app, token) = setup().await;
        let (status, _) = send(app.clone(), Method::GET, "/recipe/recipes/abc/", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/recipe/recipes/")
            .header(header::AUTHORIZATION, format!("Token {}", token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
