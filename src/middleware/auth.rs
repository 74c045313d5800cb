use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::database::models::User;
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated user context resolved from the token key
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub name: String,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
            name: user.name,
        }
    }
}

/// Token authentication middleware that resolves the key and injects the acting user
pub async fn token_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = extract_token_from_headers(request.headers()).map_err(|msg| {
        tracing::debug!("Token authentication failed: {}", msg);
        ApiError::unauthorized(msg)
    })?;

    let user = state.tokens.resolve_identity(&key).await?.ok_or_else(|| {
        tracing::warn!("Rejected request with unknown or inactive token");
        ApiError::unauthorized("Invalid token.")
    })?;

    tracing::debug!(user_id = user.id, "Token authentication successful");
    request.extensions_mut().insert(AuthUser::from(user));

    Ok(next.run(request).await)
}

/// Extract the token key from the Authorization header.
///
/// Accepts `Token <key>` and `Bearer <key>`.
fn extract_token_from_headers(headers: &HeaderMap) -> Result<String, &'static str> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or("Authentication credentials were not provided.")?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid token header. Token string should not contain invalid characters.")?;

    let key = auth_str
        .strip_prefix("Token ")
        .or_else(|| auth_str.strip_prefix("Bearer "))
        .ok_or("Authentication credentials were not provided.")?
        .trim();

    if key.is_empty() {
        return Err("Invalid token header. No credentials provided.");
    }
    if key.contains(char::is_whitespace) {
        return Err("Invalid token header. Token string should not contain spaces.");
    }
    Ok(key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn accepts_token_and_bearer_schemes() {
        assert_eq!(extract_token_from_headers(&headers("Token abc123")).unwrap(), "abc123");
        assert_eq!(extract_token_from_headers(&headers("Bearer abc123")).unwrap(), "abc123");
    }

    #[test]
    fn rejects_missing_or_malformed_headers() {
        assert!(extract_token_from_headers(&HeaderMap::new()).is_err());
        assert!(extract_token_from_headers(&headers("Basic abc123")).is_err());
        assert!(extract_token_from_headers(&headers("Token ")).is_err());
        assert!(extract_token_from_headers(&headers("Token abc 123")).is_err());
    }
}
