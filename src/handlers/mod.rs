// handlers/mod.rs - two security tiers
//
// Public (no auth) → Protected (token auth)
pub mod public;
pub mod protected;

use axum::http::Method;

use crate::error::ApiError;

/// Fallback for known paths hit with a verb they do not serve
pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::method_not_allowed(format!("Method \"{}\" not allowed.", method))
}
