/// Shared types used across the codebase

use axum::http::StatusCode;

/// Resource actions exposed by the API.
/// Handlers pick their serializer from the action instead of from the route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    PartialUpdate,
    Delete,
}

impl Action {
    /// PATCH semantics: only supplied fields change.
    pub fn is_partial(self) -> bool {
        matches!(self, Action::PartialUpdate)
    }

    /// Status of a successful response for this action.
    pub fn success_status(self) -> StatusCode {
        match self {
            Action::Create => StatusCode::CREATED,
            Action::Delete => StatusCode::NO_CONTENT,
            _ => StatusCode::OK,
        }
    }
}
