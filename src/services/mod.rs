pub mod recipe_service;
pub mod token_service;
pub mod user_service;

use std::collections::HashMap;

use thiserror::Error;

use crate::database::manager::DatabaseError;

pub use recipe_service::{RecipePayload, RecipeService, TagPayload};
pub use token_service::{Credentials, TokenService};
pub use user_service::{normalize_email, UserPayload, UserService};

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{message}")]
    Validation {
        message: String,
        field_errors: HashMap<String, String>,
    },

    #[error("{0}")]
    Auth(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl ServiceError {
    /// Single-field validation failure
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::default();
        errors.add(field, message);
        errors.into_error()
    }
}

/// Accumulates per-field validation messages so a payload reports every problem at once
#[derive(Debug, Default)]
pub struct FieldErrors(HashMap<String, String>);

impl FieldErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        // first message per field wins
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_error(self) -> ServiceError {
        ServiceError::Validation {
            message: "Invalid input".to_string(),
            field_errors: self.0,
        }
    }

    pub fn finish(self) -> Result<(), ServiceError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.into_error())
        }
    }
}

/// Trimmed, non-blank, length-limited text field
pub(crate) fn clean_text(
    errors: &mut FieldErrors,
    field: &str,
    value: String,
    max_len: usize,
    allow_blank: bool,
) -> Option<String> {
    let value = value.trim().to_string();
    if value.is_empty() && !allow_blank {
        errors.add(field, BLANK);
        return None;
    }
    if value.chars().count() > max_len {
        errors.add(field, format!("Ensure this field has no more than {} characters.", max_len));
        return None;
    }
    Some(value)
}
