use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::config::SecurityConfig;
use crate::database::manager::DatabaseError;
use crate::database::models::{NewUser, User, UserChanges};
use crate::database::store::Store;
use crate::types::Action;

use super::{clean_text, FieldErrors, ServiceError, REQUIRED};

const EMAIL_TAKEN: &str = "user with this email already exists.";
const INVALID_EMAIL: &str = "Enter a valid email address.";

/// Registration and profile body. Unknown keys are ignored.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct UserPayload {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

/// Lower-case the domain part of an address, leaving the local part alone.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

fn is_valid_email(email: &str) -> bool {
    match email.rsplit_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !local.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    password_min_length: usize,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, security: &SecurityConfig) -> Self {
        Self {
            store,
            password_min_length: security.password_min_length,
            bcrypt_cost: security.bcrypt_cost,
        }
    }

    /// Create a regular account. Fails on an empty or malformed email, an
    /// empty password, or an email that is already registered.
    pub async fn create_user(&self, email: &str, password: &str, name: Option<&str>) -> Result<User, ServiceError> {
        self.insert(email, password, name.unwrap_or_default(), false).await
    }

    /// Same as `create_user` with staff and superuser flags set.
    pub async fn create_superuser(&self, email: &str, password: &str) -> Result<User, ServiceError> {
        self.insert(email, password, "", true).await
    }

    /// bcrypt verification; a corrupt stored hash counts as a mismatch.
    pub async fn check_password(&self, user: &User, plaintext: &str) -> Result<bool, ServiceError> {
        let plaintext = plaintext.to_string();
        let hash = user.password.clone();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &hash).unwrap_or(false)).await?;
        Ok(matches)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        Ok(self.store.find_user_by_email(&normalize_email(email)).await?)
    }

    /// Self-registration from the public API; enforces the password policy.
    pub async fn register(&self, payload: UserPayload) -> Result<User, ServiceError> {
        let mut errors = FieldErrors::default();
        let email = self.required_email(&mut errors, payload.email);
        let password = self.required_password(&mut errors, payload.password);
        let name = payload
            .name
            .and_then(|n| clean_text(&mut errors, "name", n, 255, true))
            .unwrap_or_default();
        errors.finish()?;

        self.create_user(&email.unwrap_or_default(), &password.unwrap_or_default(), Some(&name))
            .await
    }

    /// Update the acting user's own profile.
    ///
    /// `Action::PartialUpdate` changes only supplied fields; `Action::Update`
    /// requires email and password.
    pub async fn update_profile(&self, user_id: i64, payload: UserPayload, action: Action) -> Result<User, ServiceError> {
        let mut errors = FieldErrors::default();
        let mut changes = UserChanges::default();

        match payload.email {
            Some(email) => changes.email = self.valid_email(&mut errors, &email),
            None if !action.is_partial() => errors.add("email", REQUIRED),
            None => {}
        }
        let password = match payload.password {
            Some(password) => self.valid_password(&mut errors, password),
            None if !action.is_partial() => {
                errors.add("password", REQUIRED);
                None
            }
            None => None,
        };
        if let Some(name) = payload.name {
            changes.name = clean_text(&mut errors, "name", name, 255, true);
        }
        errors.finish()?;

        if let Some(password) = password {
            changes.password_hash = Some(self.hash_password(&password).await?);
        }

        if changes.is_empty() {
            return self
                .store
                .find_user_by_id(user_id)
                .await?
                .ok_or(ServiceError::NotFound("user"));
        }

        match self.store.update_user(user_id, changes).await {
            Ok(user) => {
                info!(user_id, "profile updated");
                Ok(user)
            }
            Err(DatabaseError::Conflict(_)) => Err(ServiceError::field("email", EMAIL_TAKEN)),
            Err(DatabaseError::NotFound(_)) => Err(ServiceError::NotFound("user")),
            Err(e) => Err(e.into()),
        }
    }

    async fn insert(&self, email: &str, password: &str, name: &str, elevated: bool) -> Result<User, ServiceError> {
        let mut errors = FieldErrors::default();
        let email = self.valid_email(&mut errors, email);
        if password.is_empty() {
            errors.add("password", super::BLANK);
        }
        errors.finish()?;
        let email = email.unwrap_or_default();

        let password_hash = self.hash_password(password).await?;
        let new_user = NewUser {
            email,
            password_hash,
            name: name.to_string(),
            is_staff: elevated,
            is_superuser: elevated,
        };

        match self.store.insert_user(new_user).await {
            Ok(user) => {
                info!(user_id = user.id, superuser = user.is_superuser, "user created");
                Ok(user)
            }
            Err(DatabaseError::Conflict(_)) => Err(ServiceError::field("email", EMAIL_TAKEN)),
            Err(e) => Err(e.into()),
        }
    }

    async fn hash_password(&self, password: &str) -> Result<String, ServiceError> {
        let password = password.to_string();
        let cost = self.bcrypt_cost;
        Ok(tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??)
    }

    fn valid_email(&self, errors: &mut FieldErrors, email: &str) -> Option<String> {
        let email = normalize_email(email);
        if email.is_empty() {
            errors.add("email", super::BLANK);
            return None;
        }
        if email.chars().count() > 255 || !is_valid_email(&email) {
            errors.add("email", INVALID_EMAIL);
            return None;
        }
        Some(email)
    }

    fn required_email(&self, errors: &mut FieldErrors, email: Option<String>) -> Option<String> {
        match email {
            Some(email) => self.valid_email(errors, &email),
            None => {
                errors.add("email", REQUIRED);
                None
            }
        }
    }

    fn valid_password(&self, errors: &mut FieldErrors, password: String) -> Option<String> {
        if password.chars().count() < self.password_min_length {
            errors.add(
                "password",
                format!("Ensure this field has at least {} characters.", self.password_min_length),
            );
            return None;
        }
        Some(password)
    }

    fn required_password(&self, errors: &mut FieldErrors, password: Option<String>) -> Option<String> {
        match password {
            Some(password) => self.valid_password(errors, password),
            None => {
                errors.add("password", REQUIRED);
                None
            }
        }
    }
}
