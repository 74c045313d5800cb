use std::sync::Arc;

use rand::RngCore;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::SecurityConfig;
use crate::database::models::{Token, User};
use crate::database::store::Store;

use super::{FieldErrors, ServiceError, UserService, BLANK, REQUIRED};

const BAD_CREDENTIALS: &str = "Unable to log in with provided credentials.";

/// Body of `POST /user/token/`
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Random hex key of `bytes` bytes from the thread-local CSPRNG.
pub fn generate_key(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn Store>,
    users: UserService,
    token_bytes: usize,
}

impl TokenService {
    pub fn new(store: Arc<dyn Store>, users: UserService, security: &SecurityConfig) -> Self {
        Self {
            store,
            users,
            token_bytes: security.token_bytes,
        }
    }

    /// Exchange credentials for the user's token, creating it on first use.
    ///
    /// Unknown email, wrong password and inactive accounts all produce the same
    /// `ServiceError::Auth` so callers cannot probe for registered addresses.
    pub async fn obtain_token(&self, credentials: Credentials) -> Result<Token, ServiceError> {
        let mut errors = FieldErrors::default();
        let email = match credentials.email {
            Some(email) if email.trim().is_empty() => {
                errors.add("email", BLANK);
                None
            }
            Some(email) => Some(email),
            None => {
                errors.add("email", REQUIRED);
                None
            }
        };
        let password = match credentials.password {
            Some(password) if password.is_empty() => {
                errors.add("password", BLANK);
                None
            }
            Some(password) => Some(password),
            None => {
                errors.add("password", REQUIRED);
                None
            }
        };
        errors.finish()?;
        let (email, password) = (email.unwrap_or_default(), password.unwrap_or_default());

        let Some(user) = self.users.find_by_email(&email).await? else {
            warn!("token request for unknown email");
            return Err(ServiceError::Auth(BAD_CREDENTIALS.to_string()));
        };
        if !user.is_active || !self.users.check_password(&user, &password).await? {
            warn!(user_id = user.id, "token request with bad credentials");
            return Err(ServiceError::Auth(BAD_CREDENTIALS.to_string()));
        }

        let token = self
            .store
            .get_or_create_token(user.id, &generate_key(self.token_bytes))
            .await?;
        debug!(user_id = user.id, "token obtained");
        Ok(token)
    }

    /// Resolve the acting user for a presented key.
    ///
    /// `None` for unknown keys and inactive users; the caller decides how to
    /// reject the request.
    pub async fn resolve_identity(&self, key: &str) -> Result<Option<User>, ServiceError> {
        if key.is_empty() {
            return Ok(None);
        }
        let user = self.store.find_user_by_token(key).await?;
        Ok(user.filter(|u| u.is_active))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[test]
    fn keys_are_fixed_length_hex() {
        let a = generate_key(20);
        let b = generate_key(20);
        assert_eq!(a.len(), 40);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn token_issuance_is_idempotent() {
        let state = testing::state();
        state.users.create_user("user@example.com", "good_password", None).await.unwrap();

        let first = state.tokens.obtain_token(credentials("user@example.com", "good_password")).await.unwrap();
        let second = state.tokens.obtain_token(credentials("user@example.com", "good_password")).await.unwrap();
        assert_eq!(first.key, second.key);
    }

    #[tokio::test]
    async fn bad_password_is_rejected() {
        let state = testing::state();
        state.users.create_user("user@example.com", "good_password", None).await.unwrap();

        let err = state
            .tokens
            .obtain_token(credentials("user@example.com", "bad_password"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Auth(_)));
    }

    #[tokio::test]
    async fn unknown_email_and_blank_password_are_rejected() {
        let state = testing::state();

        let unknown = state.tokens.obtain_token(credentials("nobody@example.com", "whatever")).await;
        assert!(matches!(unknown, Err(ServiceError::Auth(_))));

        let blank = state.tokens.obtain_token(credentials("user@example.com", "")).await;
        assert!(matches!(blank, Err(ServiceError::Validation { .. })));
    }

    #[tokio::test]
    async fn resolve_identity_finds_token_owner() {
        let state = testing::state();
        let user = state.users.create_user("user@example.com", "good_password", None).await.unwrap();
        let token = state.tokens.obtain_token(credentials("user@EXAMPLE.com", "good_password")).await.unwrap();

        let resolved = state.tokens.resolve_identity(&token.key).await.unwrap().unwrap();
        assert_eq!(resolved.id, user.id);
        assert!(state.tokens.resolve_identity("not-a-token").await.unwrap().is_none());
        assert!(state.tokens.resolve_identity("").await.unwrap().is_none());
    }
}
