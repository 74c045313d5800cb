use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;

use crate::config::AppConfig;
use crate::database::models::{NewRecipe, NewUser, User};
use crate::database::{DatabaseManager, MemoryStore, PgStore, Store};
use crate::state::AppState;

/// bcrypt's minimum accepted cost
pub const TEST_BCRYPT_COST: u32 = 4;

/// Development config with the cheapest bcrypt cost so tests stay fast
pub fn config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.bcrypt_cost = TEST_BCRYPT_COST;
    config
}

/// Fresh state over an empty in-memory store
pub fn state() -> AppState {
    AppState::new(Arc::new(MemoryStore::new()), &config())
}

pub async fn create_user(state: &AppState, email: &str) -> User {
    state
        .users
        .create_user(email, "test1234", None)
        .await
        .expect("failed to create test user")
}

/// Unique value per call, safe to use against a shared database
pub fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, rand_suffix())
}

fn rand_suffix() -> String {
    crate::services::token_service::generate_key(8)
}

pub async fn insert_user_with_email(store: &dyn Store, email: &str) -> User {
    store
        .insert_user(NewUser {
            email: email.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            name: String::new(),
            is_staff: false,
            is_superuser: false,
        })
        .await
        .expect("failed to insert test user")
}

pub async fn insert_user(store: &dyn Store, name: &str) -> User {
    insert_user_with_email(store, &format!("{}@example.com", unique(name))).await
}

pub fn new_recipe(title: &str) -> NewRecipe {
    NewRecipe {
        title: title.to_string(),
        time_minutes: 5,
        price: Decimal::from_str("5.50").expect("valid decimal"),
        link: String::new(),
        description: String::new(),
    }
}

/// Postgres store from TEST_DATABASE_URL, migrated; `None` when unset
pub async fn pg_store() -> Option<PgStore> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let config = config();
    let pool = DatabaseManager::connect(&url, &config.database)
        .await
        .expect("failed to connect to TEST_DATABASE_URL");
    DatabaseManager::migrate(&pool).await.expect("failed to migrate test database");
    Some(PgStore::new(pool))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_values_differ() {
        let a = unique("user");
        let b = unique("user");
        assert_ne!(a, b);
        assert!(a.starts_with("user_"));
    }

    #[test]
    fn test_config_uses_cheapest_bcrypt_cost() {
        assert_eq!(config().security.bcrypt_cost, TEST_BCRYPT_COST);
        assert!(bcrypt::hash("pw", TEST_BCRYPT_COST).is_ok());
    }

    #[tokio::test]
    async fn state_starts_empty() {
        let state = state();
        assert!(state.store.find_user_by_email("anyone@example.com").await.unwrap().is_none());
    }
}
