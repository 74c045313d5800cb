use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::store::Store;
use crate::services::{RecipeService, TokenService, UserService};

/// Shared handler state: one store handle plus the services built on it
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub users: UserService,
    pub tokens: TokenService,
    pub recipes: RecipeService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: &AppConfig) -> Self {
        let users = UserService::new(store.clone(), &config.security);
        let tokens = TokenService::new(store.clone(), users.clone(), &config.security);
        let recipes = RecipeService::new(store.clone());
        Self {
            store,
            users,
            tokens,
            recipes,
        }
    }
}
