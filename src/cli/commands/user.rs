use std::sync::Arc;

use serde_json::json;

use crate::cli::utils::{database_url, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::models::User;
use crate::database::{DatabaseManager, PgStore};
use crate::services::UserService;

async fn user_service(config: &AppConfig) -> anyhow::Result<UserService> {
    let url = database_url(config)?;
    let pool = DatabaseManager::connect(url, &config.database).await?;
    Ok(UserService::new(Arc::new(PgStore::new(pool)), &config.security))
}

fn summary(user: &User) -> serde_json::Value {
    json!({
        "id": user.id,
        "email": user.email,
        "name": user.name,
        "is_staff": user.is_staff,
        "is_superuser": user.is_superuser,
    })
}

/// `recipe create-superuser`
pub async fn create_superuser(
    config: &AppConfig,
    email: &str,
    password: &str,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let users = user_service(config).await?;
    let user = users.create_superuser(email, password).await?;

    output_success(
        &output_format,
        &format!("Superuser {} created", user.email),
        Some(summary(&user)),
    )
}

/// `recipe create-user`
pub async fn create_user(
    config: &AppConfig,
    email: &str,
    password: &str,
    name: Option<&str>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let users = user_service(config).await?;
    let user = users.create_user(email, password, name).await?;

    output_success(&output_format, &format!("User {} created", user.email), Some(summary(&user)))
}
