use std::time::Duration;

use serde_json::json;

use crate::cli::utils::{database_url, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::{wait_for_db, DatabaseManager};

/// `recipe migrate`
pub async fn migrate(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let url = database_url(config)?;
    let pool = DatabaseManager::connect(url, &config.database).await?;
    DatabaseManager::migrate(&pool).await?;
    pool.close().await;

    output_success(&output_format, "Migrations applied", None)
}

/// `recipe wait-for-db`; flags override the configured attempt count and delay
pub async fn wait(
    config: &AppConfig,
    attempts: Option<u32>,
    delay_ms: Option<u64>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let url = database_url(config)?;
    let attempts = attempts.unwrap_or(config.database.wait_attempts).max(1);
    let delay = Duration::from_millis(delay_ms.unwrap_or(config.database.wait_delay_ms));

    if let OutputFormat::Text = output_format {
        println!("Waiting for database...");
    }
    let database = &config.database;
    let used = wait_for_db(move || DatabaseManager::probe(url, database), attempts, delay).await?;

    output_success(&output_format, "Database available!", Some(json!({ "attempts": used })))
}
