use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::DatabaseError;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(data_value) = data {
                response["data"] = data_value;
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Commands that talk to PostgreSQL directly have no in-memory fallback
pub fn database_url(config: &AppConfig) -> Result<&str, DatabaseError> {
    config
        .database
        .url
        .as_deref()
        .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_url_is_reported() {
        let mut config = AppConfig::development();
        config.database.url = None;
        assert!(matches!(database_url(&config), Err(DatabaseError::ConfigMissing("DATABASE_URL"))));

        config.database.url = Some("postgres://localhost/recipes".into());
        assert_eq!(database_url(&config).unwrap(), "postgres://localhost/recipes");
    }
}
