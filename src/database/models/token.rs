use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Token {
    pub key: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}
