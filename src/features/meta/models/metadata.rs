use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Key/value row; `is_public` rows are readable without signing in
#[derive(Debug, Clone, FromRow)]
pub struct Metadata {
    pub key: String,
    pub value: serde_json::Value,
    pub is_public: bool,
    pub updated_at: DateTime<Utc>,
}
