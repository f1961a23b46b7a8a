use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::features::meta::models::Metadata;
use crate::features::quizzes::models::QuizDifficulty;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MetadataDto {
    pub key: String,
    pub value: serde_json::Value,
    pub is_public: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<Metadata> for MetadataDto {
    fn from(m: Metadata) -> Self {
        Self {
            key: m.key,
            value: m.value,
            is_public: m.is_public,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpsertMetadataDto {
    /// Any JSON value
    pub value: serde_json::Value,

    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DifficultyDto {
    pub value: QuizDifficulty,
    pub label: String,
}

impl From<QuizDifficulty> for DifficultyDto {
    fn from(d: QuizDifficulty) -> Self {
        let label = match d {
            QuizDifficulty::Easy => "Easy",
            QuizDifficulty::Medium => "Medium",
            QuizDifficulty::Hard => "Hard",
        };
        Self {
            value: d,
            label: label.to_string(),
        }
    }
}

/// Public counters shown on the landing page
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicStatsDto {
    pub users: i64,
    pub quizzes_generated: i64,
    pub quizzes_completed: i64,
}
