use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "quiz_difficulty", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum QuizDifficulty {
    Easy,
    Medium,
    Hard,
}

impl QuizDifficulty {
    pub const ALL: [QuizDifficulty; 3] = [Self::Easy, Self::Medium, Self::Hard];
}

impl fmt::Display for QuizDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizDifficulty::Easy => write!(f, "easy"),
            QuizDifficulty::Medium => write!(f, "medium"),
            QuizDifficulty::Hard => write!(f, "hard"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "quiz_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuizStatus {
    InProgress,
    Completed,
}

impl fmt::Display for QuizStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuizStatus::InProgress => write!(f, "in_progress"),
            QuizStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Database model for quiz
#[derive(Debug, Clone, FromRow)]
pub struct Quiz {
    pub id: Uuid,
    pub user_id: Uuid,
    pub topic_slug: String,
    pub difficulty: QuizDifficulty,
    pub title: String,
    pub status: QuizStatus,
    pub question_count: i32,
    pub current_step: i32,
    pub score: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Quiz {
    pub fn is_completed(&self) -> bool {
        self.status == QuizStatus::Completed
    }
}
