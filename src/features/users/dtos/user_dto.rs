use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::users::models::{User, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfileDto {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: UserRole,
    pub credits: i32,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfileDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            image: user.image,
            role: user.role,
            credits: user.credits,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileDto {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(url(message = "Image must be a valid URL"))]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TopicStatsDto {
    pub topic_slug: String,
    pub quizzes_taken: i64,
    pub quizzes_completed: i64,
    pub average_score: Option<f64>,
}

#[derive(Debug, Clone, FromRow)]
pub struct QuizTotalsRow {
    pub quizzes_taken: i64,
    pub quizzes_completed: i64,
    pub average_score: Option<f64>,
    pub best_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserStatsDto {
    pub quizzes_taken: i64,
    pub quizzes_completed: i64,
    /// Mean score over completed quizzes, 2 decimals
    pub average_score: Option<f64>,
    pub best_score: Option<f64>,
    pub credits: i32,
    pub topics: Vec<TopicStatsDto>,
}
