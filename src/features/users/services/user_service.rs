use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::users::dtos::{
    QuizTotalsRow, TopicStatsDto, UpdateProfileDto, UserProfileDto, UserStatsDto,
};
use crate::features::auth::AccountDirectory;
use crate::features::users::models::{User, UserRole};
use crate::modules::storage::ObjectStore;

/// Service for the signed-in user's own account
pub struct UserService {
    pool: PgPool,
    store: Arc<dyn ObjectStore>,
}

impl UserService {
    pub fn new(pool: PgPool, store: Arc<dyn ObjectStore>) -> Self {
        Self { pool, store }
    }

    pub async fn find_by_id(&self, user_id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Create the user on first sign-in, or mark an existing one as verified
    pub async fn upsert_verified(&self, email: &str) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, email_verified_at)
            VALUES ($1, NOW())
            ON CONFLICT (email) DO UPDATE
            SET email_verified_at = COALESCE(users.email_verified_at, NOW()),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<UserProfileDto> {
        Ok(self.find_by_id(user_id).await?.into())
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        dto: UpdateProfileDto,
    ) -> Result<UserProfileDto> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                image = COALESCE($3, image),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(dto.name.map(|n| n.trim().to_string()))
        .bind(dto.image)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(user.into())
    }

    pub async fn stats(&self, user_id: Uuid) -> Result<UserStatsDto> {
        let user = self.find_by_id(user_id).await?;

        let totals = sqlx::query_as::<_, QuizTotalsRow>(
            r#"
            SELECT
                COUNT(*) AS quizzes_taken,
                COUNT(*) FILTER (WHERE status = 'completed') AS quizzes_completed,
                ROUND(AVG(score), 2)::float8 AS average_score,
                MAX(score)::float8 AS best_score
            FROM quizzes
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let topics = sqlx::query_as::<_, TopicStatsDto>(
            r#"
            SELECT
                topic_slug,
                COUNT(*) AS quizzes_taken,
                COUNT(*) FILTER (WHERE status = 'completed') AS quizzes_completed,
                ROUND(AVG(score), 2)::float8 AS average_score
            FROM quizzes
            WHERE user_id = $1
            GROUP BY topic_slug
            ORDER BY quizzes_taken DESC, topic_slug
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(UserStatsDto {
            quizzes_taken: totals.quizzes_taken,
            quizzes_completed: totals.quizzes_completed,
            average_score: totals.average_score,
            best_score: totals.best_score,
            credits: user.credits,
            topics,
        })
    }

    /// Delete the account; rows cascade, stored documents are removed best-effort
    pub async fn delete_account(&self, user_id: Uuid) -> Result<()> {
        let file_keys: Vec<String> =
            sqlx::query_scalar("SELECT file_key FROM documents WHERE user_id = $1 AND is_active")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        for key in &file_keys {
            if let Err(e) = self.store.delete(key).await {
                warn!("Failed to delete object {} for removed user: {}", key, e);
            }
        }

        info!(
            "User account deleted: id={}, documents_removed={}",
            user_id,
            file_keys.len()
        );
        Ok(())
    }
}

#[async_trait]
impl AccountDirectory for UserService {
    async fn current_role(&self, user_id: Uuid) -> Result<Option<UserRole>> {
        let role = sqlx::query_scalar::<_, UserRole>("SELECT role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::storage::testing::MemoryObjectStore;
    use crate::shared::test_helpers::{database_pool, insert_user};

    #[tokio::test]
    async fn test_current_role_tracks_role_changes_and_deletion() {
        let Some(pool) = database_pool().await else {
            return;
        };
        let service = UserService::new(pool.clone(), Arc::new(MemoryObjectStore::default()));
        let user = insert_user(&pool, UserRole::Admin, 0).await;

        assert_eq!(
            service.current_role(user.user_id).await.unwrap(),
            Some(UserRole::Admin)
        );

        sqlx::query("UPDATE users SET role = 'user' WHERE id = $1")
            .bind(user.user_id)
            .execute(&pool)
            .await
            .unwrap();
        assert_eq!(
            service.current_role(user.user_id).await.unwrap(),
            Some(UserRole::User)
        );

        service.delete_account(user.user_id).await.unwrap();
        assert_eq!(service.current_role(user.user_id).await.unwrap(), None);
    }
}
