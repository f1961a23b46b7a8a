use sqlx::PgPool;
use tracing::info;

use crate::core::error::{AppError, Result};
use crate::features::topics::dtos::{CreateTopicDto, TopicResponseDto, UpdateTopicDto};
use crate::features::topics::models::Topic;

/// Service for topic operations
pub struct TopicService {
    pool: PgPool,
}

impl TopicService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Active topics in display order
    pub async fn list_active(&self) -> Result<Vec<TopicResponseDto>> {
        let topics = sqlx::query_as::<_, Topic>(
            r#"
            SELECT * FROM topics
            WHERE is_active = TRUE
            ORDER BY display_order, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(topics.into_iter().map(Into::into).collect())
    }

    /// Every topic, including inactive ones
    pub async fn list_all(&self) -> Result<Vec<TopicResponseDto>> {
        let topics = sqlx::query_as::<_, Topic>("SELECT * FROM topics ORDER BY display_order, name")
            .fetch_all(&self.pool)
            .await?;

        Ok(topics.into_iter().map(Into::into).collect())
    }

    /// Topic that quizzes may currently be generated for
    pub async fn get_active(&self, slug: &str) -> Result<Topic> {
        sqlx::query_as::<_, Topic>("SELECT * FROM topics WHERE slug = $1 AND is_active = TRUE")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Topic '{}' not found", slug)))
    }

    pub async fn create(&self, dto: CreateTopicDto) -> Result<TopicResponseDto> {
        let topic = sqlx::query_as::<_, Topic>(
            r#"
            INSERT INTO topics (slug, name, description, display_order)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&dto.slug)
        .bind(dto.name.trim())
        .bind(&dto.description)
        .bind(dto.display_order)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_db(e, &format!("Topic '{}' already exists", dto.slug)))?;

        info!("Topic created: slug={}", topic.slug);
        Ok(topic.into())
    }

    pub async fn update(&self, slug: &str, dto: UpdateTopicDto) -> Result<TopicResponseDto> {
        let topic = sqlx::query_as::<_, Topic>(
            r#"
            UPDATE topics
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                is_active = COALESCE($4, is_active),
                display_order = COALESCE($5, display_order),
                updated_at = NOW()
            WHERE slug = $1
            RETURNING *
            "#,
        )
        .bind(slug)
        .bind(dto.name.map(|n| n.trim().to_string()))
        .bind(dto.description)
        .bind(dto.is_active)
        .bind(dto.display_order)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Topic '{}' not found", slug)))?;

        Ok(topic.into())
    }

    /// Delete a topic that no quiz references; referenced topics must be deactivated instead
    pub async fn delete(&self, slug: &str) -> Result<()> {
        let in_use_message = format!(
            "Topic '{}' is used by existing quizzes; deactivate it instead",
            slug
        );

        let in_use: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM quizzes WHERE topic_slug = $1)")
                .bind(slug)
                .fetch_one(&self.pool)
                .await?;

        if in_use {
            return Err(AppError::Conflict(in_use_message));
        }

        // a quiz created after the check still trips the foreign key
        let result = sqlx::query("DELETE FROM topics WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::from_db_in_use(e, &in_use_message))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Topic '{}' not found", slug)));
        }

        info!("Topic deleted: slug={}", slug);
        Ok(())
    }
}
