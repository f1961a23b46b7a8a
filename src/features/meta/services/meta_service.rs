use sqlx::{PgExecutor, PgPool};
use std::sync::Arc;
use tracing::info;

use crate::core::error::{AppError, Result};
use crate::features::meta::dtos::{DifficultyDto, MetadataDto, PublicStatsDto, UpsertMetadataDto};
use crate::features::meta::models::Metadata;
use crate::features::quizzes::models::QuizDifficulty;
use crate::features::topics::dtos::TopicResponseDto;
use crate::features::topics::TopicService;
use crate::shared::constants::{METADATA_COUNTER_KEYS, METADATA_QUIZZES_GENERATED};
use crate::shared::validation::METADATA_KEY_REGEX;

/// Add one to a numeric metadata counter, creating it as a public key at 1
pub async fn increment_counter<'e, E: PgExecutor<'e>>(executor: E, key: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO metadata (key, value, is_public)
        VALUES ($1, '1'::jsonb, TRUE)
        ON CONFLICT (key) DO UPDATE
        SET value = to_jsonb(COALESCE((metadata.value #>> '{}')::bigint, 0) + 1),
            updated_at = NOW()
        "#,
    )
    .bind(key)
    .execute(executor)
    .await?;

    Ok(())
}

/// Keys follow `METADATA_KEY_REGEX`; counters only accept non-negative integers
fn validate_metadata(key: &str, value: &serde_json::Value) -> Result<()> {
    if !METADATA_KEY_REGEX.is_match(key) || key.len() > 100 {
        return Err(AppError::Validation(format!("Invalid metadata key '{}'", key)));
    }

    if METADATA_COUNTER_KEYS.contains(&key) && value.as_i64().filter(|n| *n >= 0).is_none() {
        return Err(AppError::Validation(format!(
            "Metadata '{}' is a counter and must be a non-negative integer",
            key
        )));
    }

    Ok(())
}

pub struct MetaService {
    pool: PgPool,
    topics: Arc<TopicService>,
}

impl MetaService {
    pub fn new(pool: PgPool, topics: Arc<TopicService>) -> Self {
        Self { pool, topics }
    }

    pub async fn topics(&self) -> Result<Vec<TopicResponseDto>> {
        self.topics.list_active().await
    }

    pub fn difficulties(&self) -> Vec<DifficultyDto> {
        QuizDifficulty::ALL.into_iter().map(Into::into).collect()
    }

    pub async fn stats(&self) -> Result<PublicStatsDto> {
        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let quizzes_generated: Option<i64> = sqlx::query_scalar(
            "SELECT (value #>> '{}')::bigint FROM metadata WHERE key = $1",
        )
        .bind(METADATA_QUIZZES_GENERATED)
        .fetch_optional(&self.pool)
        .await?
        .flatten();

        let quizzes_completed: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM quizzes WHERE status = 'completed'")
                .fetch_one(&self.pool)
                .await?;

        Ok(PublicStatsDto {
            users,
            quizzes_generated: quizzes_generated.unwrap_or(0),
            quizzes_completed,
        })
    }

    /// Public value for `key`; private and missing keys are both 404
    pub async fn get_public(&self, key: &str) -> Result<MetadataDto> {
        sqlx::query_as::<_, Metadata>("SELECT * FROM metadata WHERE key = $1 AND is_public = TRUE")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .map(Into::into)
            .ok_or_else(|| AppError::NotFound(format!("Metadata '{}' not found", key)))
    }

    pub async fn upsert(&self, key: &str, dto: UpsertMetadataDto) -> Result<MetadataDto> {
        validate_metadata(key, &dto.value)?;

        let metadata = sqlx::query_as::<_, Metadata>(
            r#"
            INSERT INTO metadata (key, value, is_public)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value,
                is_public = EXCLUDED.is_public,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(key)
        .bind(&dto.value)
        .bind(dto.is_public)
        .fetch_one(&self.pool)
        .await?;

        info!("Metadata updated: key={}, public={}", key, metadata.is_public);
        Ok(metadata.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_counter_keys_only_accept_non_negative_integers() {
        assert!(validate_metadata(METADATA_QUIZZES_GENERATED, &json!(42)).is_ok());
        assert!(validate_metadata(METADATA_QUIZZES_GENERATED, &json!(0)).is_ok());

        for bad in [json!("many"), json!(-1), json!(1.5), json!(null), json!({"n": 1})] {
            assert!(matches!(
                validate_metadata(METADATA_QUIZZES_GENERATED, &bad),
                Err(AppError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_other_keys_accept_any_value() {
        assert!(validate_metadata("banner.message", &json!("Exams week!")).is_ok());
        assert!(validate_metadata("banner.message", &json!({"text": "hi"})).is_ok());
        assert!(validate_metadata("Bad..Key", &json!(1)).is_err());
    }
}
