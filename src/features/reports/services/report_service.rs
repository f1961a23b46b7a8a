use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::reports::dtos::{CreateReportDto, ReportResponseDto, UpdateReportDto};
use crate::features::reports::models::{Report, ReportStatus};
use crate::shared::types::PaginationQuery;

/// Service for report operations
pub struct ReportService {
    pool: PgPool,
}

impl ReportService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: Uuid, dto: CreateReportDto) -> Result<ReportResponseDto> {
        if let Some(quiz_id) = dto.quiz_id {
            let owned: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM quizzes WHERE id = $1 AND user_id = $2)",
            )
            .bind(quiz_id)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

            if !owned {
                return Err(AppError::NotFound("Quiz not found".to_string()));
            }
        }

        let report = sqlx::query_as::<_, Report>(
            r#"
            INSERT INTO reports (user_id, quiz_id, kind, subject, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(dto.quiz_id)
        .bind(dto.kind)
        .bind(dto.subject.trim())
        .bind(dto.message.trim())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create report: {:?}", e);
            AppError::Database(e)
        })?;

        tracing::info!("Report created: id={}, user={}", report.id, user_id);

        Ok(report.into())
    }

    /// List reports for a user
    pub async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<ReportResponseDto>> {
        let reports = sqlx::query_as::<_, Report>(
            "SELECT * FROM reports WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reports.into_iter().map(Into::into).collect())
    }

    /// Get report by ID (must belong to user)
    pub async fn get_by_id(&self, id: Uuid, user_id: Uuid) -> Result<ReportResponseDto> {
        sqlx::query_as::<_, Report>("SELECT * FROM reports WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Into::into)
            .ok_or_else(|| AppError::NotFound("Report not found".to_string()))
    }

    /// All reports, optionally filtered by status (admin)
    pub async fn list_all(
        &self,
        status: Option<ReportStatus>,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<ReportResponseDto>, i64)> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reports WHERE ($1::report_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let reports = sqlx::query_as::<_, Report>(
            r#"
            SELECT * FROM reports
            WHERE ($1::report_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((reports.into_iter().map(Into::into).collect(), total))
    }

    /// Update status and/or admin note (admin)
    pub async fn update(&self, id: Uuid, dto: UpdateReportDto) -> Result<ReportResponseDto> {
        let report = sqlx::query_as::<_, Report>(
            r#"
            UPDATE reports
            SET status = COALESCE($2, status),
                admin_note = COALESCE($3, admin_note),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(dto.status)
        .bind(dto.admin_note)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Report not found".to_string()))?;

        tracing::info!("Report updated: id={}, status={}", report.id, report.status);

        Ok(report.into())
    }
}
