use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::admin::dtos::*;
use crate::features::users::models::{User, UserRole};
use crate::features::users::UserService;

const USER_WITH_COUNTS: &str = r#"
    SELECT
        u.id, u.email, u.name, u.role, u.credits, u.email_verified_at, u.created_at,
        (SELECT COUNT(*) FROM quizzes q WHERE q.user_id = u.id) AS quiz_count,
        (SELECT COUNT(*) FROM documents d WHERE d.user_id = u.id AND d.is_active) AS document_count
    FROM users u
"#;

/// Service for admin account management and dashboard totals
pub struct AdminService {
    pool: PgPool,
    users: Arc<UserService>,
}

impl AdminService {
    pub fn new(pool: PgPool, users: Arc<UserService>) -> Self {
        Self { pool, users }
    }

    // =========================================================================
    // USERS
    // =========================================================================

    /// List users with optional email/name search
    pub async fn list_users(&self, query: &UserSearchQuery) -> Result<(Vec<AdminUserDto>, i64)> {
        let pattern = query.search_pattern();
        let pagination = query.pagination();

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM users
            WHERE ($1::text IS NULL OR email ILIKE $1 OR name ILIKE $1)
            "#,
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        // sort is a closed enum, never user text
        let items = sqlx::query_as::<_, AdminUserDto>(&format!(
            "{} WHERE ($1::text IS NULL OR u.email ILIKE $1 OR u.name ILIKE $1) \
             ORDER BY u.created_at {} LIMIT $2 OFFSET $3",
            USER_WITH_COUNTS,
            query.sort.as_sql()
        ))
        .bind(&pattern)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((items, total))
    }

    pub async fn get_user(&self, id: Uuid) -> Result<AdminUserDto> {
        sqlx::query_as::<_, AdminUserDto>(&format!("{} WHERE u.id = $1", USER_WITH_COUNTS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Change name, role or credit balance. Admins cannot demote themselves.
    pub async fn update_user(
        &self,
        admin_id: Uuid,
        id: Uuid,
        dto: UpdateUserAdminDto,
    ) -> Result<AdminUserDto> {
        if admin_id == id && dto.role == Some(UserRole::User) {
            return Err(AppError::BadRequest(
                "You cannot remove your own admin role".to_string(),
            ));
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                role = COALESCE($3, role),
                credits = COALESCE($4, credits),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(dto.name)
        .bind(dto.role)
        .bind(dto.credits)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        info!(
            "User updated by admin: id={}, role={}, credits={}, by={}",
            user.id, user.role, user.credits, admin_id
        );

        self.get_user(user.id).await
    }

    pub async fn delete_user(&self, admin_id: Uuid, id: Uuid) -> Result<()> {
        if admin_id == id {
            return Err(AppError::BadRequest(
                "You cannot delete your own account from the admin area".to_string(),
            ));
        }

        self.users.delete_account(id).await?;
        info!("User deleted by admin: id={}, by={}", id, admin_id);
        Ok(())
    }

    // =========================================================================
    // STATS
    // =========================================================================

    pub async fn stats(&self) -> Result<AdminStatsDto> {
        let stats = sqlx::query_as::<_, AdminStatsDto>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM quizzes) AS quizzes,
                (SELECT COUNT(*) FROM quizzes WHERE status = 'completed') AS completed_quizzes,
                (SELECT ROUND(AVG(score), 2)::float8 FROM quizzes WHERE status = 'completed') AS average_score,
                (SELECT COUNT(*) FROM reports WHERE status = 'open') AS open_reports,
                (SELECT COUNT(*) FROM documents WHERE is_active) AS documents,
                (SELECT COALESCE(SUM(amount_cents), 0)::int8 FROM payments WHERE status = 'completed') AS revenue_cents
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::storage::testing::MemoryObjectStore;
    use crate::shared::test_helpers::lazy_pool;

    fn service() -> AdminService {
        let pool = lazy_pool();
        let users = Arc::new(UserService::new(
            pool.clone(),
            Arc::new(MemoryObjectStore::default()),
        ));
        AdminService::new(pool, users)
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_self() {
        let id = Uuid::new_v4();
        let result = service().delete_user(id, id).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_admin_cannot_demote_self() {
        let id = Uuid::new_v4();
        let dto = UpdateUserAdminDto {
            name: None,
            role: Some(UserRole::User),
            credits: None,
        };
        let result = service().update_user(id, id, dto).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
