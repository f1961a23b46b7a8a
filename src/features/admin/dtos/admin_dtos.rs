use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::users::models::UserRole;
use crate::shared::constants::DEFAULT_PAGE_SIZE;
use crate::shared::types::PaginationQuery;

// =============================================================================
// COMMON SORT ENUM
// =============================================================================

/// Sort direction
#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Desc,
    Asc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

// =============================================================================
// USER DTOs
// =============================================================================

/// Query params for listing users
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct UserSearchQuery {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,
    /// Items per page
    #[serde(default = "default_page_size")]
    #[param(minimum = 1, maximum = 100)]
    pub page_size: i64,
    /// Case-insensitive match on email or name
    pub search: Option<String>,
    /// Sort by signup date (default: desc)
    #[serde(default)]
    pub sort: SortDirection,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl UserSearchQuery {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery {
            page: self.page,
            page_size: self.page_size,
        }
    }

    /// `ILIKE` pattern for the search term, `None` when blank
    pub fn search_pattern(&self) -> Option<String> {
        let term = self.search.as_deref()?.trim();
        if term.is_empty() {
            return None;
        }
        let escaped = term
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        Some(format!("%{}%", escaped))
    }
}

/// Admin view of a user account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AdminUserDto {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub credits: i32,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub quiz_count: i64,
    pub document_count: i64,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateUserAdminDto {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    pub role: Option<UserRole>,

    #[validate(range(min = 0, message = "Credits cannot be negative"))]
    pub credits: Option<i32>,
}

// =============================================================================
// STATS
// =============================================================================

/// Dashboard totals
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AdminStatsDto {
    pub users: i64,
    pub quizzes: i64,
    pub completed_quizzes: i64,
    /// Mean score over completed quizzes, 2 decimals
    pub average_score: Option<f64>,
    pub open_reports: i64,
    pub documents: i64,
    /// Sum of completed payments, in cents
    pub revenue_cents: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::name::en::Name;
    use fake::Fake;
    use tokio_test::{assert_err, assert_ok};

    fn query(search: Option<&str>) -> UserSearchQuery {
        UserSearchQuery {
            page: 1,
            page_size: 10,
            search: search.map(str::to_string),
            sort: SortDirection::default(),
        }
    }

    #[test]
    fn test_search_pattern() {
        assert_eq!(query(None).search_pattern(), None);
        assert_eq!(query(Some("   ")).search_pattern(), None);
        assert_eq!(
            query(Some(" ada@ ")).search_pattern(),
            Some("%ada@%".to_string())
        );
        assert_eq!(
            query(Some("100%_done")).search_pattern(),
            Some("%100\\%\\_done%".to_string())
        );
    }

    #[test]
    fn test_sort_direction_default_is_desc() {
        assert_eq!(query(None).sort.as_sql(), "DESC");
        assert_eq!(SortDirection::Asc.as_sql(), "ASC");
    }

    #[test]
    fn test_update_user_validation() {
        let ok = UpdateUserAdminDto {
            name: Some(Name().fake()),
            role: Some(UserRole::Admin),
            credits: Some(0),
        };
        assert_ok!(ok.validate());

        let negative = UpdateUserAdminDto {
            name: None,
            role: None,
            credits: Some(-1),
        };
        assert_err!(negative.validate());

        let empty_name = UpdateUserAdminDto {
            name: Some(String::new()),
            role: None,
            credits: None,
        };
        assert_err!(empty_name.validate());
    }
}
