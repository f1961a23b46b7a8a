use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::reports::models::{Report, ReportKind, ReportStatus};
use crate::shared::constants::DEFAULT_PAGE_SIZE;
use crate::shared::types::PaginationQuery;

/// Response DTO for report
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReportResponseDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub quiz_id: Option<Uuid>,
    pub kind: ReportKind,
    pub subject: String,
    pub message: String,
    pub status: ReportStatus,
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Report> for ReportResponseDto {
    fn from(r: Report) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            quiz_id: r.quiz_id,
            kind: r.kind,
            subject: r.subject,
            message: r.message,
            status: r.status,
            admin_note: r.admin_note,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateReportDto {
    pub kind: ReportKind,

    #[validate(length(min = 3, max = 150, message = "Subject must be 3-150 characters"))]
    pub subject: String,

    #[validate(length(min = 10, max = 5000, message = "Message must be 10-5000 characters"))]
    pub message: String,

    /// Quiz the report is about; must belong to the caller
    pub quiz_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateReportDto {
    pub status: Option<ReportStatus>,

    #[validate(length(max = 2000, message = "Admin note must not exceed 2000 characters"))]
    pub admin_note: Option<String>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct ReportFilterQuery {
    /// Only reports in this status
    pub status: Option<ReportStatus>,

    #[serde(default = "default_page")]
    #[param(minimum = 1)]
    pub page: i64,

    #[serde(default = "default_page_size")]
    #[param(minimum = 1, maximum = 100)]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl ReportFilterQuery {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::lorem::en::{Paragraph, Sentence};
    use fake::Fake;

    fn create(subject: String, message: String) -> CreateReportDto {
        CreateReportDto {
            kind: ReportKind::Content,
            subject,
            message,
            quiz_id: None,
        }
    }

    #[test]
    fn test_create_report_lengths() {
        let subject: String = Sentence(2..5).fake();
        let message: String = Paragraph(2..4).fake();
        assert!(create(subject.chars().take(150).collect(), message.clone())
            .validate()
            .is_ok());

        assert!(create("Hi".to_string(), message.clone()).validate().is_err());
        assert!(create("Wrong answer".to_string(), "Too short".to_string())
            .validate()
            .is_err());
        assert!(create("Wrong answer".to_string(), "x".repeat(5001))
            .validate()
            .is_err());
    }

    #[test]
    fn test_status_filter_parses_snake_case() {
        let query: ReportFilterQuery =
            serde_json::from_str(r#"{"status": "in_progress"}"#).unwrap();
        assert_eq!(query.status, Some(ReportStatus::InProgress));
        assert_eq!(query.pagination().limit(), 10);
    }
}
