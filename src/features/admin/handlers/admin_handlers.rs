use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::core::error::Result;
use crate::core::extractor::ValidatedJson;
use crate::features::admin::dtos::*;
use crate::features::admin::services::AdminService;
use crate::features::auth::guards::RequireAdmin;
use crate::features::documents::dtos::DocumentResponseDto;
use crate::features::documents::DocumentService;
use crate::features::meta::dtos::{MetadataDto, UpsertMetadataDto};
use crate::features::meta::MetaService;
use crate::features::reports::dtos::{ReportFilterQuery, ReportResponseDto, UpdateReportDto};
use crate::features::reports::ReportService;
use crate::features::topics::dtos::{CreateTopicDto, TopicResponseDto, UpdateTopicDto};
use crate::features::topics::TopicService;
use crate::shared::types::{ApiResponse, Meta, PaginationQuery};

/// Services reachable from the admin area
#[derive(Clone)]
pub struct AdminState {
    pub admin_service: Arc<AdminService>,
    pub document_service: Arc<DocumentService>,
    pub topic_service: Arc<TopicService>,
    pub report_service: Arc<ReportService>,
    pub meta_service: Arc<MetaService>,
}

// =============================================================================
// USERS
// =============================================================================

/// List users
#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(UserSearchQuery),
    responses(
        (status = 200, description = "Paginated users", body = ApiResponse<Vec<AdminUserDto>>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - admin access required")
    ),
    security(("bearer_auth" = [])),
    tag = "admin",
    operation_id = "admin_list_users"
)]
pub async fn list_users(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AdminState>,
    Query(params): Query<UserSearchQuery>,
) -> Result<Json<ApiResponse<Vec<AdminUserDto>>>> {
    let (items, total) = state.admin_service.list_users(&params).await?;
    Ok(Json(ApiResponse::success(Some(items), None, Some(Meta { total }))))
}

/// Get a user
#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = ApiResponse<AdminUserDto>),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin",
    operation_id = "admin_get_user"
)]
pub async fn get_user(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AdminUserDto>>> {
    let user = state.admin_service.get_user(id).await?;
    Ok(Json(ApiResponse::success(Some(user), None, None)))
}

/// Update a user's name, role or credits
#[utoipa::path(
    patch,
    path = "/api/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserAdminDto,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<AdminUserDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin",
    operation_id = "admin_update_user"
)]
pub async fn update_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateUserAdminDto>,
) -> Result<Json<ApiResponse<AdminUserDto>>> {
    let user = state.admin_service.update_user(admin.user_id, id, dto).await?;
    Ok(Json(ApiResponse::success(
        Some(user),
        Some("User updated".to_string()),
        None,
    )))
}

/// Delete a user and their data
#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "Cannot delete yourself"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin",
    operation_id = "admin_delete_user"
)]
pub async fn delete_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    state.admin_service.delete_user(admin.user_id, id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("User deleted".to_string()),
        None,
    )))
}

// =============================================================================
// DOCUMENTS
// =============================================================================

/// List every active document
#[utoipa::path(
    get,
    path = "/api/admin/documents",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Paginated documents", body = ApiResponse<Vec<DocumentResponseDto>>),
        (status = 403, description = "Forbidden - admin access required")
    ),
    security(("bearer_auth" = [])),
    tag = "admin",
    operation_id = "admin_list_documents"
)]
pub async fn list_documents(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AdminState>,
    Query(params): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<DocumentResponseDto>>>> {
    let (items, total) = state.document_service.list_all(&params).await?;
    Ok(Json(ApiResponse::success(Some(items), None, Some(Meta { total }))))
}

/// Delete any document
#[utoipa::path(
    delete,
    path = "/api/admin/documents/{id}",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document deleted"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 404, description = "Document not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin",
    operation_id = "admin_delete_document"
)]
pub async fn delete_document(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    state.document_service.delete_any(id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Document deleted".to_string()),
        None,
    )))
}

// =============================================================================
// TOPICS
// =============================================================================

/// List all topics, inactive included
#[utoipa::path(
    get,
    path = "/api/admin/topics",
    responses(
        (status = 200, description = "All topics", body = ApiResponse<Vec<TopicResponseDto>>),
        (status = 403, description = "Forbidden - admin access required")
    ),
    security(("bearer_auth" = [])),
    tag = "admin",
    operation_id = "admin_list_topics"
)]
pub async fn list_topics(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AdminState>,
) -> Result<Json<ApiResponse<Vec<TopicResponseDto>>>> {
    let topics = state.topic_service.list_all().await?;
    Ok(Json(ApiResponse::success(Some(topics), None, None)))
}

/// Create a topic
#[utoipa::path(
    post,
    path = "/api/admin/topics",
    request_body = CreateTopicDto,
    responses(
        (status = 201, description = "Topic created", body = ApiResponse<TopicResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 409, description = "Slug already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "admin",
    operation_id = "admin_create_topic"
)]
pub async fn create_topic(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AdminState>,
    ValidatedJson(dto): ValidatedJson<CreateTopicDto>,
) -> Result<(StatusCode, Json<ApiResponse<TopicResponseDto>>)> {
    let topic = state.topic_service.create(dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(topic),
            Some("Topic created".to_string()),
            None,
        )),
    ))
}

/// Update a topic
#[utoipa::path(
    patch,
    path = "/api/admin/topics/{slug}",
    params(("slug" = String, Path, description = "Topic slug")),
    request_body = UpdateTopicDto,
    responses(
        (status = 200, description = "Topic updated", body = ApiResponse<TopicResponseDto>),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 404, description = "Topic not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin",
    operation_id = "admin_update_topic"
)]
pub async fn update_topic(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AdminState>,
    Path(slug): Path<String>,
    ValidatedJson(dto): ValidatedJson<UpdateTopicDto>,
) -> Result<Json<ApiResponse<TopicResponseDto>>> {
    let topic = state.topic_service.update(&slug, dto).await?;
    Ok(Json(ApiResponse::success(
        Some(topic),
        Some("Topic updated".to_string()),
        None,
    )))
}

/// Delete a topic that no quiz references
#[utoipa::path(
    delete,
    path = "/api/admin/topics/{slug}",
    params(("slug" = String, Path, description = "Topic slug")),
    responses(
        (status = 200, description = "Topic deleted"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 404, description = "Topic not found"),
        (status = 409, description = "Topic is referenced by quizzes")
    ),
    security(("bearer_auth" = [])),
    tag = "admin",
    operation_id = "admin_delete_topic"
)]
pub async fn delete_topic(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AdminState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<()>>> {
    state.topic_service.delete(&slug).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Topic deleted".to_string()),
        None,
    )))
}

// =============================================================================
// REPORTS
// =============================================================================

/// List reports, optionally by status
#[utoipa::path(
    get,
    path = "/api/admin/reports",
    params(ReportFilterQuery),
    responses(
        (status = 200, description = "Paginated reports", body = ApiResponse<Vec<ReportResponseDto>>),
        (status = 403, description = "Forbidden - admin access required")
    ),
    security(("bearer_auth" = [])),
    tag = "admin",
    operation_id = "admin_list_reports"
)]
pub async fn list_reports(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AdminState>,
    Query(params): Query<ReportFilterQuery>,
) -> Result<Json<ApiResponse<Vec<ReportResponseDto>>>> {
    let (items, total) = state
        .report_service
        .list_all(params.status, &params.pagination())
        .await?;
    Ok(Json(ApiResponse::success(Some(items), None, Some(Meta { total }))))
}

/// Update a report's status or note
#[utoipa::path(
    patch,
    path = "/api/admin/reports/{id}",
    params(("id" = Uuid, Path, description = "Report ID")),
    request_body = UpdateReportDto,
    responses(
        (status = 200, description = "Report updated", body = ApiResponse<ReportResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Forbidden - admin access required"),
        (status = 404, description = "Report not found")
    ),
    security(("bearer_auth" = [])),
    tag = "admin",
    operation_id = "admin_update_report"
)]
pub async fn update_report(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AdminState>,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateReportDto>,
) -> Result<Json<ApiResponse<ReportResponseDto>>> {
    let report = state.report_service.update(id, dto).await?;
    Ok(Json(ApiResponse::success(
        Some(report),
        Some("Report updated".to_string()),
        None,
    )))
}

// =============================================================================
// METADATA & STATS
// =============================================================================

/// Create or replace a metadata entry
#[utoipa::path(
    put,
    path = "/api/admin/metadata/{key}",
    params(("key" = String, Path, description = "Metadata key, e.g. `banner.message`")),
    request_body = UpsertMetadataDto,
    responses(
        (status = 200, description = "Metadata saved", body = ApiResponse<MetadataDto>),
        (status = 400, description = "Invalid key"),
        (status = 403, description = "Forbidden - admin access required")
    ),
    security(("bearer_auth" = [])),
    tag = "admin",
    operation_id = "admin_upsert_metadata"
)]
pub async fn upsert_metadata(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AdminState>,
    Path(key): Path<String>,
    ValidatedJson(dto): ValidatedJson<UpsertMetadataDto>,
) -> Result<Json<ApiResponse<MetadataDto>>> {
    let entry = state.meta_service.upsert(&key, dto).await?;
    Ok(Json(ApiResponse::success(
        Some(entry),
        Some("Metadata saved".to_string()),
        None,
    )))
}

/// Dashboard totals
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Totals", body = ApiResponse<AdminStatsDto>),
        (status = 403, description = "Forbidden - admin access required")
    ),
    security(("bearer_auth" = [])),
    tag = "admin",
    operation_id = "admin_get_stats"
)]
pub async fn get_stats(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AdminState>,
) -> Result<Json<ApiResponse<AdminStatsDto>>> {
    let stats = state.admin_service.stats().await?;
    Ok(Json(ApiResponse::success(Some(stats), None, None)))
}
