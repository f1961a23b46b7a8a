use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::documents::dtos::{
    resolve_content_type, DocumentDetailDto, DocumentResponseDto, UploadDocumentDto,
};
use crate::features::documents::services::{DocumentService, UploadedFile};
use crate::shared::types::{ApiResponse, Meta, PaginationQuery};

/// Upload a study document
///
/// Accepts multipart/form-data with:
/// - `file`: plain text or Markdown, UTF-8, max 5 MB (required)
/// - `topic`: topic slug the document belongs to (optional)
#[utoipa::path(
    post,
    path = "/api/documents",
    tag = "documents",
    request_body(
        content = UploadDocumentDto,
        content_type = "multipart/form-data",
        description = "Document upload form with an optional topic slug",
    ),
    responses(
        (status = 201, description = "Document uploaded", body = ApiResponse<DocumentResponseDto>),
        (status = 400, description = "Invalid file or validation error"),
        (status = 401, description = "Authentication required"),
        (status = 413, description = "File too large")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_document(
    user: AuthenticatedUser,
    State(service): State<Arc<DocumentService>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<DocumentResponseDto>>)> {
    let mut upload: Option<UploadedFile> = None;
    let mut topic: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "document.txt".to_string());
                let content_type = resolve_content_type(field.content_type(), &filename);

                let data = field.bytes().await.map_err(|e| {
                    debug!("Failed to read file bytes: {}", e);
                    AppError::BadRequest(format!("Failed to read file data: {}", e))
                })?;

                upload = Some(UploadedFile {
                    filename,
                    content_type,
                    data: data.to_vec(),
                });
            }
            "topic" => {
                let text = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read topic field: {}", e))
                })?;
                let text = text.trim();
                if !text.is_empty() {
                    topic = Some(text.to_string());
                }
            }
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let upload = upload.ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;

    let document = service.upload(user.user_id, upload, topic).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(document),
            Some("Document uploaded successfully".to_string()),
            None,
        )),
    ))
}

#[utoipa::path(
    get,
    path = "/api/documents",
    tag = "documents",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Caller's documents", body = ApiResponse<Vec<DocumentResponseDto>>),
        (status = 401, description = "Authentication required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_documents(
    user: AuthenticatedUser,
    State(service): State<Arc<DocumentService>>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<DocumentResponseDto>>>> {
    let (documents, total) = service.list(user.user_id, &pagination).await?;
    Ok(Json(ApiResponse::success(
        Some(documents),
        None,
        Some(Meta { total }),
    )))
}

#[utoipa::path(
    get,
    path = "/api/documents/{id}",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document with download link", body = ApiResponse<DocumentDetailDto>),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Document not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_document(
    user: AuthenticatedUser,
    State(service): State<Arc<DocumentService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DocumentDetailDto>>> {
    let document = service.get(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(Some(document), None, None)))
}

/// Delete a document
///
/// Only the owner of the document can delete it.
#[utoipa::path(
    delete,
    path = "/api/documents/{id}",
    tag = "documents",
    params(("id" = Uuid, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document deleted"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not authorized to delete this document"),
        (status = 404, description = "Document not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_document(
    user: AuthenticatedUser,
    State(service): State<Arc<DocumentService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>> {
    service.delete(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(
        None,
        Some("Document deleted successfully".to_string()),
        None,
    )))
}
