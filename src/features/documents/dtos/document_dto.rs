use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::documents::models::Document;

/// Upload document request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadDocumentDto {
    /// Plain text or Markdown file (UTF-8, max 5 MB)
    #[schema(format = Binary, content_media_type = "text/plain")]
    pub file: String,
    /// Optional topic slug the document belongs to
    #[schema(example = "chemistry")]
    pub topic: Option<String>,
}

/// Response DTO for documents
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentResponseDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub original_filename: String,
    pub content_type: String,
    /// Size of the file in bytes
    pub file_size: i64,
    pub topic_slug: Option<String>,
    /// Number of retrieval chunks the text was split into
    pub chunk_count: i64,
    pub created_at: DateTime<Utc>,
}

impl DocumentResponseDto {
    pub fn new(doc: Document, chunk_count: i64) -> Self {
        Self {
            id: doc.id,
            user_id: doc.user_id,
            original_filename: doc.original_filename,
            content_type: doc.content_type,
            file_size: doc.file_size,
            topic_slug: doc.topic_slug,
            chunk_count,
            created_at: doc.created_at,
        }
    }
}

/// Document row joined with its chunk count
#[derive(Debug, sqlx::FromRow)]
pub struct DocumentWithCountRow {
    #[sqlx(flatten)]
    pub document: Document,
    pub chunk_count: i64,
}

impl From<DocumentWithCountRow> for DocumentResponseDto {
    fn from(row: DocumentWithCountRow) -> Self {
        Self::new(row.document, row.chunk_count)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentDetailDto {
    #[serde(flatten)]
    pub document: DocumentResponseDto,
    /// Time-limited download link
    pub download_url: String,
}

/// Allowed MIME types for document uploads
pub const ALLOWED_CONTENT_TYPES: &[&str] = &["text/plain", "text/markdown"];

/// Maximum document size in bytes (5MB)
pub const MAX_DOCUMENT_SIZE: usize = 5 * 1024 * 1024;

/// Resolve the effective MIME type of an upload.
///
/// Browsers often send Markdown as `application/octet-stream` or
/// `text/x-markdown`, so the file extension decides in those cases.
pub fn resolve_content_type(declared: Option<&str>, filename: &str) -> String {
    let declared = declared
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_lowercase())
        .unwrap_or_default();

    match declared.as_str() {
        "text/plain" | "text/markdown" => declared,
        "text/x-markdown" => "text/markdown".to_string(),
        "" | "application/octet-stream" => {
            let extension = filename
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_lowercase())
                .unwrap_or_default();
            match extension.as_str() {
                "md" | "markdown" => "text/markdown".to_string(),
                "txt" => "text/plain".to_string(),
                _ => declared,
            }
        }
        _ => declared,
    }
}

/// Check if a MIME type is allowed
pub fn is_content_type_allowed(content_type: &str) -> bool {
    ALLOWED_CONTENT_TYPES.contains(&content_type)
}

/// Get file extension from content type
pub fn get_extension_from_content_type(content_type: &str) -> Option<&'static str> {
    match content_type {
        "text/plain" => Some("txt"),
        "text/markdown" => Some("md"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_content_type() {
        assert_eq!(resolve_content_type(Some("text/plain"), "notes"), "text/plain");
        assert_eq!(
            resolve_content_type(Some("text/plain; charset=utf-8"), "notes.txt"),
            "text/plain"
        );
        assert_eq!(
            resolve_content_type(Some("text/x-markdown"), "notes.md"),
            "text/markdown"
        );
        assert_eq!(
            resolve_content_type(Some("application/octet-stream"), "Notes.MD"),
            "text/markdown"
        );
        assert_eq!(resolve_content_type(None, "notes.txt"), "text/plain");
        assert_eq!(
            resolve_content_type(Some("application/pdf"), "notes.pdf"),
            "application/pdf"
        );
    }

    #[test]
    fn test_allowed_types_and_extensions() {
        assert!(is_content_type_allowed("text/plain"));
        assert!(is_content_type_allowed("text/markdown"));
        assert!(!is_content_type_allowed("application/pdf"));
        assert_eq!(get_extension_from_content_type("text/markdown"), Some("md"));
        assert_eq!(get_extension_from_content_type("image/png"), None);
    }
}
