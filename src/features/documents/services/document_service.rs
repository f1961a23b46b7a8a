use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::documents::dtos::{
    get_extension_from_content_type, is_content_type_allowed, DocumentDetailDto,
    DocumentResponseDto, DocumentWithCountRow, ALLOWED_CONTENT_TYPES, MAX_DOCUMENT_SIZE,
};
use crate::features::documents::models::Document;
use crate::features::documents::services::chunker::{chunk_text, CHUNK_OVERLAP, CHUNK_SIZE};
use crate::modules::storage::ObjectStore;
use crate::shared::constants::MAX_CONTEXT_CHUNKS;
use crate::shared::types::PaginationQuery;
use crate::shared::validation::SLUG_REGEX;

/// A file pulled out of a multipart upload
#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    /// Size, type and encoding checks; returns the decoded text
    pub fn validate(&self) -> Result<&str> {
        if self.data.is_empty() {
            return Err(AppError::BadRequest("File is empty".to_string()));
        }

        if self.data.len() > MAX_DOCUMENT_SIZE {
            return Err(AppError::BadRequest(format!(
                "File too large. Maximum size is {} bytes ({} MB)",
                MAX_DOCUMENT_SIZE,
                MAX_DOCUMENT_SIZE / 1024 / 1024
            )));
        }

        if !is_content_type_allowed(&self.content_type) {
            return Err(AppError::BadRequest(format!(
                "File type '{}' is not allowed. Allowed types: {}",
                self.content_type,
                ALLOWED_CONTENT_TYPES.join(", ")
            )));
        }

        std::str::from_utf8(&self.data)
            .map_err(|_| AppError::BadRequest("File must be UTF-8 encoded text".to_string()))
    }
}

const DOCUMENT_WITH_COUNT: &str = r#"
    SELECT d.*,
           (SELECT COUNT(*) FROM document_chunks c WHERE c.document_id = d.id) AS chunk_count
    FROM documents d
"#;

/// Service for study documents: storage, chunking and retrieval
pub struct DocumentService {
    pool: PgPool,
    store: Arc<dyn ObjectStore>,
}

impl DocumentService {
    pub fn new(pool: PgPool, store: Arc<dyn ObjectStore>) -> Self {
        Self { pool, store }
    }

    /// Store the file, split its text into chunks and save both
    pub async fn upload(
        &self,
        user_id: Uuid,
        file: UploadedFile,
        topic: Option<String>,
    ) -> Result<DocumentResponseDto> {
        let text = file.validate()?;
        let chunks = chunk_text(text, CHUNK_SIZE, CHUNK_OVERLAP);
        if chunks.is_empty() {
            return Err(AppError::BadRequest(
                "File does not contain any text".to_string(),
            ));
        }

        if let Some(slug) = topic.as_deref() {
            self.ensure_topic_exists(slug).await?;
        }

        let extension = get_extension_from_content_type(&file.content_type).unwrap_or("txt");
        let path = format!("documents/{}/{}.{}", user_id, Uuid::new_v4(), extension);
        let file_key = self.store.private_key(&path);
        let file_size = file.data.len() as i64;

        self.store
            .upload(&file_key, file.data, &file.content_type)
            .await?;
        debug!("Document uploaded to storage: {}", file_key);

        let url = self.store.object_url(&file_key);

        let saved = self
            .save(
                user_id,
                &file_key,
                &file.filename,
                &file.content_type,
                file_size,
                &url,
                topic.as_deref(),
                &chunks,
            )
            .await;

        let document = match saved {
            Ok(document) => document,
            Err(e) => {
                if let Err(cleanup) = self.store.delete(&file_key).await {
                    warn!("Failed to remove orphaned object {}: {}", file_key, cleanup);
                }
                return Err(e);
            }
        };

        info!(
            "Document saved: id={}, key={}, size={}, chunks={}",
            document.id,
            document.file_key,
            document.file_size,
            chunks.len()
        );

        Ok(DocumentResponseDto::new(document, chunks.len() as i64))
    }

    #[allow(clippy::too_many_arguments)]
    async fn save(
        &self,
        user_id: Uuid,
        file_key: &str,
        filename: &str,
        content_type: &str,
        file_size: i64,
        url: &str,
        topic: Option<&str>,
        chunks: &[String],
    ) -> Result<Document> {
        let mut tx = self.pool.begin().await?;

        let document = sqlx::query_as::<_, Document>(
            r#"
            INSERT INTO documents (user_id, file_key, original_filename, content_type, file_size, url, topic_slug)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(file_key)
        .bind(filename)
        .bind(content_type)
        .bind(file_size)
        .bind(url)
        .bind(topic)
        .fetch_one(&mut *tx)
        .await?;

        let positions: Vec<i32> = (0..chunks.len() as i32).collect();
        sqlx::query(
            r#"
            INSERT INTO document_chunks (document_id, position, content)
            SELECT $1, position, content
            FROM UNNEST($2::int[], $3::text[]) AS t(position, content)
            "#,
        )
        .bind(document.id)
        .bind(&positions)
        .bind(chunks)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(document)
    }

    async fn ensure_topic_exists(&self, slug: &str) -> Result<()> {
        if !SLUG_REGEX.is_match(slug) {
            return Err(AppError::Validation(format!("Invalid topic slug '{}'", slug)));
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM topics WHERE slug = $1)")
            .bind(slug)
            .fetch_one(&self.pool)
            .await?;

        if !exists {
            return Err(AppError::BadRequest(format!("Topic '{}' not found", slug)));
        }
        Ok(())
    }

    /// Caller's active documents, newest first
    pub async fn list(
        &self,
        user_id: Uuid,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<DocumentResponseDto>, i64)> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM documents WHERE user_id = $1 AND is_active = TRUE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, DocumentWithCountRow>(&format!(
            "{} WHERE d.user_id = $1 AND d.is_active = TRUE ORDER BY d.created_at DESC LIMIT $2 OFFSET $3",
            DOCUMENT_WITH_COUNT
        ))
        .bind(user_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    /// Every active document, for admins
    pub async fn list_all(
        &self,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<DocumentResponseDto>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE is_active = TRUE")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, DocumentWithCountRow>(&format!(
            "{} WHERE d.is_active = TRUE ORDER BY d.created_at DESC LIMIT $1 OFFSET $2",
            DOCUMENT_WITH_COUNT
        ))
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    async fn find_active(&self, id: Uuid) -> Result<DocumentWithCountRow> {
        sqlx::query_as::<_, DocumentWithCountRow>(&format!(
            "{} WHERE d.id = $1 AND d.is_active = TRUE",
            DOCUMENT_WITH_COUNT
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Document not found".to_string()))
    }

    /// Owner-only view with a presigned download URL
    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<DocumentDetailDto> {
        let row = self.find_active(id).await?;
        if row.document.user_id != user_id {
            return Err(AppError::NotFound("Document not found".to_string()));
        }

        let download_url = self.store.presigned_url(&row.document.file_key).await?;

        Ok(DocumentDetailDto {
            document: row.into(),
            download_url,
        })
    }

    /// Owner delete: removes the object and soft-deletes the row
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let row = self.find_active(id).await?;
        if row.document.user_id != user_id {
            return Err(AppError::Forbidden(
                "You do not have permission to delete this document".to_string(),
            ));
        }
        self.remove(row.document).await
    }

    /// Admin delete, regardless of owner
    pub async fn delete_any(&self, id: Uuid) -> Result<()> {
        let row = self.find_active(id).await?;
        self.remove(row.document).await
    }

    async fn remove(&self, document: Document) -> Result<()> {
        self.store.delete(&document.file_key).await?;
        debug!("Document deleted from storage: {}", document.file_key);

        sqlx::query(
            r#"
            UPDATE documents
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(document.id)
        .execute(&self.pool)
        .await?;

        info!(
            "Document soft deleted: id={}, key={}",
            document.id, document.file_key
        );
        Ok(())
    }

    /// Best-ranked chunks of the caller's documents for a free-text query.
    ///
    /// Every id must be an active document owned by `user_id`. Chunks that
    /// do not match the query still qualify, in document order.
    pub async fn context_chunks(
        &self,
        user_id: Uuid,
        document_ids: &[Uuid],
        query: &str,
    ) -> Result<Vec<String>> {
        if document_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids = document_ids.to_vec();
        ids.sort();
        ids.dedup();

        let owned: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM documents
            WHERE id = ANY($1) AND user_id = $2 AND is_active = TRUE
            "#,
        )
        .bind(&ids)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        if owned != ids.len() as i64 {
            return Err(AppError::NotFound("Document not found".to_string()));
        }

        let chunks: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT content FROM document_chunks
            WHERE document_id = ANY($1)
            ORDER BY ts_rank(search, websearch_to_tsquery('english', $2)) DESC,
                     document_id, position
            LIMIT $3
            "#,
        )
        .bind(&ids)
        .bind(query)
        .bind(MAX_CONTEXT_CHUNKS)
        .fetch_all(&self.pool)
        .await?;

        debug!(
            "Retrieved {} context chunks from {} documents",
            chunks.len(),
            ids.len()
        );
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(content_type: &str, data: &[u8]) -> UploadedFile {
        UploadedFile {
            filename: "notes.txt".to_string(),
            content_type: content_type.to_string(),
            data: data.to_vec(),
        }
    }

    #[test]
    fn test_validate_accepts_utf8_text() {
        let upload = file("text/markdown", "# Thermodynamics\nΔU = Q − W".as_bytes());
        assert_eq!(upload.validate().unwrap(), "# Thermodynamics\nΔU = Q − W");
    }

    #[test]
    fn test_validate_rejects_bad_uploads() {
        assert!(matches!(
            file("text/plain", b"").validate(),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            file("application/pdf", b"%PDF-1.7").validate(),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            file("text/plain", &[0xff, 0xfe, 0x00]).validate(),
            Err(AppError::BadRequest(_))
        ));

        let too_big = vec![b'a'; MAX_DOCUMENT_SIZE + 1];
        let err = file("text/plain", &too_big).validate().unwrap_err();
        assert!(err.to_string().contains("too large"));
    }
}
