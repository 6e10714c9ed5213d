//! Upload persistence: original file to S3-compatible object storage,
//! metadata record to PostgreSQL.
//!
//! Handlers only see `Arc<dyn UploadStore>` from `AppState`, so the backing
//! store can be swapped without touching routing code.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::upload::UploadRow;

/// A file ready to be persisted. The id is assigned by the caller so the
/// object key and the metadata row agree.
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub filename: String,
    pub content_type: String,
    pub content_preview: Option<String>,
    pub bytes: Bytes,
}

impl NewUpload {
    pub fn storage_path(&self) -> String {
        format!("resumes/{}/{}", self.id, sanitize_filename(&self.filename))
    }
}

#[async_trait]
pub trait UploadStore: Send + Sync {
    async fn save(&self, upload: NewUpload) -> Result<UploadRow, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<UploadRow>, AppError>;

    /// Newest first. `user_id` filters when present.
    async fn list(&self, user_id: Option<Uuid>) -> Result<Vec<UploadRow>, AppError>;

    /// Returns `false` when no record existed.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;
}

/// Replaces anything outside `[A-Za-z0-9._-]` with `_` so the name is safe
/// inside an object key.
pub fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

// ────────────────────────────────────────────────────────────────────────────
// S3 + PostgreSQL
// ────────────────────────────────────────────────────────────────────────────

pub struct S3PgUploadStore {
    db: PgPool,
    s3: aws_sdk_s3::Client,
    bucket: String,
}

impl S3PgUploadStore {
    pub fn new(db: PgPool, s3: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { db, s3, bucket }
    }

    async fn delete_object(&self, key: &str) -> Result<(), AppError> {
        self.s3
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::S3(format!("delete {key} failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl UploadStore for S3PgUploadStore {
    async fn save(&self, upload: NewUpload) -> Result<UploadRow, AppError> {
        let key = upload.storage_path();
        let size_bytes = upload.bytes.len() as i64;

        // 1. Object first, so a row never points at a missing file
        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(upload.bytes.clone()))
            .content_type(&upload.content_type)
            .send()
            .await
            .map_err(|e| AppError::S3(format!("upload {key} failed: {e}")))?;

        info!("Uploaded resume to s3://{}/{}", self.bucket, key);

        // 2. Metadata row
        let inserted = sqlx::query_as::<_, UploadRow>(
            r#"
            INSERT INTO resume_uploads
                (id, user_id, filename, storage_path, size_bytes, content_type, content_preview)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(upload.id)
        .bind(upload.user_id)
        .bind(&upload.filename)
        .bind(&key)
        .bind(size_bytes)
        .bind(&upload.content_type)
        .bind(&upload.content_preview)
        .fetch_one(&self.db)
        .await;

        match inserted {
            Ok(row) => Ok(row),
            Err(e) => {
                if let Err(cleanup) = self.delete_object(&key).await {
                    warn!("Orphaned object {key} after failed insert: {cleanup}");
                }
                Err(AppError::Database(e))
            }
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<UploadRow>, AppError> {
        Ok(
            sqlx::query_as::<_, UploadRow>("SELECT * FROM resume_uploads WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.db)
                .await?,
        )
    }

    async fn list(&self, user_id: Option<Uuid>) -> Result<Vec<UploadRow>, AppError> {
        Ok(sqlx::query_as::<_, UploadRow>(
            r#"
            SELECT * FROM resume_uploads
            WHERE $1::uuid IS NULL OR user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let key: Option<String> =
            sqlx::query_scalar("DELETE FROM resume_uploads WHERE id = $1 RETURNING storage_path")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;

        let Some(key) = key else {
            return Ok(false);
        };
        self.delete_object(&key).await?;
        info!("Deleted resume upload {id} ({key})");
        Ok(true)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory store for router tests
// ────────────────────────────────────────────────────────────────────────────
