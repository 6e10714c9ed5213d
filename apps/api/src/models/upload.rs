use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata for one stored resume file. The file itself lives in object
/// storage under `storage_path`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UploadRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub filename: String,
    pub storage_path: String,
    pub size_bytes: i64,
    pub content_type: String,
    pub content_preview: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
