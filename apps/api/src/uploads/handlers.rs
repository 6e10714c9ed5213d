//! Axum route handlers for the Upload API.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::analysis::handlers::analyze_if_present;
use crate::analysis::models::AnalysisResult;
use crate::errors::AppError;
use crate::extractors::{AppPath, AppQuery};
use crate::models::upload::UploadRow;
use crate::state::AppState;
use crate::uploads::extract::{content_preview, extract_text, FileKind};
use crate::uploads::store::NewUpload;

const PREVIEW_CHARS: usize = 500;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct UploadListQuery {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub upload: UploadRow,
    /// Extracted text, so the client can keep editing it as a draft.
    pub text: String,
    pub analysis: Option<AnalysisResult>,
}

struct FilePart {
    filename: String,
    content_type: Option<String>,
    bytes: Bytes,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/uploads
///
/// Multipart form with a `file` part and an optional `user_id` part.
/// Extracts text, stores file + metadata, and returns the analysis.
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart?;
    let mut file: Option<FilePart> = None;
    let mut user_id: Option<Uuid> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|name| !name.trim().is_empty())
                    .ok_or_else(|| AppError::Validation("file part has no filename".into()))?;
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                file = Some(FilePart {
                    filename,
                    content_type,
                    bytes,
                });
            }
            Some("user_id") => {
                let raw = field.text().await?;
                let parsed = Uuid::parse_str(raw.trim())
                    .map_err(|_| AppError::Validation(format!("invalid user_id '{raw}'")))?;
                user_id = Some(parsed);
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::Validation("missing 'file' part".into()))?;
    if file.bytes.is_empty() {
        return Err(AppError::Validation(format!("'{}' is empty", file.filename)));
    }
    if file.bytes.len() > state.config.max_upload_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "'{}' exceeds {} bytes",
            file.filename, state.config.max_upload_bytes
        )));
    }

    let kind = FileKind::detect(&file.filename, file.content_type.as_deref())?;

    let extract_bytes = file.bytes.clone();
    let text = tokio::task::spawn_blocking(move || extract_text(kind, &extract_bytes))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("extraction task failed: {e}")))??;

    info!(
        "Extracted {} chars from '{}' ({:?})",
        text.len(),
        file.filename,
        kind
    );

    let upload = state
        .uploads
        .save(NewUpload {
            id: Uuid::new_v4(),
            user_id,
            filename: file.filename,
            content_type: kind.mime_type().to_string(),
            content_preview: content_preview(&text, PREVIEW_CHARS),
            bytes: file.bytes,
        })
        .await?;

    let analysis = analyze_if_present(&text);

    Ok(Json(UploadResponse {
        upload,
        text,
        analysis,
    }))
}

/// GET /api/v1/uploads
pub async fn handle_list_uploads(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<UploadListQuery>,
) -> Result<Json<Vec<UploadRow>>, AppError> {
    Ok(Json(state.uploads.list(params.user_id).await?))
}

/// GET /api/v1/uploads/:id
pub async fn handle_get_upload(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<UploadRow>, AppError> {
    state
        .uploads
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Upload {id} not found")))
}

/// DELETE /api/v1/uploads/:id
pub async fn handle_delete_upload(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.uploads.delete(id).await? {
        return Err(AppError::NotFound(format!("Upload {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}
