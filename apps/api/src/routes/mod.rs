pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers as analysis;
use crate::errors::AppError;
use crate::state::AppState;
use crate::uploads::handlers as uploads;

/// Room for multipart boundaries and the `user_id` part on top of the file.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

async fn route_not_found() -> AppError {
    AppError::NotFound("No such route".to_string())
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // Analysis API
        .route("/api/v1/analyze", post(analysis::handle_analyze))
        .route("/api/v1/drafts", post(analysis::handle_create_draft))
        .route(
            "/api/v1/drafts/:id",
            get(analysis::handle_get_draft)
                .put(analysis::handle_update_draft)
                .delete(analysis::handle_delete_draft),
        )
        // Upload API
        .route(
            "/api/v1/uploads",
            get(uploads::handle_list_uploads).post(uploads::handle_upload),
        )
        .route(
            "/api/v1/uploads/:id",
            get(uploads::handle_get_upload).delete(uploads::handle_delete_upload),
        )
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
