use std::sync::Arc;

use crate::analysis::handlers::DraftSessions;
use crate::config::Config;
use crate::uploads::store::UploadStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Pluggable upload store. Default: S3PgUploadStore.
    pub uploads: Arc<dyn UploadStore>,
    /// Live draft sessions, each with its own delayed analysis scheduler.
    pub drafts: Arc<DraftSessions>,
}
