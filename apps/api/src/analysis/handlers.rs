//! Axum route handlers for the Analysis API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::analysis::models::{AnalysisInput, AnalysisResult};
use crate::analysis::scheduler::{AnalysisScheduler, AnalysisState};
use crate::analysis::scorer::analyze;
use crate::errors::AppError;
use crate::extractors::{AppJson, AppPath};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Draft sessions
// ────────────────────────────────────────────────────────────────────────────

struct DraftMeta {
    filename: Option<String>,
    last_touched: Instant,
}

struct DraftSession {
    scheduler: AnalysisScheduler,
    meta: Mutex<DraftMeta>,
}

impl DraftSession {
    fn meta(&self) -> MutexGuard<'_, DraftMeta> {
        self.meta.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registry of live editing sessions. Each session owns a scheduler, so
/// rapid edits to one draft cancel each other without affecting others.
/// Sessions untouched for `idle_ttl` are dropped by `evict_idle`.
pub struct DraftSessions {
    delay: Duration,
    idle_ttl: Duration,
    sessions: RwLock<HashMap<Uuid, Arc<DraftSession>>>,
}

impl DraftSessions {
    pub fn new(delay: Duration, idle_ttl: Duration) -> Self {
        Self {
            delay,
            idle_ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let session = Arc::new(DraftSession {
            scheduler: AnalysisScheduler::new(self.delay),
            meta: Mutex::new(DraftMeta {
                filename: None,
                last_touched: Instant::now(),
            }),
        });
        self.sessions.write().await.insert(id, session);
        id
    }

    /// Looks up a session and marks it as used.
    async fn get(&self, id: Uuid) -> Result<Arc<DraftSession>, AppError> {
        let session = self
            .sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Draft {id} not found")))?;
        session.meta().last_touched = Instant::now();
        Ok(session)
    }

    /// Drops the session; its scheduler aborts any pending work on drop.
    pub async fn remove(&self, id: Uuid) -> bool {
        match self.sessions.write().await.remove(&id) {
            Some(session) => {
                session.scheduler.cancel();
                true
            }
            None => false,
        }
    }

    /// Removes every session idle for longer than `idle_ttl`.
    pub async fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| {
            let keep = now.duration_since(session.meta().last_touched) <= self.idle_ttl;
            if !keep {
                session.scheduler.cancel();
            }
            keep
        });
        before - sessions.len()
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Runs `evict_idle` every `every` until the registry is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let registry = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(sessions) = registry.upgrade() else {
                    break;
                };
                let evicted = sessions.evict_idle().await;
                if evicted > 0 {
                    info!(
                        "Evicted {evicted} idle draft sessions, {} remain",
                        sessions.active_count().await
                    );
                }
            }
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub filename: Option<String>,
    /// `None` for blank input: the client shows its placeholder state.
    pub analysis: Option<AnalysisResult>,
}

#[derive(Debug, Serialize)]
pub struct DraftCreatedResponse {
    pub draft_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DraftStateResponse {
    pub draft_id: Uuid,
    pub filename: Option<String>,
    pub state: AnalysisState,
}

#[derive(Debug, Serialize)]
pub struct DraftSubmitResponse {
    pub draft_id: Uuid,
    pub generation: u64,
    pub state: AnalysisState,
}

/// Scores `text` unless it is blank.
pub fn analyze_if_present(text: &str) -> Option<AnalysisResult> {
    if text.trim().is_empty() {
        return None;
    }
    Some(analyze(text))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/analyze
///
/// Scores pasted resume text immediately.
pub async fn handle_analyze(AppJson(input): AppJson<AnalysisInput>) -> Json<AnalyzeResponse> {
    let analysis = analyze_if_present(&input.text);
    if let Some(result) = &analysis {
        debug!(
            "Analyzed {} chars, overall score {}",
            input.text.len(),
            result.overall_score
        );
    }
    Json(AnalyzeResponse {
        filename: input.filename,
        analysis,
    })
}

/// POST /api/v1/drafts
pub async fn handle_create_draft(
    State(state): State<AppState>,
) -> (StatusCode, Json<DraftCreatedResponse>) {
    let draft_id = state.drafts.create().await;
    info!("Created draft session {draft_id}");
    (StatusCode::CREATED, Json(DraftCreatedResponse { draft_id }))
}

/// PUT /api/v1/drafts/:id
///
/// Replaces the draft text. Analysis is published after the configured
/// delay unless newer text arrives first.
pub async fn handle_update_draft(
    State(state): State<AppState>,
    AppPath(draft_id): AppPath<Uuid>,
    AppJson(input): AppJson<AnalysisInput>,
) -> Result<Json<DraftSubmitResponse>, AppError> {
    let session = state.drafts.get(draft_id).await?;
    session.meta().filename = input.filename;
    let generation = session.scheduler.submit(input.text);
    Ok(Json(DraftSubmitResponse {
        draft_id,
        generation,
        state: session.scheduler.current(),
    }))
}

/// GET /api/v1/drafts/:id
pub async fn handle_get_draft(
    State(state): State<AppState>,
    AppPath(draft_id): AppPath<Uuid>,
) -> Result<Json<DraftStateResponse>, AppError> {
    let session = state.drafts.get(draft_id).await?;
    let filename = session.meta().filename.clone();
    Ok(Json(DraftStateResponse {
        draft_id,
        filename,
        state: session.scheduler.current(),
    }))
}

/// DELETE /api/v1/drafts/:id
pub async fn handle_delete_draft(
    State(state): State<AppState>,
    AppPath(draft_id): AppPath<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.drafts.remove(draft_id).await {
        return Err(AppError::NotFound(format!("Draft {draft_id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}
