//! HTTP endpoint handlers for the omapick web API.
//!
//! This module contains all the handler functions for the REST API endpoints.

#![allow(clippy::missing_errors_doc)]

use std::path::PathBuf;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::orchestrator::{JobSnapshot, JobStep};
use crate::preview::{PreviewKey, SyncReport};
use crate::service::{AvailableSummary, InstalledSummary};

use super::error::{ApiError, ApiResult};
use super::state::SharedState;

// ============================================================================
// Request/response types
// ============================================================================

/// Body of `POST /api/themes/apply`.
#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    /// Installed theme name
    pub name: String,
}

/// Body of `POST /api/themes/install`.
#[derive(Debug, Deserialize)]
pub struct InstallRequest {
    /// Theme name
    pub name: String,
    /// Repository URL, required for themes outside the catalog
    #[serde(default)]
    pub url: Option<String>,
    /// Return a job id immediately instead of waiting
    #[serde(default)]
    pub background: bool,
}

/// Result of a finished install or apply job.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    /// Whether every step completed
    pub success: bool,
    /// Steps with their final status
    pub steps: Vec<JobStep>,
    /// Step that failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    /// Error of the failed step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<JobSnapshot> for JobResponse {
    fn from(snapshot: JobSnapshot) -> Self {
        Self {
            success: snapshot.succeeded(),
            steps: snapshot.steps,
            failed_step: snapshot.failed_step,
            error: snapshot.error,
        }
    }
}

/// Response of a background install.
#[derive(Debug, Serialize)]
pub struct JobStarted {
    /// Id to poll at `/api/jobs/{id}`
    pub job_id: Uuid,
}

/// Response of a removal.
#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    /// Always true; failures are errors
    pub success: bool,
}

/// Query of `POST /api/sync-previews`.
#[derive(Debug, Default, Deserialize)]
pub struct SyncQuery {
    /// Also sync catalog themes that are not installed
    #[serde(default)]
    pub available: bool,
    /// Refetch available previews that are already cached
    #[serde(default)]
    pub force: bool,
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

// ============================================================================
// Listing handlers
// ============================================================================

/// GET /api/themes - List installed themes.
pub async fn list_themes(State(state): State<SharedState>) -> Json<Vec<InstalledSummary>> {
    Json(state.service.installed())
}

/// GET /api/available - List catalog themes that are not installed.
pub async fn list_available(State(state): State<SharedState>) -> Json<Vec<AvailableSummary>> {
    Json(state.service.available())
}

// ============================================================================
// Operation handlers
// ============================================================================

/// POST /api/themes/apply - Apply an installed theme.
pub async fn apply_theme(
    State(state): State<SharedState>,
    Json(req): Json<ApplyRequest>,
) -> ApiResult<Json<JobResponse>> {
    let handle = state.service.orchestrator().apply(&req.name)?;
    Ok(Json(handle.wait().await.into()))
}

/// POST /api/themes/install - Install a theme, waiting unless `background`.
pub async fn install_theme(
    State(state): State<SharedState>,
    Json(req): Json<InstallRequest>,
) -> ApiResult<Response> {
    let handle = state
        .service
        .orchestrator()
        .install(&req.name, req.url.as_deref())?;

    if req.background {
        let job_id = handle.id();
        state.jobs.insert(handle);
        return Ok((StatusCode::ACCEPTED, Json(JobStarted { job_id })).into_response());
    }

    let response: JobResponse = handle.wait().await.into();
    Ok(Json(response).into_response())
}

/// GET /api/jobs/{id} - Poll a background job.
pub async fn get_job(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JobSnapshot>> {
    state
        .jobs
        .take_snapshot(id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("no job with id {id}")))
}

/// DELETE /api/themes/{name} - Remove an installed theme.
pub async fn delete_theme(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> ApiResult<Json<RemoveResponse>> {
    state.service.orchestrator().remove(&name).await?;
    Ok(Json(RemoveResponse { success: true }))
}

// ============================================================================
// Preview handlers
// ============================================================================

/// GET /api/themes/{name}/preview - Preview of an installed theme.
pub async fn installed_preview(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> ApiResult<Response> {
    let path = state
        .service
        .cache()
        .get_or_fetch(&PreviewKey::installed(name))
        .await?;
    serve_jpeg(path).await
}

/// GET /api/available/{name}/preview - Preview of a catalog theme.
///
/// A cached preview of the installed copy wins over the remote one.
pub async fn available_preview(
    State(state): State<SharedState>,
    Path(name): Path<String>,
) -> ApiResult<Response> {
    let cache = state.service.cache();
    let local = PreviewKey::installed(name.as_str());
    if cache.is_cached(&local) {
        return serve_jpeg(cache.path_for(&local)?).await;
    }

    let path = cache.get_or_fetch(&PreviewKey::available(name)).await?;
    serve_jpeg(path).await
}

/// POST /api/sync-previews - Refresh cached previews.
pub async fn sync_previews(
    State(state): State<SharedState>,
    Query(query): Query<SyncQuery>,
) -> ApiResult<Json<SyncReport>> {
    let cache = state.service.cache();
    let report = if query.available {
        cache.sync_all(query.force).await?
    } else {
        cache.resync_installed().await?
    };
    Ok(Json(report))
}

async fn serve_jpeg(path: PathBuf) -> ApiResult<Response> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to read preview: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        bytes,
    )
        .into_response())
}

// ============================================================================
// Health
// ============================================================================

/// GET /health - Liveness check.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::VERSION,
    })
}
