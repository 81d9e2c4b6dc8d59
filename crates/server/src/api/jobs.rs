//! Job API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use tubequeue_core::{EnqueueRequest, Job, OrchestratorError};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for enqueueing one job
#[derive(Debug, Deserialize)]
pub struct EnqueueBody {
    #[serde(flatten)]
    pub job: EnqueueRequest,
    /// Proceed even though credentials may be stale
    #[serde(default)]
    pub confirm_stale: bool,
}

/// Request body for enqueueing many jobs
#[derive(Debug, Deserialize)]
pub struct EnqueueBatchBody {
    pub jobs: Vec<EnqueueRequest>,
    #[serde(default)]
    pub confirm_stale: bool,
}

/// Request body for merging an exported history
#[derive(Debug, Deserialize)]
pub struct RestoreBody {
    pub jobs: Vec<Job>,
}

/// Response for a single enqueue
#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    /// False when the job was already queued or downloading
    pub enqueued: bool,
    pub job: Option<Job>,
}

/// Response for a batch enqueue
#[derive(Debug, Serialize)]
pub struct EnqueueBatchResponse {
    pub submitted: usize,
    pub added: usize,
}

/// Response for listing jobs
#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<Job>,
    pub total: usize,
}

/// Response for operations touching many jobs
#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct JobErrorResponse {
    pub error: String,
    /// Machine-readable reason for configuration rejections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

/// Orchestrator error mapped to an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub OrchestratorError);

impl From<OrchestratorError> for ApiError {
    fn from(e: OrchestratorError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            OrchestratorError::DestinationNotConfigured => {
                (StatusCode::BAD_REQUEST, Some("destination_not_configured"))
            }
            OrchestratorError::CredentialsUnconfirmed => {
                (StatusCode::BAD_REQUEST, Some("credentials_unconfirmed"))
            }
            OrchestratorError::JobNotFound(_) => (StatusCode::NOT_FOUND, None),
            OrchestratorError::InvalidTransition { .. } => (StatusCode::CONFLICT, None),
            OrchestratorError::Store(e) => {
                error!("Job store error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
            OrchestratorError::Stopped => (StatusCode::SERVICE_UNAVAILABLE, None),
        };

        (
            status,
            Json(JobErrorResponse {
                error: self.0.to_string(),
                code,
            }),
        )
            .into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// List all jobs in queue order
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListJobsResponse>, ApiError> {
    let jobs = state.orchestrator().list().await?;
    Ok(Json(ListJobsResponse {
        total: jobs.len(),
        jobs,
    }))
}

/// Get a job by id
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    state
        .orchestrator()
        .get(&id)
        .await?
        .map(Json)
        .ok_or(ApiError(OrchestratorError::JobNotFound(id)))
}

/// Enqueue one job
pub async fn enqueue_job(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EnqueueBody>,
) -> Result<(StatusCode, Json<EnqueueResponse>), ApiError> {
    let orchestrator = state.orchestrator();
    let id = body.job.id.clone();
    let enqueued = orchestrator.enqueue(body.job, body.confirm_stale).await?;
    let job = orchestrator.get(&id).await?;

    let status = if enqueued {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(EnqueueResponse { enqueued, job })))
}

/// Enqueue many jobs
pub async fn enqueue_batch(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EnqueueBatchBody>,
) -> Result<Json<EnqueueBatchResponse>, ApiError> {
    let submitted = body.jobs.len();
    let added = state
        .orchestrator()
        .enqueue_batch(body.jobs, body.confirm_stale)
        .await?;
    Ok(Json(EnqueueBatchResponse { submitted, added }))
}

/// Retry a failed or cancelled job
pub async fn retry_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(state.orchestrator().retry(&id).await?))
}

/// Download a completed or failed job again
pub async fn redownload_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(state.orchestrator().redownload(&id).await?))
}

/// Cancel a queued or downloading job
pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(state.orchestrator().cancel(&id).await?))
}

/// Remove a job in any status
pub async fn remove_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(state.orchestrator().remove(&id).await?))
}

/// Re-queue every failed job
pub async fn retry_failed(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.orchestrator().retry_all_failed().await?;
    Ok(Json(CountResponse { count }))
}

/// Cancel every queued and downloading job
pub async fn cancel_all(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.orchestrator().cancel_all().await?;
    Ok(Json(CountResponse { count }))
}

/// Delete every finished job
pub async fn clear_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.orchestrator().clear_history().await?;
    Ok(Json(CountResponse { count }))
}

/// Merge finished jobs from an exported history
pub async fn restore_history(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RestoreBody>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.orchestrator().restore_history(body.jobs).await?;
    Ok(Json(CountResponse { count }))
}
