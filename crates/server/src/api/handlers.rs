use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use tubequeue_core::{OrchestratorStatus, SanitizedConfig};

use super::jobs::ApiError;
use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

pub async fn orchestrator_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<OrchestratorStatus>, ApiError> {
    Ok(Json(state.orchestrator().status().await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusParams {
    pub id: Option<String>,
}

/// Short-lived status of one job, for clients that poll.
pub async fn poll_status(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatusParams>,
) -> impl IntoResponse {
    match params.id.filter(|id| !id.is_empty()) {
        Some(id) => (
            StatusCode::OK,
            Json(serde_json::to_value(state.orchestrator().poll(&id)).unwrap_or_default()),
        ),
        None => (StatusCode::BAD_REQUEST, Json(json!({ "status": "invalid" }))),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CredentialsState {
    pub stale: bool,
}

pub async fn get_credentials(State(state): State<Arc<AppState>>) -> Json<CredentialsState> {
    Json(CredentialsState {
        stale: state.orchestrator().credentials_stale(),
    })
}

pub async fn set_credentials(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CredentialsState>,
) -> Json<CredentialsState> {
    state.orchestrator().set_credentials_stale(body.stale);
    info!(stale = body.stale, "Credentials flag updated");
    Json(body)
}

/// Prometheus scrape endpoint.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state).await;
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
