use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{handlers, jobs, middleware::metrics_middleware, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/orchestrator/status", get(handlers::orchestrator_status))
        // Jobs
        .route("/jobs", get(jobs::list_jobs).post(jobs::enqueue_job))
        .route("/jobs/batch", post(jobs::enqueue_batch))
        .route("/jobs/retry-failed", post(jobs::retry_failed))
        .route("/jobs/cancel-all", post(jobs::cancel_all))
        .route("/jobs/clear-history", post(jobs::clear_history))
        .route("/jobs/restore", post(jobs::restore_history))
        .route("/jobs/{id}", get(jobs::get_job).delete(jobs::remove_job))
        .route("/jobs/{id}/retry", post(jobs::retry_job))
        .route("/jobs/{id}/redownload", post(jobs::redownload_job))
        .route("/jobs/{id}/cancel", post(jobs::cancel_job))
        // Polling and credentials
        .route("/status", get(handlers::poll_status))
        .route(
            "/credentials",
            get(handlers::get_credentials).put(handlers::set_credentials),
        )
        // Real-time events
        .route("/ws", get(ws::ws_handler));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
