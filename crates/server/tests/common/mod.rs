//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock supervisor injected, so no downloader process is spawned.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use tubequeue_core::{
    testing::MockSupervisor, Config, DownloadOrchestrator, JobStore, OrchestratorConfig,
    OrchestratorHandle, SqliteJobStore, Supervisor,
};
use tubequeue_server::{create_router, AppState};

/// Test fixture for E2E testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_enqueue() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/jobs", json!({
///         "id": "v1", "title": "Video", "channel_name": "Channel"
///     })).await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock supervisor - drive downloads
    pub supervisor: Arc<MockSupervisor>,
    /// Handle to the running orchestrator
    pub orchestrator: OrchestratorHandle,
    /// Temporary directory for test database and downloads
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Test configuration options
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub max_concurrent: usize,
    pub destination_configured: bool,
    pub credentials_stale: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            destination_configured: true,
            credentials_stale: false,
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = Config::default();
        config.database.path = temp_dir.path().join("jobs.db");
        config.orchestrator = OrchestratorConfig {
            max_concurrent: test_config.max_concurrent,
            sweep_interval_ms: 20,
            ..Default::default()
        };
        config.library.destination_root = test_config
            .destination_configured
            .then(|| temp_dir.path().join("media"));
        config.library.credentials_stale = test_config.credentials_stale;

        let store: Arc<dyn JobStore> = Arc::new(
            SqliteJobStore::new(&config.database.path).expect("Failed to create job store"),
        );
        let supervisor = Arc::new(MockSupervisor::new());

        let orchestrator = DownloadOrchestrator::new(
            config.orchestrator.clone(),
            store,
            Arc::clone(&supervisor) as Arc<dyn Supervisor>,
        )
        .with_destination_root(config.library.destination_root.clone())
        .with_credentials_stale(config.library.credentials_stale)
        .start()
        .await
        .expect("Failed to start orchestrator");

        let state = Arc::new(AppState::new(config, orchestrator.clone()));
        let router = create_router(state);

        Self {
            router,
            supervisor,
            orchestrator,
            temp_dir,
        }
    }

    pub fn media_root(&self) -> PathBuf {
        self.temp_dir.path().join("media")
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Poll `GET /api/v1/jobs/{id}` until the job reaches `status`.
    pub async fn wait_for_status(&self, id: &str, status: &str) -> bool {
        let path = format!("/api/v1/jobs/{}", id);
        for _ in 0..200 {
            let response = self.get(&path).await;
            if response.body["status"] == status {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    /// Wait until the mock supervisor has received `count` launches.
    pub async fn wait_for_launches(&self, count: usize) -> bool {
        for _ in 0..200 {
            if self.supervisor.launch_count().await >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// JSON body for enqueueing a job with reasonable defaults.
pub fn job_body(id: &str) -> Value {
    serde_json::json!({
        "id": id,
        "title": format!("Video {}", id),
        "channel_name": "Test Channel",
    })
}
