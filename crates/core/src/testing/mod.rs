//! Testing utilities and mock implementations for E2E tests.
//!
//! This module provides a mock [`Supervisor`](crate::supervisor::Supervisor)
//! and fixtures, allowing orchestrator tests without spawning processes.
//!
//! # Example
//!
//! ```rust,ignore
//! use tubequeue_core::testing::{fixtures, MockSupervisor};
//!
//! let supervisor = Arc::new(MockSupervisor::new());
//! let handle = DownloadOrchestrator::new(config, store, supervisor.clone())
//!     .with_destination_root(Some(root))
//!     .start()
//!     .await?;
//! handle.enqueue(fixtures::enqueue_request("v1"), false).await?;
//! supervisor.complete("v1").await;
//! ```

mod mock_supervisor;

pub use crate::clock::ManualClock;
pub use mock_supervisor::MockSupervisor;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, Utc};

    use crate::job::EnqueueRequest;

    /// Create an enqueue request with reasonable defaults.
    pub fn enqueue_request(id: &str) -> EnqueueRequest {
        EnqueueRequest {
            id: id.to_string(),
            title: format!("Video {}", id),
            thumbnail: Some(format!("https://img.example.com/{}.jpg", id)),
            channel_name: "Test Channel".to_string(),
            channel_id: Some("UC-test".to_string()),
            group_name: None,
        }
    }

    /// Create an enqueue request filed under a group.
    pub fn grouped_request(id: &str, group: &str) -> EnqueueRequest {
        EnqueueRequest {
            group_name: Some(group.to_string()),
            ..enqueue_request(id)
        }
    }

    /// A fixed instant to start manual clocks from.
    pub fn epoch() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
    }
}
