//! Types for the download orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::job::{JobStatus, JobStoreError};

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// No download destination has been configured.
    #[error("download destination is not configured")]
    DestinationNotConfigured,

    /// Credentials may be stale and the caller did not confirm.
    #[error("credentials may be stale; confirm to enqueue anyway")]
    CredentialsUnconfirmed,

    /// Job not found.
    #[error("job not found: {0}")]
    JobNotFound(String),

    /// Operation not allowed from the job's current status.
    #[error("cannot {action} job {id} while it is {status}")]
    InvalidTransition {
        id: String,
        status: JobStatus,
        action: &'static str,
    },

    /// Job store error.
    #[error("job store error: {0}")]
    Store(#[from] JobStoreError),

    /// The coordinator task is no longer running.
    #[error("orchestrator is not running")]
    Stopped,
}

impl OrchestratorError {
    /// Rejections the caller fixes by changing configuration and resubmitting.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            OrchestratorError::DestinationNotConfigured | OrchestratorError::CredentialsUnconfirmed
        )
    }
}

/// Event published to subscribers whenever a job changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    Progress {
        job_id: String,
        progress: f32,
        #[serde(skip_serializing_if = "Option::is_none")]
        speed: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        eta: Option<String>,
    },
    Completed {
        job_id: String,
        output_path: String,
    },
    Error {
        job_id: String,
        message: String,
    },
    /// Queued, admitted or cancelled.
    StatusChanged { job_id: String, status: JobStatus },
    Removed { job_id: String },
}

impl JobEvent {
    pub fn job_id(&self) -> &str {
        match self {
            JobEvent::Progress { job_id, .. }
            | JobEvent::Completed { job_id, .. }
            | JobEvent::Error { job_id, .. }
            | JobEvent::StatusChanged { job_id, .. }
            | JobEvent::Removed { job_id } => job_id,
        }
    }

    /// Short name used for metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            JobEvent::Progress { .. } => "progress",
            JobEvent::Completed { .. } => "completed",
            JobEvent::Error { .. } => "error",
            JobEvent::StatusChanged { .. } => "status_changed",
            JobEvent::Removed { .. } => "removed",
        }
    }
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Whether the coordinator is running.
    pub running: bool,
    pub max_concurrent: usize,
    pub queued: usize,
    pub downloading: usize,
    pub completed: usize,
    pub error: usize,
    pub cancelled: usize,
    /// Whether a destination root is set.
    pub destination_configured: bool,
    pub credentials_stale: bool,
}

impl OrchestratorStatus {
    pub fn count(&self, status: JobStatus) -> usize {
        match status {
            JobStatus::Queued => self.queued,
            JobStatus::Downloading => self.downloading,
            JobStatus::Completed => self.completed,
            JobStatus::Error => self.error,
            JobStatus::Cancelled => self.cancelled,
        }
    }
}
