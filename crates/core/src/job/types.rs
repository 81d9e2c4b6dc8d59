//! Job data model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a download job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Downloading,
    Completed,
    Error,
    Cancelled,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Queued,
        JobStatus::Downloading,
        JobStatus::Completed,
        JobStatus::Error,
        JobStatus::Cancelled,
    ];

    /// Returns the status name used in storage, events and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Downloading => "downloading",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Queued or downloading.
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Downloading)
    }

    /// No automatic transition leaves a terminal state.
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    pub fn can_cancel(&self) -> bool {
        self.is_active()
    }

    pub fn can_retry(&self) -> bool {
        matches!(self, JobStatus::Error | JobStatus::Cancelled)
    }

    pub fn can_redownload(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown job status: {}", s))
    }
}

/// Input for enqueueing one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnqueueRequest {
    /// External video identifier, also the de-duplication key.
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    pub channel_name: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    /// Channel group, used as the first directory level.
    #[serde(default)]
    pub group_name: Option<String>,
}

/// One queued, active or finished download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub channel_name: String,
    pub channel_id: Option<String>,
    pub group_name: Option<String>,
    pub status: JobStatus,
    /// 0-100, meaningful only while downloading.
    pub progress: f32,
    pub speed: Option<String>,
    pub eta: Option<String>,
    /// Set only in `error`.
    pub error: Option<String>,
    /// Set only in `completed`.
    pub output_path: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    /// FIFO tie-breaker for equal `enqueued_at`.
    #[serde(default)]
    pub sequence: u64,
    /// Number of times the job has been admitted. Supervisor events carry it.
    #[serde(default)]
    pub attempt: u32,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// A fresh queued job.
    pub fn new(request: EnqueueRequest, now: DateTime<Utc>, sequence: u64) -> Self {
        Self {
            id: request.id,
            title: request.title,
            thumbnail: request.thumbnail,
            channel_name: request.channel_name,
            channel_id: request.channel_id,
            group_name: request.group_name,
            status: JobStatus::Queued,
            progress: 0.0,
            speed: None,
            eta: None,
            error: None,
            output_path: None,
            enqueued_at: now,
            sequence,
            attempt: 0,
            started_at: None,
            updated_at: now,
        }
    }

    /// Move to `queued` or `downloading`, resetting transient progress fields.
    pub(crate) fn reset_to(&mut self, status: JobStatus, now: DateTime<Utc>) {
        self.status = status;
        self.progress = 0.0;
        self.speed = None;
        self.eta = None;
        self.error = None;
        self.output_path = None;
        self.updated_at = now;
    }

    /// FIFO ordering key among queued jobs.
    pub fn queue_key(&self) -> (DateTime<Utc>, u64) {
        (self.enqueued_at, self.sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: &str) -> EnqueueRequest {
        EnqueueRequest {
            id: id.to_string(),
            title: "Title".to_string(),
            thumbnail: Some("https://img/1.jpg".to_string()),
            channel_name: "Channel".to_string(),
            channel_id: Some("UC1".to_string()),
            group_name: None,
        }
    }

    #[test]
    fn test_new_job_is_queued_and_clean() {
        let now = Utc::now();
        let job = Job::new(request("v1"), now, 7);
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0.0);
        assert!(job.speed.is_none() && job.eta.is_none() && job.error.is_none());
        assert_eq!(job.enqueued_at, now);
        assert_eq!(job.sequence, 7);
        assert_eq!(job.attempt, 0);
    }

    #[test]
    fn test_reset_clears_transient_fields() {
        let now = Utc::now();
        let mut job = Job::new(request("v1"), now, 0);
        job.status = JobStatus::Error;
        job.progress = 42.0;
        job.speed = Some("1MiB/s".to_string());
        job.eta = Some("00:10".to_string());
        job.error = Some("boom".to_string());

        job.reset_to(JobStatus::Queued, now);
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0.0);
        assert!(job.speed.is_none() && job.eta.is_none() && job.error.is_none());
    }

    #[test]
    fn test_status_classification() {
        assert!(JobStatus::Queued.is_active());
        assert!(JobStatus::Downloading.is_active());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Error.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());

        assert!(JobStatus::Error.can_retry());
        assert!(JobStatus::Cancelled.can_retry());
        assert!(!JobStatus::Completed.can_retry());

        assert!(JobStatus::Completed.can_redownload());
        assert!(!JobStatus::Cancelled.can_redownload());
        assert!(!JobStatus::Completed.can_cancel());
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in JobStatus::ALL {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("paused".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::Downloading).unwrap();
        assert_eq!(json, "\"downloading\"");
    }

    #[test]
    fn test_enqueue_request_optional_fields() {
        let json = r#"{"id":"v1","title":"T","channel_name":"C"}"#;
        let request: EnqueueRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.id, "v1");
        assert!(request.thumbnail.is_none());
        assert!(request.group_name.is_none());
    }
}
