//! Job persistence trait.

use thiserror::Error;

use super::Job;

/// Error type for job persistence.
#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("Database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for JobStoreError {
    fn from(e: rusqlite::Error) -> Self {
        JobStoreError::Database(e.to_string())
    }
}

/// Durable storage for the job list.
///
/// The coordinator is the only writer; implementations only need to be safe
/// to share, not to arbitrate concurrent mutations.
pub trait JobStore: Send + Sync {
    /// Load every persisted job.
    fn load_all(&self) -> Result<Vec<Job>, JobStoreError>;

    /// Insert or replace one job.
    fn upsert(&self, job: &Job) -> Result<(), JobStoreError>;

    /// Insert or replace several jobs atomically.
    fn upsert_many(&self, jobs: &[Job]) -> Result<(), JobStoreError>;

    /// Delete a job. Returns false if it did not exist.
    fn delete(&self, id: &str) -> Result<bool, JobStoreError>;

    /// Delete several jobs atomically. Returns the number removed.
    fn delete_many(&self, ids: &[String]) -> Result<usize, JobStoreError>;
}
