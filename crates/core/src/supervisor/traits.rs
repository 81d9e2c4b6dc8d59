//! Trait definitions for the supervisor module.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::SupervisorError;
use super::types::{LaunchRequest, SupervisorEvent};

/// Runs downloader processes and reports what they do.
#[async_trait]
pub trait Supervisor: Send + Sync {
    /// Returns the name of this supervisor implementation.
    fn name(&self) -> &str;

    /// Start a download. Returns once the process is running.
    ///
    /// Progress and exactly one terminal event for the attempt are sent on
    /// `events` in emission order. An `Err` means nothing was started and no
    /// event will follow.
    async fn start(
        &self,
        request: LaunchRequest,
        events: mpsc::Sender<SupervisorEvent>,
    ) -> Result<(), SupervisorError>;

    /// Ask the job's process to terminate. Returns false if none is running,
    /// which is not an error.
    async fn cancel(&self, job_id: &str) -> bool;

    /// Number of processes still running.
    async fn running(&self) -> usize;

    /// Terminate every running process.
    async fn shutdown(&self);
}
