//! Cloneable front end to a running orchestrator.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::gate::EnqueueGate;
use super::messages::Command;
use super::types::{JobEvent, OrchestratorError, OrchestratorStatus};
use crate::job::{EnqueueRequest, Job};
use crate::status_cache::{StatusCache, StatusSnapshot};

/// Handle to the coordinator task.
///
/// Every mutating operation is a message to the coordinator, which applies
/// them one at a time. Status polls and event subscriptions are served
/// without going through it.
#[derive(Clone)]
pub struct OrchestratorHandle {
    pub(crate) commands: mpsc::Sender<Command>,
    pub(crate) events: broadcast::Sender<JobEvent>,
    pub(crate) status_cache: Arc<StatusCache>,
    pub(crate) gate: Arc<EnqueueGate>,
    pub(crate) running: Arc<AtomicBool>,
    pub(crate) task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl OrchestratorHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, OrchestratorError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| OrchestratorError::Stopped)?;
        response.await.map_err(|_| OrchestratorError::Stopped)
    }

    /// Queue a download. Returns `false` if the id is already queued or downloading.
    ///
    /// `confirm_stale` acknowledges that credentials may be stale.
    pub async fn enqueue(
        &self,
        request: EnqueueRequest,
        confirm_stale: bool,
    ) -> Result<bool, OrchestratorError> {
        self.request(|reply| Command::Enqueue {
            request,
            confirm_stale,
            reply,
        })
        .await?
    }

    /// Queue many downloads. Returns how many were actually added.
    ///
    /// A configuration rejection applies to the whole batch.
    pub async fn enqueue_batch(
        &self,
        requests: Vec<EnqueueRequest>,
        confirm_stale: bool,
    ) -> Result<usize, OrchestratorError> {
        self.request(|reply| Command::EnqueueBatch {
            requests,
            confirm_stale,
            reply,
        })
        .await?
    }

    pub async fn retry(&self, id: &str) -> Result<Job, OrchestratorError> {
        let id = id.to_string();
        self.request(|reply| Command::Retry { id, reply }).await?
    }

    /// Re-queue every failed job. Returns how many were re-queued.
    pub async fn retry_all_failed(&self) -> Result<usize, OrchestratorError> {
        self.request(|reply| Command::RetryAllFailed { reply }).await?
    }

    pub async fn redownload(&self, id: &str) -> Result<Job, OrchestratorError> {
        let id = id.to_string();
        self.request(|reply| Command::Redownload { id, reply })
            .await?
    }

    pub async fn cancel(&self, id: &str) -> Result<Job, OrchestratorError> {
        let id = id.to_string();
        self.request(|reply| Command::Cancel { id, reply }).await?
    }

    pub async fn cancel_all(&self) -> Result<usize, OrchestratorError> {
        self.request(|reply| Command::CancelAll { reply }).await?
    }

    /// Delete a job in any status, stopping its download if one is running.
    pub async fn remove(&self, id: &str) -> Result<Job, OrchestratorError> {
        let id = id.to_string();
        self.request(|reply| Command::Remove { id, reply }).await?
    }

    pub async fn clear_history(&self) -> Result<usize, OrchestratorError> {
        self.request(|reply| Command::ClearHistory { reply }).await?
    }

    /// Merge finished jobs from an exported history.
    pub async fn restore_history(&self, jobs: Vec<Job>) -> Result<usize, OrchestratorError> {
        self.request(|reply| Command::RestoreHistory { jobs, reply })
            .await?
    }

    pub async fn get(&self, id: &str) -> Result<Option<Job>, OrchestratorError> {
        let id = id.to_string();
        self.request(|reply| Command::Get { id, reply }).await
    }

    /// All jobs in queue order.
    pub async fn list(&self) -> Result<Vec<Job>, OrchestratorError> {
        self.request(|reply| Command::List { reply }).await
    }

    pub async fn status(&self) -> Result<OrchestratorStatus, OrchestratorError> {
        self.request(|reply| Command::Status { reply }).await
    }

    /// Poll the short-lived status of one job.
    pub fn poll(&self, id: &str) -> StatusSnapshot {
        self.status_cache.query(id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    pub fn destination_root(&self) -> Option<PathBuf> {
        self.gate.destination_root()
    }

    pub fn set_destination_root(&self, root: Option<&Path>) {
        self.gate.set_destination_root(root);
    }

    pub fn credentials_stale(&self) -> bool {
        self.gate.credentials_stale()
    }

    pub fn set_credentials_stale(&self, stale: bool) {
        self.gate.set_credentials_stale(stale);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stop the coordinator and every running download.
    ///
    /// Jobs are left as they are; downloads interrupted here are re-queued by
    /// the next start.
    pub async fn shutdown(&self) {
        if self.request(|reply| Command::Shutdown { reply }).await.is_err() {
            warn!("Orchestrator already stopped");
        }
        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                warn!("Coordinator task ended abnormally: {}", e);
            }
            info!("Download orchestrator stopped");
        }
    }
}
