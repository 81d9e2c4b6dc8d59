//! Mock supervisor for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use crate::supervisor::{LaunchRequest, Supervisor, SupervisorError, SupervisorEvent};

struct RunningLaunch {
    request: LaunchRequest,
    events: mpsc::Sender<SupervisorEvent>,
}

/// Mock implementation of the Supervisor trait.
///
/// Nothing runs on its own: tests drive each launched job by calling
/// [`emit_progress`](Self::emit_progress), [`complete`](Self::complete) or
/// [`fail`](Self::fail). Cancelling only records the request, so a test can
/// still deliver a late terminal event afterwards.
///
/// # Example
///
/// ```rust,ignore
/// let supervisor = Arc::new(MockSupervisor::new());
/// // ... start an orchestrator with it, enqueue "v1" ...
/// supervisor.emit_progress("v1", 50.0).await;
/// supervisor.complete("v1").await;
/// ```
#[derive(Default)]
pub struct MockSupervisor {
    launches: Arc<RwLock<Vec<LaunchRequest>>>,
    running: Arc<RwLock<HashMap<String, RunningLaunch>>>,
    cancelled: Arc<RwLock<Vec<String>>>,
    next_error: Arc<RwLock<Option<SupervisorError>>>,
}

impl MockSupervisor {
    /// Create a new mock supervisor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every launch request received, in order.
    pub async fn launches(&self) -> Vec<LaunchRequest> {
        self.launches.read().await.clone()
    }

    /// Number of launches received.
    pub async fn launch_count(&self) -> usize {
        self.launches.read().await.len()
    }

    /// Ids of jobs whose launch has not reported a terminal event yet.
    pub async fn running_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.running.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Job ids passed to `cancel`, in order.
    pub async fn cancelled(&self) -> Vec<String> {
        self.cancelled.read().await.clone()
    }

    /// Make the next `start` fail with the given error.
    pub async fn set_next_error(&self, error: SupervisorError) {
        *self.next_error.write().await = Some(error);
    }

    /// Send a progress event for the job's current launch.
    pub async fn emit_progress(&self, job_id: &str, progress: f32) -> bool {
        self.emit(job_id, false, |request| {
            SupervisorEvent::progress(request, progress)
        })
        .await
    }

    /// Finish the job's current launch successfully.
    pub async fn complete(&self, job_id: &str) -> bool {
        self.emit(job_id, true, SupervisorEvent::completed).await
    }

    /// Finish the job's current launch with a failure.
    pub async fn fail(&self, job_id: &str, message: &str) -> bool {
        self.emit(job_id, true, |request| SupervisorEvent::failed(request, message))
            .await
    }

    /// Output path the job's current launch was given.
    pub async fn output_path(&self, job_id: &str) -> Option<PathBuf> {
        self.running
            .read()
            .await
            .get(job_id)
            .map(|launch| launch.request.output_path.clone())
    }

    /// Deliver an event built by the test, such as the exit of an earlier
    /// launch, on the channel of the job's current launch. Leaves the current
    /// launch running.
    pub async fn deliver(&self, event: SupervisorEvent) -> bool {
        let sender = match self.running.read().await.get(&event.job_id) {
            Some(launch) => launch.events.clone(),
            None => return false,
        };
        sender.send(event).await.is_ok()
    }

    async fn emit(
        &self,
        job_id: &str,
        terminal: bool,
        build: impl FnOnce(&LaunchRequest) -> SupervisorEvent,
    ) -> bool {
        let (event, sender) = {
            let mut running = self.running.write().await;
            let Some(launch) = running.get(job_id) else {
                return false;
            };
            let event = build(&launch.request);
            let sender = launch.events.clone();
            if terminal {
                running.remove(job_id);
            }
            (event, sender)
        };
        sender.send(event).await.is_ok()
    }
}

#[async_trait]
impl Supervisor for MockSupervisor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn start(
        &self,
        request: LaunchRequest,
        events: mpsc::Sender<SupervisorEvent>,
    ) -> Result<(), SupervisorError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        self.launches.write().await.push(request.clone());
        self.running
            .write()
            .await
            .insert(request.job_id.clone(), RunningLaunch { request, events });
        Ok(())
    }

    async fn cancel(&self, job_id: &str) -> bool {
        self.cancelled.write().await.push(job_id.to_string());
        self.running.read().await.contains_key(job_id)
    }

    async fn running(&self) -> usize {
        self.running.read().await.len()
    }

    async fn shutdown(&self) {
        self.running.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::SupervisorEventKind;

    fn request(id: &str) -> LaunchRequest {
        LaunchRequest {
            job_id: id.to_string(),
            attempt: 1,
            source_url: format!("https://example.com/{}", id),
            output_path: PathBuf::from(format!("/out/{}.mp4", id)),
        }
    }

    #[tokio::test]
    async fn test_drives_events_for_started_jobs() {
        let mock = MockSupervisor::new();
        let (tx, mut rx) = mpsc::channel(8);

        mock.start(request("v1"), tx).await.unwrap();
        assert_eq!(mock.launch_count().await, 1);

        assert!(mock.emit_progress("v1", 25.0).await);
        assert!(mock.complete("v1").await);
        assert!(!mock.complete("v1").await, "launch is over");

        let first = rx.recv().await.unwrap();
        assert!(matches!(
            first.kind,
            SupervisorEventKind::Progress { progress, .. } if progress == 25.0
        ));
        let second = rx.recv().await.unwrap();
        assert!(second.is_terminal());
        assert_eq!(mock.running().await, 0);
    }

    #[tokio::test]
    async fn test_next_error() {
        let mock = MockSupervisor::new();
        let (tx, _rx) = mpsc::channel(8);
        mock.set_next_error(SupervisorError::BinaryNotFound {
            path: PathBuf::from("yt-dlp"),
        })
        .await;

        assert!(mock.start(request("v1"), tx.clone()).await.is_err());
        assert!(mock.start(request("v1"), tx).await.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_keeps_launch_alive() {
        let mock = MockSupervisor::new();
        let (tx, mut rx) = mpsc::channel(8);
        mock.start(request("v1"), tx).await.unwrap();

        assert!(mock.cancel("v1").await);
        assert!(!mock.cancel("other").await);
        assert_eq!(mock.cancelled().await, vec!["v1", "other"]);

        assert!(mock.fail("v1", "terminated").await);
        assert!(rx.recv().await.unwrap().is_terminal());
    }
}
