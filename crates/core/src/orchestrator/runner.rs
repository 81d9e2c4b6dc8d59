//! Download orchestrator implementation.
//!
//! A single coordinator task owns the job registry and applies, one at a
//! time, commands from handles and events from the supervisor. After every
//! message it admits queued jobs until the concurrency cap is reached.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::job::{EnqueueRequest, Job, JobStatus, JobStore};
use crate::metrics;
use crate::paths::resolve_output_path;
use crate::status_cache::StatusCache;
use crate::supervisor::{
    DownloaderConfig, LaunchRequest, Supervisor, SupervisorEvent, SupervisorEventKind,
};

use super::config::OrchestratorConfig;
use super::dispatcher::Dispatcher;
use super::gate::EnqueueGate;
use super::handle::OrchestratorHandle;
use super::messages::Command;
use super::registry::{EventOutcome, IgnoreReason, JobRegistry};
use super::types::{JobEvent, OrchestratorError, OrchestratorStatus};

/// Called with the job id and output path whenever a download completes.
pub type CompletionCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Capacity of the channel carrying supervisor events to the coordinator.
const SUPERVISOR_EVENT_BUFFER: usize = 256;

/// Builder for the download orchestrator.
pub struct DownloadOrchestrator {
    config: OrchestratorConfig,
    store: Arc<dyn JobStore>,
    supervisor: Arc<dyn Supervisor>,
    clock: Arc<dyn Clock>,
    source_url_template: String,
    destination_root: Option<PathBuf>,
    credentials_stale: bool,
    on_complete: Option<CompletionCallback>,
}

impl DownloadOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        store: Arc<dyn JobStore>,
        supervisor: Arc<dyn Supervisor>,
    ) -> Self {
        Self {
            config,
            store,
            supervisor,
            clock: Arc::new(SystemClock),
            source_url_template: DownloaderConfig::default().source_url_template,
            destination_root: None,
            credentials_stale: false,
            on_complete: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// URL template handed to the downloader; `{id}` is replaced by the job id.
    pub fn with_source_url_template(mut self, template: impl Into<String>) -> Self {
        self.source_url_template = template.into();
        self
    }

    pub fn with_destination_root(mut self, root: Option<PathBuf>) -> Self {
        self.destination_root = root;
        self
    }

    pub fn with_credentials_stale(mut self, stale: bool) -> Self {
        self.credentials_stale = stale;
        self
    }

    pub fn with_completion_callback(mut self, callback: CompletionCallback) -> Self {
        self.on_complete = Some(callback);
        self
    }

    /// Restore persisted jobs and spawn the coordinator task.
    pub async fn start(self) -> Result<OrchestratorHandle, OrchestratorError> {
        info!("Starting download orchestrator");

        let registry = JobRegistry::restore(Arc::clone(&self.store), self.clock.now())?;

        let (command_tx, command_rx) = mpsc::channel(self.config.command_buffer.max(1));
        let (event_tx, _) = broadcast::channel(self.config.event_buffer.max(1));
        let (supervisor_tx, supervisor_rx) = mpsc::channel(SUPERVISOR_EVENT_BUFFER);

        let status_cache = Arc::new(StatusCache::new(
            chrono::Duration::seconds(self.config.status_ttl_secs as i64),
            Arc::clone(&self.clock),
        ));
        let gate = Arc::new(EnqueueGate::new(
            self.destination_root,
            self.credentials_stale,
        ));
        let running = Arc::new(AtomicBool::new(true));

        let coordinator = Coordinator {
            registry,
            dispatcher: Dispatcher::new(self.config.max_concurrent),
            supervisor: self.supervisor,
            supervisor_tx,
            clock: self.clock,
            status_cache: Arc::clone(&status_cache),
            gate: Arc::clone(&gate),
            events: event_tx.clone(),
            source_url_template: self.source_url_template,
            on_complete: self.on_complete,
            sweep_interval: Duration::from_millis(self.config.sweep_interval_ms.max(1)),
            running: Arc::clone(&running),
        };
        let task = tokio::spawn(coordinator.run(command_rx, supervisor_rx));

        info!(
            max_concurrent = self.config.max_concurrent,
            "Download orchestrator started"
        );

        Ok(OrchestratorHandle {
            commands: command_tx,
            events: event_tx,
            status_cache,
            gate,
            running,
            task: Arc::new(Mutex::new(Some(task))),
        })
    }
}

/// State owned by the coordinator task.
struct Coordinator {
    registry: JobRegistry,
    dispatcher: Dispatcher,
    supervisor: Arc<dyn Supervisor>,
    supervisor_tx: mpsc::Sender<SupervisorEvent>,
    clock: Arc<dyn Clock>,
    status_cache: Arc<StatusCache>,
    gate: Arc<EnqueueGate>,
    events: broadcast::Sender<JobEvent>,
    source_url_template: String,
    on_complete: Option<CompletionCallback>,
    sweep_interval: Duration,
    running: Arc<AtomicBool>,
}

impl Coordinator {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut supervisor_events: mpsc::Receiver<SupervisorEvent>,
    ) {
        info!("Coordinator loop started");
        self.dispatch().await;

        let mut sweep = tokio::time::interval(self.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        self.stop().await;
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        info!("All orchestrator handles dropped");
                        self.stop().await;
                        break;
                    }
                },
                Some(event) = supervisor_events.recv() => {
                    self.handle_supervisor_event(event);
                }
                _ = sweep.tick() => {
                    let evicted = self.status_cache.evict_expired();
                    if evicted > 0 {
                        debug!(evicted, "Evicted expired status entries");
                    }
                }
            }

            self.dispatch().await;
        }

        info!("Coordinator loop stopped");
    }

    async fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.supervisor.shutdown().await;
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Enqueue {
                request,
                confirm_stale,
                reply,
            } => {
                let _ = reply.send(self.enqueue(request, confirm_stale));
            }
            Command::EnqueueBatch {
                requests,
                confirm_stale,
                reply,
            } => {
                let _ = reply.send(self.enqueue_batch(requests, confirm_stale));
            }
            Command::Retry { id, reply } => {
                let _ = reply.send(self.retry(&id));
            }
            Command::RetryAllFailed { reply } => {
                let _ = reply.send(self.retry_all_failed());
            }
            Command::Redownload { id, reply } => {
                let _ = reply.send(self.redownload(&id));
            }
            Command::Cancel { id, reply } => {
                let _ = reply.send(self.cancel(&id).await);
            }
            Command::CancelAll { reply } => {
                let _ = reply.send(self.cancel_all().await);
            }
            Command::Remove { id, reply } => {
                let _ = reply.send(self.remove(&id).await);
            }
            Command::ClearHistory { reply } => {
                let _ = reply.send(self.clear_history());
            }
            Command::RestoreHistory { jobs, reply } => {
                let _ = reply.send(self.registry.restore_history(jobs).map_err(Into::into));
            }
            Command::Get { id, reply } => {
                let _ = reply.send(self.registry.get(&id).cloned());
            }
            Command::List { reply } => {
                let _ = reply.send(self.registry.list());
            }
            Command::Status { reply } => {
                let _ = reply.send(self.status());
            }
            // Handled by the loop.
            Command::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }

    fn publish(&self, event: JobEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn publish_status(&self, job: &Job) {
        self.publish(JobEvent::StatusChanged {
            job_id: job.id.clone(),
            status: job.status,
        });
    }

    fn check_gate(&self, confirm_stale: bool) -> Result<(), OrchestratorError> {
        self.gate.check(confirm_stale).inspect_err(|e| {
            let reason = match e {
                OrchestratorError::DestinationNotConfigured => "destination",
                _ => "credentials",
            };
            metrics::ENQUEUE_REJECTIONS.with_label_values(&[reason]).inc();
            warn!("Enqueue rejected: {}", e);
        })
    }

    fn queued(&self, job: &Job) {
        // A fresh run starts with no poll state.
        self.status_cache.forget(&job.id);
        self.publish_status(job);
    }

    fn enqueue(
        &mut self,
        request: EnqueueRequest,
        confirm_stale: bool,
    ) -> Result<bool, OrchestratorError> {
        self.check_gate(confirm_stale)?;

        let id = request.id.clone();
        match self.registry.enqueue(request, self.clock.now())? {
            Some(job) => {
                info!(job_id = %job.id, title = %job.title, "Job enqueued");
                metrics::JOBS_ENQUEUED.with_label_values(&["single"]).inc();
                self.queued(&job);
                Ok(true)
            }
            None => {
                debug!(job_id = %id, "Job already active, enqueue ignored");
                Ok(false)
            }
        }
    }

    fn enqueue_batch(
        &mut self,
        requests: Vec<EnqueueRequest>,
        confirm_stale: bool,
    ) -> Result<usize, OrchestratorError> {
        self.check_gate(confirm_stale)?;

        let submitted = requests.len();
        let created = self.registry.enqueue_batch(requests, self.clock.now())?;
        for job in &created {
            self.queued(job);
        }
        metrics::JOBS_ENQUEUED
            .with_label_values(&["batch"])
            .inc_by(created.len() as u64);
        info!(submitted, added = created.len(), "Batch enqueued");
        Ok(created.len())
    }

    fn retry(&mut self, id: &str) -> Result<Job, OrchestratorError> {
        let job = self.registry.retry(id, self.clock.now())?;
        info!(job_id = %id, "Job re-queued for retry");
        metrics::JOBS_REQUEUED.with_label_values(&["retry"]).inc();
        self.queued(&job);
        Ok(job)
    }

    fn retry_all_failed(&mut self) -> Result<usize, OrchestratorError> {
        let jobs = self.registry.retry_all_failed(self.clock.now())?;
        for job in &jobs {
            self.queued(job);
        }
        metrics::JOBS_REQUEUED
            .with_label_values(&["retry_all"])
            .inc_by(jobs.len() as u64);
        info!(count = jobs.len(), "Failed jobs re-queued");
        Ok(jobs.len())
    }

    fn redownload(&mut self, id: &str) -> Result<Job, OrchestratorError> {
        let job = self.registry.redownload(id, self.clock.now())?;
        info!(job_id = %id, "Job re-queued for redownload");
        metrics::JOBS_REQUEUED.with_label_values(&["redownload"]).inc();
        self.queued(&job);
        Ok(job)
    }

    async fn cancel(&mut self, id: &str) -> Result<Job, OrchestratorError> {
        let (job, previous) = self.registry.cancel(id, self.clock.now())?;
        self.cancelled(&job, previous).await;
        Ok(job)
    }

    async fn cancel_all(&mut self) -> Result<usize, OrchestratorError> {
        let cancelled = self.registry.cancel_all(self.clock.now())?;
        for (job, previous) in &cancelled {
            self.cancelled(job, *previous).await;
        }
        info!(count = cancelled.len(), "Cancelled all active jobs");
        Ok(cancelled.len())
    }

    /// Follow-up once a job is persisted as cancelled.
    async fn cancelled(&self, job: &Job, previous: JobStatus) {
        if previous == JobStatus::Downloading && !self.supervisor.cancel(&job.id).await {
            debug!(job_id = %job.id, "No live process to signal");
        }
        self.status_cache.forget(&job.id);
        metrics::DOWNLOADS_CANCELLED.inc();
        info!(job_id = %job.id, was = %previous, "Job cancelled");
        self.publish_status(job);
    }

    async fn remove(&mut self, id: &str) -> Result<Job, OrchestratorError> {
        let job = self.registry.remove(id)?;
        if job.status == JobStatus::Downloading {
            self.supervisor.cancel(&job.id).await;
        }
        self.status_cache.forget(&job.id);
        info!(job_id = %id, status = %job.status, "Job removed");
        self.publish(JobEvent::Removed {
            job_id: job.id.clone(),
        });
        Ok(job)
    }

    fn clear_history(&mut self) -> Result<usize, OrchestratorError> {
        let ids = self.registry.clear_history()?;
        for id in &ids {
            self.status_cache.forget(id);
            self.publish(JobEvent::Removed {
                job_id: id.clone(),
            });
        }
        info!(count = ids.len(), "Cleared finished jobs");
        Ok(ids.len())
    }

    fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            running: self.running.load(Ordering::Relaxed),
            max_concurrent: self.dispatcher.max_concurrent(),
            queued: self.registry.count(JobStatus::Queued),
            downloading: self.registry.count(JobStatus::Downloading),
            completed: self.registry.count(JobStatus::Completed),
            error: self.registry.count(JobStatus::Error),
            cancelled: self.registry.count(JobStatus::Cancelled),
            destination_configured: self.gate.destination_root().is_some(),
            credentials_stale: self.gate.credentials_stale(),
        }
    }

    /// Admit queued jobs while slots are free.
    async fn dispatch(&mut self) {
        if !self.running.load(Ordering::Relaxed) {
            return;
        }

        loop {
            let job = match self.dispatcher.admit_next(&mut self.registry, self.clock.now()) {
                Ok(Some(job)) => job,
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to admit queued job: {}", e);
                    break;
                }
            };

            metrics::DOWNLOADS_STARTED.inc();
            self.status_cache.mark_active(&job.id, 0.0);
            self.publish_status(&job);
            info!(job_id = %job.id, attempt = job.attempt, "Download admitted");

            if let Err(message) = self.launch(&job).await {
                warn!(job_id = %job.id, "Download could not start: {}", message);
                let event = SupervisorEvent {
                    job_id: job.id.clone(),
                    attempt: job.attempt,
                    kind: SupervisorEventKind::Failed { message },
                };
                self.handle_supervisor_event(event);
            }
        }
    }

    async fn launch(&self, job: &Job) -> Result<(), String> {
        let root = self
            .gate
            .destination_root()
            .ok_or_else(|| OrchestratorError::DestinationNotConfigured.to_string())?;
        let output_path = resolve_output_path(job, &root, job.group_name.as_deref())
            .map_err(|e| e.to_string())?;

        let request = LaunchRequest {
            job_id: job.id.clone(),
            attempt: job.attempt,
            source_url: self.source_url_template.replace("{id}", &job.id),
            output_path,
        };
        debug!(
            job_id = %job.id,
            output = %request.output_path.display(),
            supervisor = self.supervisor.name(),
            "Launching download"
        );

        self.supervisor
            .start(request, self.supervisor_tx.clone())
            .await
            .map_err(|e| {
                metrics::SPAWN_FAILURES.inc();
                e.to_string()
            })
    }

    fn handle_supervisor_event(&mut self, event: SupervisorEvent) {
        let now = self.clock.now();
        let job = match self.registry.apply_event(&event, now) {
            EventOutcome::Applied(job) => job,
            EventOutcome::Ignored(reason) => {
                let label = match &reason {
                    IgnoreReason::UnknownJob => "unknown_job",
                    IgnoreReason::NotDownloading(_) => "not_downloading",
                    IgnoreReason::StaleAttempt { .. } => "stale_attempt",
                };
                metrics::LATE_EVENTS_IGNORED.with_label_values(&[label]).inc();
                if event.is_terminal() {
                    debug!(job_id = %event.job_id, ?reason, "Ignoring late supervisor event");
                }
                return;
            }
        };

        let elapsed = job
            .started_at
            .map(|started| (now - started).num_milliseconds().max(0) as f64 / 1000.0);

        match event.kind {
            SupervisorEventKind::Progress { speed, eta, .. } => {
                self.status_cache.mark_active(&job.id, job.progress);
                self.publish(JobEvent::Progress {
                    job_id: job.id,
                    progress: job.progress,
                    speed,
                    eta,
                });
            }
            SupervisorEventKind::Completed { .. } => {
                let output_path = job.output_path.clone().unwrap_or_default();
                info!(job_id = %job.id, output = %output_path, "Download completed");
                metrics::DOWNLOADS_COMPLETED.inc();
                if let Some(secs) = elapsed {
                    metrics::DOWNLOAD_DURATION
                        .with_label_values(&["success"])
                        .observe(secs);
                }
                self.status_cache.mark_completed(&job.id);
                if let Some(callback) = &self.on_complete {
                    callback(&job.id, &output_path);
                }
                self.publish(JobEvent::Completed {
                    job_id: job.id,
                    output_path,
                });
            }
            SupervisorEventKind::Failed { message } => {
                warn!(job_id = %job.id, "Download failed: {}", message);
                metrics::DOWNLOADS_FAILED.inc();
                if let Some(secs) = elapsed {
                    metrics::DOWNLOAD_DURATION
                        .with_label_values(&["failed"])
                        .observe(secs);
                }
                self.status_cache.mark_error(&job.id, &message);
                self.publish(JobEvent::Error {
                    job_id: job.id,
                    message,
                });
            }
        }
    }
}
