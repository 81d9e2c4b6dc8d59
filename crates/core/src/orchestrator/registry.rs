//! Job registry: the single source of truth for job state.
//!
//! Owned by the coordinator task, which is the only writer. Every accepted
//! transition is written through to the [`JobStore`] before it becomes visible
//! in memory, except progress updates, which are memory-only.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use super::types::OrchestratorError;
use crate::job::{EnqueueRequest, Job, JobStatus, JobStore, JobStoreError};
use crate::supervisor::{SupervisorEvent, SupervisorEventKind};

/// Why a supervisor event was not applied.
#[derive(Debug, Clone, PartialEq)]
pub enum IgnoreReason {
    /// The job was removed.
    UnknownJob,
    /// The job is no longer downloading (cancelled, or already terminal).
    NotDownloading(JobStatus),
    /// The event belongs to an earlier admission of the job.
    StaleAttempt { current: u32, event: u32 },
}

/// Result of applying a supervisor event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Applied(Job),
    Ignored(IgnoreReason),
}

pub struct JobRegistry {
    jobs: HashMap<String, Job>,
    store: Arc<dyn JobStore>,
    next_sequence: u64,
    /// Last attempt of deleted ids, so a re-enqueued id never reuses one
    /// whose process may still be winding down.
    retired_attempts: HashMap<String, u32>,
}

impl JobRegistry {
    /// An empty registry backed by `store`, ignoring anything already persisted.
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            jobs: HashMap::new(),
            store,
            next_sequence: 0,
            retired_attempts: HashMap::new(),
        }
    }

    /// Load the persisted job list and reconcile it with a fresh process.
    ///
    /// Jobs left `downloading` by a previous run cannot be reattached, so they
    /// go back to `queued` with their progress reset. Everything else is kept.
    pub fn restore(store: Arc<dyn JobStore>, now: DateTime<Utc>) -> Result<Self, JobStoreError> {
        let mut jobs = store.load_all()?;

        let mut reconciled = Vec::new();
        for job in jobs.iter_mut() {
            if job.status == JobStatus::Downloading {
                job.reset_to(JobStatus::Queued, now);
                reconciled.push(job.clone());
            }
        }
        if !reconciled.is_empty() {
            store.upsert_many(&reconciled)?;
            info!(
                count = reconciled.len(),
                "Re-queued downloads interrupted by the previous run"
            );
        }

        let next_sequence = jobs.iter().map(|j| j.sequence + 1).max().unwrap_or(0);
        info!(jobs = jobs.len(), "Restored job registry");

        Ok(Self {
            jobs: jobs.into_iter().map(|j| (j.id.clone(), j)).collect(),
            store,
            next_sequence,
            retired_attempts: HashMap::new(),
        })
    }

    pub fn get(&self, id: &str) -> Option<&Job> {
        self.jobs.get(id)
    }

    /// All jobs in queue order.
    pub fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.values().cloned().collect();
        jobs.sort_by_key(Job::queue_key);
        jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn count(&self, status: JobStatus) -> usize {
        self.jobs.values().filter(|j| j.status == status).count()
    }

    pub fn downloading_count(&self) -> usize {
        self.count(JobStatus::Downloading)
    }

    /// The queued job with the earliest `enqueued_at` (then sequence).
    pub fn next_queued(&self) -> Option<&Job> {
        self.jobs
            .values()
            .filter(|j| j.status == JobStatus::Queued)
            .min_by_key(|j| j.queue_key())
    }

    fn take_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    fn retired_attempt(&self, id: &str) -> u32 {
        self.retired_attempts.get(id).copied().unwrap_or(0)
    }

    fn retire(&mut self, job: &Job) {
        let last = self.retired_attempts.entry(job.id.clone()).or_insert(0);
        *last = (*last).max(job.attempt);
    }

    fn lookup(&self, id: &str) -> Result<&Job, OrchestratorError> {
        self.jobs
            .get(id)
            .ok_or_else(|| OrchestratorError::JobNotFound(id.to_string()))
    }

    /// Persist, then publish in memory.
    fn commit(&mut self, job: Job) -> Result<Job, JobStoreError> {
        self.store.upsert(&job)?;
        self.jobs.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    fn commit_many(&mut self, jobs: Vec<Job>) -> Result<Vec<Job>, JobStoreError> {
        if jobs.is_empty() {
            return Ok(jobs);
        }
        self.store.upsert_many(&jobs)?;
        for job in &jobs {
            self.jobs.insert(job.id.clone(), job.clone());
        }
        Ok(jobs)
    }

    /// Build the job an enqueue would create, or `None` if one is already active.
    fn fresh_job(&mut self, request: EnqueueRequest, now: DateTime<Utc>) -> Option<Job> {
        let previous_attempt = match self.jobs.get(&request.id) {
            Some(existing) if existing.status.is_active() => return None,
            Some(existing) => existing.attempt,
            None => self.retired_attempt(&request.id),
        };
        let sequence = self.take_sequence();
        let mut job = Job::new(request, now, sequence);
        // Attempts stay monotonic so events from a superseded run are recognisable.
        job.attempt = previous_attempt;
        Some(job)
    }

    /// Queue one job. Returns `None` if the id is already queued or downloading.
    ///
    /// A finished job with the same id is replaced by the new one.
    pub fn enqueue(
        &mut self,
        request: EnqueueRequest,
        now: DateTime<Utc>,
    ) -> Result<Option<Job>, JobStoreError> {
        match self.fresh_job(request, now) {
            Some(job) => self.commit(job).map(Some),
            None => Ok(None),
        }
    }

    /// Queue many jobs at once, skipping ids that are active or repeated
    /// within the batch. Either every new job is stored or none is.
    pub fn enqueue_batch(
        &mut self,
        requests: Vec<EnqueueRequest>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Job>, JobStoreError> {
        let sequence_before = self.next_sequence;
        let mut seen = HashSet::new();
        let mut created = Vec::new();

        for request in requests {
            if !seen.insert(request.id.clone()) {
                debug!(job_id = %request.id, "Skipping duplicate within batch");
                continue;
            }
            if let Some(job) = self.fresh_job(request, now) {
                created.push(job);
            }
        }

        self.commit_many(created).inspect_err(|_| {
            self.next_sequence = sequence_before;
        })
    }

    /// `error`/`cancelled` back to `queued`, keeping the original queue position.
    pub fn retry(&mut self, id: &str, now: DateTime<Utc>) -> Result<Job, OrchestratorError> {
        let mut job = self.lookup(id)?.clone();
        if !job.status.can_retry() {
            return Err(OrchestratorError::InvalidTransition {
                id: id.to_string(),
                status: job.status,
                action: "retry",
            });
        }
        job.reset_to(JobStatus::Queued, now);
        Ok(self.commit(job)?)
    }

    /// Every `error` job back to `queued`, stamped with `now` so retried jobs
    /// line up behind work that is already waiting.
    pub fn retry_all_failed(&mut self, now: DateTime<Utc>) -> Result<Vec<Job>, JobStoreError> {
        let mut failed: Vec<Job> = self
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Error)
            .cloned()
            .collect();
        failed.sort_by_key(Job::queue_key);

        let sequence_before = self.next_sequence;
        for job in failed.iter_mut() {
            job.reset_to(JobStatus::Queued, now);
            job.enqueued_at = now;
            job.sequence = self.take_sequence();
        }

        self.commit_many(failed).inspect_err(|_| {
            self.next_sequence = sequence_before;
        })
    }

    /// `completed`/`error` back to `queued` at the end of the queue.
    pub fn redownload(&mut self, id: &str, now: DateTime<Utc>) -> Result<Job, OrchestratorError> {
        let mut job = self.lookup(id)?.clone();
        if !job.status.can_redownload() {
            return Err(OrchestratorError::InvalidTransition {
                id: id.to_string(),
                status: job.status,
                action: "redownload",
            });
        }
        job.reset_to(JobStatus::Queued, now);
        job.enqueued_at = now;
        job.sequence = self.take_sequence();
        Ok(self.commit(job)?)
    }

    /// Cancel a queued or downloading job. Returns the job and its previous status.
    pub fn cancel(
        &mut self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<(Job, JobStatus), OrchestratorError> {
        let mut job = self.lookup(id)?.clone();
        let previous = job.status;
        if !previous.can_cancel() {
            return Err(OrchestratorError::InvalidTransition {
                id: id.to_string(),
                status: previous,
                action: "cancel",
            });
        }
        mark_cancelled(&mut job, now);
        Ok((self.commit(job)?, previous))
    }

    /// Cancel every queued and downloading job.
    pub fn cancel_all(&mut self, now: DateTime<Utc>) -> Result<Vec<(Job, JobStatus)>, JobStoreError> {
        let mut cancelled = Vec::new();
        let mut previous = Vec::new();
        for job in self.jobs.values().filter(|j| j.status.can_cancel()) {
            let mut job = job.clone();
            previous.push(job.status);
            mark_cancelled(&mut job, now);
            cancelled.push(job);
        }

        let cancelled = self.commit_many(cancelled)?;
        Ok(cancelled.into_iter().zip(previous).collect())
    }

    /// Delete a job whatever its status. Returns it as it was.
    pub fn remove(&mut self, id: &str) -> Result<Job, OrchestratorError> {
        self.lookup(id)?;
        self.store.delete(id)?;
        let job = self
            .jobs
            .remove(id)
            .ok_or_else(|| OrchestratorError::JobNotFound(id.to_string()))?;
        self.retire(&job);
        Ok(job)
    }

    /// Delete every completed, error and cancelled job. Returns their ids.
    pub fn clear_history(&mut self) -> Result<Vec<String>, JobStoreError> {
        let ids: Vec<String> = self
            .jobs
            .values()
            .filter(|j| j.status.is_terminal())
            .map(|j| j.id.clone())
            .collect();

        if !ids.is_empty() {
            self.store.delete_many(&ids)?;
            for id in &ids {
                if let Some(job) = self.jobs.remove(id) {
                    self.retire(&job);
                }
            }
        }
        Ok(ids)
    }

    /// Merge finished jobs from an external history snapshot.
    ///
    /// Ids the registry already knows are left alone, and active jobs in the
    /// snapshot are skipped since they cannot be trusted to be running.
    pub fn restore_history(&mut self, jobs: Vec<Job>) -> Result<usize, JobStoreError> {
        let mut seen = HashSet::new();
        let mut merged: Vec<Job> = jobs
            .into_iter()
            .filter(|j| j.status.is_terminal())
            .filter(|j| !self.jobs.contains_key(&j.id))
            .filter(|j| seen.insert(j.id.clone()))
            .collect();
        for job in merged.iter_mut() {
            job.attempt = job.attempt.max(self.retired_attempt(&job.id));
        }

        if let Some(max) = merged.iter().map(|j| j.sequence + 1).max() {
            self.next_sequence = self.next_sequence.max(max);
        }
        Ok(self.commit_many(merged)?.len())
    }

    /// Move a queued job to `downloading` and start a new attempt.
    pub fn admit(&mut self, id: &str, now: DateTime<Utc>) -> Result<Job, OrchestratorError> {
        let mut job = self.lookup(id)?.clone();
        if job.status != JobStatus::Queued {
            return Err(OrchestratorError::InvalidTransition {
                id: id.to_string(),
                status: job.status,
                action: "admit",
            });
        }
        job.reset_to(JobStatus::Downloading, now);
        job.attempt += 1;
        job.started_at = Some(now);
        Ok(self.commit(job)?)
    }

    /// Apply a supervisor event to its job.
    ///
    /// Only the current attempt of a `downloading` job is affected, which makes
    /// `cancelled` (and every other terminal state) a fixed point for late
    /// events. Terminal outcomes are applied in memory even if persisting them
    /// fails, so a concurrency slot is never held by a finished process.
    pub fn apply_event(&mut self, event: &SupervisorEvent, now: DateTime<Utc>) -> EventOutcome {
        let Some(current) = self.jobs.get(&event.job_id) else {
            return EventOutcome::Ignored(IgnoreReason::UnknownJob);
        };
        if current.status != JobStatus::Downloading {
            return EventOutcome::Ignored(IgnoreReason::NotDownloading(current.status));
        }
        if current.attempt != event.attempt {
            return EventOutcome::Ignored(IgnoreReason::StaleAttempt {
                current: current.attempt,
                event: event.attempt,
            });
        }

        let mut job = current.clone();
        job.updated_at = now;

        match &event.kind {
            SupervisorEventKind::Progress {
                progress,
                speed,
                eta,
            } => {
                job.progress = progress.clamp(0.0, 100.0);
                job.speed = speed.clone();
                job.eta = eta.clone();
                self.jobs.insert(job.id.clone(), job.clone());
                return EventOutcome::Applied(job);
            }
            SupervisorEventKind::Completed { output_path } => {
                job.status = JobStatus::Completed;
                job.progress = 100.0;
                job.output_path = Some(output_path.display().to_string());
                job.error = None;
            }
            SupervisorEventKind::Failed { message } => {
                job.status = JobStatus::Error;
                job.progress = 0.0;
                job.error = Some(message.clone());
                job.output_path = None;
            }
        }
        job.speed = None;
        job.eta = None;

        if let Err(e) = self.store.upsert(&job) {
            error!(job_id = %job.id, "Failed to persist {} job: {}", job.status, e);
        }
        self.jobs.insert(job.id.clone(), job.clone());
        EventOutcome::Applied(job)
    }
}

fn mark_cancelled(job: &mut Job, now: DateTime<Utc>) {
    job.status = JobStatus::Cancelled;
    job.speed = None;
    job.eta = None;
    job.updated_at = now;
}
