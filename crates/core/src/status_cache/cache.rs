use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::Clock;

/// Lifetime of terminal entries, in seconds.
pub const DEFAULT_STATUS_TTL_SECS: i64 = 60;

/// Result of a status poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusSnapshot {
    /// No entry: never started, cancelled, or expired.
    Inactive,
    Active { progress: f32 },
    Completed { progress: f32 },
    Error { progress: f32, error: String },
}

impl StatusSnapshot {
    fn is_terminal(&self) -> bool {
        matches!(
            self,
            StatusSnapshot::Completed { .. } | StatusSnapshot::Error { .. }
        )
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    snapshot: StatusSnapshot,
    written_at: DateTime<Utc>,
}

/// TTL-evicting map of job id to latest status.
pub struct StatusCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl StatusCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self, job_id: &str, snapshot: StatusSnapshot) {
        let entry = CacheEntry {
            snapshot,
            written_at: self.clock.now(),
        };
        self.entries().insert(job_id.to_string(), entry);
    }

    pub fn mark_active(&self, job_id: &str, progress: f32) {
        self.write(job_id, StatusSnapshot::Active { progress });
    }

    pub fn mark_completed(&self, job_id: &str) {
        self.write(job_id, StatusSnapshot::Completed { progress: 100.0 });
    }

    pub fn mark_error(&self, job_id: &str, error: &str) {
        self.write(
            job_id,
            StatusSnapshot::Error {
                progress: 0.0,
                error: error.to_string(),
            },
        );
    }

    /// Drop an entry, e.g. after cancellation or removal.
    pub fn forget(&self, job_id: &str) {
        self.entries().remove(job_id);
    }

    fn expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        entry.snapshot.is_terminal() && now - entry.written_at > self.ttl
    }

    /// Current snapshot for a job. Expired entries read as inactive.
    pub fn query(&self, job_id: &str) -> StatusSnapshot {
        let now = self.clock.now();
        let mut entries = self.entries();
        match entries.get(job_id) {
            Some(entry) if self.expired(entry, now) => {
                entries.remove(job_id);
                StatusSnapshot::Inactive
            }
            Some(entry) => entry.snapshot.clone(),
            None => StatusSnapshot::Inactive,
        }
    }

    /// Remove every expired terminal entry. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| !self.expired(entry, now));
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(evicted, "Evicted expired status entries");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
