//! Admission of queued jobs under the concurrency cap.

use chrono::{DateTime, Utc};

use super::registry::JobRegistry;
use super::types::OrchestratorError;
use crate::job::Job;

/// Decides which queued job starts next.
///
/// Stateless apart from the cap: the registry's `downloading` count is the
/// only slot accounting, so a job frees its slot exactly when it leaves
/// `downloading`.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    max_concurrent: usize,
}

impl Dispatcher {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn free_slots(&self, registry: &JobRegistry) -> usize {
        self.max_concurrent
            .saturating_sub(registry.downloading_count())
    }

    /// Admit the oldest queued job if a slot is free.
    pub fn admit_next(
        &self,
        registry: &mut JobRegistry,
        now: DateTime<Utc>,
    ) -> Result<Option<Job>, OrchestratorError> {
        if self.free_slots(registry) == 0 {
            return Ok(None);
        }
        let Some(next) = registry.next_queued().map(|job| job.id.clone()) else {
            return Ok(None);
        };
        registry.admit(&next, now).map(Some)
    }
}
