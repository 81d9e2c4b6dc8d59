//! Commands sent from handles to the coordinator task.

use tokio::sync::oneshot;

use super::types::{OrchestratorError, OrchestratorStatus};
use crate::job::{EnqueueRequest, Job};

pub(crate) type Reply<T> = oneshot::Sender<Result<T, OrchestratorError>>;

pub(crate) enum Command {
    Enqueue {
        request: EnqueueRequest,
        confirm_stale: bool,
        reply: Reply<bool>,
    },
    EnqueueBatch {
        requests: Vec<EnqueueRequest>,
        confirm_stale: bool,
        reply: Reply<usize>,
    },
    Retry {
        id: String,
        reply: Reply<Job>,
    },
    RetryAllFailed {
        reply: Reply<usize>,
    },
    Redownload {
        id: String,
        reply: Reply<Job>,
    },
    Cancel {
        id: String,
        reply: Reply<Job>,
    },
    CancelAll {
        reply: Reply<usize>,
    },
    Remove {
        id: String,
        reply: Reply<Job>,
    },
    ClearHistory {
        reply: Reply<usize>,
    },
    RestoreHistory {
        jobs: Vec<Job>,
        reply: Reply<usize>,
    },
    Get {
        id: String,
        reply: oneshot::Sender<Option<Job>>,
    },
    List {
        reply: oneshot::Sender<Vec<Job>>,
    },
    Status {
        reply: oneshot::Sender<OrchestratorStatus>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}
