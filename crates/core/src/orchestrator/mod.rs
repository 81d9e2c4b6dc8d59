//! Download orchestrator.
//!
//! Owns the job registry and drives jobs through their lifecycle:
//! - **Queue**: FIFO by enqueue time, deduplicated by job id
//! - **Dispatch**: at most `max_concurrent` downloads at once
//! - **Supervision**: one downloader process per admitted job, events fed back
//!   into the registry (see [`crate::supervisor`])

mod config;
mod dispatcher;
mod gate;
mod handle;
mod messages;
mod registry;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use dispatcher::Dispatcher;
pub use gate::EnqueueGate;
pub use handle::OrchestratorHandle;
pub use registry::{EventOutcome, IgnoreReason, JobRegistry};
pub use runner::{CompletionCallback, DownloadOrchestrator};
pub use types::{JobEvent, OrchestratorError, OrchestratorStatus};
