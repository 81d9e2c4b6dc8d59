pub mod clock;
pub mod config;
pub mod job;
pub mod metrics;
pub mod orchestrator;
pub mod paths;
pub mod status_cache;
pub mod supervisor;
pub mod testing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use job::{EnqueueRequest, Job, JobStatus, JobStore, JobStoreError, SqliteJobStore};
pub use orchestrator::{
    DownloadOrchestrator, JobEvent, OrchestratorConfig, OrchestratorError, OrchestratorHandle,
    OrchestratorStatus,
};
pub use status_cache::{StatusCache, StatusSnapshot};
pub use supervisor::{DownloaderConfig, ProcessSupervisor, Supervisor, SupervisorError};
