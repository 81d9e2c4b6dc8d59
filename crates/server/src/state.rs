use tubequeue_core::{Config, OrchestratorHandle, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: OrchestratorHandle,
}

impl AppState {
    pub fn new(config: Config, orchestrator: OrchestratorHandle) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    /// Configuration with secrets redacted and runtime settings applied.
    pub fn sanitized_config(&self) -> SanitizedConfig {
        let mut sanitized = SanitizedConfig::from(&self.config);
        sanitized.library.destination_root = self.orchestrator.destination_root();
        sanitized.library.credentials_stale = self.orchestrator.credentials_stale();
        sanitized
    }

    pub fn orchestrator(&self) -> &OrchestratorHandle {
        &self.orchestrator
    }
}
