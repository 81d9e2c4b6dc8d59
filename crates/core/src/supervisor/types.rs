//! Types exchanged between the coordinator and a supervisor.

use std::path::PathBuf;

/// Everything needed to start one download attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchRequest {
    pub job_id: String,
    /// Admission counter of the job; echoed on every event.
    pub attempt: u32,
    pub source_url: String,
    pub output_path: PathBuf,
}

/// Something that happened to a running download.
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorEvent {
    pub job_id: String,
    pub attempt: u32,
    pub kind: SupervisorEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SupervisorEventKind {
    Progress {
        progress: f32,
        speed: Option<String>,
        eta: Option<String>,
    },
    Completed {
        output_path: PathBuf,
    },
    Failed {
        message: String,
    },
}

impl SupervisorEvent {
    pub fn progress(request: &LaunchRequest, progress: f32) -> Self {
        Self {
            job_id: request.job_id.clone(),
            attempt: request.attempt,
            kind: SupervisorEventKind::Progress {
                progress,
                speed: None,
                eta: None,
            },
        }
    }

    pub fn completed(request: &LaunchRequest) -> Self {
        Self {
            job_id: request.job_id.clone(),
            attempt: request.attempt,
            kind: SupervisorEventKind::Completed {
                output_path: request.output_path.clone(),
            },
        }
    }

    pub fn failed(request: &LaunchRequest, message: impl Into<String>) -> Self {
        Self {
            job_id: request.job_id.clone(),
            attempt: request.attempt,
            kind: SupervisorEventKind::Failed {
                message: message.into(),
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind, SupervisorEventKind::Progress { .. })
    }
}
