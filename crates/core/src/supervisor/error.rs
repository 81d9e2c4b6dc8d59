//! Error types for the supervisor module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while launching a downloader process.
///
/// Failures after a successful spawn are reported as events, not errors.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The downloader executable could not be found.
    #[error("Failed to start downloader: executable not found at {path}")]
    BinaryNotFound { path: PathBuf },

    /// The OS refused to start the process.
    #[error("Failed to start downloader: {0}")]
    Spawn(#[source] std::io::Error),
}
