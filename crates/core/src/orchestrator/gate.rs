//! Preconditions checked before anything is enqueued.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use super::types::OrchestratorError;

/// Runtime-settable destination root and credentials flag.
#[derive(Debug, Default)]
pub struct EnqueueGate {
    destination_root: RwLock<Option<PathBuf>>,
    credentials_stale: AtomicBool,
}

impl EnqueueGate {
    pub fn new(destination_root: Option<PathBuf>, credentials_stale: bool) -> Self {
        Self {
            destination_root: RwLock::new(destination_root),
            credentials_stale: AtomicBool::new(credentials_stale),
        }
    }

    pub fn destination_root(&self) -> Option<PathBuf> {
        self.destination_root
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_destination_root(&self, root: Option<&Path>) {
        *self
            .destination_root
            .write()
            .unwrap_or_else(PoisonError::into_inner) = root.map(Path::to_path_buf);
    }

    pub fn credentials_stale(&self) -> bool {
        self.credentials_stale.load(Ordering::Relaxed)
    }

    pub fn set_credentials_stale(&self, stale: bool) {
        self.credentials_stale.store(stale, Ordering::Relaxed);
    }

    /// Reject an enqueue that cannot succeed. Nothing is changed on rejection.
    pub fn check(&self, confirm_stale: bool) -> Result<(), OrchestratorError> {
        let configured = self
            .destination_root
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|root| !root.as_os_str().is_empty());
        if !configured {
            return Err(OrchestratorError::DestinationNotConfigured);
        }
        if self.credentials_stale() && !confirm_stale {
            return Err(OrchestratorError::CredentialsUnconfirmed);
        }
        Ok(())
    }
}
