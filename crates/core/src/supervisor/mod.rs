//! Downloader subprocess supervision.
//!
//! A [`Supervisor`] owns one external process per admitted job. It streams the
//! process output, reports progress and the terminal outcome as
//! [`SupervisorEvent`]s over a channel, and never touches job state itself.

mod args;
mod config;
mod diagnostics;
mod error;
mod process;
mod progress;
mod traits;
mod types;

pub use args::build_args;
pub use config::{CookieSource, DownloaderConfig, KNOWN_BROWSERS};
pub use diagnostics::{StderrTail, MAX_TAIL_CHARS, MAX_TAIL_LINES};
pub use error::SupervisorError;
pub use process::ProcessSupervisor;
pub use progress::{PercentProgressParser, ProgressParser, ProgressUpdate};
pub use traits::Supervisor;
pub use types::{LaunchRequest, SupervisorEvent, SupervisorEventKind};
