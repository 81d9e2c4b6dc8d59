//! Jobs and their persistence.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteJobStore;
pub use store::{JobStore, JobStoreError};
pub use types::{EnqueueRequest, Job, JobStatus};
