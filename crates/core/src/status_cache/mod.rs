//! Poll-mirror of recent job states.
//!
//! A disposable view derived from supervisor events, for callers that poll
//! instead of subscribing. Terminal entries expire after a TTL; unknown ids
//! report [`StatusSnapshot::Inactive`].

mod cache;

pub use cache::{StatusCache, StatusSnapshot, DEFAULT_STATUS_TTL_SECS};
