//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Queue (enqueues, retries, cancellations)
//! - Downloads (starts, outcomes, durations)
//! - Supervisor (spawn failures, late events)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Queue Metrics
// =============================================================================

/// Jobs enqueued total by source.
pub static JOBS_ENQUEUED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tubequeue_jobs_enqueued_total", "Total jobs enqueued"),
        &["source"], // "single", "batch"
    )
    .unwrap()
});

/// Jobs re-queued total by operation.
pub static JOBS_REQUEUED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tubequeue_jobs_requeued_total",
            "Total jobs sent back to the queue",
        ),
        &["operation"], // "retry", "retry_all", "redownload"
    )
    .unwrap()
});

/// Enqueue requests rejected by configuration checks.
pub static ENQUEUE_REJECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tubequeue_enqueue_rejections_total",
            "Total enqueue requests rejected before queueing",
        ),
        &["reason"], // "destination", "credentials"
    )
    .unwrap()
});

// =============================================================================
// Download Metrics
// =============================================================================

/// Downloads started total.
pub static DOWNLOADS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("tubequeue_downloads_started_total", "Total downloads started").unwrap()
});

/// Downloads completed total.
pub static DOWNLOADS_COMPLETED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tubequeue_downloads_completed_total",
        "Total downloads completed successfully",
    )
    .unwrap()
});

/// Downloads failed total.
pub static DOWNLOADS_FAILED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tubequeue_downloads_failed_total",
        "Total downloads that failed",
    )
    .unwrap()
});

/// Jobs cancelled total.
pub static DOWNLOADS_CANCELLED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tubequeue_downloads_cancelled_total",
        "Total jobs cancelled while queued or downloading",
    )
    .unwrap()
});

/// Download duration in seconds.
pub static DOWNLOAD_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "tubequeue_download_duration_seconds",
            "Duration of downloads",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

// =============================================================================
// Supervisor Metrics
// =============================================================================

/// Downloader processes that could not be started.
pub static SPAWN_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tubequeue_spawn_failures_total",
        "Total downloader processes that failed to start",
    )
    .unwrap()
});

/// Supervisor events dropped because the job had moved on.
pub static LATE_EVENTS_IGNORED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tubequeue_late_events_ignored_total",
            "Supervisor events ignored because the job was no longer downloading",
        ),
        &["reason"], // "unknown_job", "not_downloading", "stale_attempt"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Queue
        Box::new(JOBS_ENQUEUED.clone()),
        Box::new(JOBS_REQUEUED.clone()),
        Box::new(ENQUEUE_REJECTIONS.clone()),
        // Downloads
        Box::new(DOWNLOADS_STARTED.clone()),
        Box::new(DOWNLOADS_COMPLETED.clone()),
        Box::new(DOWNLOADS_FAILED.clone()),
        Box::new(DOWNLOADS_CANCELLED.clone()),
        Box::new(DOWNLOAD_DURATION.clone()),
        // Supervisor
        Box::new(SPAWN_FAILURES.clone()),
        Box::new(LATE_EVENTS_IGNORED.clone()),
    ]
}
