//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Pipeline runs (outcomes, duration)
//! - Composition (remote vs fallback, poll attempts)
//! - Quota and persistence
//! - External services (composition API)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Pipeline Metrics
// =============================================================================

/// Pipeline runs total by outcome.
pub static PIPELINE_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("luckyticket_pipeline_runs_total", "Total pipeline runs"),
        &["outcome"], // "done", "quota_exceeded", "capture_failed", "cancelled"
    )
    .unwrap()
});

/// Pipeline duration in seconds, from generate to commit.
pub static PIPELINE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "luckyticket_pipeline_duration_seconds",
            "Duration of pipeline runs",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 45.0, 60.0]),
        &["outcome"],
    )
    .unwrap()
});

/// Generation requests rejected by the quota gate.
pub static QUOTA_REJECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "luckyticket_quota_rejections_total",
            "Generation requests rejected by the daily quota",
        ),
        &["tier"],
    )
    .unwrap()
});

/// Tickets committed to the store.
pub static TICKETS_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("luckyticket_tickets_created_total", "Total tickets created").unwrap()
});

/// Profile store writes that failed.
pub static STORE_WRITE_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "luckyticket_store_write_failures_total",
            "Profile store writes that failed",
        ),
        &["operation"], // "commit", "remove", "set_tier"
    )
    .unwrap()
});

// =============================================================================
// Composition Metrics
// =============================================================================

/// Compositions total by path.
pub static COMPOSITIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("luckyticket_compositions_total", "Total compositions"),
        &["path"], // "remote", "fallback"
    )
    .unwrap()
});

/// Fallbacks by the error that caused them.
pub static COMPOSITION_FALLBACKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "luckyticket_composition_fallbacks_total",
            "Compositions that fell back to the source photo",
        ),
        &["reason"],
    )
    .unwrap()
});

/// Status polls needed per job.
pub static POLL_ATTEMPTS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "luckyticket_composition_poll_attempts",
            "Number of status polls per composition job",
        )
        .buckets(vec![1.0, 2.0, 3.0, 5.0, 10.0, 20.0, 30.0]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// External service request duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "luckyticket_external_service_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["service", "operation"],
    )
    .unwrap()
});

/// External service requests total.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "luckyticket_external_service_requests_total",
            "Total external service requests",
        ),
        &["service", "operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Pipeline
        Box::new(PIPELINE_RUNS.clone()),
        Box::new(PIPELINE_DURATION.clone()),
        Box::new(QUOTA_REJECTIONS.clone()),
        Box::new(TICKETS_CREATED.clone()),
        Box::new(STORE_WRITE_FAILURES.clone()),
        // Composition
        Box::new(COMPOSITIONS_TOTAL.clone()),
        Box::new(COMPOSITION_FALLBACKS.clone()),
        Box::new(POLL_ATTEMPTS.clone()),
        // External services
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
    ]
}
