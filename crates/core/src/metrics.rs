//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Indexer search (queries, hits, magnet resolution)
//! - Acquisition (downloads by result, retry transitions)
//! - Release policy (upgrade sweep)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Search Metrics
// =============================================================================

/// Indexer searches by result.
pub static SEARCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("selectarr_searches_total", "Total indexer searches"),
        &["result"], // "success", "error"
    )
    .unwrap()
});

/// Hits per search, before and after filtering.
pub static SEARCH_HITS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "selectarr_search_hits",
            "Number of indexer hits per search",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]),
        &["stage"], // "received", "kept"
    )
    .unwrap()
});

/// Magnet resolution outcomes.
pub static RESOLVER_RESULTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "selectarr_resolver_results_total",
            "Download link resolutions by outcome",
        ),
        &["result"], // "resolved", "no_magnet", "error"
    )
    .unwrap()
});

// =============================================================================
// Acquisition Metrics
// =============================================================================

/// Download attempts by result.
pub static ACQUISITIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("selectarr_acquisitions_total", "Total acquisition attempts"),
        &["kind", "result"], // result: "downloaded", "nothing_found", "skipped"
    )
    .unwrap()
});

/// Retry tracker transitions.
pub static RETRY_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "selectarr_retry_transitions_total",
            "Retry tracker state transitions",
        ),
        &["state"], // "ignored", "suppressed", "cleared"
    )
    .unwrap()
});

// =============================================================================
// Release Policy Metrics
// =============================================================================

/// Upgrade sweep outcomes per queue entry.
pub static UPGRADE_SWEEP_RESULTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "selectarr_upgrade_sweep_results_total",
            "Upgrade sweep outcomes per queued item",
        ),
        &["result"], // "upgraded", "not_found", "failed"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(SEARCHES_TOTAL.clone()),
        Box::new(SEARCH_HITS.clone()),
        Box::new(RESOLVER_RESULTS.clone()),
        Box::new(ACQUISITIONS_TOTAL.clone()),
        Box::new(RETRY_TRANSITIONS.clone()),
        Box::new(UPGRADE_SWEEP_RESULTS.clone()),
    ]
}
