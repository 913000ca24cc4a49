//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the selectarr server:
//! - HTTP request metrics (latency, counts, in flight)
//! - Retry and policy state (collected dynamically)
//! - Core acquisition and search metrics, registered from the core crate

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "selectarr_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("selectarr_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "selectarr_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Retry and Policy State (collected dynamically)
// =============================================================================

/// Items suppressed after exhausting their retries.
pub static SUPPRESSED_ITEMS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "selectarr_suppressed_items",
        "Number of items currently suppressed",
    )
    .unwrap()
});

/// Items with recorded failures that are still being retried.
pub static IGNORED_ITEMS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "selectarr_ignored_items",
        "Number of items with recorded failures below their threshold",
    )
    .unwrap()
});

/// 4K timers on record.
pub static POLICY_TIMERS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("selectarr_policy_timers", "Number of 4K timers on record").unwrap()
});

/// Entries waiting in the upgrade queue.
pub static UPGRADE_QUEUE_SIZE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "selectarr_upgrade_queue_size",
        "Number of acquisitions queued for a 4K upgrade check",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Retry and policy state
    registry
        .register(Box::new(SUPPRESSED_ITEMS.clone()))
        .unwrap();
    registry.register(Box::new(IGNORED_ITEMS.clone())).unwrap();
    registry.register(Box::new(POLICY_TIMERS.clone())).unwrap();
    registry
        .register(Box::new(UPGRADE_QUEUE_SIZE.clone()))
        .unwrap();

    // Core metrics (search, acquisition, retries, upgrades)
    for metric in selectarr_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the gauges reflect the session and the
/// persisted policy state.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let session = state.session();
    SUPPRESSED_ITEMS.set(session.suppressed().await.len() as i64);
    IGNORED_ITEMS.set(session.ignored().await.len() as i64);

    let policy = state.policy().store().snapshot().await;
    POLICY_TIMERS.set(policy.timers.len() as i64);
    UPGRADE_QUEUE_SIZE.set(policy.upgrade_queue.len() as i64);
}

static KEYED_ROUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(/api/v1/(suppressed|policy/upgrades))/[^/]+$").unwrap());
static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());

/// Collapse media keys and numeric ids in a request path so label
/// cardinality stays bounded.
pub fn normalize_path(path: &str) -> String {
    let result = KEYED_ROUTE.replace(path, "$1/{key}");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}
