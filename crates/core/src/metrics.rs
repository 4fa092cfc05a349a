//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Session (login attempts)
//! - Scraper (searches, result counts, downloads)
//! - Cache gateway (hits, misses, fallbacks)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Session Metrics
// =============================================================================

/// Login attempts by result.
pub static LOGIN_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("yggzn_login_attempts_total", "Total login attempts"),
        &["result"], // "restored", "success", "failed", "error"
    )
    .unwrap()
});

/// Sessions found expired while searching.
pub static SESSION_EXPIRED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "yggzn_session_expired_total",
            "Sessions found expired during an operation",
        ),
        &["outcome"], // "restored", "lost"
    )
    .unwrap()
});

// =============================================================================
// Scraper Metrics
// =============================================================================

/// Search requests by result.
pub static SEARCH_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("yggzn_search_requests_total", "Total search requests"),
        &["result"], // "success", "error"
    )
    .unwrap()
});

/// Results returned per search.
pub static SEARCH_RESULTS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("yggzn_search_results", "Number of results per search")
            .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 150.0]),
        &[],
    )
    .unwrap()
});

/// Browser downloads by result.
pub static DOWNLOADS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("yggzn_downloads_total", "Total browser downloads"),
        &["result"], // "success", "timeout", "error"
    )
    .unwrap()
});

// =============================================================================
// Cache Metrics
// =============================================================================

/// Artifact fetches by source.
pub static CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("yggzn_cache_lookups_total", "Artifact fetches by cache outcome"),
        &["result"], // "hit", "miss", "direct"
    )
    .unwrap()
});

/// Returns all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Session
        Box::new(LOGIN_ATTEMPTS.clone()),
        Box::new(SESSION_EXPIRED.clone()),
        // Scraper
        Box::new(SEARCH_REQUESTS.clone()),
        Box::new(SEARCH_RESULTS.clone()),
        Box::new(DOWNLOADS.clone()),
        // Cache
        Box::new(CACHE_LOOKUPS.clone()),
    ]
}
