//! Prometheus metrics for monitoring the tournament server.
//!
//! Metrics are exposed in Prometheus text format on a separate listener when
//! `METRICS_BIND` is configured. Without an installed exporter the recording
//! functions are no-ops.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use th_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/competitions", 200);
//! metrics::brackets_created_total();
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
///
/// # Arguments
///
/// - `addr`: Address to bind the metrics server to (e.g., `0.0.0.0:9090`)
///
/// # Returns
///
/// Result indicating success or error message
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
///
/// `path` should be the matched route template so label cardinality stays bounded.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

pub fn websocket_connections_total() {
    metrics::counter!("websocket_connections_total").increment(1);
}

pub fn websocket_connections_active(count: usize) {
    metrics::gauge!("websocket_connections_active").set(count as f64);
}

// ============================================================================
// Tournament Metrics
// ============================================================================

/// Increment brackets created counter (initial plans and regenerations).
pub fn brackets_created_total() {
    metrics::counter!("brackets_created_total").increment(1);
}

/// Record how long planning and scheduling a bracket took.
pub fn bracket_plan_duration_ms(duration_ms: f64) {
    metrics::histogram!("bracket_plan_duration_ms").record(duration_ms);
}

/// Increment reported results counter; `final_match` marks the result that produced a champion.
pub fn match_results_total(final_match: bool) {
    metrics::counter!("match_results_total",
        "final" => final_match.to_string()
    )
    .increment(1);
}
