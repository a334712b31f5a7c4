//! Gemini request metrics.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Total Gemini requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "reelscope_gemini_requests_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "reelscope_gemini_latency_seconds";
}

/// Record metrics for a completed Gemini request. `status` is 0 when no
/// response was received.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}
