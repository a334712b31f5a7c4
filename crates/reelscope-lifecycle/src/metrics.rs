//! Lifecycle metrics.
//!
//! Recorded through the `metrics` facade; installing an exporter is left to
//! the binary.

use metrics::counter;

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Total retry attempts by operation.
    pub const RETRIES_TOTAL: &str = "reelscope_retries_total";

    /// Status queries that found the asset still processing.
    pub const POLL_TICKS_TOTAL: &str = "reelscope_poll_ticks_total";

    /// Remote deletes that failed and were swallowed.
    pub const CLEANUP_FAILURES_TOTAL: &str = "reelscope_cleanup_failures_total";

    /// Finished assets by outcome.
    pub const ASSETS_TOTAL: &str = "reelscope_assets_total";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record a retry attempt.
pub fn record_retry(operation: &str) {
    counter!(
        names::RETRIES_TOTAL,
        "operation" => operation.to_string()
    )
    .increment(1);
}

pub fn record_poll_tick() {
    counter!(names::POLL_TICKS_TOTAL).increment(1);
}

pub fn record_cleanup_failure() {
    counter!(names::CLEANUP_FAILURES_TOTAL).increment(1);
}

/// Record a finished asset. `outcome` is `success` or an error kind.
pub fn record_asset(outcome: &str) {
    counter!(
        names::ASSETS_TOTAL,
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::RETRIES_TOTAL.contains("retries"));
        assert!(names::POLL_TICKS_TOTAL.contains("poll"));
        assert!(names::CLEANUP_FAILURES_TOTAL.contains("cleanup"));
        assert!(names::ASSETS_TOTAL.starts_with("reelscope_"));
    }

    #[test]
    fn test_recording_without_recorder() {
        // No recorder installed: calls are no-ops
        record_retry("upload");
        record_poll_tick();
        record_cleanup_failure();
        record_asset("success");
    }
}
