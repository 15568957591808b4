//! Metrics for the telemetry synchronization core.
//!
//! This module provides metrics collection using the metrics crate. Nothing is
//! exported unless the embedding binary installs a recorder.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::sync::Once;
use std::time::Duration;

static REGISTER: Once = Once::new();

/// Registers metric descriptions. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        describe_counter!(
            "sn_polls_total",
            "Total number of completed poll ticks, by stream and outcome"
        );
        describe_counter!(
            "sn_poll_skipped_total",
            "Poll ticks skipped because a fetch was still outstanding"
        );
        describe_histogram!(
            "sn_poll_duration_seconds",
            "Latency of completed poll fetches"
        );
        describe_counter!(
            "sn_analysis_total",
            "Total number of analysis requests, by outcome"
        );
    });
}

/// Records the outcome of one poll fetch.
pub fn record_poll(stream: &str, success: bool, latency: Duration) {
    let outcome = if success { "success" } else { "failure" };
    counter!("sn_polls_total", "stream" => stream.to_string(), "outcome" => outcome).increment(1);
    histogram!("sn_poll_duration_seconds", "stream" => stream.to_string())
        .record(latency.as_secs_f64());
}

/// Records a tick skipped because the previous fetch was still outstanding.
pub fn record_skipped_tick(stream: &str) {
    counter!("sn_poll_skipped_total", "stream" => stream.to_string()).increment(1);
}

/// Records the outcome of one analysis request.
pub fn record_analysis(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!("sn_analysis_total", "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        register_metrics();
        register_metrics();
        record_poll("stats", true, Duration::from_millis(120));
        record_poll("threat_feed", false, Duration::from_secs(8));
        record_skipped_tick("threat_map");
        record_analysis(true);
        record_analysis(false);
    }
}
