//! Prometheus metrics

use crate::domain::call::CallDirection;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

pub const CALLS_CREATED: &str = "calltrack_calls_created_total";
pub const CALLS_ENDED: &str = "calltrack_calls_ended_total";
pub const CALLS_DELETED: &str = "calltrack_calls_deleted_total";
pub const REQUESTS_REJECTED: &str = "calltrack_requests_rejected_total";
pub const CALL_DURATION: &str = "calltrack_call_duration_seconds";
pub const STATISTICS_DURATION: &str = "calltrack_statistics_duration_seconds";

/// Install the Prometheus recorder and describe the metrics
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(handle)
}

pub fn describe_metrics() {
    describe_counter!(CALLS_CREATED, "Total number of calls created");
    describe_counter!(CALLS_ENDED, "Total number of calls ended");
    describe_counter!(CALLS_DELETED, "Total number of call records deleted");
    describe_counter!(
        REQUESTS_REJECTED,
        "Lifecycle requests rejected, by operation and reason"
    );
    describe_histogram!(CALL_DURATION, "Length of ended calls in seconds");
    describe_histogram!(
        STATISTICS_DURATION,
        "Time spent computing call statistics in seconds"
    );
}

pub fn record_call_created(direction: CallDirection) {
    counter!(CALLS_CREATED, "direction" => direction.as_str()).increment(1);
}

pub fn record_call_ended(direction: CallDirection, length: chrono::Duration) {
    counter!(CALLS_ENDED, "direction" => direction.as_str()).increment(1);
    histogram!(CALL_DURATION, "direction" => direction.as_str())
        .record(length.num_milliseconds().max(0) as f64 / 1000.0);
}

pub fn record_call_deleted() {
    counter!(CALLS_DELETED).increment(1);
}

pub fn record_rejected(operation: &'static str, reason: &'static str) {
    counter!(REQUESTS_REJECTED, "operation" => operation, "reason" => reason).increment(1);
}

pub fn record_statistics_run(elapsed: Duration) {
    histogram!(STATISTICS_DURATION).record(elapsed.as_secs_f64());
}
