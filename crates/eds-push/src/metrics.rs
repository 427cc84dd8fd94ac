//! Push-path metrics.
//!
//! Metric names are contractual; dashboards and alerts reference them:
//!
//! - `eds_pushes_total` - completed endpoint pushes
//! - `eds_push_duration_seconds` - push latency histogram
//! - `eds_pushed_endpoints_total` - endpoints delivered across pushes
//! - `eds_empty_assignments_total` - assignments sent with no endpoints
//! - `eds_send_errors_total` (`conn_id`) - transport write failures
//! - `eds_cluster_no_instances_total` (`cluster`) - built clusters that
//!   filtered down to nothing
//!
//! The index side emits `eds_endpoint_updates_total`,
//! `eds_service_updates_total` and `eds_service_deletes_total`.

use std::time::{Duration, Instant};

use metrics::{counter, histogram};

/// Recorder for push-path metrics.
///
/// Cheap to clone; all state lives in the metrics registry.
#[derive(Clone, Copy, Debug, Default)]
pub struct EdsMetrics;

impl EdsMetrics {
    /// Create a metrics recorder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Record a completed push and what it carried.
    pub fn record_push(&self, endpoints: usize, empty_assignments: usize) {
        counter!("eds_pushes_total").increment(1);
        counter!("eds_pushed_endpoints_total").increment(endpoints as u64);
        if empty_assignments > 0 {
            counter!("eds_empty_assignments_total").increment(empty_assignments as u64);
        }
    }

    /// Record push latency.
    pub fn record_push_duration(&self, duration: Duration) {
        histogram!("eds_push_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a transport write failure on a connection.
    pub fn record_send_error(&self, conn_id: &str) {
        counter!("eds_send_errors_total", "conn_id" => conn_id.to_string()).increment(1);
    }

    /// Start a push timer.
    #[must_use]
    pub fn start_push(&self) -> PushTimer {
        PushTimer {
            start: Instant::now(),
            metrics: *self,
        }
    }
}

/// Timer measuring one push; records the duration when finished.
#[derive(Debug)]
pub struct PushTimer {
    start: Instant,
    metrics: EdsMetrics,
}

impl PushTimer {
    /// Finish the timer and record the push latency.
    pub fn finish(self) -> Duration {
        let elapsed = self.start.elapsed();
        self.metrics.record_push_duration(elapsed);
        elapsed
    }
}
