//! Metrics for the Polaris persistent state
//!
//! Counters are recorded through the `metrics` facade; without an installed
//! recorder they are no-ops, so embedding applications choose the exporter.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Initialize metrics with descriptions
pub fn init_metrics() {
    // Local change logs
    describe_counter!("polaris.local_changes.inserted", "Number of local meta changes logged");
    describe_counter!("polaris.content_changes.inserted", "Number of local content changes logged");

    // Conflict buffer
    describe_counter!("polaris.conflict_buffer.buffered", "Number of remote meta changes deferred");
    describe_counter!("polaris.conflict_buffer.applied", "Number of deferred meta changes cleared after application");

    // Remote content and fetching
    describe_counter!("polaris.remote_content.inserted", "Number of remote content versions recorded");
    describe_counter!("polaris.fetch_queue.enqueued", "Number of objects queued for content fetch");
    describe_counter!("polaris.fetch_queue.dequeued", "Number of objects removed from the fetch queue");

    // Store lifecycle
    describe_counter!("polaris.stores.deleted", "Number of stores torn down");
    describe_histogram!("polaris.stores.delete.duration_ms", "Store teardown duration in milliseconds");
}

/// Record a counter metric
pub fn record_counter(name: &'static str, value: u64) {
    counter!(name).increment(value);
}

/// Timer for measuring operation duration
pub struct Timer {
    name: &'static str,
    start: Instant,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self { name, start: Instant::now() }
    }

    /// Stop the timer and record the duration
    pub fn stop(self) {
        let duration = self.start.elapsed();
        histogram!(self.name).record(duration.as_secs_f64() * 1000.0);
    }
}
