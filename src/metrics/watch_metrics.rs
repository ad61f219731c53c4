//! Poll loop metrics tracking using OpenTelemetry.

use crate::core::PollReport;
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use std::time::Instant;

/// Metrics collector for the watch poll loop.
///
/// # Examples
///
/// ```rust,no_run
/// use remote_config_watch::metrics::WatchMetrics;
/// use opentelemetry::global;
///
/// let meter = global::meter("remote-config-watch");
/// let metrics = WatchMetrics::new(meter);
/// metrics.update_watched_keys(3);
/// ```
#[derive(Clone)]
pub struct WatchMetrics {
    poll_cycles: Counter<u64>,
    refresh_failures: Counter<u64>,
    changes_detected: Counter<u64>,
    callback_panics: Counter<u64>,
    cycle_duration: Histogram<f64>,
    watched_keys: Gauge<i64>,
}

impl WatchMetrics {
    /// Create a new metrics collector with the provided meter.
    pub fn new(meter: Meter) -> Self {
        let poll_cycles = meter
            .u64_counter("remote_config.poll.cycles")
            .with_description("Total number of completed poll cycles")
            .build();

        let refresh_failures = meter
            .u64_counter("remote_config.refresh.failures")
            .with_description("Number of failed source refreshes")
            .build();

        let changes_detected = meter
            .u64_counter("remote_config.changes")
            .with_description("Number of watched-key changes delivered to callbacks")
            .build();

        let callback_panics = meter
            .u64_counter("remote_config.callback.panics")
            .with_description("Number of watch callbacks that panicked")
            .build();

        let cycle_duration = meter
            .f64_histogram("remote_config.poll.duration")
            .with_description("Duration of poll cycles in seconds")
            .with_unit("s")
            .build();

        let watched_keys = meter
            .i64_gauge("remote_config.watched_keys")
            .with_description("Number of keys currently watched")
            .build();

        Self {
            poll_cycles,
            refresh_failures,
            changes_detected,
            callback_panics,
            cycle_duration,
            watched_keys,
        }
    }

    /// Record a finished poll cycle.
    ///
    /// # Arguments
    ///
    /// * `start` - When the cycle began
    /// * `report` - What the cycle observed
    pub fn record_cycle(&self, start: Instant, report: &PollReport) {
        let outcome = KeyValue::new("refreshed", report.refreshed);
        self.poll_cycles.add(1, &[outcome.clone()]);
        self.cycle_duration
            .record(start.elapsed().as_secs_f64(), &[outcome]);

        if !report.refreshed {
            self.refresh_failures.add(1, &[]);
        }
        if !report.changed.is_empty() {
            self.changes_detected.add(report.changed.len() as u64, &[]);
        }
        if report.callback_panics > 0 {
            self.callback_panics.add(report.callback_panics as u64, &[]);
        }
    }

    /// Update the number of watched keys.
    pub fn update_watched_keys(&self, count: usize) {
        self.watched_keys.record(count as i64, &[]);
    }
}
