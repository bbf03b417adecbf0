/// Prometheus metric definitions.
use prometheus::{
    Counter, Gauge, Histogram, Registry, register_counter_with_registry,
    register_gauge_with_registry, register_histogram_with_registry,
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Metrics {
    // counters
    pub videos_fetched: Counter,
    pub videos_scored: Counter,
    pub videos_skipped: Counter,
    pub spikes_detected: Counter,
    pub spikes_suppressed: Counter,
    pub spike_evaluation_failures: Counter,
    pub notifications_created: Counter,
    pub persistence_failures: Counter,
    pub source_errors: Counter,
    pub quota_exhausted: Counter,
    pub scans_completed: Counter,
    pub scans_failed: Counter,
    pub scans_timed_out: Counter,

    // histograms
    pub scan_duration: Histogram,
    pub fetch_duration: Histogram,

    // gauges
    pub active_scans: Gauge,
}

impl Metrics {
    /// # Errors
    /// Returns an error when a metric name collides within `registry`.
    #[allow(clippy::too_many_lines)]
    pub fn new(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            videos_fetched: register_counter_with_registry!(
                "trendai_videos_fetched_total",
                "Total number of raw videos returned by the video source",
                registry
            )?,
            videos_scored: register_counter_with_registry!(
                "trendai_videos_scored_total",
                "Total number of videos normalized and scored",
                registry
            )?,
            videos_skipped: register_counter_with_registry!(
                "trendai_videos_skipped_total",
                "Total number of videos rejected during normalization",
                registry
            )?,
            spikes_detected: register_counter_with_registry!(
                "trendai_spikes_detected_total",
                "Total number of spike events emitted",
                registry
            )?,
            spikes_suppressed: register_counter_with_registry!(
                "trendai_spikes_suppressed_total",
                "Qualifying snapshots suppressed by the cooldown window",
                registry
            )?,
            spike_evaluation_failures: register_counter_with_registry!(
                "trendai_spike_evaluation_failures_total",
                "Snapshots that could not be evaluated for spikes",
                registry
            )?,
            notifications_created: register_counter_with_registry!(
                "trendai_notifications_created_total",
                "Total number of subscriber notifications created",
                registry
            )?,
            persistence_failures: register_counter_with_registry!(
                "trendai_persistence_failures_total",
                "Store writes that failed and were skipped",
                registry
            )?,
            source_errors: register_counter_with_registry!(
                "trendai_source_errors_total",
                "Video source calls that failed",
                registry
            )?,
            quota_exhausted: register_counter_with_registry!(
                "trendai_quota_exhausted_total",
                "Scans cut short by video source quota exhaustion",
                registry
            )?,
            scans_completed: register_counter_with_registry!(
                "trendai_scans_completed_total",
                "Total number of scans completed",
                registry
            )?,
            scans_failed: register_counter_with_registry!(
                "trendai_scans_failed_total",
                "Total number of scans that failed",
                registry
            )?,
            scans_timed_out: register_counter_with_registry!(
                "trendai_scans_timed_out_total",
                "Scans that hit the per-run timeout",
                registry
            )?,
            scan_duration: register_histogram_with_registry!(
                "trendai_scan_duration_seconds",
                "Duration of entire scan runs",
                registry
            )?,
            fetch_duration: register_histogram_with_registry!(
                "trendai_fetch_duration_seconds",
                "Duration of a single search term fetch",
                registry
            )?,
            active_scans: register_gauge_with_registry!(
                "trendai_active_scans",
                "Number of scans currently running",
                registry
            )?,
        })
    }
}
