pub(crate) mod metrics;
pub(crate) mod structured_log;
pub(crate) mod tracing;

use std::sync::Arc;

use anyhow::Result;
use prometheus::{Encoder, Registry, TextEncoder};

pub use self::metrics::Metrics;

/// Metrics registry plus the process-wide tracing subscriber.
#[derive(Debug, Clone)]
pub struct Telemetry {
    registry: Arc<Registry>,
    metrics: Arc<Metrics>,
}

impl Telemetry {
    /// Initializes tracing (once per process) and a fresh metrics registry.
    ///
    /// # Errors
    /// Returns an error when the subscriber or a metric cannot be registered.
    pub fn new() -> Result<Self> {
        tracing::init()?;
        let registry = Arc::new(Registry::new());
        let metrics = Arc::new(Metrics::new(Arc::clone(&registry))?);
        Ok(Self { registry, metrics })
    }

    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    #[must_use]
    pub fn metrics_arc(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    pub fn record_ready_probe(&self) {
        ::tracing::debug!("service ready probe recorded");
    }

    pub fn record_live_probe(&self) {
        ::tracing::debug!("service live probe");
    }

    pub fn record_manual_scan_invocation(&self) {
        ::tracing::info!("manual scan invoked");
    }

    #[must_use]
    pub fn render_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(error) = encoder.encode(&metric_families, &mut buffer) {
            ::tracing::warn!(error = %error, "failed to encode prometheus metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_metrics_include_crate_counters() {
        let telemetry = Telemetry::new().expect("telemetry");
        telemetry.metrics().videos_scored.inc();

        let rendered = telemetry.render_prometheus();

        assert!(rendered.contains("trendai_videos_scored_total 1"));
        assert!(rendered.contains("trendai_scan_duration_seconds"));
    }

    #[test]
    fn registries_are_independent() {
        let first = Telemetry::new().expect("first telemetry");
        let second = Telemetry::new().expect("second telemetry");
        first.metrics().spikes_detected.inc_by(3.0);

        assert!(second.render_prometheus().contains("trendai_spikes_detected_total 0"));
    }
}
