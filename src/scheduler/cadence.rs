use chrono::{DateTime, TimeZone, Utc};

/// Fires on every multiple of `interval` since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalCadence {
    interval_ms: i64,
}

impl IntervalCadence {
    /// Sub-millisecond intervals are rounded up to one millisecond.
    #[must_use]
    pub fn new(interval: std::time::Duration) -> Self {
        let interval_ms = i64::try_from(interval.as_millis()).unwrap_or(i64::MAX).max(1);
        Self { interval_ms }
    }

    #[must_use]
    pub fn next_run_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let now_ms = now.timestamp_millis();
        let remainder = now_ms.rem_euclid(self.interval_ms);
        if remainder == 0 && now.timestamp_subsec_nanos() % 1_000_000 == 0 {
            return now;
        }
        let next_ms = now_ms - remainder + self.interval_ms;
        Utc.timestamp_millis_opt(next_ms).single().unwrap_or(now)
    }
}
