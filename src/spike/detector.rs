use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::SpikeConfig;
use super::types::{MetricsSnapshot, SpikeEvent, SpikeOutcome, SpikeReason, SpikeState};

/// Lookup of previously emitted alerts.
#[async_trait]
pub trait SpikeHistory: Send + Sync {
    /// Time of the most recent alert recorded for `video_id`, if any.
    async fn last_spike_at(&self, video_id: &str) -> anyhow::Result<Option<DateTime<Utc>>>;
}

/// A snapshot that could not be evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionFailure {
    pub video_id: String,
    pub error: String,
}

/// Result of evaluating a batch of snapshots.
#[derive(Debug, Clone, Default)]
pub struct BatchDetection {
    pub events: Vec<SpikeEvent>,
    pub suppressed: Vec<String>,
    pub failures: Vec<DetectionFailure>,
}

#[derive(Debug, Clone, Default)]
pub struct SpikeDetector {
    config: SpikeConfig,
}

impl SpikeDetector {
    #[must_use]
    pub fn new(config: SpikeConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &SpikeConfig {
        &self.config
    }

    /// Conditions crossed by `snapshot`, ignoring suppression.
    #[must_use]
    pub fn triggered_reasons(&self, snapshot: &MetricsSnapshot) -> Vec<SpikeReason> {
        let mut reasons = Vec::new();
        let metric = &snapshot.metric;

        let engagement_threshold = self.config.engagement_threshold(snapshot.content_type);
        if metric.engagement_rate() >= engagement_threshold {
            reasons.push(SpikeReason::HighEngagement {
                engagement_rate: metric.engagement_rate(),
                threshold: engagement_threshold,
                content_type: snapshot.content_type,
            });
        }

        if snapshot.trend_score > self.config.trend_score_threshold {
            reasons.push(SpikeReason::HighTrendScore {
                trend_score: snapshot.trend_score,
                threshold: self.config.trend_score_threshold,
            });
        }

        let age = metric.observed_at() - metric.published_at();
        if metric.views_per_hour() > self.config.views_per_hour_threshold
            && age < self.config.fresh_video_max_age
        {
            reasons.push(SpikeReason::RapidViewGrowth {
                views_per_hour: metric.views_per_hour(),
                threshold: self.config.views_per_hour_threshold,
                age_hours: metric.age_hours(),
            });
        }

        reasons
    }

    /// Evaluates one snapshot against the last alert time of its video.
    ///
    /// Suppression holds while `detected_at - last_spike_at` is shorter than
    /// the window; an alert recorded after `detected_at` also suppresses.
    #[must_use]
    pub fn evaluate(
        &self,
        snapshot: &MetricsSnapshot,
        last_spike_at: Option<DateTime<Utc>>,
    ) -> SpikeOutcome {
        let reasons = self.triggered_reasons(snapshot);
        if reasons.is_empty() {
            return SpikeOutcome {
                state: SpikeState::Normal,
                reasons,
                event: None,
            };
        }

        let detected_at = snapshot.observed_at();
        if let Some(last) = last_spike_at {
            if detected_at - last < self.config.suppression_window {
                return SpikeOutcome {
                    state: SpikeState::Suppressed {
                        until: last
                            .checked_add_signed(self.config.suppression_window)
                            .unwrap_or(DateTime::<Utc>::MAX_UTC),
                    },
                    reasons,
                    event: None,
                };
            }
        }

        let event = SpikeEvent {
            id: Uuid::new_v4(),
            video_id: snapshot.video_id().to_string(),
            detected_at,
            reasons: reasons.clone(),
            metrics_snapshot: snapshot.clone(),
        };

        SpikeOutcome {
            state: SpikeState::Spiking,
            reasons,
            event: Some(event),
        }
    }

    /// Evaluates every snapshot independently. A failing snapshot is logged
    /// and recorded without aborting the batch, and events emitted earlier in
    /// the batch count towards suppression of later snapshots.
    pub async fn detect_batch<H>(&self, snapshots: &[MetricsSnapshot], history: &H) -> BatchDetection
    where
        H: SpikeHistory + ?Sized,
    {
        let mut batch = BatchDetection::default();
        let mut emitted: HashMap<String, DateTime<Utc>> = HashMap::new();

        for snapshot in snapshots {
            let video_id = snapshot.video_id().to_string();

            if let Err(error) = snapshot.validate() {
                warn!(video_id = %video_id, error = %error, "skipping malformed snapshot");
                batch.failures.push(DetectionFailure {
                    video_id,
                    error: error.to_string(),
                });
                continue;
            }

            let stored = match history.last_spike_at(&video_id).await {
                Ok(stored) => stored,
                Err(error) => {
                    warn!(video_id = %video_id, error = %error, "spike history lookup failed");
                    batch.failures.push(DetectionFailure {
                        video_id,
                        error: format!("{error:#}"),
                    });
                    continue;
                }
            };
            let last = match (stored, emitted.get(&video_id).copied()) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            };

            let outcome = self.evaluate(snapshot, last);
            match (outcome.state, outcome.event) {
                (SpikeState::Spiking, Some(event)) => {
                    info!(
                        video_id = %video_id,
                        reasons = event.reasons.len(),
                        trend_score = event.trend_score(),
                        "trendai.event" = "spike_detected",
                        "spike detected"
                    );
                    emitted.insert(video_id, event.detected_at);
                    batch.events.push(event);
                }
                (SpikeState::Suppressed { until }, _) => {
                    debug!(video_id = %video_id, until = %until, "spike suppressed");
                    batch.suppressed.push(video_id);
                }
                _ => {}
            }
        }

        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{ContentType, ScoreResult, VideoMetric};
    use chrono::{Duration, TimeZone};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapHistory {
        entries: Mutex<HashMap<String, DateTime<Utc>>>,
        failing: Vec<String>,
    }

    #[async_trait]
    impl SpikeHistory for MapHistory {
        async fn last_spike_at(&self, video_id: &str) -> anyhow::Result<Option<DateTime<Utc>>> {
            if self.failing.iter().any(|id| id == video_id) {
                anyhow::bail!("history unavailable");
            }
            Ok(self.entries.lock().unwrap().get(video_id).copied())
        }
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
    }

    fn snapshot_at(
        video_id: &str,
        views: u64,
        engagements: u64,
        age: Duration,
        observed_at: DateTime<Utc>,
        content_type: ContentType,
        trend_score: f64,
    ) -> MetricsSnapshot {
        let metric = VideoMetric::new(
            video_id,
            views,
            engagements,
            0,
            observed_at - age,
            observed_at,
        );
        let score = ScoreResult {
            video_id: video_id.to_string(),
            observed_at,
            velocity_score: 0.0,
            novelty_score: 0.0,
            title_quality_score: 0.0,
            seo_score: 0.0,
            engagement_rate: metric.engagement_rate(),
            views_per_minute: metric.views_per_minute(),
            overall_score: 0.0,
            is_trending: false,
        };
        MetricsSnapshot {
            metric,
            score,
            trend_score,
            content_type,
            title: format!("video {video_id}"),
            url: format!("https://www.youtube.com/watch?v={video_id}"),
        }
    }

    /// Old video with low velocity, so only the engagement condition can fire.
    fn engagement_snapshot(engagements: u64, content_type: ContentType) -> MetricsSnapshot {
        snapshot_at(
            "vid",
            1_000,
            engagements,
            Duration::days(3),
            base(),
            content_type,
            0.1,
        )
    }

    fn qualifying(video_id: &str, observed_at: DateTime<Utc>) -> MetricsSnapshot {
        snapshot_at(
            video_id,
            1_000,
            30,
            Duration::days(3),
            observed_at,
            ContentType::Long,
            0.1,
        )
    }

    #[test]
    fn short_form_engagement_triggers_at_threshold() {
        let detector = SpikeDetector::default();

        let at_threshold = detector.triggered_reasons(&engagement_snapshot(25, ContentType::Short));
        assert_eq!(at_threshold.len(), 1);
        assert!(at_threshold[0].to_string().starts_with("High engagement"));

        let above = detector.triggered_reasons(&engagement_snapshot(30, ContentType::Short));
        assert_eq!(above[0].kind(), "high_engagement");

        let below = detector.triggered_reasons(&engagement_snapshot(24, ContentType::Short));
        assert!(below.is_empty());
    }

    #[test]
    fn long_form_engagement_triggers_at_threshold() {
        let detector = SpikeDetector::default();

        let at_threshold = detector.triggered_reasons(&engagement_snapshot(12, ContentType::Long));
        assert_eq!(at_threshold.len(), 1);
        assert!(at_threshold[0].to_string().starts_with("High engagement"));

        // 1.0% is below both thresholds
        assert!(detector
            .triggered_reasons(&engagement_snapshot(10, ContentType::Long))
            .is_empty());
        assert!(detector
            .triggered_reasons(&engagement_snapshot(10, ContentType::Short))
            .is_empty());
        // 1.2% only qualifies long-form content
        assert!(detector
            .triggered_reasons(&engagement_snapshot(12, ContentType::Short))
            .is_empty());
    }

    #[test]
    fn trend_score_must_exceed_threshold() {
        let detector = SpikeDetector::default();
        let at = snapshot_at("vid", 1_000, 0, Duration::days(3), base(), ContentType::Long, 0.72);
        let above = snapshot_at("vid", 1_000, 0, Duration::days(3), base(), ContentType::Long, 0.73);

        assert!(detector.triggered_reasons(&at).is_empty());
        let reasons = detector.triggered_reasons(&above);
        assert_eq!(reasons.len(), 1);
        assert!(reasons[0].to_string().starts_with("High trend score"));
    }

    #[test]
    fn view_growth_only_counts_for_fresh_videos() {
        let detector = SpikeDetector::default();
        // 30_000 views in 2 hours = 15_000 views/hour
        let fresh = snapshot_at("vid", 30_000, 0, Duration::hours(2), base(), ContentType::Long, 0.0);
        // 3M views in 25 hours = 120_000 views/hour, but too old
        let old = snapshot_at("vid", 3_000_000, 0, Duration::hours(25), base(), ContentType::Long, 0.0);

        let reasons = detector.triggered_reasons(&fresh);
        assert_eq!(reasons.len(), 1);
        assert!(reasons[0].to_string().starts_with("Rapid view growth"));
        assert!(detector.triggered_reasons(&old).is_empty());
    }

    #[test]
    fn reasons_follow_condition_order() {
        let detector = SpikeDetector::default();
        let snapshot = snapshot_at(
            "vid",
            30_000,
            3_000,
            Duration::hours(2),
            base(),
            ContentType::Short,
            0.9,
        );

        let kinds: Vec<&str> = detector
            .triggered_reasons(&snapshot)
            .iter()
            .map(SpikeReason::kind)
            .collect();
        assert_eq!(
            kinds,
            vec!["high_engagement", "high_trend_score", "rapid_view_growth"]
        );
    }

    #[test]
    fn evaluate_emits_and_suppresses() {
        let detector = SpikeDetector::default();
        let snapshot = qualifying("vid", base());

        let fresh = detector.evaluate(&snapshot, None);
        assert_eq!(fresh.state, SpikeState::Spiking);
        let event = fresh.event.expect("event emitted");
        assert_eq!(event.video_id, "vid");
        assert_eq!(event.detected_at, base());

        let suppressed = detector.evaluate(&snapshot, Some(base() - Duration::hours(1)));
        assert_eq!(
            suppressed.state,
            SpikeState::Suppressed {
                until: base() + Duration::hours(5)
            }
        );
        assert!(suppressed.event.is_none());

        let expired = detector.evaluate(&snapshot, Some(base() - Duration::hours(6)));
        assert_eq!(expired.state, SpikeState::Spiking);
    }

    #[test]
    fn oversized_suppression_window_saturates() {
        let detector = SpikeDetector::new(SpikeConfig {
            suppression_window: Duration::MAX,
            ..SpikeConfig::default()
        });
        let snapshot = qualifying("vid", base());

        let outcome = detector.evaluate(&snapshot, Some(base() - Duration::hours(1)));
        assert_eq!(
            outcome.state,
            SpikeState::Suppressed {
                until: DateTime::<Utc>::MAX_UTC
            }
        );
        assert!(outcome.event.is_none());
    }

    #[test]
    fn evaluate_reports_normal_without_reasons() {
        let detector = SpikeDetector::default();
        let quiet = engagement_snapshot(1, ContentType::Long);

        let outcome = detector.evaluate(&quiet, Some(base() - Duration::minutes(5)));
        assert_eq!(outcome.state, SpikeState::Normal);
        assert!(outcome.event.is_none());
    }

    #[tokio::test]
    async fn snapshots_one_hour_apart_emit_once() {
        let detector = SpikeDetector::default();
        let history = MapHistory::default();
        let snapshots = vec![
            qualifying("vid", base()),
            qualifying("vid", base() + Duration::hours(1)),
        ];

        let batch = detector.detect_batch(&snapshots, &history).await;

        assert_eq!(batch.events.len(), 1);
        assert_eq!(batch.suppressed, vec!["vid".to_string()]);
    }

    #[tokio::test]
    async fn snapshots_seven_hours_apart_emit_twice() {
        let detector = SpikeDetector::default();
        let history = MapHistory::default();
        let snapshots = vec![
            qualifying("vid", base()),
            qualifying("vid", base() + Duration::hours(7)),
        ];

        let batch = detector.detect_batch(&snapshots, &history).await;

        assert_eq!(batch.events.len(), 2);
        assert!(batch.suppressed.is_empty());
    }

    #[tokio::test]
    async fn stored_history_suppresses_across_runs() {
        let detector = SpikeDetector::default();
        let history = MapHistory::default();
        history
            .entries
            .lock()
            .unwrap()
            .insert("vid".to_string(), base() - Duration::hours(2));

        let batch = detector
            .detect_batch(&[qualifying("vid", base())], &history)
            .await;

        assert!(batch.events.is_empty());
        assert_eq!(batch.suppressed.len(), 1);
    }

    #[tokio::test]
    async fn failures_do_not_abort_batch() {
        let detector = SpikeDetector::default();
        let history = MapHistory {
            failing: vec!["broken".to_string()],
            ..MapHistory::default()
        };
        let mut malformed = qualifying("mismatch", base());
        malformed.score.video_id = "other".to_string();
        let snapshots = vec![
            qualifying("broken", base()),
            malformed,
            qualifying("ok", base()),
        ];

        let batch = detector.detect_batch(&snapshots, &history).await;

        assert_eq!(batch.events.len(), 1);
        assert_eq!(batch.events[0].video_id, "ok");
        let failed: Vec<&str> = batch.failures.iter().map(|f| f.video_id.as_str()).collect();
        assert_eq!(failed, vec!["broken", "mismatch"]);
    }
}
