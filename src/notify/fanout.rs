use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use super::types::{NotificationRecord, SubscriberPreference, Urgency};
use crate::spike::SpikeEvent;

const HIGH_TREND_SCORE: f64 = 0.9;
const HIGH_VIEWS_PER_HOUR: f64 = 10_000.0;
const MEDIUM_TREND_SCORE: f64 = 0.8;
const MEDIUM_VIEWS_PER_HOUR: f64 = 5_000.0;

#[must_use]
pub fn classify_urgency(trend_score: f64, views_per_hour: f64) -> Urgency {
    if trend_score > HIGH_TREND_SCORE || views_per_hour > HIGH_VIEWS_PER_HOUR {
        Urgency::High
    } else if trend_score > MEDIUM_TREND_SCORE || views_per_hour > MEDIUM_VIEWS_PER_HOUR {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

/// Frequency gate. Subscribers that were never alerted are always due.
#[must_use]
pub fn is_due(subscriber: &SubscriberPreference, now: DateTime<Utc>) -> bool {
    match (subscriber.frequency.min_interval(), subscriber.last_alert_sent_at) {
        (None, _) | (_, None) => true,
        (Some(interval), Some(last)) => now - last >= interval,
    }
}

/// Builds one notification per subscriber whose filters accept `event`.
///
/// Pure: updating `last_alert_sent_at` is left to the store.
#[must_use]
pub fn fanout(
    event: &SpikeEvent,
    subscribers: &[SubscriberPreference],
    now: DateTime<Utc>,
) -> Vec<NotificationRecord> {
    let snapshot = &event.metrics_snapshot;
    let trend_score = event.trend_score();
    let urgency = classify_urgency(trend_score, event.views_per_hour());
    let title = format!("{} {}: {}", urgency.emoji(), urgency.headline(), snapshot.title);
    let message = format!(
        "{} ({:.0} views/hour, trend score {:.2}). {} {}",
        snapshot.title,
        event.views_per_hour(),
        trend_score,
        event.reason_messages().join("; "),
        snapshot.url,
    );

    subscribers
        .iter()
        .filter(|subscriber| {
            let accepted = subscriber.content_type_filter.accepts(snapshot.content_type)
                && trend_score >= subscriber.score_tier.cutoff()
                && is_due(subscriber, now);
            if !accepted {
                debug!(
                    subscriber_id = %subscriber.subscriber_id,
                    video_id = %event.video_id,
                    "subscriber filtered out of fanout"
                );
            }
            accepted
        })
        .map(|subscriber| NotificationRecord {
            id: Uuid::new_v4(),
            subscriber_id: subscriber.subscriber_id,
            video_id: event.video_id.clone(),
            spike_event_id: event.id,
            urgency,
            title: title.clone(),
            message: message.clone(),
            trend_score,
            created_at: now,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::types::{AlertFrequency, ContentTypeFilter, ScoreTier};
    use crate::scoring::{ContentType, ScoreResult, VideoMetric};
    use crate::spike::{MetricsSnapshot, SpikeReason};
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn event(trend_score: f64, views: u64, content_type: ContentType) -> SpikeEvent {
        let metric = VideoMetric::new("vid", views, 0, 0, now() - Duration::hours(1), now());
        let score = ScoreResult {
            video_id: "vid".to_string(),
            observed_at: now(),
            velocity_score: 0.0,
            novelty_score: 0.0,
            title_quality_score: 0.0,
            seo_score: 0.0,
            engagement_rate: 0.0,
            views_per_minute: metric.views_per_minute(),
            overall_score: 0.0,
            is_trending: false,
        };
        SpikeEvent {
            id: Uuid::new_v4(),
            video_id: "vid".to_string(),
            detected_at: now(),
            reasons: vec![SpikeReason::HighTrendScore {
                trend_score,
                threshold: 0.72,
            }],
            metrics_snapshot: MetricsSnapshot {
                metric,
                score,
                trend_score,
                content_type,
                title: "GPT agents take over".to_string(),
                url: "https://www.youtube.com/watch?v=vid".to_string(),
            },
        }
    }

    fn subscriber(
        filter: ContentTypeFilter,
        tier: ScoreTier,
        frequency: AlertFrequency,
        last: Option<DateTime<Utc>>,
    ) -> SubscriberPreference {
        SubscriberPreference {
            subscriber_id: Uuid::new_v4(),
            content_type_filter: filter,
            score_tier: tier,
            frequency,
            last_alert_sent_at: last,
        }
    }

    #[rstest]
    #[case(0.95, 0.0, Urgency::High)]
    #[case(0.5, 12_000.0, Urgency::High)]
    #[case(0.85, 0.0, Urgency::Medium)]
    #[case(0.5, 6_000.0, Urgency::Medium)]
    #[case(0.9, 10_000.0, Urgency::Medium)]
    #[case(0.8, 5_000.0, Urgency::Low)]
    fn urgency_tiers(#[case] trend: f64, #[case] vph: f64, #[case] expected: Urgency) {
        assert_eq!(classify_urgency(trend, vph), expected);
    }

    #[test]
    fn tier_cutoff_filters_subscribers() {
        let spike = event(0.85, 1_000, ContentType::Long);
        let subscribers = vec![
            subscriber(ContentTypeFilter::Any, ScoreTier::Conservative, AlertFrequency::Realtime, None),
            subscriber(ContentTypeFilter::Any, ScoreTier::Moderate, AlertFrequency::Realtime, None),
            subscriber(ContentTypeFilter::Any, ScoreTier::Aggressive, AlertFrequency::Realtime, None),
        ];

        let records = fanout(&spike, &subscribers, now());

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].subscriber_id, subscribers[1].subscriber_id);
        assert_eq!(records[1].subscriber_id, subscribers[2].subscriber_id);
        assert!(records.iter().all(|r| r.spike_event_id == spike.id));
    }

    #[test]
    fn content_filter_skips_mismatched_format() {
        let spike = event(0.95, 1_000, ContentType::Short);
        let subscribers = vec![
            subscriber(ContentTypeFilter::Long, ScoreTier::Aggressive, AlertFrequency::Realtime, None),
            subscriber(ContentTypeFilter::Shorts, ScoreTier::Aggressive, AlertFrequency::Realtime, None),
        ];

        let records = fanout(&spike, &subscribers, now());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].subscriber_id, subscribers[1].subscriber_id);
    }

    #[test]
    fn frequency_gates_recent_recipients() {
        let spike = event(0.95, 1_000, ContentType::Long);
        let subscribers = vec![
            subscriber(
                ContentTypeFilter::Any,
                ScoreTier::Aggressive,
                AlertFrequency::Hourly,
                Some(now() - Duration::minutes(30)),
            ),
            subscriber(
                ContentTypeFilter::Any,
                ScoreTier::Aggressive,
                AlertFrequency::Hourly,
                Some(now() - Duration::hours(1)),
            ),
            subscriber(
                ContentTypeFilter::Any,
                ScoreTier::Aggressive,
                AlertFrequency::Daily,
                Some(now() - Duration::hours(23)),
            ),
            subscriber(
                ContentTypeFilter::Any,
                ScoreTier::Aggressive,
                AlertFrequency::Realtime,
                Some(now() - Duration::seconds(1)),
            ),
        ];

        let records = fanout(&spike, &subscribers, now());
        let recipients: Vec<Uuid> = records.iter().map(|r| r.subscriber_id).collect();

        assert_eq!(
            recipients,
            vec![subscribers[1].subscriber_id, subscribers[3].subscriber_id]
        );
    }

    #[test]
    fn record_text_reflects_urgency() {
        // 15_000 views in one hour
        let spike = event(0.75, 15_000, ContentType::Long);
        let subscribers = vec![subscriber(
            ContentTypeFilter::Any,
            ScoreTier::Aggressive,
            AlertFrequency::Realtime,
            None,
        )];

        let records = fanout(&spike, &subscribers, now());

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.urgency, Urgency::High);
        assert!(record.title.starts_with("🔥"));
        assert!(record.title.contains("GPT agents take over"));
        assert!(record.message.contains("High trend score"));
        assert!(record.message.contains("https://www.youtube.com/watch?v=vid"));
        assert_eq!(record.created_at, now());
    }

    #[test]
    fn no_subscribers_yield_no_records() {
        let spike = event(0.99, 50_000, ContentType::Long);
        assert!(fanout(&spike, &[], now()).is_empty());
    }
}
