//! The 0-1 trend score consumed by spike detection and alert fanout.
//!
//! This is deliberately separate from [`overall_score`](super::overall_score):
//! the two formulas weigh different signals and are not interchangeable.

use super::types::VideoMetric;

const VIEW_SATURATION: f64 = 1_000_000.0;
const ENGAGEMENT_RATE_CAP: f64 = 0.3;
const VIEW_CAP: f64 = 0.4;

/// Engagement on a 0-100 scale: ten points per engagement percent.
#[must_use]
pub fn engagement_score(metric: &VideoMetric) -> f64 {
    (metric.engagement_rate() * 10.0).clamp(0.0, 100.0)
}

/// `min(1, engagement_score/100 + min(rate/10, 0.3) + min(views/1M, 0.4))`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn trend_score(metric: &VideoMetric) -> f64 {
    let engagement_component = engagement_score(metric) / 100.0;
    let rate_component = (metric.engagement_rate() / 10.0).min(ENGAGEMENT_RATE_CAP);
    let view_component = (metric.view_count() as f64 / VIEW_SATURATION).min(VIEW_CAP);

    (engagement_component + rate_component + view_component).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn metric(views: u64, likes: u64) -> VideoMetric {
        let observed = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        VideoMetric::new("vid", views, likes, 0, observed - Duration::hours(2), observed)
    }

    #[test]
    fn unwatched_video_scores_zero() {
        assert!(trend_score(&metric(0, 0)).abs() < f64::EPSILON);
    }

    #[test]
    fn components_add_up_below_cap() {
        // 2% engagement on 100k views: 0.2 + 0.2 + 0.1
        let score = trend_score(&metric(100_000, 2_000));
        assert!((score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn view_component_is_capped() {
        // 1% engagement on 5M views: 0.1 + 0.1 + 0.4
        let score = trend_score(&metric(5_000_000, 50_000));
        assert!((score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn score_never_exceeds_one() {
        let score = trend_score(&metric(2_000_000, 400_000));
        assert!((score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn engagement_score_is_bounded() {
        assert!((engagement_score(&metric(100, 50)) - 100.0).abs() < f64::EPSILON);
        assert!((engagement_score(&metric(1_000, 25)) - 25.0).abs() < 1e-9);
    }
}
