//! Spike thresholds.

use chrono::Duration;

use crate::scoring::ContentType;

/// Thresholds and cooldown used by the [`SpikeDetector`](super::SpikeDetector).
///
/// The per-format engagement thresholds have no documented derivation, so
/// they are plain configuration rather than constants.
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeConfig {
    /// Engagement rate (percent) that makes a short-form video spike.
    pub short_form_engagement_threshold: f64,
    /// Engagement rate (percent) that makes a long-form video spike.
    pub long_form_engagement_threshold: f64,
    /// Trend score (0-1) that must be exceeded.
    pub trend_score_threshold: f64,
    /// Views per hour that must be exceeded by a fresh video.
    pub views_per_hour_threshold: f64,
    /// Only videos younger than this are checked for view velocity.
    pub fresh_video_max_age: Duration,
    /// Minimum distance between two alerts for the same video.
    pub suppression_window: Duration,
}

impl SpikeConfig {
    #[must_use]
    pub fn engagement_threshold(&self, content_type: ContentType) -> f64 {
        match content_type {
            ContentType::Short => self.short_form_engagement_threshold,
            ContentType::Long => self.long_form_engagement_threshold,
        }
    }
}

impl Default for SpikeConfig {
    fn default() -> Self {
        Self {
            short_form_engagement_threshold: 2.5,
            long_form_engagement_threshold: 1.2,
            trend_score_threshold: 0.72,
            views_per_hour_threshold: 1_000.0,
            fresh_video_max_age: Duration::hours(24),
            suppression_window: Duration::hours(6),
        }
    }
}
