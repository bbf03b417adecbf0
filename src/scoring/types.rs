//! Core scoring types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Videos shorter than this are treated as short-form.
pub const SHORT_FORM_MAX_SECONDS: u32 = 60;

/// Raw video metadata as delivered by a video source.
///
/// Counts are signed so that bad upstream data can be rejected by
/// [`normalize`](super::normalize) instead of silently wrapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVideo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub channel_name: String,
    pub published_at: DateTime<Utc>,
    pub view_count: i64,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub comment_count: i64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub duration_seconds: Option<u32>,
}

impl RawVideo {
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        ContentType::infer(&self.url, self.duration_seconds)
    }
}

/// Short-form vs. long-form content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Short,
    Long,
}

impl ContentType {
    /// Shorts are recognised by their URL or by a duration under one minute.
    #[must_use]
    pub fn infer(url: &str, duration_seconds: Option<u32>) -> Self {
        if url.contains("/shorts/") {
            return ContentType::Short;
        }
        match duration_seconds {
            // zero means the length is unknown, as for live broadcasts
            Some(seconds) if (1..SHORT_FORM_MAX_SECONDS).contains(&seconds) => {
                ContentType::Short
            }
            _ => ContentType::Long,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Short => "short",
            ContentType::Long => "long",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point-in-time observation of one video with its derived rates.
///
/// The derived fields are computed once in [`VideoMetric::new`] and are never
/// set independently, so `age_minutes >= 1` and all rates are finite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoMetric {
    video_id: String,
    view_count: u64,
    like_count: u64,
    comment_count: u64,
    published_at: DateTime<Utc>,
    observed_at: DateTime<Utc>,
    age_minutes: u64,
    views_per_minute: f64,
    engagement_rate: f64,
}

impl VideoMetric {
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
    pub fn new(
        video_id: impl Into<String>,
        view_count: u64,
        like_count: u64,
        comment_count: u64,
        published_at: DateTime<Utc>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        let elapsed_minutes = (observed_at - published_at).num_seconds().div_euclid(60);
        let age_minutes = elapsed_minutes.max(1) as u64;
        let views_per_minute = view_count as f64 / age_minutes as f64;
        let engagement_rate = if view_count == 0 {
            0.0
        } else {
            (like_count.saturating_add(comment_count)) as f64 * 100.0 / view_count as f64
        };

        Self {
            video_id: video_id.into(),
            view_count,
            like_count,
            comment_count,
            published_at,
            observed_at,
            age_minutes,
            views_per_minute,
            engagement_rate,
        }
    }

    #[must_use]
    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    #[must_use]
    pub fn view_count(&self) -> u64 {
        self.view_count
    }

    #[must_use]
    pub fn like_count(&self) -> u64 {
        self.like_count
    }

    #[must_use]
    pub fn comment_count(&self) -> u64 {
        self.comment_count
    }

    #[must_use]
    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    #[must_use]
    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    /// Whole minutes since publication, never below 1.
    #[must_use]
    pub fn age_minutes(&self) -> u64 {
        self.age_minutes
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn age_hours(&self) -> f64 {
        self.age_minutes as f64 / 60.0
    }

    #[must_use]
    pub fn views_per_minute(&self) -> f64 {
        self.views_per_minute
    }

    #[must_use]
    pub fn views_per_hour(&self) -> f64 {
        self.views_per_minute * 60.0
    }

    /// Likes plus comments per hundred views; 0 for unwatched videos.
    #[must_use]
    pub fn engagement_rate(&self) -> f64 {
        self.engagement_rate
    }
}

/// Sub-scores and the weighted composite for one observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub video_id: String,
    pub observed_at: DateTime<Utc>,
    pub velocity_score: f64,
    pub novelty_score: f64,
    pub title_quality_score: f64,
    pub seo_score: f64,
    pub engagement_rate: f64,
    pub views_per_minute: f64,
    pub overall_score: f64,
    pub is_trending: bool,
}

/// Everything the pipeline knows about one video after scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredVideo {
    pub video: RawVideo,
    pub metric: VideoMetric,
    pub score: ScoreResult,
    pub trend_score: f64,
    pub content_type: ContentType,
    pub category: String,
}

/// Rejections raised while normalizing raw input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoringError {
    #[error("video id must not be empty")]
    MissingVideoId,
    #[error("{field} must be non-negative, got {value}")]
    NegativeCount { field: &'static str, value: i64 },
    #[error("published_at {published_at} is later than observation time {now}")]
    PublishedInFuture {
        published_at: DateTime<Utc>,
        now: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn at(minutes_after: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes_after)
    }

    #[test]
    fn metric_derives_rates_from_counts() {
        let metric = VideoMetric::new("vid", 120_000, 6_000, 1_200, at(0), at(60));

        assert_eq!(metric.age_minutes(), 60);
        assert!((metric.views_per_minute() - 2000.0).abs() < f64::EPSILON);
        assert!((metric.engagement_rate() - 6.0).abs() < f64::EPSILON);
        assert!((metric.views_per_hour() - 120_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn metric_age_floors_at_one_minute() {
        let metric = VideoMetric::new("vid", 10, 0, 0, at(0), at(0) + Duration::seconds(20));
        assert_eq!(metric.age_minutes(), 1);

        let future = VideoMetric::new("vid", 10, 0, 0, at(5), at(0));
        assert_eq!(future.age_minutes(), 1);
    }

    #[test]
    fn metric_age_truncates_partial_minutes() {
        let metric = VideoMetric::new("vid", 10, 0, 0, at(0), at(2) + Duration::seconds(59));
        assert_eq!(metric.age_minutes(), 2);
    }

    #[test]
    fn zero_views_have_zero_engagement() {
        let metric = VideoMetric::new("vid", 0, 5, 5, at(0), at(30));
        assert!(metric.engagement_rate().abs() < f64::EPSILON);
        assert!(metric.views_per_minute().abs() < f64::EPSILON);
    }

    #[rstest]
    #[case("https://www.youtube.com/shorts/abc", None, ContentType::Short)]
    #[case("https://www.youtube.com/watch?v=abc", Some(59), ContentType::Short)]
    #[case("https://www.youtube.com/watch?v=abc", Some(60), ContentType::Long)]
    #[case("https://www.youtube.com/watch?v=abc", None, ContentType::Long)]
    #[case("https://www.youtube.com/watch?v=abc", Some(0), ContentType::Long)]
    fn content_type_inference(
        #[case] url: &str,
        #[case] duration: Option<u32>,
        #[case] expected: ContentType,
    ) {
        assert_eq!(ContentType::infer(url, duration), expected);
    }
}
