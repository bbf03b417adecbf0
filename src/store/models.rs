use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::scoring::ScoredVideo;

/// A row of the `videos` table as served to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct TrendingVideo {
    pub video_id: String,
    pub title: String,
    pub channel_name: String,
    pub url: String,
    pub content_type: String,
    pub category: String,
    pub published_at: DateTime<Utc>,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub engagement_rate: f64,
    pub views_per_minute: f64,
    pub overall_score: f64,
    pub trend_score: f64,
    pub is_trending: bool,
    pub last_updated: DateTime<Utc>,
}

impl From<&ScoredVideo> for TrendingVideo {
    fn from(scored: &ScoredVideo) -> Self {
        Self {
            video_id: scored.score.video_id.clone(),
            title: scored.video.title.clone(),
            channel_name: scored.video.channel_name.clone(),
            url: scored.video.url.clone(),
            content_type: scored.content_type.as_str().to_string(),
            category: scored.category.clone(),
            published_at: scored.metric.published_at(),
            view_count: to_i64(scored.metric.view_count()),
            like_count: to_i64(scored.metric.like_count()),
            comment_count: to_i64(scored.metric.comment_count()),
            engagement_rate: scored.score.engagement_rate,
            views_per_minute: scored.score.views_per_minute,
            overall_score: scored.score.overall_score,
            trend_score: scored.trend_score,
            is_trending: scored.score.is_trending,
            last_updated: scored.score.observed_at,
        }
    }
}

/// Raw `alert_subscriptions` row; enum columns are parsed afterwards.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct SubscriptionRow {
    pub(crate) subscriber_id: Uuid,
    pub(crate) content_type_filter: String,
    pub(crate) score_threshold: String,
    pub(crate) frequency: String,
    pub(crate) last_alert_sent_at: Option<DateTime<Utc>>,
}

pub(crate) fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
