use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::scoring::{ContentType, ScoreResult, ScoredVideo, VideoMetric};

/// Consistent view of one video at a single observation time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub metric: VideoMetric,
    pub score: ScoreResult,
    pub trend_score: f64,
    pub content_type: ContentType,
    pub title: String,
    pub url: String,
}

impl MetricsSnapshot {
    #[must_use]
    pub fn video_id(&self) -> &str {
        self.metric.video_id()
    }

    #[must_use]
    pub fn observed_at(&self) -> DateTime<Utc> {
        self.metric.observed_at()
    }

    /// Rejects snapshots whose parts disagree or whose numbers are unusable.
    ///
    /// # Errors
    /// Returns [`SpikeError`] describing the first inconsistency found.
    pub fn validate(&self) -> Result<(), SpikeError> {
        if self.score.video_id != self.metric.video_id()
            || self.score.observed_at != self.metric.observed_at()
        {
            return Err(SpikeError::InconsistentSnapshot {
                video_id: self.metric.video_id().to_string(),
            });
        }
        let numbers = [
            ("trend_score", self.trend_score),
            ("engagement_rate", self.metric.engagement_rate()),
            ("views_per_minute", self.metric.views_per_minute()),
            ("overall_score", self.score.overall_score),
        ];
        for (field, value) in numbers {
            if !value.is_finite() {
                return Err(SpikeError::NonFiniteMetric {
                    video_id: self.metric.video_id().to_string(),
                    field,
                });
            }
        }
        Ok(())
    }
}

impl From<&ScoredVideo> for MetricsSnapshot {
    fn from(scored: &ScoredVideo) -> Self {
        Self {
            metric: scored.metric.clone(),
            score: scored.score.clone(),
            trend_score: scored.trend_score,
            content_type: scored.content_type,
            title: scored.video.title.clone(),
            url: scored.video.url.clone(),
        }
    }
}

/// One triggering condition, in detection order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpikeReason {
    HighEngagement {
        engagement_rate: f64,
        threshold: f64,
        content_type: ContentType,
    },
    HighTrendScore {
        trend_score: f64,
        threshold: f64,
    },
    RapidViewGrowth {
        views_per_hour: f64,
        threshold: f64,
        age_hours: f64,
    },
}

impl SpikeReason {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            SpikeReason::HighEngagement { .. } => "high_engagement",
            SpikeReason::HighTrendScore { .. } => "high_trend_score",
            SpikeReason::RapidViewGrowth { .. } => "rapid_view_growth",
        }
    }
}

impl std::fmt::Display for SpikeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpikeReason::HighEngagement {
                engagement_rate,
                threshold,
                content_type,
            } => write!(
                f,
                "High engagement: {engagement_rate:.2}% (>= {threshold:.2}% for {content_type}-form)"
            ),
            SpikeReason::HighTrendScore {
                trend_score,
                threshold,
            } => write!(f, "High trend score: {trend_score:.2} (> {threshold:.2})"),
            SpikeReason::RapidViewGrowth {
                views_per_hour,
                threshold,
                age_hours,
            } => write!(
                f,
                "Rapid view growth: {views_per_hour:.0} views/hour (> {threshold:.0}) within {age_hours:.1}h of publishing"
            ),
        }
    }
}

/// An emitted spike alert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpikeEvent {
    pub id: Uuid,
    pub video_id: String,
    pub detected_at: DateTime<Utc>,
    pub reasons: Vec<SpikeReason>,
    pub metrics_snapshot: MetricsSnapshot,
}

impl SpikeEvent {
    #[must_use]
    pub fn trend_score(&self) -> f64 {
        self.metrics_snapshot.trend_score
    }

    #[must_use]
    pub fn views_per_hour(&self) -> f64 {
        self.metrics_snapshot.metric.views_per_hour()
    }

    #[must_use]
    pub fn reason_messages(&self) -> Vec<String> {
        self.reasons.iter().map(ToString::to_string).collect()
    }
}

/// Per-video detector state after evaluating one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpikeState {
    Normal,
    Spiking,
    Suppressed { until: DateTime<Utc> },
}

impl SpikeState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SpikeState::Normal => "normal",
            SpikeState::Spiking => "spiking",
            SpikeState::Suppressed { .. } => "suppressed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpikeOutcome {
    pub state: SpikeState,
    pub reasons: Vec<SpikeReason>,
    pub event: Option<SpikeEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpikeError {
    #[error("snapshot for {video_id} mixes different observations")]
    InconsistentSnapshot { video_id: String },
    #[error("snapshot for {video_id} has a non-finite {field}")]
    NonFiniteMetric {
        video_id: String,
        field: &'static str,
    },
}
