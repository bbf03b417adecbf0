use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::scoring::ContentType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {field} value: {value}")]
pub struct PreferenceParseError {
    pub field: &'static str,
    pub value: String,
}

/// Which content formats a subscriber wants to hear about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentTypeFilter {
    #[default]
    Any,
    Shorts,
    Long,
}

impl ContentTypeFilter {
    #[must_use]
    pub fn accepts(self, content_type: ContentType) -> bool {
        match self {
            ContentTypeFilter::Any => true,
            ContentTypeFilter::Shorts => content_type == ContentType::Short,
            ContentTypeFilter::Long => content_type == ContentType::Long,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentTypeFilter::Any => "any",
            ContentTypeFilter::Shorts => "shorts",
            ContentTypeFilter::Long => "long",
        }
    }
}

impl FromStr for ContentTypeFilter {
    type Err = PreferenceParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "any" | "all" | "" => Ok(ContentTypeFilter::Any),
            "shorts" | "short" => Ok(ContentTypeFilter::Shorts),
            "long" | "long_form" => Ok(ContentTypeFilter::Long),
            _ => Err(PreferenceParseError {
                field: "content_type_filter",
                value: value.to_string(),
            }),
        }
    }
}

/// Named sensitivity tier mapped onto the 0-1 trend scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTier {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

impl ScoreTier {
    /// Minimum trend score a spike needs to reach subscribers on this tier.
    #[must_use]
    pub fn cutoff(self) -> f64 {
        match self {
            ScoreTier::Conservative => 0.90,
            ScoreTier::Moderate => 0.80,
            ScoreTier::Aggressive => 0.70,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreTier::Conservative => "conservative",
            ScoreTier::Moderate => "moderate",
            ScoreTier::Aggressive => "aggressive",
        }
    }
}

impl FromStr for ScoreTier {
    type Err = PreferenceParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "conservative" => Ok(ScoreTier::Conservative),
            "moderate" => Ok(ScoreTier::Moderate),
            "aggressive" => Ok(ScoreTier::Aggressive),
            _ => Err(PreferenceParseError {
                field: "score_threshold",
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertFrequency {
    #[default]
    Realtime,
    Hourly,
    Daily,
}

impl AlertFrequency {
    /// Minimum gap between two alerts, `None` for realtime delivery.
    #[must_use]
    pub fn min_interval(self) -> Option<Duration> {
        match self {
            AlertFrequency::Realtime => None,
            AlertFrequency::Hourly => Some(Duration::hours(1)),
            AlertFrequency::Daily => Some(Duration::hours(24)),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AlertFrequency::Realtime => "realtime",
            AlertFrequency::Hourly => "hourly",
            AlertFrequency::Daily => "daily",
        }
    }
}

impl FromStr for AlertFrequency {
    type Err = PreferenceParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "realtime" | "instant" => Ok(AlertFrequency::Realtime),
            "hourly" => Ok(AlertFrequency::Hourly),
            "daily" => Ok(AlertFrequency::Daily),
            _ => Err(PreferenceParseError {
                field: "frequency",
                value: value.to_string(),
            }),
        }
    }
}

/// Read-only view of one subscription row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriberPreference {
    pub subscriber_id: Uuid,
    #[serde(default)]
    pub content_type_filter: ContentTypeFilter,
    #[serde(default)]
    pub score_tier: ScoreTier,
    #[serde(default)]
    pub frequency: AlertFrequency,
    #[serde(default)]
    pub last_alert_sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl Urgency {
    #[must_use]
    pub fn emoji(self) -> &'static str {
        match self {
            Urgency::High => "🔥",
            Urgency::Medium => "🚀",
            Urgency::Low => "⚡",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::High => "high",
            Urgency::Medium => "medium",
            Urgency::Low => "low",
        }
    }

    pub(crate) fn headline(self) -> &'static str {
        match self {
            Urgency::High => "Viral AI video",
            Urgency::Medium => "Fast-rising AI video",
            Urgency::Low => "New AI spike",
        }
    }
}

/// One alert addressed to one subscriber.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub subscriber_id: Uuid,
    pub video_id: String,
    pub spike_event_id: Uuid,
    pub urgency: Urgency,
    pub title: String,
    pub message: String,
    pub trend_score: f64,
    pub created_at: DateTime<Utc>,
}
