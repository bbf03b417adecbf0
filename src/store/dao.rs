//! TrendStore trait - persistence boundary of the scan pipeline

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::TrendingVideo;
use crate::notify::{NotificationRecord, SubscriberPreference};
use crate::scoring::ScoredVideo;
use crate::spike::SpikeEvent;

#[async_trait]
pub trait TrendStore: Send + Sync {
    /// Cheap connectivity check used by the readiness probe.
    async fn ping(&self) -> Result<()>;

    /// Creates the tables this worker writes to when they are missing.
    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    /// Inserts or refreshes the `videos` row for one scored observation.
    async fn upsert_video_score(&self, scored: &ScoredVideo) -> Result<()>;

    /// Detection time of the most recent alert for `video_id`.
    async fn latest_spike_at(&self, video_id: &str) -> Result<Option<DateTime<Utc>>>;

    async fn insert_spike_event(&self, event: &SpikeEvent) -> Result<()>;

    /// Active subscriptions. Rows with unknown enum values are skipped.
    async fn list_subscribers(&self) -> Result<Vec<SubscriberPreference>>;

    /// Returns the number of rows written.
    async fn insert_notifications(&self, records: &[NotificationRecord]) -> Result<u64>;

    async fn mark_subscribers_notified(
        &self,
        subscriber_ids: &[Uuid],
        sent_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Highest scoring videos first.
    async fn list_trending(&self, limit: i64) -> Result<Vec<TrendingVideo>>;
}
