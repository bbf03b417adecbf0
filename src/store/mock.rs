// In-memory TrendStore for pipeline and router tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::dao::TrendStore;
use super::models::TrendingVideo;
use crate::notify::{NotificationRecord, SubscriberPreference};
use crate::scoring::ScoredVideo;
use crate::spike::SpikeEvent;

#[derive(Default)]
struct Tables {
    videos: HashMap<String, ScoredVideo>,
    spikes: Vec<SpikeEvent>,
    subscribers: Vec<SubscriberPreference>,
    notifications: Vec<NotificationRecord>,
}

#[derive(Default)]
pub(crate) struct MemoryTrendStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
    transient_write_failures: AtomicUsize,
    write_calls: AtomicUsize,
    fail_ping: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryTrendStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_subscribers(subscribers: Vec<SubscriberPreference>) -> Self {
        let store = Self::default();
        store.tables().subscribers = subscribers;
        store
    }

    pub(crate) fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// The next `count` writes fail with a pool timeout, then writes succeed.
    pub(crate) fn fail_next_writes(&self, count: usize) {
        self.transient_write_failures.store(count, Ordering::SeqCst);
    }

    pub(crate) fn write_calls(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn set_fail_ping(&self, fail: bool) {
        self.fail_ping.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn record_spike(&self, event: SpikeEvent) {
        self.tables().spikes.push(event);
    }

    pub(crate) fn insert_video(&self, scored: ScoredVideo) {
        self.tables()
            .videos
            .insert(scored.score.video_id.clone(), scored);
    }

    pub(crate) fn videos(&self) -> Vec<ScoredVideo> {
        self.tables().videos.values().cloned().collect()
    }

    pub(crate) fn spikes(&self) -> Vec<SpikeEvent> {
        self.tables().spikes.clone()
    }

    pub(crate) fn subscribers(&self) -> Vec<SubscriberPreference> {
        self.tables().subscribers.clone()
    }

    pub(crate) fn notifications(&self) -> Vec<NotificationRecord> {
        self.tables().notifications.clone()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().expect("memory store mutex")
    }

    fn check_write(&self) -> Result<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        let transient = self.transient_write_failures.fetch_update(
            Ordering::SeqCst,
            Ordering::SeqCst,
            |remaining| remaining.checked_sub(1),
        );
        if transient.is_ok() {
            return Err(sqlx::Error::PoolTimedOut.into());
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("simulated write failure");
        }
        Ok(())
    }
}

#[async_trait]
impl TrendStore for MemoryTrendStore {
    async fn ping(&self) -> Result<()> {
        if self.fail_ping.load(Ordering::SeqCst) {
            bail!("simulated connection failure");
        }
        Ok(())
    }

    async fn upsert_video_score(&self, scored: &ScoredVideo) -> Result<()> {
        self.check_write()?;
        self.insert_video(scored.clone());
        Ok(())
    }

    async fn latest_spike_at(&self, video_id: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .tables()
            .spikes
            .iter()
            .filter(|event| event.video_id == video_id)
            .map(|event| event.detected_at)
            .max())
    }

    async fn insert_spike_event(&self, event: &SpikeEvent) -> Result<()> {
        self.check_write()?;
        self.record_spike(event.clone());
        Ok(())
    }

    async fn list_subscribers(&self) -> Result<Vec<SubscriberPreference>> {
        Ok(self.subscribers())
    }

    async fn insert_notifications(&self, records: &[NotificationRecord]) -> Result<u64> {
        self.check_write()?;
        self.tables().notifications.extend_from_slice(records);
        Ok(records.len() as u64)
    }

    async fn mark_subscribers_notified(
        &self,
        subscriber_ids: &[Uuid],
        sent_at: DateTime<Utc>,
    ) -> Result<()> {
        self.check_write()?;
        for subscriber in &mut self.tables().subscribers {
            if subscriber_ids.contains(&subscriber.subscriber_id) {
                subscriber.last_alert_sent_at = Some(sent_at);
            }
        }
        Ok(())
    }

    async fn list_trending(&self, limit: i64) -> Result<Vec<TrendingVideo>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            bail!("simulated read failure");
        }
        let mut rows: Vec<TrendingVideo> = self
            .tables()
            .videos
            .values()
            .map(TrendingVideo::from)
            .collect();
        rows.sort_by(|a, b| b.overall_score.total_cmp(&a.overall_score));
        rows.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(rows)
    }
}
