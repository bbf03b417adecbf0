//! One scan cycle: fetch, score, persist, detect spikes and fan out alerts.
//!
//! Every stage is best effort. A failing term, video or write is logged and
//! recorded in the [`ScanReport`]; only quota exhaustion stops further calls
//! to the video source, and the per-run timeout stops the run as a whole.
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration as StdDuration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clients::{SearchQuery, SourceError, VideoSource};
use crate::notify::{SubscriberPreference, fanout};
use crate::observability::Metrics;
use crate::scoring::{CompositeScorer, RawVideo, ScoreResult, ScoredVideo};
use crate::spike::{MetricsSnapshot, SpikeDetector, SpikeEvent, SpikeHistory};
use crate::store::TrendStore;
use crate::util::error::{ErrorKind, classify_error};
use crate::util::retry::RetryConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct ScanSettings {
    /// Only videos published within this window are requested.
    pub lookback: Duration,
    pub max_results: u32,
    pub max_concurrency: usize,
    pub timeout: StdDuration,
    pub clock_skew: Duration,
    /// Attempts per store write, including the first. Only retryable
    /// failures (pool timeouts, dropped connections) are attempted again.
    pub write_attempts: usize,
    pub write_backoff_base_ms: u64,
    pub write_backoff_cap_ms: u64,
}

impl ScanSettings {
    fn write_retry(&self) -> RetryConfig {
        RetryConfig::new(
            self.write_attempts.max(1),
            self.write_backoff_base_ms,
            self.write_backoff_cap_ms,
        )
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            lookback: Duration::hours(48),
            max_results: 25,
            max_concurrency: 4,
            timeout: StdDuration::from_secs(300),
            clock_skew: Duration::minutes(5),
            write_attempts: 3,
            write_backoff_base_ms: 100,
            write_backoff_cap_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedVideo {
    pub video_id: String,
    pub reason: String,
}

/// Outcome of one run. Returned even when the run times out.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub terms: usize,
    pub failed_terms: Vec<String>,
    pub skipped_terms: Vec<String>,
    pub quota_exhausted: bool,
    pub videos_fetched: usize,
    pub videos_scored: usize,
    pub trending: usize,
    pub skipped: Vec<SkippedVideo>,
    /// Every result scored this run, whether or not it was stored.
    pub scores: Vec<ScoreResult>,
    /// Scored videos whose upsert failed, kept so the caller can write them
    /// again later.
    pub unpersisted: Vec<ScoredVideo>,
    pub spikes: Vec<SpikeEvent>,
    pub spikes_suppressed: usize,
    pub detection_failures: usize,
    pub notifications_created: usize,
    pub persistence_failures: usize,
    pub timed_out: bool,
}

impl ScanReport {
    fn new(run_id: Uuid, terms: usize) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            terms,
            failed_terms: Vec::new(),
            skipped_terms: Vec::new(),
            quota_exhausted: false,
            videos_fetched: 0,
            videos_scored: 0,
            trending: 0,
            skipped: Vec::new(),
            scores: Vec::new(),
            unpersisted: Vec::new(),
            spikes: Vec::new(),
            spikes_suppressed: 0,
            detection_failures: 0,
            notifications_created: 0,
            persistence_failures: 0,
            timed_out: false,
        }
    }

    /// Every requested term failed or was skipped, so nothing was fetched.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.terms > 0 && self.failed_terms.len() + self.skipped_terms.len() >= self.terms
    }
}

/// Adapts the store's alert history to the detector.
struct StoreHistory<'a>(&'a dyn TrendStore);

#[async_trait]
impl SpikeHistory for StoreHistory<'_> {
    async fn last_spike_at(&self, video_id: &str) -> Result<Option<DateTime<Utc>>> {
        self.0.latest_spike_at(video_id).await
    }
}

pub struct ScanPipeline {
    source: Arc<dyn VideoSource>,
    store: Arc<dyn TrendStore>,
    scorer: CompositeScorer,
    detector: SpikeDetector,
    metrics: Arc<Metrics>,
    settings: ScanSettings,
}

#[allow(clippy::cast_precision_loss)]
impl ScanPipeline {
    #[must_use]
    pub fn new(
        source: Arc<dyn VideoSource>,
        store: Arc<dyn TrendStore>,
        scorer: CompositeScorer,
        detector: SpikeDetector,
        metrics: Arc<Metrics>,
        settings: ScanSettings,
    ) -> Self {
        Self {
            source,
            store,
            scorer,
            detector,
            metrics,
            settings,
        }
    }

    #[must_use]
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub async fn run(&self, run_id: Uuid, terms: &[String]) -> ScanReport {
        let mut report = ScanReport::new(run_id, terms.len());
        let timer = self.metrics.scan_duration.start_timer();
        self.metrics.active_scans.inc();

        info!(
            %run_id,
            source = self.source.name(),
            terms = terms.len(),
            "scan started"
        );

        let outcome =
            tokio::time::timeout(self.settings.timeout, self.execute(terms, &mut report)).await;
        if outcome.is_err() {
            report.timed_out = true;
            self.metrics.scans_timed_out.inc();
            warn!(
                %run_id,
                timeout_secs = self.settings.timeout.as_secs(),
                "scan timed out, returning partial report"
            );
        } else if report.is_failure() {
            self.metrics.scans_failed.inc();
        } else {
            self.metrics.scans_completed.inc();
        }

        self.metrics.active_scans.dec();
        timer.observe_duration();
        report.finished_at = Some(Utc::now());

        info!(
            %run_id,
            videos_fetched = report.videos_fetched,
            videos_scored = report.videos_scored,
            spikes = report.spikes.len(),
            notifications = report.notifications_created,
            quota_exhausted = report.quota_exhausted,
            timed_out = report.timed_out,
            "trendai.event" = "scan_finished",
            "scan finished"
        );
        report
    }

    async fn execute(&self, terms: &[String], report: &mut ScanReport) {
        let videos = self.fetch(terms, report).await;
        let observed_at = Utc::now();

        let mut snapshots = Vec::with_capacity(videos.len());
        for raw in &videos {
            if let Some(scored) = self.score_and_persist(raw, observed_at, report).await {
                snapshots.push(MetricsSnapshot::from(&scored));
            }
        }

        let detection = self
            .detector
            .detect_batch(&snapshots, &StoreHistory(self.store.as_ref()))
            .await;
        report.spikes_suppressed += detection.suppressed.len();
        report.detection_failures += detection.failures.len();
        self.metrics
            .spikes_suppressed
            .inc_by(detection.suppressed.len() as f64);
        self.metrics
            .spike_evaluation_failures
            .inc_by(detection.failures.len() as f64);

        if detection.events.is_empty() {
            return;
        }

        let mut subscribers = match self.store.list_subscribers().await {
            Ok(subscribers) => subscribers,
            Err(error) => {
                warn!(error = %error, "failed to load subscribers, alerts will not fan out");
                self.record_persistence_failure(report);
                Vec::new()
            }
        };

        for event in detection.events {
            self.metrics.spikes_detected.inc();
            let inserted = self
                .with_write_retry("insert_spike_event", || {
                    self.store.insert_spike_event(&event)
                })
                .await;
            if let Err(error) = inserted {
                warn!(
                    video_id = %event.video_id,
                    error = %error,
                    error_kind = classify_error(&error).as_str(),
                    "failed to persist spike event, skipping fanout"
                );
                self.record_persistence_failure(report);
                report.spikes.push(event);
                continue;
            }
            self.notify_subscribers(&event, &mut subscribers, observed_at, report)
                .await;
            report.spikes.push(event);
        }
    }

    /// Fetches every term with bounded concurrency and deduplicates video ids.
    async fn fetch(&self, terms: &[String], report: &mut ScanReport) -> Vec<RawVideo> {
        let quota_exhausted = AtomicBool::new(false);
        let published_after = Utc::now()
            .checked_sub_signed(self.settings.lookback)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let concurrency = self.settings.max_concurrency.max(1);

        let mut results = stream::iter(terms.iter().cloned())
            .map(|term| {
                let quota_exhausted = &quota_exhausted;
                async move {
                    if quota_exhausted.load(Ordering::SeqCst) {
                        return (term, None);
                    }
                    let query = SearchQuery {
                        term: term.clone(),
                        published_after,
                        max_results: self.settings.max_results,
                    };
                    let timer = self.metrics.fetch_duration.start_timer();
                    let result = self.source.search(&query).await;
                    timer.observe_duration();
                    if matches!(&result, Err(error) if error.is_quota_exhausted()) {
                        quota_exhausted.store(true, Ordering::SeqCst);
                    }
                    (term, Some(result))
                }
            })
            .buffer_unordered(concurrency);

        let mut seen = HashSet::new();
        let mut videos = Vec::new();
        while let Some((term, result)) = results.next().await {
            match result {
                None => report.skipped_terms.push(term),
                Some(Ok(batch)) => {
                    report.videos_fetched += batch.len();
                    self.metrics.videos_fetched.inc_by(batch.len() as f64);
                    videos.extend(
                        batch
                            .into_iter()
                            .filter(|video| seen.insert(video.id.clone())),
                    );
                }
                Some(Err(error)) => self.record_source_error(&term, &error, report),
            }
        }
        drop(results);

        report.quota_exhausted = quota_exhausted.load(Ordering::SeqCst);
        if report.quota_exhausted {
            self.metrics.quota_exhausted.inc();
        }
        videos
    }

    fn record_source_error(&self, term: &str, error: &SourceError, report: &mut ScanReport) {
        self.metrics.source_errors.inc();
        if error.is_quota_exhausted() {
            warn!(term, error = %error, "video source quota exhausted, halting further fetches");
        } else {
            warn!(term, error = %error, "video source search failed, continuing");
        }
        report.failed_terms.push(term.to_string());
    }

    async fn score_and_persist(
        &self,
        raw: &RawVideo,
        observed_at: DateTime<Utc>,
        report: &mut ScanReport,
    ) -> Option<ScoredVideo> {
        let scored = match self
            .scorer
            .score_video(raw, observed_at, self.settings.clock_skew)
        {
            Ok(scored) => scored,
            Err(error) => {
                warn!(video_id = %raw.id, error = %error, "skipping invalid video");
                self.metrics.videos_skipped.inc();
                report.skipped.push(SkippedVideo {
                    video_id: raw.id.clone(),
                    reason: error.to_string(),
                });
                return None;
            }
        };

        self.metrics.videos_scored.inc();
        report.videos_scored += 1;
        if scored.score.is_trending {
            report.trending += 1;
        }
        report.scores.push(scored.score.clone());

        let upserted = self
            .with_write_retry("upsert_video_score", || {
                self.store.upsert_video_score(&scored)
            })
            .await;
        if let Err(error) = upserted {
            warn!(
                video_id = %raw.id,
                error = %error,
                error_kind = classify_error(&error).as_str(),
                "failed to persist video score"
            );
            self.record_persistence_failure(report);
            report.unpersisted.push(scored.clone());
        }
        Some(scored)
    }

    async fn notify_subscribers(
        &self,
        event: &SpikeEvent,
        subscribers: &mut [SubscriberPreference],
        now: DateTime<Utc>,
        report: &mut ScanReport,
    ) {
        let records = fanout(event, subscribers, now);
        if records.is_empty() {
            return;
        }

        let inserted = self
            .with_write_retry("insert_notifications", || {
                self.store.insert_notifications(&records)
            })
            .await;
        if let Err(error) = inserted {
            warn!(
                video_id = %event.video_id,
                error = %error,
                error_kind = classify_error(&error).as_str(),
                "failed to persist notifications"
            );
            self.record_persistence_failure(report);
            return;
        }
        report.notifications_created += records.len();
        self.metrics
            .notifications_created
            .inc_by(records.len() as f64);

        let notified: Vec<Uuid> = records.iter().map(|r| r.subscriber_id).collect();
        let marked = self
            .with_write_retry("mark_subscribers_notified", || {
                self.store.mark_subscribers_notified(&notified, now)
            })
            .await;
        if let Err(error) = marked {
            warn!(
                error = %error,
                error_kind = classify_error(&error).as_str(),
                "failed to update last_alert_sent_at"
            );
            self.record_persistence_failure(report);
        }
        // keep frequency gating correct for later events in this run
        for subscriber in subscribers.iter_mut() {
            if notified.contains(&subscriber.subscriber_id) {
                subscriber.last_alert_sent_at = Some(now);
            }
        }
    }

    /// Runs one store write, repeating it with jittered backoff while the
    /// failure classifies as retryable and attempts remain.
    async fn with_write_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        mut write: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let retry = self.settings.write_retry();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match write().await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    let retryable = classify_error(&error) == ErrorKind::Retryable;
                    if !retryable || !retry.can_retry(attempt) {
                        return Err(error);
                    }
                    let delay = retry.delay_for_attempt(attempt);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "store write failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn record_persistence_failure(&self, report: &mut ScanReport) {
        self.metrics.persistence_failures.inc();
        report.persistence_failures += 1;
    }
}
