use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::pipeline::{ScanPipeline, ScanReport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanJob {
    pub run_id: Uuid,
    pub terms: Vec<String>,
}

impl ScanJob {
    #[must_use]
    pub fn new(run_id: Uuid, terms: Vec<String>) -> Self {
        Self { run_id, terms }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("a scan is already running")]
    AlreadyRunning,
    #[error("no search terms configured")]
    NoTerms,
}

/// Serializes scans: at most one run is in flight per process.
#[derive(Clone)]
pub struct Scheduler {
    pipeline: Arc<ScanPipeline>,
    default_terms: Arc<Vec<String>>,
    running: Arc<Mutex<()>>,
}

impl Scheduler {
    #[must_use]
    pub fn new(pipeline: Arc<ScanPipeline>, default_terms: Vec<String>) -> Self {
        Self {
            pipeline,
            default_terms: Arc::new(default_terms),
            running: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn default_terms(&self) -> &[String] {
        &self.default_terms
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    /// Runs `job` to completion unless another scan holds the lock.
    ///
    /// # Errors
    /// [`SchedulerError::AlreadyRunning`] when a scan is in flight and
    /// [`SchedulerError::NoTerms`] when `job` has nothing to search for.
    pub async fn run_scan(&self, job: ScanJob) -> Result<ScanReport, SchedulerError> {
        if job.terms.is_empty() {
            return Err(SchedulerError::NoTerms);
        }
        let _guard = self
            .running
            .try_lock()
            .map_err(|_| SchedulerError::AlreadyRunning)?;

        tracing::info!(run_id = %job.run_id, terms = job.terms.len(), "running trend scan");
        Ok(self.pipeline.run(job.run_id, &job.terms).await)
    }

    /// Claims the run lock and executes `job` on a background task.
    ///
    /// # Errors
    /// Same as [`Scheduler::run_scan`], reported before anything is spawned.
    pub fn spawn_scan(
        &self,
        job: ScanJob,
    ) -> Result<tokio::task::JoinHandle<ScanReport>, SchedulerError> {
        if job.terms.is_empty() {
            return Err(SchedulerError::NoTerms);
        }
        let guard = Arc::clone(&self.running)
            .try_lock_owned()
            .map_err(|_| SchedulerError::AlreadyRunning)?;
        let pipeline = Arc::clone(&self.pipeline);

        Ok(tokio::spawn(async move {
            let _guard = guard;
            tracing::info!(run_id = %job.run_id, terms = job.terms.len(), "running trend scan");
            pipeline.run(job.run_id, &job.terms).await
        }))
    }

    #[cfg(test)]
    pub(crate) fn hold_run_lock(&self) -> tokio::sync::OwnedMutexGuard<()> {
        Arc::clone(&self.running)
            .try_lock_owned()
            .expect("run lock is free")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::SyntheticVideoSource;
    use crate::observability::Telemetry;
    use crate::pipeline::ScanSettings;
    use crate::scoring::{CompositeScorer, ScoringKeywords};
    use crate::spike::SpikeDetector;
    use crate::store::mock::MemoryTrendStore;

    fn scheduler() -> Scheduler {
        let telemetry = Telemetry::new().expect("telemetry");
        let keywords = Arc::new(ScoringKeywords::builtin().expect("keywords"));
        let pipeline = ScanPipeline::new(
            Arc::new(SyntheticVideoSource::new(7)),
            Arc::new(MemoryTrendStore::new()),
            CompositeScorer::new(keywords),
            SpikeDetector::default(),
            telemetry.metrics_arc(),
            ScanSettings::default(),
        );
        Scheduler::new(Arc::new(pipeline), vec!["ai".to_string()])
    }

    #[tokio::test]
    async fn run_scan_returns_report() {
        let scheduler = scheduler();
        let run_id = Uuid::new_v4();

        let report = scheduler
            .run_scan(ScanJob::new(run_id, vec!["gpt".to_string()]))
            .await
            .expect("scan runs");

        assert_eq!(report.run_id, run_id);
        assert_eq!(report.terms, 1);
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn concurrent_scan_is_rejected() {
        let scheduler = scheduler();
        let _held = scheduler.hold_run_lock();

        let result = scheduler
            .run_scan(ScanJob::new(Uuid::new_v4(), vec!["gpt".to_string()]))
            .await;

        assert_eq!(result.unwrap_err(), SchedulerError::AlreadyRunning);
        assert!(scheduler.is_running());
    }

    #[tokio::test]
    async fn empty_terms_are_rejected() {
        let scheduler = scheduler();
        let result = scheduler.spawn_scan(ScanJob::new(Uuid::new_v4(), Vec::new()));
        assert_eq!(result.unwrap_err(), SchedulerError::NoTerms);
    }

    #[tokio::test]
    async fn spawned_scan_releases_lock_when_done() {
        let scheduler = scheduler();
        let handle = scheduler
            .spawn_scan(ScanJob::new(Uuid::new_v4(), vec!["gpt".to_string()]))
            .expect("spawned");

        let report = handle.await.expect("join");
        assert!(report.finished_at.is_some());
        assert!(!scheduler.is_running());
    }
}
