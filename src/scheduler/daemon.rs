use std::time::Duration;

use chrono::Utc;
use tokio::{task::JoinHandle, time::sleep};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::scheduler::{ScanJob, Scheduler, cadence::IntervalCadence};

/// Runs a scan over the scheduler's default terms on every cadence tick.
pub fn spawn_scan_daemon(scheduler: Scheduler, cadence: IntervalCadence) -> JoinHandle<()> {
    ScanDaemon { scheduler, cadence }.spawn()
}

struct ScanDaemon {
    scheduler: Scheduler,
    cadence: IntervalCadence,
}

impl ScanDaemon {
    fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(self) {
        loop {
            let now = Utc::now();
            let next = self.cadence.next_run_from(now);
            let wait = duration_until(next, now);
            info!(
                next_run_utc = %next.to_rfc3339(),
                wait_seconds = wait.as_secs(),
                "scheduled automatic trend scan"
            );
            sleep(wait).await;

            let run_id = Uuid::now_v7();
            let job = ScanJob::new(run_id, self.scheduler.default_terms().to_vec());
            match self.scheduler.run_scan(job).await {
                Ok(report) if report.is_failure() => {
                    error!(%run_id, failed_terms = report.failed_terms.len(), "automatic scan failed");
                }
                Ok(report) => info!(
                    %run_id,
                    spikes = report.spikes.len(),
                    timed_out = report.timed_out,
                    "automatic scan completed"
                ),
                Err(err) => warn!(%run_id, error = %err, "automatic scan skipped"),
            }

            // a scan finishing inside the same millisecond must not re-trigger
            if Utc::now() <= next {
                sleep(Duration::from_millis(1)).await;
            }
        }
    }
}

fn duration_until(next: chrono::DateTime<Utc>, now: chrono::DateTime<Utc>) -> Duration {
    match (next - now).to_std() {
        Ok(duration) => duration,
        Err(_) => Duration::from_secs(0),
    }
}
