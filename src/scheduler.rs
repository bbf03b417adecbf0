pub(crate) mod cadence;
pub mod daemon;
pub(crate) mod jobs;

pub use cadence::IntervalCadence;
pub use daemon::spawn_scan_daemon;
pub use jobs::{ScanJob, Scheduler, SchedulerError};
