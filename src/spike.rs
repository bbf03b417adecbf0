//! Spike detection.
//!
//! A video spikes when a fresh snapshot crosses any configured threshold
//! (engagement, trend score, early view velocity). Alerts for the same video
//! are suppressed for a cooldown window after each emitted event.
//!
//! ```text
//! Normal ──qualifies──▶ Spiking (event emitted)
//!   ▲                      │
//!   │                qualifies again within window
//!   │                      ▼
//!   └──window elapsed── Suppressed { until }
//! ```

pub mod config;
pub mod detector;
pub mod types;

pub use config::SpikeConfig;
pub use detector::{BatchDetection, DetectionFailure, SpikeDetector, SpikeHistory};
pub use types::{MetricsSnapshot, SpikeError, SpikeEvent, SpikeOutcome, SpikeReason, SpikeState};
