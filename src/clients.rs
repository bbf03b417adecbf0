pub mod synthetic;
pub mod youtube;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use thiserror::Error;

use crate::scoring::RawVideo;

pub use synthetic::SyntheticVideoSource;
pub use youtube::{YouTubeClient, YouTubeConfig};

/// One search request against a video source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub term: String,
    pub published_after: DateTime<Utc>,
    pub max_results: u32,
}

#[derive(Debug, Error)]
pub enum SourceError {
    /// The daily API quota is spent; no further calls should be made this run.
    #[error("video source quota exhausted: {reason}")]
    QuotaExhausted { reason: String },
    #[error("video source request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("video source returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("failed to decode video source response: {0}")]
    Decode(String),
    #[error("invalid video source configuration: {0}")]
    Config(String),
}

impl SourceError {
    #[must_use]
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, SourceError::QuotaExhausted { .. })
    }
}

/// A provider of raw video records.
#[async_trait]
pub trait VideoSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Videos matching `query`, newest first where the source supports ordering.
    ///
    /// # Errors
    /// Returns [`SourceError`] when the upstream call fails or its payload
    /// cannot be decoded.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawVideo>, SourceError>;
}
