//! YouTube Data API v3 client.
//!
//! A search is two calls: `search` for matching ids, then `videos` for the
//! snippet, statistics and duration of those ids.
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::{SearchQuery, SourceError, VideoSource};
use crate::scoring::RawVideo;
use crate::scoring::types::SHORT_FORM_MAX_SECONDS;
use crate::util::retry::{RetryConfig, is_retryable_error, is_retryable_status};

const QUOTA_REASONS: [&str; 2] = ["quotaExceeded", "dailyLimitExceeded"];
/// The `videos` endpoint accepts at most this many ids per call.
const MAX_IDS_PER_CALL: usize = 50;

static ISO_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?)?$")
        .unwrap_or_else(|error| panic!("invalid duration pattern: {error}"))
});

#[derive(Debug, Clone)]
pub struct YouTubeConfig {
    pub base_url: String,
    pub api_key: String,
    pub connect_timeout: Duration,
    pub total_timeout: Duration,
    pub max_attempts: usize,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
}

#[derive(Debug, Clone)]
pub struct YouTubeClient {
    client: Client,
    base_url: Url,
    api_key: String,
    retry: RetryConfig,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    channel_title: String,
    published_at: DateTime<Utc>,
}

/// Counts arrive as decimal strings and may be hidden by the uploader.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

impl YouTubeClient {
    /// # Errors
    /// Returns an error when the base URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: YouTubeConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.total_timeout)
            .build()
            .context("failed to build YouTube HTTP client")?;

        let base_url = normalize_base_url(&config.base_url)?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
            retry: RetryConfig::new(
                config.max_attempts.max(1),
                config.backoff_base_ms,
                config.backoff_cap_ms,
            ),
        })
    }

    async fn search_ids(&self, query: &SearchQuery) -> Result<Vec<String>, SourceError> {
        let mut url = self.endpoint("search")?;
        url.query_pairs_mut()
            .append_pair("part", "snippet")
            .append_pair("type", "video")
            .append_pair("order", "date")
            .append_pair("q", &query.term)
            .append_pair("maxResults", &query.max_results.to_string())
            .append_pair(
                "publishedAfter",
                &query
                    .published_after
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            )
            .append_pair("key", &self.api_key);

        let response: SearchResponse = self.get_json(url, "search").await?;
        let mut ids: Vec<String> = Vec::with_capacity(response.items.len());
        for id in response.items.into_iter().filter_map(|item| item.id.video_id) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    async fn fetch_details(&self, ids: &[String]) -> Result<Vec<RawVideo>, SourceError> {
        let mut videos = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_IDS_PER_CALL) {
            let mut url = self.endpoint("videos")?;
            url.query_pairs_mut()
                .append_pair("part", "snippet,statistics,contentDetails")
                .append_pair("id", &chunk.join(","))
                .append_pair("key", &self.api_key);

            let response: VideosResponse = self.get_json(url, "videos").await?;
            videos.extend(response.items.into_iter().filter_map(|item| {
                let id = item.id.clone();
                into_raw_video(item)
                    .map_err(|error| {
                        warn!(video_id = %id, error = %error, "dropping undecodable video");
                    })
                    .ok()
            }));
        }
        Ok(videos)
    }

    fn endpoint(&self, name: &str) -> Result<Url, SourceError> {
        self.base_url
            .join(name)
            .map_err(|error| SourceError::Config(format!("failed to build {name} URL: {error}")))
    }

    /// GET with bounded retries. The URL carries the API key, so only the
    /// endpoint name is logged.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        endpoint: &'static str,
    ) -> Result<T, SourceError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body = response
                            .text()
                            .await
                            .map_err(|error| SourceError::Request(error.without_url()))?;
                        return serde_json::from_str(&body)
                            .map_err(|error| SourceError::Decode(format!("{endpoint}: {error}")));
                    }

                    let body = response.text().await.unwrap_or_default();
                    if status == StatusCode::FORBIDDEN {
                        if let Some(reason) = quota_reason(&body) {
                            return Err(SourceError::QuotaExhausted { reason });
                        }
                    }
                    if is_retryable_status(status) && self.retry.can_retry(attempt) {
                        let delay = self.retry.delay_for_attempt(attempt);
                        warn!(
                            endpoint,
                            %status,
                            attempt,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            "YouTube request failed, retrying"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        return Err(SourceError::QuotaExhausted {
                            reason: format!("rate limited after {attempt} attempts"),
                        });
                    }
                    return Err(SourceError::Status { status, body });
                }
                Err(error) => {
                    let error = error.without_url();
                    if is_retryable_error(&error) && self.retry.can_retry(attempt) {
                        let delay = self.retry.delay_for_attempt(attempt);
                        warn!(endpoint, attempt, error = %error, "YouTube request error, retrying");
                        sleep(delay).await;
                        continue;
                    }
                    return Err(SourceError::Request(error));
                }
            }
        }
    }
}

#[async_trait]
impl VideoSource for YouTubeClient {
    fn name(&self) -> &'static str {
        "youtube"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawVideo>, SourceError> {
        let ids = self.search_ids(query).await?;
        debug!(term = %query.term, ids = ids.len(), "YouTube search returned ids");
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch_details(&ids).await
    }
}

fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut base = raw.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Url::parse(&base).with_context(|| format!("invalid YouTube base URL: {raw}"))
}

fn quota_reason(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/errors")?
        .as_array()?
        .iter()
        .filter_map(|entry| entry.get("reason").and_then(serde_json::Value::as_str))
        .find(|reason| QUOTA_REASONS.contains(reason))
        .map(ToString::to_string)
}

/// Parses ISO-8601 durations such as `PT1M5S` or `P1DT2H` into seconds.
pub(crate) fn parse_iso8601_duration(raw: &str) -> Option<u32> {
    let captures = ISO_DURATION.captures(raw.trim())?;
    let part = |index: usize, unit: u64| -> Option<u64> {
        captures
            .get(index)
            .map_or(Some(0), |m| m.as_str().parse::<u64>().ok())
            .map(|value| value.saturating_mul(unit))
    };
    let total = part(1, 86_400)?
        .saturating_add(part(2, 3_600)?)
        .saturating_add(part(3, 60)?)
        .saturating_add(part(4, 1)?);
    u32::try_from(total).ok()
}

fn parse_count(field: &'static str, raw: Option<&str>) -> Result<i64, SourceError> {
    match raw {
        None => Ok(0),
        Some(value) => value
            .parse::<i64>()
            .map_err(|error| SourceError::Decode(format!("{field} {value:?}: {error}"))),
    }
}

pub(crate) fn video_url(video_id: &str, duration_seconds: Option<u32>) -> String {
    match duration_seconds {
        Some(seconds) if (1..SHORT_FORM_MAX_SECONDS).contains(&seconds) => {
            format!("https://www.youtube.com/shorts/{video_id}")
        }
        _ => format!("https://www.youtube.com/watch?v={video_id}"),
    }
}

fn into_raw_video(item: VideoItem) -> Result<RawVideo, SourceError> {
    let duration_seconds = item
        .content_details
        .and_then(|details| details.duration)
        .and_then(|raw| parse_iso8601_duration(&raw))
        // live and upcoming broadcasts report P0D
        .filter(|seconds| *seconds > 0);

    Ok(RawVideo {
        url: video_url(&item.id, duration_seconds),
        view_count: parse_count("viewCount", item.statistics.view_count.as_deref())?,
        like_count: parse_count("likeCount", item.statistics.like_count.as_deref())?,
        comment_count: parse_count("commentCount", item.statistics.comment_count.as_deref())?,
        id: item.id,
        title: item.snippet.title,
        description: item.snippet.description,
        tags: item.snippet.tags,
        channel_name: item.snippet.channel_title,
        published_at: item.snippet.published_at,
        duration_seconds,
    })
}
