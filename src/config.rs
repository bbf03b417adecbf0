use std::{env, net::SocketAddr, num::NonZeroUsize, time::Duration};

use thiserror::Error;

use crate::spike::SpikeConfig;

#[cfg(test)]
use once_cell::sync::Lazy;
#[cfg(test)]
pub(crate) static ENV_MUTEX: Lazy<std::sync::Mutex<()>> = Lazy::new(|| std::sync::Mutex::new(()));

#[cfg(test)]
const ENV_VARS: [&str; 28] = [
    "TRENDAI_DB_DSN",
    "TRENDAI_HTTP_BIND",
    "TRENDAI_DB_MAX_CONNECTIONS",
    "TRENDAI_DB_ACQUIRE_TIMEOUT_MS",
    "TRENDAI_DB_WRITE_ATTEMPTS",
    "YOUTUBE_API_KEY",
    "YOUTUBE_API_BASE_URL",
    "YOUTUBE_CONNECT_TIMEOUT_MS",
    "YOUTUBE_TOTAL_TIMEOUT_MS",
    "YOUTUBE_MAX_RESULTS",
    "HTTP_MAX_RETRIES",
    "HTTP_BACKOFF_BASE_MS",
    "HTTP_BACKOFF_CAP_MS",
    "TRENDAI_SYNTHETIC_SEED",
    "TRENDAI_SEARCH_TERMS",
    "TRENDAI_AI_KEYWORDS",
    "TRENDAI_EMOTIONAL_TRIGGERS",
    "TRENDAI_SCAN_INTERVAL_MINUTES",
    "TRENDAI_SCAN_LOOKBACK_HOURS",
    "TRENDAI_SCAN_TIMEOUT_SECS",
    "TRENDAI_MAX_CONCURRENCY",
    "TRENDAI_CLOCK_SKEW_SECS",
    "SPIKE_SHORT_FORM_ENGAGEMENT",
    "SPIKE_LONG_FORM_ENGAGEMENT",
    "SPIKE_TREND_SCORE_THRESHOLD",
    "SPIKE_VIEWS_PER_HOUR_THRESHOLD",
    "SPIKE_FRESH_MAX_AGE_HOURS",
    "SPIKE_SUPPRESSION_HOURS",
];

/// Clears every variable [`Config::from_env`] reads. Hold [`ENV_MUTEX`] while calling.
#[cfg(test)]
pub(crate) fn reset_env() {
    for name in ENV_VARS {
        // SAFETY: callers serialize environment access through ENV_MUTEX.
        unsafe {
            env::remove_var(name);
        }
    }
}

const DEFAULT_SEARCH_TERMS: &str = "artificial intelligence,ChatGPT,GPT-5,Claude AI,Gemini AI,AI agents,machine learning,AI tools";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    http_bind: SocketAddr,
    db_dsn: String,
    db_max_connections: u32,
    db_acquire_timeout: Duration,
    db_write_attempts: usize,
    youtube_api_key: Option<String>,
    youtube_api_base_url: String,
    youtube_connect_timeout: Duration,
    youtube_total_timeout: Duration,
    youtube_max_results: u32,
    http_max_retries: usize,
    http_backoff_base_ms: u64,
    http_backoff_cap_ms: u64,
    synthetic_seed: u64,
    search_terms: Vec<String>,
    ai_keywords: Option<Vec<String>>,
    emotional_triggers: Option<Vec<String>>,
    scan_interval: Duration,
    scan_lookback: Duration,
    scan_timeout: Duration,
    max_concurrency: NonZeroUsize,
    clock_skew: Duration,
    spike_short_form_engagement: f64,
    spike_long_form_engagement: f64,
    spike_trend_score_threshold: f64,
    spike_views_per_hour_threshold: f64,
    spike_fresh_max_age: Duration,
    spike_suppression_window: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Config {
    /// Reads and validates the worker configuration from the environment.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when `TRENDAI_DB_DSN` is missing or any value
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_dsn = env_var("TRENDAI_DB_DSN")?;
        let http_bind = parse_socket_addr("TRENDAI_HTTP_BIND", "0.0.0.0:9010")?;
        let db_max_connections = parse_u32("TRENDAI_DB_MAX_CONNECTIONS", 8)?;
        let db_acquire_timeout = parse_duration_ms("TRENDAI_DB_ACQUIRE_TIMEOUT_MS", 5000)?;
        let db_write_attempts = parse_usize("TRENDAI_DB_WRITE_ATTEMPTS", 3)?;

        // YouTube Data API
        let youtube_api_key = env::var("YOUTUBE_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        let youtube_api_base_url = env::var("YOUTUBE_API_BASE_URL")
            .unwrap_or_else(|_| "https://www.googleapis.com/youtube/v3/".to_string());
        let youtube_connect_timeout = parse_duration_ms("YOUTUBE_CONNECT_TIMEOUT_MS", 3000)?;
        let youtube_total_timeout = parse_duration_ms("YOUTUBE_TOTAL_TIMEOUT_MS", 15000)?;
        let youtube_max_results = parse_u32("YOUTUBE_MAX_RESULTS", 25)?;
        if !(1..=50).contains(&youtube_max_results) {
            return Err(ConfigError::Invalid {
                name: "YOUTUBE_MAX_RESULTS",
                source: anyhow::anyhow!("must be between 1 and 50"),
            });
        }

        // Retry settings (exponential backoff + jitter)
        let http_max_retries = parse_usize("HTTP_MAX_RETRIES", 3)?;
        let http_backoff_base_ms = parse_u64("HTTP_BACKOFF_BASE_MS", 250)?;
        let http_backoff_cap_ms = parse_u64("HTTP_BACKOFF_CAP_MS", 10000)?;
        let synthetic_seed = parse_u64("TRENDAI_SYNTHETIC_SEED", 42)?;

        // Scan settings
        let search_terms = parse_csv("TRENDAI_SEARCH_TERMS", DEFAULT_SEARCH_TERMS);
        let ai_keywords = parse_optional_csv("TRENDAI_AI_KEYWORDS");
        let emotional_triggers = parse_optional_csv("TRENDAI_EMOTIONAL_TRIGGERS");
        let scan_interval = parse_duration_minutes("TRENDAI_SCAN_INTERVAL_MINUTES", 30)?;
        let scan_lookback = parse_duration_hours("TRENDAI_SCAN_LOOKBACK_HOURS", 48)?;
        let scan_timeout = parse_duration_secs("TRENDAI_SCAN_TIMEOUT_SECS", 300)?;
        let max_concurrency = parse_non_zero_usize("TRENDAI_MAX_CONCURRENCY", 4)?;
        let clock_skew = parse_duration_secs("TRENDAI_CLOCK_SKEW_SECS", 300)?;

        // Spike thresholds
        let spike_short_form_engagement = parse_f64("SPIKE_SHORT_FORM_ENGAGEMENT", 2.5)?;
        let spike_long_form_engagement = parse_f64("SPIKE_LONG_FORM_ENGAGEMENT", 1.2)?;
        let spike_trend_score_threshold = parse_f64("SPIKE_TREND_SCORE_THRESHOLD", 0.72)?;
        let spike_views_per_hour_threshold = parse_f64("SPIKE_VIEWS_PER_HOUR_THRESHOLD", 1000.0)?;
        let spike_fresh_max_age = parse_duration_hours("SPIKE_FRESH_MAX_AGE_HOURS", 24)?;
        let spike_suppression_window = parse_duration_hours("SPIKE_SUPPRESSION_HOURS", 6)?;

        Ok(Self {
            http_bind,
            db_dsn,
            db_max_connections,
            db_acquire_timeout,
            db_write_attempts,
            youtube_api_key,
            youtube_api_base_url,
            youtube_connect_timeout,
            youtube_total_timeout,
            youtube_max_results,
            http_max_retries,
            http_backoff_base_ms,
            http_backoff_cap_ms,
            synthetic_seed,
            search_terms,
            ai_keywords,
            emotional_triggers,
            scan_interval,
            scan_lookback,
            scan_timeout,
            max_concurrency,
            clock_skew,
            spike_short_form_engagement,
            spike_long_form_engagement,
            spike_trend_score_threshold,
            spike_views_per_hour_threshold,
            spike_fresh_max_age,
            spike_suppression_window,
        })
    }

    #[must_use]
    pub fn http_bind(&self) -> SocketAddr {
        self.http_bind
    }

    #[must_use]
    pub fn db_dsn(&self) -> &str {
        &self.db_dsn
    }

    #[must_use]
    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
    }

    #[must_use]
    pub fn db_acquire_timeout(&self) -> Duration {
        self.db_acquire_timeout
    }

    /// Attempts per store write; transient database errors are retried with
    /// the HTTP backoff settings.
    #[must_use]
    pub fn db_write_attempts(&self) -> usize {
        self.db_write_attempts
    }

    #[must_use]
    pub fn youtube_api_key(&self) -> Option<&str> {
        self.youtube_api_key.as_deref()
    }

    #[must_use]
    pub fn youtube_api_base_url(&self) -> &str {
        &self.youtube_api_base_url
    }

    #[must_use]
    pub fn youtube_connect_timeout(&self) -> Duration {
        self.youtube_connect_timeout
    }

    #[must_use]
    pub fn youtube_total_timeout(&self) -> Duration {
        self.youtube_total_timeout
    }

    #[must_use]
    pub fn youtube_max_results(&self) -> u32 {
        self.youtube_max_results
    }

    /// Retries after the first attempt.
    #[must_use]
    pub fn http_max_retries(&self) -> usize {
        self.http_max_retries
    }

    #[must_use]
    pub fn http_backoff_base_ms(&self) -> u64 {
        self.http_backoff_base_ms
    }

    #[must_use]
    pub fn http_backoff_cap_ms(&self) -> u64 {
        self.http_backoff_cap_ms
    }

    #[must_use]
    pub fn synthetic_seed(&self) -> u64 {
        self.synthetic_seed
    }

    #[must_use]
    pub fn search_terms(&self) -> &[String] {
        &self.search_terms
    }

    #[must_use]
    pub fn ai_keywords(&self) -> Option<&[String]> {
        self.ai_keywords.as_deref()
    }

    #[must_use]
    pub fn emotional_triggers(&self) -> Option<&[String]> {
        self.emotional_triggers.as_deref()
    }

    #[must_use]
    pub fn scan_interval(&self) -> Duration {
        self.scan_interval
    }

    #[must_use]
    pub fn scan_lookback(&self) -> Duration {
        self.scan_lookback
    }

    #[must_use]
    pub fn scan_timeout(&self) -> Duration {
        self.scan_timeout
    }

    #[must_use]
    pub fn max_concurrency(&self) -> NonZeroUsize {
        self.max_concurrency
    }

    #[must_use]
    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    /// Spike thresholds assembled from the `SPIKE_*` variables.
    #[must_use]
    pub fn spike_config(&self) -> SpikeConfig {
        SpikeConfig {
            short_form_engagement_threshold: self.spike_short_form_engagement,
            long_form_engagement_threshold: self.spike_long_form_engagement,
            trend_score_threshold: self.spike_trend_score_threshold,
            views_per_hour_threshold: self.spike_views_per_hour_threshold,
            fresh_video_max_age: to_chrono(self.spike_fresh_max_age),
            suppression_window: to_chrono(self.spike_suppression_window),
        }
    }
}

pub(crate) fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

fn env_var(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parse_socket_addr(name: &'static str, default: &str) -> Result<SocketAddr, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());

    raw.parse().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_non_zero_usize(name: &'static str, default: usize) -> Result<NonZeroUsize, ConfigError> {
    let parsed = parse_usize(name, default)?;
    NonZeroUsize::new(parsed).ok_or_else(|| ConfigError::Invalid {
        name,
        source: anyhow::anyhow!("must be greater than zero"),
    })
}

fn parse_duration_secs(name: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    Ok(Duration::from_secs(parse_u64(name, default_secs)?))
}

fn parse_duration_ms(name: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
    Ok(Duration::from_millis(parse_u64(name, default_ms)?))
}

fn parse_duration_minutes(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    let minutes = parse_u64(name, default)?;
    if minutes == 0 {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("must be greater than zero"),
        });
    }
    Ok(Duration::from_secs(minutes.saturating_mul(60)))
}

fn parse_duration_hours(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    Ok(Duration::from_secs(parse_u64(name, default)?.saturating_mul(3600)))
}

fn parse_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim().parse::<usize>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_u32(name: &'static str, default: u32) -> Result<u32, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim().parse::<u32>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim().parse::<u64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_f64(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    let value = raw.trim().parse::<f64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("must be a finite, non-negative number"),
        });
    }
    Ok(value)
}

fn parse_csv(name: &'static str, default: &str) -> Vec<String> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    split_csv(&raw)
}

fn parse_optional_csv(name: &'static str) -> Option<Vec<String>> {
    let values = split_csv(&env::var(name).ok()?);
    (!values.is_empty()).then_some(values)
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
