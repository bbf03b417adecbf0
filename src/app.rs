use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::{
    api,
    clients::{SyntheticVideoSource, VideoSource, YouTubeClient, YouTubeConfig},
    config::{Config, to_chrono},
    observability::Telemetry,
    pipeline::{ScanPipeline, ScanSettings},
    scheduler::Scheduler,
    scoring::{CompositeScorer, ScoringKeywords},
    spike::SpikeDetector,
    store::{PgTrendStore, TrendStore},
};

#[derive(Clone)]
pub(crate) struct AppState {
    registry: Arc<ComponentRegistry>,
}

pub struct ComponentRegistry {
    config: Arc<Config>,
    telemetry: Telemetry,
    scheduler: Scheduler,
    scorer: CompositeScorer,
    detector: SpikeDetector,
    store: Arc<dyn TrendStore>,
}

impl AppState {
    pub(crate) fn new(registry: ComponentRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub(crate) fn telemetry(&self) -> &Telemetry {
        &self.registry.telemetry
    }

    pub(crate) fn scheduler(&self) -> &Scheduler {
        &self.registry.scheduler
    }

    pub(crate) fn config(&self) -> &Config {
        &self.registry.config
    }

    pub(crate) fn scorer(&self) -> &CompositeScorer {
        &self.registry.scorer
    }

    pub(crate) fn detector(&self) -> &SpikeDetector {
        &self.registry.detector
    }

    pub(crate) fn store(&self) -> Arc<dyn TrendStore> {
        Arc::clone(&self.registry.store)
    }
}

impl ComponentRegistry {
    /// Wires the Postgres store and the configured video source.
    ///
    /// The pool connects lazily, so an unreachable database surfaces through
    /// `/health/ready` instead of failing startup.
    ///
    /// # Errors
    /// Returns an error when telemetry, the pool or the HTTP client cannot be
    /// configured.
    pub fn build(config: Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections())
            .acquire_timeout(config.db_acquire_timeout())
            .connect_lazy(config.db_dsn())
            .context("failed to configure trend database pool")?;
        let store: Arc<dyn TrendStore> = Arc::new(PgTrendStore::new(pool));
        let source = build_source(&config)?;

        Self::from_parts(config, store, source)
    }

    /// Assembles the registry around an existing store and video source.
    ///
    /// # Errors
    /// Returns an error when telemetry or the keyword matchers cannot be
    /// initialized.
    pub fn from_parts(
        config: Config,
        store: Arc<dyn TrendStore>,
        source: Arc<dyn VideoSource>,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let telemetry = Telemetry::new()?;
        let keywords = Arc::new(
            ScoringKeywords::with_overrides(config.ai_keywords(), config.emotional_triggers())
                .context("failed to compile scoring keywords")?,
        );
        let scorer = CompositeScorer::new(keywords);
        let detector = SpikeDetector::new(config.spike_config());
        let settings = ScanSettings {
            lookback: to_chrono(config.scan_lookback()),
            max_results: config.youtube_max_results(),
            max_concurrency: config.max_concurrency().get(),
            timeout: config.scan_timeout(),
            clock_skew: to_chrono(config.clock_skew()),
            write_attempts: config.db_write_attempts().max(1),
            write_backoff_base_ms: config.http_backoff_base_ms(),
            write_backoff_cap_ms: config.http_backoff_cap_ms(),
        };
        let pipeline = Arc::new(ScanPipeline::new(
            source,
            Arc::clone(&store),
            scorer.clone(),
            detector.clone(),
            telemetry.metrics_arc(),
            settings,
        ));
        let scheduler = Scheduler::new(pipeline, config.search_terms().to_vec());

        Ok(Self {
            config,
            telemetry,
            scheduler,
            scorer,
            detector,
            store,
        })
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    #[must_use]
    pub fn store(&self) -> Arc<dyn TrendStore> {
        Arc::clone(&self.store)
    }
}

fn build_source(config: &Config) -> Result<Arc<dyn VideoSource>> {
    let Some(api_key) = config.youtube_api_key() else {
        info!(
            seed = config.synthetic_seed(),
            "YOUTUBE_API_KEY not set, using synthetic video source"
        );
        return Ok(Arc::new(SyntheticVideoSource::new(config.synthetic_seed())));
    };

    let client = YouTubeClient::new(YouTubeConfig {
        base_url: config.youtube_api_base_url().to_string(),
        api_key: api_key.to_string(),
        connect_timeout: config.youtube_connect_timeout(),
        total_timeout: config.youtube_total_timeout(),
        max_attempts: config.http_max_retries().max(1),
        backoff_base_ms: config.http_backoff_base_ms(),
        backoff_cap_ms: config.http_backoff_cap_ms(),
    })
    .context("failed to build YouTube client")?;
    Ok(Arc::new(client))
}

pub fn build_router(registry: ComponentRegistry) -> Router {
    let state = AppState::new(registry);
    api::router(state)
}
