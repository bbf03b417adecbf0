pub(crate) mod health;
pub(crate) mod metrics;
pub(crate) mod scans;
pub(crate) mod score;
pub(crate) mod videos;

use axum::{
    Router,
    routing::{get, post},
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::app::AppState;

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health/ready", get(health::ready))
        .route("/health/live", get(health::live))
        .route("/metrics", get(metrics::exporter))
        .route("/v1/scans", post(scans::trigger_scan))
        .route("/v1/score", post(score::score_video))
        .route("/v1/videos/trending", get(videos::trending))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

impl ErrorResponse {
    pub(crate) fn new(error: impl Into<String>) -> axum::Json<Self> {
        axum::Json(Self {
            error: error.into(),
        })
    }
}
