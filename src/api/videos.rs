use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{api::ErrorResponse, app::AppState, store::TrendingVideo};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TrendingQuery {
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
struct TrendingResponse {
    count: usize,
    videos: Vec<TrendingVideo>,
}

/// Highest-scoring stored videos; `limit` is clamped to `1..=100`.
pub(crate) async fn trending(
    State(state): State<AppState>,
    Query(query): Query<TrendingQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    match state.store().list_trending(limit).await {
        Ok(videos) => {
            let body = Json(TrendingResponse {
                count: videos.len(),
                videos,
            });
            (StatusCode::OK, body).into_response()
        }
        Err(error) => {
            error!(error = %error, limit, "failed to load trending videos");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse::new("API temporarily unavailable"),
            )
                .into_response()
        }
    }
}
