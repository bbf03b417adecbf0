use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::{
    api::ErrorResponse,
    app::AppState,
    config::to_chrono,
    scoring::{ContentType, RawVideo, ScoreResult},
    spike::{MetricsSnapshot, SpikeReason},
};

#[derive(Debug, Serialize)]
struct ScoreResponse {
    #[serde(flatten)]
    score: ScoreResult,
    trend_score: f64,
    content_type: ContentType,
    category: String,
    /// Spike conditions this observation crosses, before suppression.
    spike_reasons: Vec<SpikeReason>,
}

/// Scores one raw video without touching the store.
pub(crate) async fn score_video(
    State(state): State<AppState>,
    Json(raw): Json<RawVideo>,
) -> impl IntoResponse {
    let clock_skew = to_chrono(state.config().clock_skew());
    let scored = match state.scorer().score_video(&raw, Utc::now(), clock_skew) {
        Ok(scored) => scored,
        Err(error) => {
            debug!(video_id = %raw.id, error = %error, "rejected score request");
            return (StatusCode::BAD_REQUEST, ErrorResponse::new(error.to_string())).into_response();
        }
    };

    let spike_reasons = state
        .detector()
        .triggered_reasons(&MetricsSnapshot::from(&scored));
    let body = Json(ScoreResponse {
        score: scored.score,
        trend_score: scored.trend_score,
        content_type: scored.content_type,
        category: scored.category,
        spike_reasons,
    });
    (StatusCode::OK, body).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{body::Body, http::Request, http::StatusCode};
    use chrono::{Duration, Utc};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::app::{build_router, test_support::registry_with};
    use crate::store::mock::MemoryTrendStore;

    async fn post(body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let store = Arc::new(MemoryTrendStore::new());
        let app = build_router(registry_with(store.clone(), &[]));
        let request = Request::post("/v1/score")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds");
        let response = app.oneshot(request).await.expect("request succeeds");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        assert!(store.videos().is_empty(), "scoring must not persist");
        (status, serde_json::from_slice(&bytes).expect("valid json"))
    }

    fn video(likes: i64) -> serde_json::Value {
        json!({
            "id": "abc123",
            "title": "GPT-5 just changed everything",
            "description": "A look at the new OpenAI model",
            "tags": ["ai", "openai"],
            "published_at": (Utc::now() - Duration::minutes(60)).to_rfc3339(),
            "view_count": 120_000,
            "like_count": likes,
            "comment_count": 1_200,
            "url": "https://www.youtube.com/watch?v=abc123",
        })
    }

    #[tokio::test]
    async fn valid_video_is_scored() {
        let (status, body) = post(video(6_000)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["video_id"], "abc123");
        assert_eq!(body["velocity_score"], 100.0);
        assert_eq!(body["engagement_rate"], 6.0);
        assert_eq!(body["content_type"], "long");
        assert_eq!(body["category"], "llm");
        assert_eq!(body["spike_reasons"][0]["kind"], "high_engagement");
        let trend = body["trend_score"].as_f64().expect("trend score");
        assert!((0.0..=1.0).contains(&trend));
    }

    #[tokio::test]
    async fn negative_counts_are_rejected() {
        let (status, body) = post(video(-1)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "like_count must be non-negative, got -1");
    }
}
