use std::collections::HashSet;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    api::ErrorResponse,
    app::AppState,
    scheduler::{ScanJob, SchedulerError},
};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TriggerScanRequest {
    #[serde(default)]
    terms: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct TriggerScanResponse {
    run_id: Uuid,
    terms: Vec<String>,
    status: &'static str,
}

/// Starts a background scan. The body is optional; without `terms` the
/// configured search terms are used.
pub(crate) async fn trigger_scan(
    State(state): State<AppState>,
    payload: Option<Json<TriggerScanRequest>>,
) -> impl IntoResponse {
    state.telemetry().record_manual_scan_invocation();

    let payload = payload.map(|Json(payload)| payload).unwrap_or_default();
    let terms = match payload.terms {
        Some(raw) => {
            let normalized = normalize_terms(raw);
            if normalized.is_empty() {
                return (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new("terms array must include at least one non-empty value"),
                )
                    .into_response();
            }
            normalized
        }
        None => state.scheduler().default_terms().to_vec(),
    };

    let run_id = Uuid::now_v7();
    let handle = match state
        .scheduler()
        .spawn_scan(ScanJob::new(run_id, terms.clone()))
    {
        Ok(handle) => handle,
        Err(SchedulerError::AlreadyRunning) => {
            return (
                StatusCode::CONFLICT,
                ErrorResponse::new("a scan is already running"),
            )
                .into_response();
        }
        Err(SchedulerError::NoTerms) => {
            return (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("no search terms configured"),
            )
                .into_response();
        }
    };

    tokio::spawn(async move {
        match handle.await {
            Ok(report) => info!(
                %run_id,
                spikes = report.spikes.len(),
                notifications = report.notifications_created,
                timed_out = report.timed_out,
                "manual scan finished"
            ),
            Err(join_error) => error!(%run_id, error = %join_error, "manual scan task aborted"),
        }
    });

    let body = Json(TriggerScanResponse {
        run_id,
        terms,
        status: "accepted",
    });
    (StatusCode::ACCEPTED, body).into_response()
}

/// Trims terms and drops blanks and case-insensitive duplicates.
fn normalize_terms(raw: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for term in raw {
        let trimmed = term.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            result.push(trimmed.to_string());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::normalize_terms;
    use crate::app::{AppState, ComponentRegistry, build_router, test_support::registry_with};
    use crate::store::mock::MemoryTrendStore;

    fn registry() -> ComponentRegistry {
        registry_with(
            Arc::new(MemoryTrendStore::new()),
            &[("TRENDAI_SEARCH_TERMS", "gpt,claude")],
        )
    }

    async fn post(app: axum::Router, body: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut request = Request::post("/v1/scans");
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .oneshot(request.body(body).expect("request builds"))
            .await
            .expect("request succeeds");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&bytes).expect("valid json"))
    }

    #[test]
    fn normalize_strips_and_deduplicates() {
        let terms = vec![
            " GPT-5 ".to_string(),
            "claude".to_string(),
            "gpt-5".to_string(),
            String::new(),
        ];
        assert_eq!(
            normalize_terms(terms),
            vec!["GPT-5".to_string(), "claude".to_string()]
        );
    }

    #[tokio::test]
    async fn trigger_without_body_uses_configured_terms() {
        let (status, payload) = post(build_router(registry()), None).await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(payload["status"], "accepted");
        assert!(
            payload["run_id"]
                .as_str()
                .and_then(|id| Uuid::parse_str(id).ok())
                .is_some()
        );
        assert_eq!(payload["terms"], serde_json::json!(["gpt", "claude"]));
    }

    #[tokio::test]
    async fn trigger_with_terms_overrides_defaults() {
        let (status, payload) =
            post(build_router(registry()), Some(r#"{"terms":["sora"," sora "]}"#)).await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(payload["terms"], serde_json::json!(["sora"]));
    }

    #[tokio::test]
    async fn trigger_rejects_blank_terms() {
        let (status, payload) =
            post(build_router(registry()), Some(r#"{"terms":["  "]}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(payload["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn trigger_conflicts_while_scan_runs() {
        let registry = registry();
        let scheduler = registry.scheduler().clone();
        let state = AppState::new(registry);
        let app = crate::api::router(state);

        let _running = scheduler.hold_run_lock();

        let (status, payload) = post(app, None).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(payload["error"], "a scan is already running");
    }
}
