use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::error::ApiError;
use super::AppState;
use crate::webhook::{self, signature, PullRequestEvent};

pub const SERVICE_NAME: &str = "pr-review-agent";

/// GET /
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// POST /webhook/github
///
/// Authenticates the delivery, filters event type and action, then starts
/// the review in the background and acknowledges right away.
pub async fn github_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let signature_header = header(&headers, webhook::SIGNATURE_HEADER);
    if !signature::verify(&body, signature_header, &state.webhook_secret) {
        warn!("rejected webhook with invalid signature");
        return Err(ApiError::InvalidSignature);
    }

    let event_type = header(&headers, webhook::EVENT_HEADER).unwrap_or_default();
    if event_type != webhook::PULL_REQUEST_EVENT {
        info!(event_type, "ignoring event type");
        return Ok(Json(json!({ "message": "Event type not supported" })));
    }

    let event =
        PullRequestEvent::parse(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if !event.is_reviewable() {
        info!(action = %event.action, "ignoring PR action");
        return Ok(Json(json!({
            "message": format!("Action {} not processed", event.action)
        })));
    }

    let action = event.action.clone();
    let ctx = event.into_context();
    let pr_number = ctx.number;
    info!(repo = %ctx.repo_identifier, pr = pr_number, %action, "new PR event");

    let pipeline = state.pipeline.clone();
    tokio::spawn(async move {
        let outcome = pipeline.run_review(ctx).await;
        info!(?outcome, "review run finished");
    });

    Ok(Json(json!({
        "message": "PR review started",
        "pr_number": pr_number,
    })))
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub repo: Option<String>,
    pub pr_number: Option<u64>,
}

/// POST /test/analyze
///
/// Manual trigger: fetch PR details and run the same pipeline, waiting for
/// it to finish.
pub async fn manual_analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = payload?;
    let (Some(repo), Some(pr_number)) = (request.repo, request.pr_number) else {
        return Err(ApiError::BadRequest(
            "Missing required fields: repo, pr_number".to_string(),
        ));
    };

    let ctx = state
        .source
        .fetch_details(&repo, pr_number)
        .await
        .map_err(|err| {
            warn!(%repo, pr = pr_number, error = %err, "failed to fetch PR details");
            ApiError::NotFound(format!("{repo}#{pr_number}"))
        })?;

    info!(%repo, pr = pr_number, "manual analysis requested");
    let outcome = state.pipeline.run_review(ctx.clone()).await;

    Ok(Json(json!({
        "message": "Analysis finished",
        "pr_info": ctx,
        "outcome": outcome,
    })))
}
