use axum::Json;
use axum::body::Bytes;
use axum::extract::{Extension, State};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::orchestrator::{OrchestrationState, PipelineOutcome};

use super::AppState;
use super::auth::Tenant;
use super::error::ApiError;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `POST /run`: runs the pipeline for the JSON goal in the body.
pub async fn run(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    body: Bytes,
) -> Result<Json<OrchestrationState>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::bad_request("request body is empty"));
    }
    let goal: Value = serde_json::from_slice(&body)
        .map_err(|err| ApiError::bad_request(format!("request body is not valid JSON: {err}")))?;

    // Cancels the pipeline when the client goes away and this future is dropped.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let deadline = state.request_timeout;
    let timer = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(deadline) => {
                    cancel.cancel();
                    true
                }
                _ = cancel.cancelled() => false,
            }
        })
    };

    let run = state.orchestrator.run_pipeline(&goal, &cancel).await;
    cancel.cancel();
    let deadline_expired = timer.await.unwrap_or(false);

    match run.outcome {
        PipelineOutcome::Completed(pipeline_state) => {
            info!(tenant = %tenant.0, stages = pipeline_state.len(), "pipeline served");
            Ok(Json(pipeline_state))
        }
        outcome => Err(ApiError::from_outcome(outcome, deadline_expired)
            .unwrap_or_else(|| ApiError::bad_request("pipeline did not complete"))),
    }
}
