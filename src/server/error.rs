use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::FailureKind;
use crate::orchestrator::{PipelineOutcome, StageKind};

/// JSON error response: `{ "error": ..., "stage": ... }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub stage: Option<StageKind>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<StageKind>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            stage: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn too_many_requests(retry_after: u64) -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            format!("rate limit exceeded, retry in {retry_after}s"),
        )
    }

    pub fn in_stage(mut self, stage: StageKind) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Maps a pipeline that did not complete to its HTTP error.
    /// `deadline_expired` tells a request timeout apart from other
    /// cancellations.
    pub fn from_outcome(outcome: PipelineOutcome, deadline_expired: bool) -> Option<Self> {
        match outcome {
            PipelineOutcome::Completed(_) => None,
            PipelineOutcome::Failed { stage, failure } => {
                let status = match failure.kind {
                    FailureKind::Validation => StatusCode::BAD_REQUEST,
                    FailureKind::Upstream | FailureKind::Parse => StatusCode::BAD_GATEWAY,
                };
                Some(Self::new(status, failure.message).in_stage(stage))
            }
            PipelineOutcome::Cancelled { stage } if deadline_expired => Some(
                Self::new(
                    StatusCode::GATEWAY_TIMEOUT,
                    format!("request deadline expired during {stage}"),
                )
                .in_stage(stage),
            ),
            PipelineOutcome::Cancelled { stage } => Some(
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    format!("pipeline cancelled during {stage}"),
                )
                .in_stage(stage),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.message,
            stage: self.stage,
        };
        (self.status, Json(body)).into_response()
    }
}
