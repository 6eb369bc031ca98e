use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Input did not match the declared shape of an agent or of the pipeline goal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {constraint}")]
pub struct ValidationError {
    pub field: String,
    pub constraint: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            constraint: constraint.into(),
        }
    }
}

/// The completion endpoint could not produce a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("failed to reach completion endpoint: {0}")]
    Transport(String),
    #[error("rate limit exceeded (API response: {0})")]
    RateLimited(String),
    #[error("invalid API key, check the llm.api_key setting")]
    Unauthorized,
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error("service is temporarily unavailable")]
    Unavailable,
    #[error("API error (status {status}): {body}")]
    Status { status: u16, body: String },
    #[error("completion response was malformed: {0}")]
    Malformed(String),
    #[error("completion response was empty")]
    Empty,
}

/// Model output that could not be turned into the agent's result type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{constraint}")]
pub struct ParseError {
    pub constraint: String,
    pub raw: String,
}

impl ParseError {
    pub fn new(constraint: impl Into<String>, raw: &str) -> Self {
        Self {
            constraint: constraint.into(),
            raw: raw.to_string(),
        }
    }
}

/// Any of the failures a single agent invocation can run into.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    #[error("validation: {0}")]
    Validation(#[from] ValidationError),
    #[error("completion: {0}")]
    Upstream(#[from] UpstreamError),
    #[error("parse: {0}")]
    Parse(#[from] ParseError),
}

impl StageError {
    pub fn kind(&self) -> FailureKind {
        match self {
            StageError::Validation(_) => FailureKind::Validation,
            StageError::Upstream(_) => FailureKind::Upstream,
            StageError::Parse(_) => FailureKind::Parse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Validation,
    Upstream,
    Parse,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Validation => "validation",
            FailureKind::Upstream => "upstream",
            FailureKind::Parse => "parse",
        };
        write!(f, "{label}")
    }
}
