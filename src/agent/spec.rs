use std::time::Duration;

use crate::config::PipelineSettings;
use crate::error::ParseError;
use crate::schema::Shape;

pub type ParseFn<T> = fn(&str) -> Result<T, ParseError>;

/// What an agent does when the model output fails its parser.
pub enum FailurePolicy<T> {
    /// Report the parse error as a failure.
    Loud,
    /// Log the error and return the fallback value instead.
    Soft(fn() -> T),
}

/// Everything that distinguishes one agent from another.
pub struct AgentSpec<T> {
    pub name: &'static str,
    pub system_prompt: &'static str,
    pub shape: Shape,
    pub parse: ParseFn<T>,
    pub on_parse_failure: FailurePolicy<T>,
    /// Re-ask the model once when its output does not parse.
    pub retry_on_parse: bool,
    /// Largest reply the agent's output format needs.
    pub max_output_tokens: u32,
}

/// Upstream retry behaviour shared by every agent of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub upstream_retry: bool,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            upstream_retry: false,
            backoff: Duration::ZERO,
        }
    }
}

impl From<&PipelineSettings> for RetryPolicy {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            upstream_retry: settings.upstream_retry,
            backoff: Duration::from_millis(settings.retry_backoff_ms),
        }
    }
}
