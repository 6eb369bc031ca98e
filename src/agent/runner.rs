use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::DynCompletionClient;
use crate::error::{ParseError, StageError, UpstreamError};
use crate::prompt::{Prompt, compose};
use crate::schema::AgentRequest;

use super::outcome::AgentResult;
use super::spec::{AgentSpec, FailurePolicy, RetryPolicy};

/// Validate, prompt, complete, parse: one request/response unit around a
/// language model.
pub struct Agent<T> {
    spec: AgentSpec<T>,
    client: Arc<DynCompletionClient>,
    retry: RetryPolicy,
}

impl<T> Agent<T> {
    pub fn new(spec: AgentSpec<T>, client: Arc<DynCompletionClient>) -> Self {
        Self {
            spec,
            client,
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Runs the agent. Every failure is reported through the returned
    /// [`AgentResult`]; nothing is raised past this boundary.
    pub async fn run(&self, request: &AgentRequest, cancel: &CancellationToken) -> AgentResult<T> {
        let agent = self.spec.name;
        if cancel.is_cancelled() {
            return AgentResult::Cancelled;
        }

        let input = match self.spec.shape.validate(request) {
            Ok(input) => input,
            Err(error) => return self.fail(error.into()),
        };
        debug!(agent, fields = input.len(), "input validated");

        let prompt = compose(self.spec.system_prompt, &input)
            .with_max_output_tokens(self.spec.max_output_tokens);
        let mut parse_attempts = if self.spec.retry_on_parse { 2 } else { 1 };

        loop {
            parse_attempts -= 1;

            let raw = match self.complete(&prompt, cancel).await {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    info!(agent, "cancelled while waiting for completion");
                    return AgentResult::Cancelled;
                }
                Err(error) => return self.fail(error.into()),
            };
            debug!(agent, chars = raw.len(), "completion received");

            match (self.spec.parse)(&raw) {
                Ok(data) => {
                    debug!(agent, "output parsed");
                    return AgentResult::Success(data);
                }
                Err(error) if parse_attempts > 0 => {
                    warn!(agent, %error, "output rejected, asking the model again");
                }
                Err(error) => return self.parse_failed(error),
            }
        }
    }

    /// `Ok(None)` means the token was cancelled before a completion arrived.
    async fn complete(
        &self,
        prompt: &Prompt,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, UpstreamError> {
        match self.call_once(prompt, cancel).await {
            Err(error) if self.retry.upstream_retry => {
                let delay = jittered(self.retry.backoff);
                warn!(
                    agent = self.spec.name,
                    %error,
                    delay_ms = delay.as_millis() as u64,
                    "completion failed, retrying once"
                );
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(None),
                    _ = tokio::time::sleep(delay) => {}
                }
                self.call_once(prompt, cancel).await
            }
            other => other,
        }
    }

    async fn call_once(
        &self,
        prompt: &Prompt,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, UpstreamError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(None),
            result = self.client.complete(prompt) => result.map(Some),
        }
    }

    fn parse_failed(&self, error: ParseError) -> AgentResult<T> {
        match &self.spec.on_parse_failure {
            FailurePolicy::Loud => {
                debug!(agent = self.spec.name, raw = %error.raw, "unparseable completion");
                self.fail(error.into())
            }
            FailurePolicy::Soft(fallback) => {
                warn!(
                    agent = self.spec.name,
                    %error,
                    raw = %error.raw,
                    "output rejected, returning fallback"
                );
                AgentResult::Success(fallback())
            }
        }
    }

    fn fail(&self, error: StageError) -> AgentResult<T> {
        warn!(agent = self.spec.name, kind = %error.kind(), %error, "agent run failed");
        AgentResult::Failure(error.into())
    }
}

fn jittered(base: Duration) -> Duration {
    let base_ms = base.as_millis() as u64;
    if base_ms == 0 {
        return Duration::ZERO;
    }
    let jitter = rand::rng().random_range(0..=base_ms / 2);
    Duration::from_millis(base_ms + jitter)
}
