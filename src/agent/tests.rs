use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::error::{FailureKind, ParseError, UpstreamError};
use crate::parsing::parse_json_object;
use crate::schema::{AgentRequest, FieldKind, FieldSpec, Shape};
use crate::test_support::{ScriptedClient, StalledClient, shared};

use super::{Agent, AgentResult, AgentSpec, FailurePolicy, RetryPolicy};

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Echo {
    word: String,
}

fn parse_echo(raw: &str) -> Result<Echo, ParseError> {
    let echo: Echo = parse_json_object(raw)?;
    if echo.word.trim().is_empty() {
        return Err(ParseError::new("word must not be empty", raw));
    }
    Ok(echo)
}

fn echo_spec() -> AgentSpec<Echo> {
    AgentSpec {
        name: "echo",
        system_prompt: "Repeat the word.",
        shape: Shape::new().field(FieldSpec::required("word", FieldKind::non_empty_string())),
        parse: parse_echo,
        on_parse_failure: FailurePolicy::Loud,
        retry_on_parse: false,
        max_output_tokens: 64,
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        upstream_retry: true,
        backoff: Duration::from_millis(1),
    }
}

fn request() -> AgentRequest {
    AgentRequest::new(json!({ "word": "hello" }))
}

#[tokio::test]
async fn run_returns_parsed_output() {
    let client = ScriptedClient::replying(&[r#"{"word":"hello"}"#]);
    let agent = Agent::new(echo_spec(), shared(client.clone()));

    let result = agent.run(&request(), &CancellationToken::new()).await;

    assert_eq!(
        result,
        AgentResult::Success(Echo {
            word: "hello".to_string()
        })
    );
    assert_eq!(client.calls(), 1);
    assert_eq!(client.prompts()[0].system(), "Repeat the word.");
    assert_eq!(client.prompts()[0].max_output_tokens(), Some(64));
}

#[tokio::test]
async fn validation_failure_skips_the_model() {
    let client = ScriptedClient::replying(&[r#"{"word":"hello"}"#]);
    let agent = Agent::new(echo_spec(), shared(client.clone())).with_retry(fast_retry());

    let result = agent
        .run(&AgentRequest::new(json!({ "other": 1 })), &CancellationToken::new())
        .await;

    let failure = result.failure().expect("validation should fail");
    assert_eq!(failure.kind, FailureKind::Validation);
    assert!(failure.message.contains("word"));
    assert!(failure.message.starts_with("validation:"));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn upstream_failure_is_reported_without_retry_by_default() {
    let client = ScriptedClient::new([
        Err(UpstreamError::Unavailable),
        Ok(r#"{"word":"hello"}"#.to_string()),
    ]);
    let agent = Agent::new(echo_spec(), shared(client.clone()));

    let result = agent.run(&request(), &CancellationToken::new()).await;

    let failure = result.failure().expect("upstream should fail");
    assert_eq!(failure.kind, FailureKind::Upstream);
    assert_eq!(failure.message, "completion: service is temporarily unavailable");
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn upstream_failure_is_retried_once_when_enabled() {
    let client = ScriptedClient::new([
        Err(UpstreamError::Unavailable),
        Ok(r#"{"word":"hello"}"#.to_string()),
    ]);
    let agent = Agent::new(echo_spec(), shared(client.clone())).with_retry(fast_retry());

    let result = agent.run(&request(), &CancellationToken::new()).await;

    assert!(result.is_success());
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn second_upstream_failure_is_final() {
    let client = ScriptedClient::new([
        Err(UpstreamError::Unavailable),
        Err(UpstreamError::Unauthorized),
        Ok(r#"{"word":"hello"}"#.to_string()),
    ]);
    let agent = Agent::new(echo_spec(), shared(client.clone())).with_retry(fast_retry());

    let result = agent.run(&request(), &CancellationToken::new()).await;

    assert_eq!(result.failure().map(|f| f.kind), Some(FailureKind::Upstream));
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn parse_failure_is_loud_by_default() {
    let client = ScriptedClient::replying(&[r#"{"word":"  "}"#, r#"{"word":"hello"}"#]);
    let agent = Agent::new(echo_spec(), shared(client.clone())).with_retry(fast_retry());

    let result = agent.run(&request(), &CancellationToken::new()).await;

    let failure = result.failure().expect("parse should fail");
    assert_eq!(failure.kind, FailureKind::Parse);
    assert_eq!(failure.message, "parse: word must not be empty");
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn parse_retry_asks_again_with_identical_prompt() {
    let client = ScriptedClient::replying(&["not json", r#"{"word":"hello"}"#]);
    let spec = AgentSpec {
        retry_on_parse: true,
        ..echo_spec()
    };
    let agent = Agent::new(spec, shared(client.clone()));

    let result = agent.run(&request(), &CancellationToken::new()).await;

    assert!(result.is_success());
    let prompts = client.prompts();
    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[0], prompts[1]);
}

#[tokio::test]
async fn soft_policy_returns_fallback() {
    let client = ScriptedClient::replying(&["I cannot help with that."]);
    let spec = AgentSpec {
        on_parse_failure: FailurePolicy::Soft(|| Echo {
            word: "fallback".to_string(),
        }),
        ..echo_spec()
    };
    let agent = Agent::new(spec, shared(client));

    let result = agent.run(&request(), &CancellationToken::new()).await;

    assert_eq!(result.data().map(|echo| echo.word.as_str()), Some("fallback"));
}

#[tokio::test]
async fn cancelled_token_stops_before_any_call() {
    let client = ScriptedClient::replying(&[r#"{"word":"hello"}"#]);
    let agent = Agent::new(echo_spec(), shared(client.clone()));
    let token = CancellationToken::new();
    token.cancel();

    let result = agent.run(&request(), &token).await;

    assert_eq!(result, AgentResult::Cancelled);
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn cancellation_aborts_in_flight_completion() {
    let agent = Agent::new(echo_spec(), Arc::new(StalledClient));
    let token = CancellationToken::new();
    let request = request();

    let (result, _) = tokio::join!(agent.run(&request, &token), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    assert_eq!(result, AgentResult::Cancelled);
}
