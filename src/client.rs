use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{Config, LlmProvider};
use crate::error::UpstreamError;
use crate::prompt::{Message, Prompt, Role};

/// Sends a prompt to a language model and returns the raw completion text.
///
/// Implementations make a single attempt per call; retry policy lives with
/// the caller.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> Result<String, UpstreamError>;
}

pub type DynCompletionClient = dyn CompletionClient;

/// OpenAI-compatible `/chat/completions` client.
#[derive(Debug, Clone)]
pub struct HttpCompletionClient {
    http: Client,
    base_url: String,
    api_key: String,
    user_agent: String,
    provider: LlmProvider,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl HttpCompletionClient {
    pub fn new(config: &Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.llm.timeout_secs);
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: config.llm.base_url.trim_end_matches('/').to_string(),
            api_key: config.llm.api_key.clone(),
            user_agent: config.llm.user_agent.clone(),
            provider: config.llm.provider,
            model: config.models.model.clone(),
            max_tokens: config.models.max_tokens,
            temperature: config.models.temperature,
        })
    }

    pub async fn chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, UpstreamError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut req_builder = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("User-Agent", &self.user_agent)
            .json(&request);

        if matches!(self.provider, LlmProvider::OpenRouter) {
            req_builder = req_builder.header("X-Title", "launchpad");
        }

        let response = req_builder
            .send()
            .await
            .map_err(|err| UpstreamError::Transport(err.to_string()))?;

        match response.status() {
            StatusCode::OK => response
                .json::<ChatCompletionResponse>()
                .await
                .map_err(|err| UpstreamError::Malformed(err.to_string())),
            StatusCode::TOO_MANY_REQUESTS => {
                let error_text = response.text().await.unwrap_or_default();
                Err(UpstreamError::RateLimited(error_text))
            }
            StatusCode::UNAUTHORIZED => Err(UpstreamError::Unauthorized),
            StatusCode::BAD_REQUEST => {
                let error_text = response.text().await.unwrap_or_default();
                Err(UpstreamError::BadRequest(error_text))
            }
            StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE => Err(UpstreamError::Unavailable),
            status => {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                Err(UpstreamError::Status {
                    status: status.as_u16(),
                    body: error_text,
                })
            }
        }
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String, UpstreamError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: prompt.messages().iter().map(ChatMessage::from).collect(),
            max_tokens: Some(completion_budget(self.max_tokens, prompt)),
            temperature: Some(self.temperature),
        };

        debug!(model = %self.model, messages = request.messages.len(), "sending completion request");
        let response = self.chat_completion(request).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(UpstreamError::Empty)?;

        let content = choice.message.content.trim();
        if content.is_empty() {
            return Err(UpstreamError::Empty);
        }

        debug!(finish_reason = ?choice.finish_reason, chars = content.len(), "completion received");
        Ok(content.to_string())
    }
}

/// Tokens left for the reply once the prompt is in the context window,
/// capped by what the prompt's agent expects to need. Never below one.
fn completion_budget(context_tokens: u32, prompt: &Prompt) -> u32 {
    let prompt_tokens: u32 = prompt
        .messages()
        .iter()
        // ~4 characters per token, plus role framing
        .map(|message| message.content.chars().count().div_ceil(4) as u32 + 4)
        .sum();
    let room = context_tokens.saturating_sub(prompt_tokens);

    prompt
        .max_output_tokens()
        .map_or(room, |cap| room.min(cap))
        .max(1)
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatMessageRole,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMessageRole {
    System,
    User,
    Assistant,
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        let role = match message.role {
            Role::System => ChatMessageRole::System,
            Role::User => ChatMessageRole::User,
        };
        Self {
            role,
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
    pub finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::prompt::compose;
    use crate::schema::{AgentRequest, FieldKind, FieldSpec, Shape};

    fn sample_config(base_url: String) -> Config {
        Config::builder()
            .with_llm(|llm| {
                llm.api_key = "test-key".to_string();
                llm.base_url = base_url;
                llm.timeout_secs = 5;
            })
            .with_models(|models| {
                models.model = "test/model".to_string();
                models.max_tokens = 2048;
                models.temperature = 0.2;
            })
            .build()
    }

    fn sample_prompt() -> Prompt {
        let input = Shape::new()
            .field(FieldSpec::required("text", FieldKind::string()))
            .validate(&AgentRequest::new(json!({ "text": "I love this product!" })))
            .unwrap();
        compose("You are a sentiment analyzer.", &input)
    }

    fn completion_body(content: &str) -> serde_json::Value {
        json!({
            "choices": [
                {
                    "index": 0,
                    "finish_reason": "stop",
                    "message": { "role": "assistant", "content": content }
                }
            ]
        })
    }

    #[tokio::test]
    async fn complete_sends_prompt_and_returns_content() {
        let server = MockServer::start_async().await;
        let prompt = sample_prompt();
        let budget = completion_budget(2048, &prompt);

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("Authorization", "Bearer test-key")
                    .json_body(json!({
                        "model": "test/model",
                        "messages": [
                            { "role": "system", "content": "You are a sentiment analyzer." },
                            { "role": "user", "content": "{\"text\":\"I love this product!\"}" }
                        ],
                        "max_tokens": budget,
                        "temperature": 0.2
                    }));
                then.status(200)
                    .json_body(completion_body("  {\"sentiment\":\"positive\"}  "));
            })
            .await;

        let client = HttpCompletionClient::new(&sample_config(server.url("/v1"))).unwrap();
        let content = client.complete(&prompt).await.unwrap();

        assert_eq!(content, "{\"sentiment\":\"positive\"}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn complete_maps_status_codes() {
        let server = MockServer::start_async().await;
        let client = HttpCompletionClient::new(&sample_config(server.url("/v1"))).unwrap();

        let unauthorized = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(401);
            })
            .await;
        let err = client.complete(&sample_prompt()).await.unwrap_err();
        assert_eq!(err, UpstreamError::Unauthorized);
        unauthorized.delete_async().await;

        let limited = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(429).body("too many requests per second");
            })
            .await;
        let err = client.complete(&sample_prompt()).await.unwrap_err();
        assert_eq!(
            err,
            UpstreamError::RateLimited("too many requests per second".to_string())
        );
        limited.delete_async().await;

        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(503);
            })
            .await;
        let err = client.complete(&sample_prompt()).await.unwrap_err();
        assert_eq!(err, UpstreamError::Unavailable);
    }

    #[test]
    fn completion_budget_respects_agent_cap_and_context() {
        // system: 29 chars -> 8 + 4, user: 31 chars -> 8 + 4
        let prompt = sample_prompt();
        assert_eq!(completion_budget(2048, &prompt), 2048 - 24);

        let capped = sample_prompt().with_max_output_tokens(256);
        assert_eq!(completion_budget(2048, &capped), 256);
        assert_eq!(completion_budget(100, &capped), 76);
        assert_eq!(completion_budget(10, &capped), 1);
    }

    #[tokio::test]
    async fn complete_sends_agent_output_cap() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .json_body_partial(r#"{ "max_tokens": 256 }"#);
                then.status(200).json_body(completion_body("{}"));
            })
            .await;

        let client = HttpCompletionClient::new(&sample_config(server.url("/v1"))).unwrap();
        let prompt = sample_prompt().with_max_output_tokens(256);
        client.complete(&prompt).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn complete_rejects_empty_choices() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(json!({ "choices": [] }));
            })
            .await;

        let client = HttpCompletionClient::new(&sample_config(server.url("/v1"))).unwrap();
        let err = client.complete(&sample_prompt()).await.unwrap_err();
        assert_eq!(err, UpstreamError::Empty);
    }

    #[tokio::test]
    async fn complete_rejects_blank_content() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(completion_body("   "));
            })
            .await;

        let client = HttpCompletionClient::new(&sample_config(server.url("/v1"))).unwrap();
        let err = client.complete(&sample_prompt()).await.unwrap_err();
        assert_eq!(err, UpstreamError::Empty);
    }
}
