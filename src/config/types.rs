use anyhow::anyhow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::constants::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENROUTER_BASE_URL};

#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmSettings,
    pub models: ModelSettings,
    pub pipeline: PipelineSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub api_key: String,
    pub timeout_secs: u64,
    pub base_url: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LlmProvider {
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "openai")]
    OpenAi,
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmProvider::OpenRouter => write!(f, "openrouter"),
            LlmProvider::OpenAi => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openrouter" => Ok(LlmProvider::OpenRouter),
            "openai" => Ok(LlmProvider::OpenAi),
            other => Err(anyhow!("Unknown LLM provider '{other}'")),
        }
    }
}

impl LlmProvider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            LlmProvider::OpenRouter => DEFAULT_OPENROUTER_BASE_URL,
            LlmProvider::OpenAi => DEFAULT_OPENAI_BASE_URL,
        }
    }

    pub fn api_key_env_var(self) -> &'static str {
        match self {
            LlmProvider::OpenRouter => "OPENROUTER_API_KEY",
            LlmProvider::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            LlmProvider::OpenRouter => "OpenRouter",
            LlmProvider::OpenAi => "OpenAI",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub model: String,
    /// Context window used to size the completion budget.
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub default_budget: u64,
    pub upstream_retry: bool,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub bind: String,
    /// API key to tenant id.
    pub api_keys: BTreeMap<String, String>,
    pub rate_limit_per_minute: u32,
    pub rate_limit_burst: u32,
    pub request_timeout_secs: u64,
}

// File configuration types
#[derive(Debug, Default, Deserialize)]
pub(super) struct FileConfig {
    #[serde(default)]
    pub llm: Option<FileLlmSettings>,
    #[serde(default)]
    pub models: Option<FileModelSettings>,
    #[serde(default)]
    pub pipeline: Option<FilePipelineSettings>,
    #[serde(default)]
    pub server: Option<FileServerSettings>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FileLlmSettings {
    pub provider: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
    pub base_url: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FileModelSettings {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FilePipelineSettings {
    pub default_budget: Option<u64>,
    pub upstream_retry: Option<bool>,
    pub retry_backoff_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FileServerSettings {
    pub bind: Option<String>,
    pub api_keys: Option<BTreeMap<String, String>>,
    pub rate_limit_per_minute: Option<u32>,
    pub rate_limit_burst: Option<u32>,
    pub request_timeout_secs: Option<u64>,
}

// Serialization helpers
#[derive(Serialize)]
pub(super) struct PersistedConfig<'a> {
    pub llm: PersistedLlm<'a>,
    pub models: PersistedModels<'a>,
    pub pipeline: PersistedPipeline,
    pub server: PersistedServer<'a>,
}

#[derive(Serialize)]
pub(super) struct PersistedLlm<'a> {
    pub provider: LlmProvider,
    pub api_key: &'a str,
    pub timeout_secs: u64,
    pub base_url: &'a str,
    pub user_agent: &'a str,
}

#[derive(Serialize)]
pub(super) struct PersistedModels<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Serialize)]
pub(super) struct PersistedPipeline {
    pub default_budget: u64,
    pub upstream_retry: bool,
    pub retry_backoff_ms: u64,
}

#[derive(Serialize)]
pub(super) struct PersistedServer<'a> {
    pub bind: &'a str,
    pub api_keys: &'a BTreeMap<String, String>,
    pub rate_limit_per_minute: u32,
    pub rate_limit_burst: u32,
    pub request_timeout_secs: u64,
}

impl<'a> From<&'a Config> for PersistedConfig<'a> {
    fn from(config: &'a Config) -> Self {
        PersistedConfig {
            llm: PersistedLlm {
                provider: config.llm.provider,
                api_key: &config.llm.api_key,
                timeout_secs: config.llm.timeout_secs,
                base_url: &config.llm.base_url,
                user_agent: &config.llm.user_agent,
            },
            models: PersistedModels {
                model: &config.models.model,
                max_tokens: config.models.max_tokens,
                temperature: config.models.temperature,
            },
            pipeline: PersistedPipeline {
                default_budget: config.pipeline.default_budget,
                upstream_retry: config.pipeline.upstream_retry,
                retry_backoff_ms: config.pipeline.retry_backoff_ms,
            },
            server: PersistedServer {
                bind: &config.server.bind,
                api_keys: &config.server.api_keys,
                rate_limit_per_minute: config.server.rate_limit_per_minute,
                rate_limit_burst: config.server.rate_limit_burst,
                request_timeout_secs: config.server.request_timeout_secs,
            },
        }
    }
}
