use anyhow::{Context, Result};
use dirs::home_dir;
use std::{fs, path::Path};

use super::Config;
use super::builder::ConfigBuilder;
use super::environment::apply_env_overrides;
use super::types::{FileConfig, LlmProvider, PersistedConfig};
use super::validation::validate;

impl Config {
    pub fn config_path() -> Result<std::path::PathBuf> {
        let mut path = home_dir().context("Could not determine home directory")?;
        path.push(".launchpad/config");
        Ok(path)
    }

    #[cfg(test)]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Defaults, then the config file, then environment overrides. Not validated.
    pub fn load_unvalidated() -> Result<Self> {
        let path = Self::config_path()?;
        let mut builder = ConfigBuilder::new();

        if path.exists() {
            builder = Self::apply_file(builder, &path)?;
        }

        builder = apply_env_overrides(builder)?;
        Ok(builder.build())
    }

    pub fn load() -> Result<Self> {
        let config = Self::load_unvalidated()?;
        validate(&config)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Unable to create config directory {}", parent.display())
            })?;
        }

        let payload = PersistedConfig::from(self);
        let json = serde_json::to_string_pretty(&payload)
            .context("Failed to serialize configuration to JSON")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    #[cfg(test)]
    pub fn validate(&self) -> Result<()> {
        validate(self)
    }

    fn apply_file(builder: ConfigBuilder, path: &Path) -> Result<ConfigBuilder> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed reading config at {}", path.display()))?;

        if contents.trim().is_empty() {
            return Ok(builder);
        }

        let raw: FileConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed parsing JSON config at {}", path.display()))?;

        raw.apply(builder)
    }
}

impl FileConfig {
    pub fn apply(self, mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
        if let Some(llm) = self.llm {
            let provider = llm
                .provider
                .as_deref()
                .map(str::parse::<LlmProvider>)
                .transpose()?;
            builder = builder.with_llm(|settings| {
                if let Some(provider) = provider {
                    if settings.provider != provider {
                        settings.provider = provider;
                        settings.base_url = provider.default_base_url().to_string();
                    }
                }
                if let Some(api_key) = llm.api_key {
                    settings.api_key = api_key;
                }
                if let Some(timeout) = llm.timeout_secs {
                    settings.timeout_secs = timeout;
                }
                if let Some(base_url) = llm.base_url {
                    settings.base_url = base_url;
                }
                if let Some(user_agent) = llm.user_agent {
                    settings.user_agent = user_agent;
                }
            });
        }

        if let Some(models) = self.models {
            builder = builder.with_models(|settings| {
                if let Some(model) = models.model {
                    settings.model = model;
                }
                if let Some(max_tokens) = models.max_tokens {
                    settings.max_tokens = max_tokens;
                }
                if let Some(temperature) = models.temperature {
                    settings.temperature = temperature;
                }
            });
        }

        if let Some(pipeline) = self.pipeline {
            builder = builder.with_pipeline(|settings| {
                if let Some(budget) = pipeline.default_budget {
                    settings.default_budget = budget;
                }
                if let Some(retry) = pipeline.upstream_retry {
                    settings.upstream_retry = retry;
                }
                if let Some(backoff) = pipeline.retry_backoff_ms {
                    settings.retry_backoff_ms = backoff;
                }
            });
        }

        if let Some(server) = self.server {
            builder = builder.with_server(|settings| {
                if let Some(bind) = server.bind {
                    settings.bind = bind;
                }
                if let Some(api_keys) = server.api_keys {
                    settings.api_keys = api_keys;
                }
                if let Some(limit) = server.rate_limit_per_minute {
                    settings.rate_limit_per_minute = limit;
                }
                if let Some(burst) = server.rate_limit_burst {
                    settings.rate_limit_burst = burst;
                }
                if let Some(timeout) = server.request_timeout_secs {
                    settings.request_timeout_secs = timeout;
                }
            });
        }

        Ok(builder)
    }
}
