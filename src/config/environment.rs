use anyhow::{Context, Result, anyhow, bail};
use std::collections::BTreeMap;
use std::env;

use super::builder::ConfigBuilder;
use super::types::LlmProvider;

pub fn apply_env_overrides(mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
    if let Some(provider_raw) = env_string("LAUNCHPAD_PROVIDER")? {
        let provider = provider_raw
            .parse::<LlmProvider>()
            .with_context(|| format!("Failed to parse LAUNCHPAD_PROVIDER value '{provider_raw}'"))?;
        builder = builder.with_llm(|llm| {
            if llm.provider != provider {
                llm.provider = provider;
                llm.base_url = provider.default_base_url().to_string();
            }
        });
    }

    if let Some(base_url) = env_string("LAUNCHPAD_LLM_BASE_URL")? {
        builder = builder.with_llm(|llm| llm.base_url = base_url);
    }

    for provider in [LlmProvider::OpenRouter, LlmProvider::OpenAi] {
        if let Some(api_key) = env_string(provider.api_key_env_var())? {
            builder = builder.with_llm(|llm| {
                if llm.provider == provider {
                    llm.api_key = api_key;
                }
            });
        }
    }

    if let Some(timeout) = env_u64("LAUNCHPAD_TIMEOUT_SECS")? {
        builder = builder.with_llm(|llm| llm.timeout_secs = timeout);
    }

    if let Some(model) = env_string("LAUNCHPAD_MODEL")? {
        builder = builder.with_models(|models| models.model = model);
    }

    if let Some(max_tokens) = env_u32("LAUNCHPAD_MAX_TOKENS")? {
        builder = builder.with_models(|models| models.max_tokens = max_tokens);
    }

    if let Some(raw) = env_string("LAUNCHPAD_TEMPERATURE")? {
        let temperature = raw
            .parse::<f32>()
            .context("Failed to parse LAUNCHPAD_TEMPERATURE as f32")?;
        builder = builder.with_models(|models| models.temperature = temperature);
    }

    if let Some(budget) = env_u64("LAUNCHPAD_DEFAULT_BUDGET")? {
        builder = builder.with_pipeline(|pipeline| pipeline.default_budget = budget);
    }

    if let Some(retry) = env_bool("LAUNCHPAD_UPSTREAM_RETRY")? {
        builder = builder.with_pipeline(|pipeline| pipeline.upstream_retry = retry);
    }

    if let Some(bind) = env_string("LAUNCHPAD_BIND")? {
        builder = builder.with_server(|server| server.bind = bind);
    }

    if let Some(raw) = env_string("LAUNCHPAD_API_KEYS")? {
        let keys = parse_api_keys(&raw)?;
        builder = builder.with_server(|server| server.api_keys = keys);
    }

    if let Some(limit) = env_u32("LAUNCHPAD_RATE_LIMIT")? {
        builder = builder.with_server(|server| {
            server.rate_limit_per_minute = limit;
            server.rate_limit_burst = limit;
        });
    }

    if let Some(timeout) = env_u64("LAUNCHPAD_REQUEST_TIMEOUT_SECS")? {
        builder = builder.with_server(|server| server.request_timeout_secs = timeout);
    }

    Ok(builder)
}

/// Parses `key:tenant` pairs separated by commas.
pub fn parse_api_keys(raw: &str) -> Result<BTreeMap<String, String>> {
    let mut keys = BTreeMap::new();
    for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        let Some((key, tenant)) = entry.split_once(':') else {
            bail!("API key entry '{entry}' must have the form key:tenant");
        };
        let (key, tenant) = (key.trim(), tenant.trim());
        if key.is_empty() || tenant.is_empty() {
            bail!("API key entry '{entry}' must have the form key:tenant");
        }
        keys.insert(key.to_string(), tenant.to_string());
    }
    Ok(keys)
}

pub fn env_string(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(val) => Ok(Some(val)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(anyhow!("{key} contains invalid UTF-8")),
    }
}

pub fn env_u64(key: &str) -> Result<Option<u64>> {
    if let Some(value) = env_string(key)? {
        let parsed = value
            .parse::<u64>()
            .with_context(|| format!("Failed to parse {key} as u64"))?;
        Ok(Some(parsed))
    } else {
        Ok(None)
    }
}

pub fn env_u32(key: &str) -> Result<Option<u32>> {
    if let Some(value) = env_string(key)? {
        let parsed = value
            .parse::<u32>()
            .with_context(|| format!("Failed to parse {key} as u32"))?;
        Ok(Some(parsed))
    } else {
        Ok(None)
    }
}

pub fn env_bool(key: &str) -> Result<Option<bool>> {
    match env_string(key)?.as_deref().map(str::trim) {
        None => Ok(None),
        Some("1" | "true" | "yes" | "on") => Ok(Some(true)),
        Some("0" | "false" | "no" | "off") => Ok(Some(false)),
        Some(other) => Err(anyhow!("Failed to parse {key} value '{other}' as a boolean")),
    }
}
