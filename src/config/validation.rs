use anyhow::{Result, anyhow, bail};

use super::types::Config;

pub fn validate(config: &Config) -> Result<()> {
    if config.llm.api_key.trim().is_empty() {
        let provider = config.llm.provider;
        let env_var = provider.api_key_env_var();
        return Err(anyhow!(
            "{} API key not found. Set {} or add it to {}",
            provider.display_name(),
            env_var,
            Config::config_path()?.display()
        ));
    }

    if config.models.max_tokens == 0 {
        bail!("models.max_tokens must be greater than zero");
    }

    if !(0.0..=2.0).contains(&config.models.temperature) {
        bail!("models.temperature must be between 0 and 2");
    }

    Ok(())
}

/// Extra requirements for running the HTTP service.
pub fn validate_server(config: &Config) -> Result<()> {
    validate(config)?;

    if config.server.api_keys.is_empty() {
        bail!(
            "No API keys configured for the server. Set LAUNCHPAD_API_KEYS=key:tenant or add server.api_keys to {}",
            Config::config_path()?.display()
        );
    }

    if config.server.rate_limit_per_minute == 0 {
        bail!("server.rate_limit_per_minute must be greater than zero");
    }

    Ok(())
}
