use anyhow::{Result, anyhow};
use colored::Colorize;

use crate::config::{Config, LlmProvider};

use super::args::ConfigArgs;
use super::util::mask_api_key;

pub(crate) fn handle_config(args: &ConfigArgs) -> Result<()> {
    let mut config = Config::load_unvalidated()?;

    if args.has_updates() {
        apply_updates(&mut config, args)?;
        config.save()?;
        println!(
            "{} Configuration saved to {}",
            "✅".green(),
            Config::config_path()?.display()
        );
    }

    print_config(&config)
}

fn apply_updates(config: &mut Config, args: &ConfigArgs) -> Result<()> {
    if let Some(provider) = &args.provider {
        let provider: LlmProvider = provider
            .parse()
            .map_err(|_| anyhow!("Unknown provider '{provider}'. Use 'openrouter' or 'openai'."))?;
        if config.llm.base_url == config.llm.provider.default_base_url() {
            config.llm.base_url = provider.default_base_url().to_string();
        }
        config.llm.provider = provider;
    }

    if let Some(api_key) = &args.api_key {
        config.llm.api_key = api_key.trim().to_string();
    }

    if let Some(model) = &args.model {
        config.models.model = model.trim().to_string();
    }

    if let Some(timeout) = args.timeout {
        config.llm.timeout_secs = timeout;
    }

    if let Some(max_tokens) = args.max_tokens {
        config.models.max_tokens = max_tokens;
    }

    Ok(())
}

fn print_config(config: &Config) -> Result<()> {
    println!("{}", "📋 Current configuration:".bold());
    println!("   Provider: {}", config.llm.provider.display_name());
    println!("   Base URL: {}", config.llm.base_url);
    println!("   API Key: {}", mask_api_key(&config.llm.api_key));
    println!("   Timeout: {}s", config.llm.timeout_secs);
    println!("   Model: {}", config.models.model);
    println!("   Max Tokens: {}", config.models.max_tokens);
    println!("   Temperature: {}", config.models.temperature);
    println!("   Default Budget: {}", config.pipeline.default_budget);
    println!(
        "   Upstream Retry: {}",
        if config.pipeline.upstream_retry { "on" } else { "off" }
    );
    println!("   Bind: {}", config.server.bind);
    println!("   Tenants: {}", config.server.api_keys.len());
    println!(
        "   Rate Limit: {}/min (burst {})",
        config.server.rate_limit_per_minute, config.server.rate_limit_burst
    );
    println!("   Request Timeout: {}s", config.server.request_timeout_secs);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ConfigArgs {
        ConfigArgs {
            provider: None,
            api_key: None,
            model: None,
            timeout: None,
            max_tokens: None,
        }
    }

    #[test]
    fn switching_provider_follows_default_base_url() {
        let mut config = Config::builder().build();
        let update = ConfigArgs {
            provider: Some("openai".to_string()),
            ..args()
        };

        apply_updates(&mut config, &update).unwrap();

        assert_eq!(config.llm.provider, LlmProvider::OpenAi);
        assert_eq!(config.llm.base_url, LlmProvider::OpenAi.default_base_url());
    }

    #[test]
    fn custom_base_url_is_kept() {
        let mut config = Config::builder().build();
        config.llm.base_url = "http://localhost:8080/v1".to_string();
        let update = ConfigArgs {
            provider: Some("openai".to_string()),
            api_key: Some("  sk-test ".to_string()),
            ..args()
        };

        apply_updates(&mut config, &update).unwrap();

        assert_eq!(config.llm.base_url, "http://localhost:8080/v1");
        assert_eq!(config.llm.api_key, "sk-test");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let mut config = Config::builder().build();
        let update = ConfigArgs {
            provider: Some("acme".to_string()),
            ..args()
        };
        assert!(apply_updates(&mut config, &update).is_err());
    }
}
