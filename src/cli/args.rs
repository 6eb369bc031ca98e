use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use super::commands;

/// Entry point for the `launchpad` command-line interface.
#[derive(Debug, Parser)]
#[command(
    name = "launchpad",
    about = "Campaign launch pipeline backed by LLM agents",
    version,
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the pipeline over HTTP.
    Serve(ServeArgs),
    /// Run the pipeline once and print the resulting state.
    Run(RunArgs),
    /// Classify the sentiment of a piece of text.
    Sentiment(SentimentArgs),
    /// Show or update the saved configuration.
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on (defaults to server.bind from config)
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Goal as a JSON object, e.g. '{"intent":"spring sale"}'
    #[arg(conflicts_with_all = ["intent", "icp", "budget"])]
    pub goal: Option<String>,

    /// Campaign intent
    #[arg(long)]
    pub intent: Option<String>,

    /// Ideal customer profile
    #[arg(long)]
    pub icp: Option<String>,

    /// Campaign budget
    #[arg(long)]
    pub budget: Option<f64>,
}

#[derive(Debug, Args)]
pub struct SentimentArgs {
    /// Text to classify
    #[arg(required = true)]
    pub text: Vec<String>,

    /// Extra context that helps interpret the text
    #[arg(long)]
    pub context: Option<String>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Select the LLM provider (openrouter or openai)
    #[arg(long)]
    pub provider: Option<String>,

    /// Set the API key
    #[arg(long)]
    pub api_key: Option<String>,

    /// Set the model
    #[arg(long)]
    pub model: Option<String>,

    /// Set timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Set max tokens
    #[arg(long)]
    pub max_tokens: Option<u32>,
}

impl ConfigArgs {
    pub fn has_updates(&self) -> bool {
        self.provider.is_some()
            || self.api_key.is_some()
            || self.model.is_some()
            || self.timeout.is_some()
            || self.max_tokens.is_some()
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        commands::run(self).await
    }
}
