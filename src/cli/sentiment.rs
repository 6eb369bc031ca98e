use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use colored::Colorize;

use crate::agent::RetryPolicy;
use crate::agents::sentiment::{Sentiment, SentimentAgent};
use crate::client::{DynCompletionClient, HttpCompletionClient};
use crate::config::Config;

use super::args::SentimentArgs;

pub(crate) async fn handle_sentiment(args: SentimentArgs, config: &Config) -> Result<()> {
    let text = args.text.join(" ").trim().to_owned();
    if text.is_empty() {
        bail!("Text cannot be empty");
    }

    let client: Arc<DynCompletionClient> = Arc::new(HttpCompletionClient::new(config)?);
    let agent = SentimentAgent::new(client, RetryPolicy::from(&config.pipeline));

    let analysis = tokio::select! {
        result = agent.analyze_text(&text, args.context.as_deref()) => {
            result.map_err(|failure| anyhow!("Sentiment analysis failed: {failure}"))?
        }
        _ = tokio::signal::ctrl_c() => bail!("Sentiment analysis cancelled"),
    };

    let label = match analysis.sentiment {
        Sentiment::Positive => analysis.sentiment.to_string().green(),
        Sentiment::Negative => analysis.sentiment.to_string().red(),
        Sentiment::Neutral => analysis.sentiment.to_string().yellow(),
    };
    println!("Sentiment: {} ({:.0}% confidence)", label.bold(), analysis.confidence * 100.0);
    println!("{}", analysis.explanation);

    Ok(())
}
