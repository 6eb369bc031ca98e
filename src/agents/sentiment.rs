use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;

use crate::agent::{Agent, AgentResult, AgentSpec, Failure, FailurePolicy, RetryPolicy};
use crate::client::DynCompletionClient;
use crate::error::{FailureKind, ParseError};
use crate::parsing::{lenient_f64, parse_json_object};
use crate::schema::{AgentRequest, FieldKind, FieldSpec, Shape};

use super::{field, required_text};

const SYSTEM_PROMPT: &str = r#"You classify the sentiment of a piece of text.

Reply with a single JSON object and nothing else:
{
  "sentiment": "positive" | "negative" | "neutral",
  "confidence": number between 0 and 1,
  "explanation": "one sentence on what drove the classification"
}

If a "context" field is present, use it to interpret the text (for example,
who wrote it or where it was posted), but classify the "text" field itself.

Example:
{"sentiment": "positive", "confidence": 0.92, "explanation": "The text expresses strong enthusiasm for the product."}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl FromStr for Sentiment {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentAnalysis {
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub explanation: String,
}

pub fn spec() -> AgentSpec<SentimentAnalysis> {
    AgentSpec {
        name: "sentiment",
        system_prompt: SYSTEM_PROMPT,
        shape: Shape::new()
            .field(FieldSpec::required("text", FieldKind::non_empty_string()))
            .field(FieldSpec::optional("context", FieldKind::string())),
        parse,
        on_parse_failure: FailurePolicy::Loud,
        retry_on_parse: false,
        max_output_tokens: 256,
    }
}

pub fn parse(raw: &str) -> Result<SentimentAnalysis, ParseError> {
    let object: Map<String, Value> = parse_json_object(raw)?;

    let sentiment = match field(&object, "sentiment") {
        Some(Value::String(label)) => label
            .parse::<Sentiment>()
            .map_err(|_| ParseError::new(format!("Invalid sentiment value: {label}"), raw))?,
        Some(other) => {
            return Err(ParseError::new(format!("Invalid sentiment value: {other}"), raw));
        }
        None => return Err(ParseError::new("Invalid sentiment value: missing", raw)),
    };

    let confidence_value = field(&object, "confidence").unwrap_or(&Value::Null);
    let confidence = lenient_f64(confidence_value)
        .filter(|value| (0.0..=1.0).contains(value))
        .ok_or_else(|| {
            ParseError::new(
                format!("Confidence must be a number between 0 and 1, got: {confidence_value}"),
                raw,
            )
        })?;

    let explanation = required_text(&object, "explanation", raw)
        .map_err(|_| ParseError::new("Explanation is required", raw))?;

    Ok(SentimentAnalysis {
        sentiment,
        confidence,
        explanation,
    })
}

/// Sentiment agent with a direct text entry point.
pub struct SentimentAgent {
    agent: Agent<SentimentAnalysis>,
}

impl SentimentAgent {
    pub fn new(client: Arc<DynCompletionClient>, retry: RetryPolicy) -> Self {
        Self {
            agent: Agent::new(spec(), client).with_retry(retry),
        }
    }

    pub async fn run(
        &self,
        request: &AgentRequest,
        cancel: &CancellationToken,
    ) -> AgentResult<SentimentAnalysis> {
        self.agent.run(request, cancel).await
    }

    pub async fn analyze_text(
        &self,
        text: &str,
        context: Option<&str>,
    ) -> Result<SentimentAnalysis, Failure> {
        let mut request = json!({ "text": text });
        if let Some(context) = context {
            request["context"] = json!(context);
        }

        match self.run(&AgentRequest::new(request), &CancellationToken::new()).await {
            AgentResult::Success(analysis) => Ok(analysis),
            AgentResult::Failure(failure) => Err(failure),
            AgentResult::Cancelled => Err(Failure::new(
                FailureKind::Upstream,
                "sentiment analysis was cancelled",
            )),
        }
    }
}
