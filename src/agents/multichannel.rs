use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::agent::{AgentSpec, FailurePolicy};
use crate::config::DEFAULT_BUDGET;
use crate::error::ParseError;
use crate::parsing::{lenient_f64, parse_json_object};
use crate::schema::{FieldKind, FieldSpec, Shape};

use super::{non_empty_text_list, object_list, required_text};

const SYSTEM_PROMPT: &str = r#"You plan the channel mix for a marketing campaign.

The input gives the ideal customer profile ("icp", may be absent) and the
total "budget" in US dollars. Pick the channels most likely to reach that
profile and split the budget across them. Allocations must not exceed the
budget.

Reply with a single JSON object and nothing else:
{
  "channels": ["search", "linkedin", "..."],
  "allocations": [{"channel": "search", "amount": 4000}, "..."],
  "rationale": "optional one-paragraph justification"
}"#;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    pub channel: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelPlan {
    pub channels: Vec<String>,
    pub allocations: Vec<Allocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

pub fn spec() -> AgentSpec<ChannelPlan> {
    AgentSpec {
        name: "multichannel",
        system_prompt: SYSTEM_PROMPT,
        shape: Shape::new()
            .field(FieldSpec::optional("icp", FieldKind::string()))
            .field(
                FieldSpec::optional("budget", FieldKind::non_negative_number())
                    .with_default(json!(DEFAULT_BUDGET)),
            ),
        parse,
        on_parse_failure: FailurePolicy::Loud,
        retry_on_parse: false,
        max_output_tokens: 1024,
    }
}

pub fn parse(raw: &str) -> Result<ChannelPlan, ParseError> {
    let object: Map<String, Value> = parse_json_object(raw)?;

    let channels = non_empty_text_list(&object, "channels", raw)?;
    let allocations = object_list(&object, "allocations", raw)?
        .into_iter()
        .enumerate()
        .map(|(index, allocation)| parse_allocation(index, allocation, raw))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ChannelPlan {
        channels,
        allocations,
        rationale: super::optional_text(&object, "rationale"),
    })
}

fn parse_allocation(
    index: usize,
    allocation: &Map<String, Value>,
    raw: &str,
) -> Result<Allocation, ParseError> {
    let channel = required_text(allocation, "channel", raw)
        .map_err(|_| ParseError::new(format!("allocations[{index}].channel is required"), raw))?;

    let amount = allocation
        .get("amount")
        .and_then(lenient_f64)
        .filter(|amount| *amount >= 0.0)
        .ok_or_else(|| {
            ParseError::new(
                format!("allocations[{index}].amount must be a number >= 0"),
                raw,
            )
        })?;

    Ok(Allocation { channel, amount })
}
