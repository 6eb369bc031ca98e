use serde::Serialize;
use serde_json::{Map, Value};

use crate::agent::{AgentSpec, FailurePolicy};
use crate::error::ParseError;
use crate::parsing::parse_json_object;
use crate::schema::{FieldKind, FieldSpec, Shape};

use super::{non_empty_text_list, text_list};

const SYSTEM_PROMPT: &str = r#"You design the analytics tracking plan for a campaign site.

The input lists the "pages" to instrument and the conversion "goals".
Name one event per meaningful interaction, in snake_case, covering every goal.
An optional "site" value describes the stack (free text or an object such as
{"framework": "next", "tag_manager": "gtm"}); tailor the notes to it.

Reply with a single JSON object and nothing else:
{
  "events": ["page_view", "lead_form_submit", "..."],
  "notes": ["optional implementation note", "..."]
}"#;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingPlan {
    pub events: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

pub fn spec() -> AgentSpec<TrackingPlan> {
    AgentSpec {
        name: "tracking",
        system_prompt: SYSTEM_PROMPT,
        shape: Shape::new()
            .field(FieldSpec::required(
                "pages",
                FieldKind::array_of(FieldKind::non_empty_string()),
            ))
            .field(FieldSpec::required(
                "goals",
                FieldKind::array_of(FieldKind::non_empty_string()),
            ))
            .field(FieldSpec::optional("site", FieldKind::Any)),
        parse,
        on_parse_failure: FailurePolicy::Loud,
        retry_on_parse: false,
        max_output_tokens: 768,
    }
}

pub fn parse(raw: &str) -> Result<TrackingPlan, ParseError> {
    let object: Map<String, Value> = parse_json_object(raw)?;
    Ok(TrackingPlan {
        events: non_empty_text_list(&object, "events", raw)?,
        notes: text_list(&object, "notes", raw)?,
    })
}
