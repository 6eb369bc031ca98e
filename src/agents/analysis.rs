use serde::Serialize;
use serde_json::{Map, Value};

use crate::agent::{AgentSpec, FailurePolicy};
use crate::error::ParseError;
use crate::parsing::parse_json_object;
use crate::schema::{FieldKind, FieldSpec, Shape};

use super::{field, object_list, optional_text, required_text, text_list};

const SYSTEM_PROMPT: &str = r#"You audit a marketing site before a campaign launch.

The input names the audit "scope": "full" covers landing pages, copy,
conversion paths and analytics, "ui" only layout and visual hierarchy,
"perf" only page weight and load time, "copy" only messaging. It may list
"urls" to focus on. When "max_issues" is given, report at most that many
issues, most severe first. When "include_insights" is false, return an
empty "insights" array.

Reply with a single JSON object and nothing else:
{
  "issues": [
    {"title": "short summary", "severity": "low" | "medium" | "high", "detail": "optional explanation"}
  ],
  "insights": ["optional observation", "..."]
}

Return an empty "issues" array when nothing needs fixing."#;

const SCOPES: &[&str] = &["full", "ui", "perf", "copy"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub title: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub issues: Vec<Issue>,
    pub insights: Vec<String>,
}

pub fn spec() -> AgentSpec<AnalysisReport> {
    AgentSpec {
        name: "analysis",
        system_prompt: SYSTEM_PROMPT,
        shape: Shape::new()
            .field(FieldSpec::required("scope", FieldKind::one_of(SCOPES)))
            .field(FieldSpec::optional(
                "urls",
                FieldKind::array_of(FieldKind::non_empty_string()),
            ))
            .field(FieldSpec::optional("max_issues", FieldKind::Integer))
            .field(FieldSpec::optional("include_insights", FieldKind::Bool)),
        parse,
        on_parse_failure: FailurePolicy::Loud,
        retry_on_parse: false,
        max_output_tokens: 1536,
    }
}

pub fn parse(raw: &str) -> Result<AnalysisReport, ParseError> {
    let object: Map<String, Value> = parse_json_object(raw)?;
    if field(&object, "issues").is_none() {
        return Err(ParseError::new("issues is required", raw));
    }

    let issues = object_list(&object, "issues", raw)?
        .into_iter()
        .enumerate()
        .map(|(index, issue)| parse_issue(index, issue, raw))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AnalysisReport {
        issues,
        insights: text_list(&object, "insights", raw)?,
    })
}

fn parse_issue(index: usize, issue: &Map<String, Value>, raw: &str) -> Result<Issue, ParseError> {
    let title = required_text(issue, "title", raw)
        .map_err(|_| ParseError::new(format!("issues[{index}].title is required"), raw))?;

    let label = field(issue, "severity").and_then(Value::as_str).unwrap_or_default();
    let severity = Severity::parse(label).ok_or_else(|| {
        ParseError::new(
            format!("issues[{index}].severity must be one of [low, medium, high], got: {label:?}"),
            raw,
        )
    })?;

    Ok(Issue {
        title,
        severity,
        detail: optional_text(issue, "detail"),
    })
}
