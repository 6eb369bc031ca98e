use serde::Serialize;
use serde_json::{Map, Value};

use crate::agent::{AgentSpec, FailurePolicy};
use crate::error::ParseError;
use crate::parsing::parse_json_object;
use crate::schema::{FieldKind, FieldSpec, Shape};

use super::{field, object_list, required_text, text_list};

const SYSTEM_PROMPT: &str = r#"You generate and modify source files for a marketing site.

The input holds the "task" to carry out and, optionally, the current
"files" it concerns (each with a "path" and possibly its "content").
Return the complete new content of every file you create or change.

Reply with a single JSON object and nothing else:
{
  "files": [{"path": "path/to/file", "content": "full file content"}],
  "changelog": ["Created path/to/file", "Updated path/to/other"]
}"#;

pub const FALLBACK_NOTE: &str =
    "Model output could not be parsed as JSON; no files were generated.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedChanges {
    pub files: Vec<GeneratedFile>,
    pub changelog: Vec<String>,
}

pub fn spec() -> AgentSpec<GeneratedChanges> {
    let existing_file = Shape::new()
        .field(FieldSpec::required("path", FieldKind::non_empty_string()))
        .field(FieldSpec::optional("content", FieldKind::string()));

    AgentSpec {
        name: "generation",
        system_prompt: SYSTEM_PROMPT,
        shape: Shape::new()
            .field(FieldSpec::required("task", FieldKind::non_empty_string()))
            .field(FieldSpec::optional(
                "files",
                FieldKind::array_of(FieldKind::Object(existing_file)),
            )),
        parse,
        on_parse_failure: FailurePolicy::Soft(fallback),
        retry_on_parse: false,
        max_output_tokens: 4096,
    }
}

fn fallback() -> GeneratedChanges {
    GeneratedChanges {
        files: Vec::new(),
        changelog: vec![FALLBACK_NOTE.to_string()],
    }
}

pub fn parse(raw: &str) -> Result<GeneratedChanges, ParseError> {
    let object: Map<String, Value> = parse_json_object(raw)?;

    let files = object_list(&object, "files", raw)?
        .into_iter()
        .enumerate()
        .map(|(index, file)| {
            let path = required_text(file, "path", raw)
                .map_err(|_| ParseError::new(format!("files[{index}].path is required"), raw))?;
            let content = match field(file, "content") {
                None => String::new(),
                Some(Value::String(content)) => content.clone(),
                Some(_) => {
                    return Err(ParseError::new(
                        format!("files[{index}].content must be a string"),
                        raw,
                    ));
                }
            };
            Ok(GeneratedFile { path, content })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GeneratedChanges {
        files,
        changelog: text_list(&object, "changelog", raw)?,
    })
}
