//! The agents shipped with launchpad. Each module exposes a `spec()` that
//! configures the generic [`crate::agent::Agent`].

pub mod analysis;
pub mod generation;
pub mod multichannel;
pub mod sentiment;
pub mod tracking;

use serde_json::{Map, Value};

use crate::error::ParseError;

/// Looks up `name`, treating an explicit `null` as absent.
fn field<'a>(object: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    object.get(name).filter(|value| !value.is_null())
}

/// A string field that must be present and non-blank; returned trimmed.
fn required_text(object: &Map<String, Value>, name: &str, raw: &str) -> Result<String, ParseError> {
    match field(object, name).and_then(Value::as_str).map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(ParseError::new(format!("{name} is required"), raw)),
    }
}

fn optional_text(object: &Map<String, Value>, name: &str) -> Option<String> {
    field(object, name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Array of objects under `name`. A missing field yields an empty list.
fn object_list<'a>(
    object: &'a Map<String, Value>,
    name: &str,
    raw: &str,
) -> Result<Vec<&'a Map<String, Value>>, ParseError> {
    let Some(value) = field(object, name) else {
        return Ok(Vec::new());
    };
    let items = value
        .as_array()
        .ok_or_else(|| ParseError::new(format!("{name} must be an array"), raw))?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_object()
                .ok_or_else(|| ParseError::new(format!("{name}[{index}] must be an object"), raw))
        })
        .collect()
}

/// Array of strings under `name`. A missing field yields an empty list;
/// blank entries are rejected.
fn text_list(object: &Map<String, Value>, name: &str, raw: &str) -> Result<Vec<String>, ParseError> {
    let Some(value) = field(object, name) else {
        return Ok(Vec::new());
    };
    let items = value
        .as_array()
        .ok_or_else(|| ParseError::new(format!("{name} must be an array"), raw))?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| match item.as_str().map(str::trim) {
            Some(text) if !text.is_empty() => Ok(text.to_string()),
            _ => Err(ParseError::new(
                format!("{name}[{index}] must be a non-empty string"),
                raw,
            )),
        })
        .collect()
}

fn non_empty_text_list(
    object: &Map<String, Value>,
    name: &str,
    raw: &str,
) -> Result<Vec<String>, ParseError> {
    let items = text_list(object, name, raw)?;
    if items.is_empty() {
        return Err(ParseError::new(format!("{name} must not be empty"), raw));
    }
    Ok(items)
}
