use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ParseError;

/// Returns the first balanced JSON object in `input`, ignoring `<think>`
/// blocks, markdown fences and surrounding prose.
pub fn extract_json_object(input: &str) -> Option<String> {
    let mut cleaned = input.to_string();

    loop {
        if let Some(think_start) = cleaned.find("<think>") {
            if let Some(think_end_pos) = cleaned[think_start..].find("</think>") {
                let absolute_end = think_start + think_end_pos + "</think>".len();
                cleaned.replace_range(think_start..absolute_end, "");
            } else {
                cleaned.replace_range(think_start.., "");
                break;
            }
        } else {
            break;
        }
    }

    let trimmed = cleaned.trim();
    let start = trimmed.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut end = None;
    for (idx, ch) in trimmed[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(start + idx);
                    break;
                }
            }
            _ => {}
        }
    }

    let end = end?;
    Some(trimmed[start..=end].to_string())
}

/// Extracts the JSON object from a completion and deserializes it.
pub fn parse_json_object<T: DeserializeOwned>(raw: &str) -> Result<T, ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::new("response was empty", raw));
    }

    let fragment = extract_json_object(raw)
        .ok_or_else(|| ParseError::new("response did not contain a JSON object", raw))?;

    serde_json::from_str(&fragment)
        .map_err(|err| ParseError::new(format!("invalid response format: {err}"), raw))
}

/// Reads a number that the model may have emitted as a JSON number or a
/// numeric string.
pub fn lenient_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn strips_think_blocks_and_prose() {
        let raw = "<think>maybe {not this}</think>Sure! Here it is: {\"a\":1} thanks";
        assert_eq!(extract_json_object(raw).as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn handles_unclosed_think_block() {
        assert_eq!(extract_json_object("{\"a\":1}<think>{\"b\":2}"), Some("{\"a\":1}".to_string()));
        assert_eq!(extract_json_object("<think>{\"b\":2}"), None);
    }

    #[test]
    fn unwraps_code_fences() {
        let raw = "```json\n{\"files\":[]}\n```";
        assert_eq!(extract_json_object(raw).as_deref(), Some("{\"files\":[]}"));
    }

    #[test]
    fn ignores_braces_inside_strings() {
        let raw = r#"{"content":"fn main() { println!(\"}\"); }","n":1} trailing"#;
        let fragment = extract_json_object(raw).unwrap();
        let value: Value = serde_json::from_str(&fragment).unwrap();
        assert_eq!(value["n"], json!(1));
    }

    #[test]
    fn reports_missing_object() {
        let err = parse_json_object::<Value>("no json here").unwrap_err();
        assert_eq!(err.constraint, "response did not contain a JSON object");
        assert_eq!(err.raw, "no json here");
    }

    #[test]
    fn lenient_numbers() {
        assert_eq!(lenient_f64(&json!(0.5)), Some(0.5));
        assert_eq!(lenient_f64(&json!(" 0.25 ")), Some(0.25));
        assert_eq!(lenient_f64(&json!("high")), None);
        assert_eq!(lenient_f64(&json!(null)), None);
        assert_eq!(lenient_f64(&json!("inf")), None);
        assert_eq!(lenient_f64(&json!("1e999")), None);
        assert_eq!(lenient_f64(&json!("NaN")), None);
    }
}
