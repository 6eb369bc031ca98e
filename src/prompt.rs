use serde::{Deserialize, Serialize};

use crate::schema::ValidatedInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Ordered messages sent to the completion endpoint. The first message is
/// always the system instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

impl Prompt {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Upper bound on the reply length worth requesting for this prompt.
    pub fn max_output_tokens(&self) -> Option<u32> {
        self.max_output_tokens
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }
}

#[cfg(test)]
impl Prompt {
    pub fn system(&self) -> &str {
        &self.messages[0].content
    }

    pub fn user(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map(|message| message.content.as_str())
    }
}

/// Builds `[system instruction, validated input as JSON]`.
pub fn compose(system_prompt: &str, input: &ValidatedInput) -> Prompt {
    Prompt {
        messages: vec![
            Message {
                role: Role::System,
                content: system_prompt.to_string(),
            },
            Message {
                role: Role::User,
                content: input.to_json(),
            },
        ],
        max_output_tokens: None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::{AgentRequest, FieldKind, FieldSpec, Shape};

    fn input(value: serde_json::Value) -> ValidatedInput {
        Shape::new()
            .field(FieldSpec::required("text", FieldKind::string()))
            .field(FieldSpec::optional("context", FieldKind::string()))
            .validate(&AgentRequest::new(value))
            .unwrap()
    }

    #[test]
    fn system_instruction_comes_first() {
        let prompt = compose("be terse", &input(json!({ "text": "hi" })));

        let roles: Vec<Role> = prompt.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User]);
        assert_eq!(prompt.system(), "be terse");
        assert_eq!(prompt.user(), Some(r#"{"text":"hi"}"#));
    }

    #[test]
    fn composition_is_deterministic() {
        let first = compose(
            "sys",
            &input(json!({ "text": "I love this product!", "context": "review" })),
        );
        let second = compose(
            "sys",
            &input(json!({ "context": "review", "text": "I love this product!" })),
        );

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
