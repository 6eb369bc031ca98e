//! Input validation for agents and for the pipeline goal.
//!
//! A [`Shape`] declares the fields an agent accepts. Validating an
//! [`AgentRequest`] against it yields a [`ValidatedInput`] with defaults
//! applied and undeclared fields removed, or a [`ValidationError`] naming the
//! offending field.

mod shape;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::error::ValidationError;

pub use shape::{FieldKind, FieldSpec, Shape};

/// Untyped caller input for a single agent invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRequest(Value);

impl AgentRequest {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for AgentRequest {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Request fields that passed validation, keyed in sorted order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidatedInput(BTreeMap<String, Value>);

impl ValidatedInput {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Compact JSON with keys in sorted order.
    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone().into_iter().collect()).to_string()
    }
}

impl Shape {
    pub fn validate(&self, request: &AgentRequest) -> Result<ValidatedInput, ValidationError> {
        let object = request
            .as_value()
            .as_object()
            .ok_or_else(|| ValidationError::new("$root", "expected a JSON object"))?;

        self.check_object(object, "").map(ValidatedInput)
    }
}
