use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Declared shape of a JSON object: an ordered list of named fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String { min_len: usize },
    Enum(Vec<&'static str>),
    Number { min: Option<f64>, max: Option<f64> },
    Integer,
    Bool,
    Array(Box<FieldKind>),
    Object(Shape),
    Any,
}

impl FieldSpec {
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

impl FieldKind {
    pub fn string() -> Self {
        FieldKind::String { min_len: 0 }
    }

    pub fn non_empty_string() -> Self {
        FieldKind::String { min_len: 1 }
    }

    pub fn one_of(values: &[&'static str]) -> Self {
        FieldKind::Enum(values.to_vec())
    }

    pub fn non_negative_number() -> Self {
        FieldKind::Number {
            min: Some(0.0),
            max: None,
        }
    }

    pub fn array_of(kind: FieldKind) -> Self {
        FieldKind::Array(Box::new(kind))
    }

    fn check(&self, value: &Value, path: &str) -> Result<Value, ValidationError> {
        match self {
            FieldKind::String { min_len } => {
                let text = value
                    .as_str()
                    .ok_or_else(|| ValidationError::new(path, "expected string"))?;
                if text.chars().count() < *min_len {
                    return Err(ValidationError::new(
                        path,
                        format!("must be at least {min_len} characters"),
                    ));
                }
                Ok(value.clone())
            }
            FieldKind::Enum(allowed) => {
                let text = value
                    .as_str()
                    .ok_or_else(|| ValidationError::new(path, "expected string"))?;
                if !allowed.contains(&text) {
                    return Err(ValidationError::new(
                        path,
                        format!("must be one of [{}]", allowed.join(", ")),
                    ));
                }
                Ok(value.clone())
            }
            FieldKind::Number { min, max } => {
                let number = value
                    .as_f64()
                    .ok_or_else(|| ValidationError::new(path, "expected number"))?;
                if let Some(min) = min {
                    if number < *min {
                        return Err(ValidationError::new(path, format!("must be >= {min}")));
                    }
                }
                if let Some(max) = max {
                    if number > *max {
                        return Err(ValidationError::new(path, format!("must be <= {max}")));
                    }
                }
                Ok(value.clone())
            }
            FieldKind::Integer => {
                if value.is_i64() || value.is_u64() {
                    Ok(value.clone())
                } else {
                    Err(ValidationError::new(path, "expected integer"))
                }
            }
            FieldKind::Bool => {
                if value.is_boolean() {
                    Ok(value.clone())
                } else {
                    Err(ValidationError::new(path, "expected boolean"))
                }
            }
            FieldKind::Array(item) => {
                let items = value
                    .as_array()
                    .ok_or_else(|| ValidationError::new(path, "expected array"))?;
                items
                    .iter()
                    .enumerate()
                    .map(|(index, entry)| item.check(entry, &format!("{path}[{index}]")))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            FieldKind::Object(shape) => {
                let object = value
                    .as_object()
                    .ok_or_else(|| ValidationError::new(path, "expected object"))?;
                let fields = shape.check_object(object, path)?;
                Ok(Value::Object(fields.into_iter().collect()))
            }
            FieldKind::Any => Ok(value.clone()),
        }
    }
}

impl Shape {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Checks `object` against the declared fields, applying defaults and
    /// dropping anything undeclared. `prefix` is the path of `object` itself.
    pub(super) fn check_object(
        &self,
        object: &Map<String, Value>,
        prefix: &str,
    ) -> Result<BTreeMap<String, Value>, ValidationError> {
        let mut checked = BTreeMap::new();

        for spec in &self.fields {
            let path = if prefix.is_empty() {
                spec.name.clone()
            } else {
                format!("{prefix}.{}", spec.name)
            };

            match object.get(&spec.name).filter(|value| !value.is_null()) {
                Some(value) => {
                    checked.insert(spec.name.clone(), spec.kind.check(value, &path)?);
                }
                None if spec.required => {
                    return Err(ValidationError::new(path, "required field is missing"));
                }
                None => {
                    if let Some(default) = &spec.default {
                        checked.insert(spec.name.clone(), default.clone());
                    }
                }
            }
        }

        Ok(checked)
    }
}
