use std::fmt;

use serde::Serialize;

use crate::error::{FailureKind, StageError};

/// Diagnosable description of why an agent or pipeline stage failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Prefixes the message with the name of the stage that produced it.
    pub fn in_stage(self, stage: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{stage} failed: {}", self.message),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<StageError> for Failure {
    fn from(error: StageError) -> Self {
        Self::new(error.kind(), error.to_string())
    }
}

/// Terminal result of one agent invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentResult<T> {
    Success(T),
    Failure(Failure),
    Cancelled,
}

impl<T> AgentResult<T> {
    pub fn map<U, F>(self, f: F) -> AgentResult<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            AgentResult::Success(data) => AgentResult::Success(f(data)),
            AgentResult::Failure(failure) => AgentResult::Failure(failure),
            AgentResult::Cancelled => AgentResult::Cancelled,
        }
    }
}

#[cfg(test)]
impl<T> AgentResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, AgentResult::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            AgentResult::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            AgentResult::Failure(failure) => Some(failure),
            _ => None,
        }
    }
}
