use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::agent::Failure;

/// Named steps of the launch pipeline. `Goal` is the validation of the
/// caller's goal that precedes every agent stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Goal,
    Analysis,
    Plan,
    Files,
    Tracking,
}

impl StageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::Goal => "goal",
            StageKind::Analysis => "analysis",
            StageKind::Plan => "plan",
            StageKind::Files => "files",
            StageKind::Tracking => "tracking",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful stage payloads keyed by stage name.
pub type OrchestrationState = BTreeMap<String, Value>;

/// How a pipeline invocation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Completed(OrchestrationState),
    Failed { stage: StageKind, failure: Failure },
    Cancelled { stage: StageKind },
}

#[cfg(test)]
impl PipelineOutcome {
    pub fn state(&self) -> Option<&OrchestrationState> {
        match self {
            PipelineOutcome::Completed(state) => Some(state),
            _ => None,
        }
    }
}
