use serde_json::{Value, json};

use crate::schema::{FieldKind, FieldSpec, Shape, ValidatedInput};

use super::types::{OrchestrationState, PipelineOutcome, StageKind};

/// Declared shape of a pipeline goal.
pub fn goal_shape() -> Shape {
    let context = Shape::new()
        .field(FieldSpec::optional("icp", FieldKind::string()))
        .field(FieldSpec::optional("budget", FieldKind::non_negative_number()));

    Shape::new()
        .field(FieldSpec::required("intent", FieldKind::non_empty_string()))
        .field(FieldSpec::optional("context", FieldKind::Object(context)))
}

/// A validated goal with the pipeline defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    pub intent: String,
    pub icp: Option<String>,
    /// Kept as a JSON number so integral budgets stay integral downstream.
    pub budget: Value,
}

impl Goal {
    pub fn from_input(input: &ValidatedInput, default_budget: u64) -> Self {
        let context = input.get("context");
        let icp = context
            .and_then(|context| context.get("icp"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let budget = context
            .and_then(|context| context.get("budget"))
            .cloned()
            .unwrap_or_else(|| json!(default_budget));

        Self {
            intent: input.str("intent").unwrap_or_default().to_string(),
            icp,
            budget,
        }
    }
}

/// State threaded through the stages of one pipeline invocation.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub goal: Goal,
    state: OrchestrationState,
    events: Vec<PipelineEvent>,
}

impl PipelineContext {
    pub fn new(goal: Goal) -> Self {
        Self {
            goal,
            state: OrchestrationState::new(),
            events: Vec::new(),
        }
    }

    pub fn record_stage_start(&mut self, stage: StageKind) {
        self.events.push(PipelineEvent::StageStarted(stage));
    }

    pub fn record_payload(&mut self, stage: StageKind, payload: Value) {
        self.state.insert(stage.to_string(), payload);
        self.events.push(PipelineEvent::StageCompleted(stage));
    }

    pub fn record_stage_failure(&mut self, stage: StageKind, error: impl Into<String>) {
        self.events.push(PipelineEvent::StageFailed {
            stage,
            error: error.into(),
        });
    }

    pub fn record_cancellation(&mut self, stage: StageKind) {
        self.events.push(PipelineEvent::StageCancelled(stage));
    }

    pub fn into_run(self) -> PipelineRun {
        let PipelineContext { state, events, .. } = self;
        PipelineRun {
            outcome: PipelineOutcome::Completed(state),
            events,
        }
    }

    pub fn into_run_with_outcome(self, outcome: PipelineOutcome) -> PipelineRun {
        PipelineRun {
            outcome,
            events: self.events,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    pub outcome: PipelineOutcome,
    pub events: Vec<PipelineEvent>,
}

#[cfg(test)]
impl PipelineRun {
    /// Stages that were started, in order.
    pub fn started_stages(&self) -> Vec<StageKind> {
        self.events
            .iter()
            .filter_map(|event| match event {
                PipelineEvent::StageStarted(stage) => Some(*stage),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    StageStarted(StageKind),
    StageCompleted(StageKind),
    StageFailed { stage: StageKind, error: String },
    StageCancelled(StageKind),
}
