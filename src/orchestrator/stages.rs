use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

use crate::agent::{Agent, AgentResult};
use crate::agents::generation::GeneratedChanges;
use crate::schema::AgentRequest;

use super::context::PipelineContext;
use super::types::StageKind;

/// One named step of the pipeline.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    fn kind(&self) -> StageKind;

    async fn execute(
        &self,
        context: &PipelineContext,
        cancel: &CancellationToken,
    ) -> AgentResult<Value>;
}

pub type InputProjection = fn(&PipelineContext) -> Value;
pub type OutputProjection<T> = fn(T) -> Value;

/// Runs an agent on a projection of the pipeline context and stores a
/// projection of its output as the stage payload.
pub struct AgentStage<T> {
    kind: StageKind,
    agent: Agent<T>,
    input: InputProjection,
    output: OutputProjection<T>,
}

impl<T: Serialize> AgentStage<T> {
    pub fn new(kind: StageKind, agent: Agent<T>, input: InputProjection) -> Self {
        Self {
            kind,
            agent,
            input,
            output: |data| json!(data),
        }
    }

    pub fn with_output(mut self, output: OutputProjection<T>) -> Self {
        self.output = output;
        self
    }
}

#[async_trait]
impl<T> PipelineStage for AgentStage<T>
where
    T: Send + Sync + 'static,
{
    fn kind(&self) -> StageKind {
        self.kind
    }

    async fn execute(
        &self,
        context: &PipelineContext,
        cancel: &CancellationToken,
    ) -> AgentResult<Value> {
        let request = AgentRequest::new((self.input)(context));
        self.agent.run(&request, cancel).await.map(self.output)
    }
}

pub fn analysis_input(_context: &PipelineContext) -> Value {
    json!({ "scope": "full" })
}

pub fn plan_input(context: &PipelineContext) -> Value {
    json!({
        "icp": context.goal.icp,
        "budget": context.goal.budget,
    })
}

pub fn files_input(context: &PipelineContext) -> Value {
    json!({
        "task": format!("Create landing hero and dataLayer for {}", context.goal.intent),
    })
}

pub fn tracking_input(_context: &PipelineContext) -> Value {
    json!({
        "pages": ["/", "/pricing"],
        "goals": ["lead"],
    })
}

pub fn files_payload(changes: GeneratedChanges) -> Value {
    json!(changes.files)
}
