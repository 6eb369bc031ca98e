//! Sequences the launch pipeline: goal validation, then the analysis, plan,
//! files and tracking stages, each fed from the goal and earlier payloads.

mod context;
mod stages;
mod types;

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agent::{Agent, AgentResult, Failure, RetryPolicy};
use crate::agents::{analysis, generation, multichannel, tracking};
use crate::client::DynCompletionClient;
use crate::config::{DEFAULT_BUDGET, PipelineSettings};
use crate::error::StageError;
use crate::schema::{AgentRequest, Shape};

pub use context::{Goal, PipelineContext, PipelineEvent, PipelineRun, goal_shape};
pub use stages::{AgentStage, PipelineStage};
pub use types::{OrchestrationState, PipelineOutcome, StageKind};

pub struct Orchestrator {
    goal_shape: Shape,
    default_budget: u64,
    stages: Vec<Box<dyn PipelineStage>>,
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// The four-stage launch pipeline backed by `client`.
    pub fn standard(client: Arc<DynCompletionClient>, settings: &PipelineSettings) -> Self {
        let retry = RetryPolicy::from(settings);

        Self::builder()
            .default_budget(settings.default_budget)
            .stage(AgentStage::new(
                StageKind::Analysis,
                Agent::new(analysis::spec(), client.clone()).with_retry(retry),
                stages::analysis_input,
            ))
            .stage(AgentStage::new(
                StageKind::Plan,
                Agent::new(multichannel::spec(), client.clone()).with_retry(retry),
                stages::plan_input,
            ))
            .stage(
                AgentStage::new(
                    StageKind::Files,
                    Agent::new(generation::spec(), client.clone()).with_retry(retry),
                    stages::files_input,
                )
                .with_output(stages::files_payload),
            )
            .stage(AgentStage::new(
                StageKind::Tracking,
                Agent::new(tracking::spec(), client.clone()).with_retry(retry),
                stages::tracking_input,
            ))
            .build()
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Runs every stage in order. Stops at the first failure or when `cancel`
    /// fires; later stages are never started.
    pub async fn run_pipeline(&self, goal: &Value, cancel: &CancellationToken) -> PipelineRun {
        let input = match self.goal_shape.validate(&AgentRequest::new(goal.clone())) {
            Ok(input) => input,
            Err(error) => {
                let failure = Failure::from(StageError::from(error)).in_stage(StageKind::Goal);
                warn!(%failure, "goal rejected");
                return PipelineRun {
                    events: vec![PipelineEvent::StageFailed {
                        stage: StageKind::Goal,
                        error: failure.message.clone(),
                    }],
                    outcome: PipelineOutcome::Failed {
                        stage: StageKind::Goal,
                        failure,
                    },
                };
            }
        };

        let mut context = PipelineContext::new(Goal::from_input(&input, self.default_budget));
        info!(intent = %context.goal.intent, stages = self.stages.len(), "pipeline started");

        for stage in &self.stages {
            let kind = stage.kind();
            if cancel.is_cancelled() {
                context.record_cancellation(kind);
                info!(stage = %kind, "pipeline cancelled");
                return context.into_run_with_outcome(PipelineOutcome::Cancelled { stage: kind });
            }

            context.record_stage_start(kind);
            info!(stage = %kind, "stage started");

            match stage.execute(&context, cancel).await {
                AgentResult::Success(payload) => {
                    context.record_payload(kind, payload);
                    info!(stage = %kind, "stage completed");
                }
                AgentResult::Failure(failure) => {
                    let failure = failure.in_stage(kind);
                    warn!(stage = %kind, kind = %failure.kind, %failure, "stage failed");
                    context.record_stage_failure(kind, &failure.message);
                    return context
                        .into_run_with_outcome(PipelineOutcome::Failed { stage: kind, failure });
                }
                AgentResult::Cancelled => {
                    context.record_cancellation(kind);
                    info!(stage = %kind, "pipeline cancelled");
                    return context.into_run_with_outcome(PipelineOutcome::Cancelled { stage: kind });
                }
            }
        }

        info!("pipeline completed");
        context.into_run()
    }
}

pub struct OrchestratorBuilder {
    default_budget: u64,
    stages: Vec<Box<dyn PipelineStage>>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            default_budget: DEFAULT_BUDGET,
            stages: Vec::new(),
        }
    }

    pub fn default_budget(mut self, budget: u64) -> Self {
        self.default_budget = budget;
        self
    }

    pub fn stage<S>(mut self, stage: S) -> Self
    where
        S: PipelineStage + 'static,
    {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn build(self) -> Orchestrator {
        Orchestrator {
            goal_shape: goal_shape(),
            default_budget: self.default_budget,
            stages: self.stages,
        }
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
