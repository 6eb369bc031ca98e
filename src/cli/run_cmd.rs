use std::sync::Arc;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;

use crate::client::{DynCompletionClient, HttpCompletionClient};
use crate::config::Config;
use crate::error::FailureKind;
use crate::orchestrator::{Orchestrator, PipelineEvent, PipelineOutcome};

use super::args::RunArgs;

pub(crate) async fn handle_run(args: RunArgs, config: &Config) -> Result<()> {
    let goal = goal_from_args(&args)?;

    let client: Arc<DynCompletionClient> = Arc::new(HttpCompletionClient::new(config)?);
    let orchestrator = Orchestrator::standard(client, &config.pipeline);

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let run = orchestrator.run_pipeline(&goal, &cancel).await;
    ctrl_c.abort();

    for event in &run.events {
        match event {
            PipelineEvent::StageCompleted(stage) => eprintln!("{} {stage}", "✔".green()),
            PipelineEvent::StageFailed { stage, .. } => eprintln!("{} {stage}", "✘".red()),
            PipelineEvent::StageCancelled(stage) => eprintln!("{} {stage}", "■".yellow()),
            PipelineEvent::StageStarted(_) => {}
        }
    }

    report(run.outcome, config)
}

/// Prints a completed state; failures and cancellations become errors so the
/// process exits non-zero.
fn report(outcome: PipelineOutcome, config: &Config) -> Result<()> {
    match outcome {
        PipelineOutcome::Completed(state) => {
            let rendered =
                serde_json::to_string_pretty(&state).context("Failed to render pipeline state")?;
            println!("{rendered}");
            Ok(())
        }
        PipelineOutcome::Failed { failure, .. } => {
            let guidance = match failure.kind {
                FailureKind::Validation => {
                    "Check the goal: it needs a non-empty \"intent\" and an optional \"context\" with \"icp\" and a non-negative \"budget\".".to_string()
                }
                FailureKind::Upstream => format!(
                    "Verify your {} API key (set {} or run 'launchpad config --api-key ...') and your connectivity. Retry if the service is rate limited.",
                    config.llm.provider.display_name(),
                    config.llm.provider.api_key_env_var()
                ),
                FailureKind::Parse => {
                    "The model replied with output the agent could not use. Retry, or pick a stronger model with 'launchpad config --model ...'.".to_string()
                }
            };
            bail!("{failure}. {guidance}");
        }
        PipelineOutcome::Cancelled { stage } => bail!("Pipeline cancelled during {stage}"),
    }
}

fn goal_from_args(args: &RunArgs) -> Result<Value> {
    if let Some(raw) = &args.goal {
        return serde_json::from_str(raw).context("Goal must be a JSON object");
    }

    let Some(intent) = &args.intent else {
        bail!("Provide a goal as JSON or pass --intent");
    };

    let mut context = Map::new();
    if let Some(icp) = &args.icp {
        context.insert("icp".to_string(), json!(icp));
    }
    if let Some(budget) = args.budget {
        context.insert("budget".to_string(), budget_value(budget));
    }

    let mut goal = json!({ "intent": intent });
    if !context.is_empty() {
        goal["context"] = Value::Object(context);
    }
    Ok(goal)
}

/// Whole budgets are sent as integers.
fn budget_value(budget: f64) -> Value {
    if budget.fract() == 0.0 && budget.abs() < 1e15 {
        json!(budget as i64)
    } else {
        json!(budget)
    }
}
