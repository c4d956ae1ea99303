//! Import of task result documents produced by older releases.
//!
//! Every document is checked before anything is written, so a bad file
//! never leaves a half-imported task behind.

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::domain::{
    DeploymentId, HookResults, Iteration, NewSubtask, NewTask, NewWorkload, Runner, SlaResult,
    TaskError, TaskStatus, ValidationErrors, WorkloadResults,
};
use crate::schema::SchemaKind;

use super::context::TaskContext;
use super::task::Task;

const IMPORTED_SUBTASK_TITLE: &str = "imported results";
const DEFAULT_RUNNER: &str = "serial";

#[derive(Debug, Default, Deserialize)]
struct KeyArgs {
    #[serde(default)]
    args: Value,
    #[serde(default)]
    runner: Option<Runner>,
    #[serde(default)]
    context: Value,
    #[serde(default)]
    sla: Value,
    #[serde(default)]
    hooks: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ResultKey {
    name: String,
    pos: u32,
    #[serde(default)]
    kw: KeyArgs,
}

#[derive(Debug, Deserialize)]
struct TaskResultDoc {
    key: ResultKey,
    sla: Vec<SlaResult>,
    #[serde(default)]
    hooks: Vec<HookResults>,
    result: Vec<Iteration>,
    load_duration: f64,
    full_duration: f64,
}

fn parse_all(docs: &[Value]) -> Result<Vec<TaskResultDoc>, ValidationErrors> {
    let schema = SchemaKind::TaskResult;
    let mut violations = Vec::new();
    let mut parsed = Vec::with_capacity(docs.len());
    for (i, doc) in docs.iter().enumerate() {
        if let Err(err) = schema.validate(doc) {
            violations.extend(
                err.violations
                    .into_iter()
                    .map(|v| format!("document #{i}: {v}")),
            );
            continue;
        }
        match TaskResultDoc::deserialize(doc) {
            Ok(result) => parsed.push(result),
            Err(e) => violations.push(format!("document #{i}: {e}")),
        }
    }
    if violations.is_empty() {
        Ok(parsed)
    } else {
        Err(ValidationErrors {
            schema: schema.name(),
            violations,
        })
    }
}

/// Creates a finished task holding one workload per document.
pub async fn import_task_results(
    ctx: TaskContext,
    deployment: Option<DeploymentId>,
    docs: &[Value],
) -> Result<Task, TaskError> {
    let results = parse_all(docs)?;

    let mut task = Task::create(
        ctx,
        NewTask {
            deployment_uuid: deployment,
            ..Default::default()
        },
    )
    .await?;
    let subtask = task.add_subtask(NewSubtask::new(IMPORTED_SUBTASK_TITLE)).await?;

    for result in results {
        let start_time = result
            .result
            .iter()
            .map(|i| i.timestamp)
            .reduce(f64::min);
        let kw = result.key.kw;
        let mut workload = subtask
            .add_workload(NewWorkload {
                name: result.key.name,
                description: String::new(),
                position: result.key.pos,
                runner: kw.runner.unwrap_or_else(|| Runner::new(DEFAULT_RUNNER)),
                context: kw.context,
                hooks: kw.hooks,
                sla: kw.sla,
                args: kw.args,
            })
            .await?;
        workload.add_workload_data(0, result.result).await?;
        workload
            .set_results(WorkloadResults {
                sla_results: result.sla,
                hooks: result.hooks,
                full_duration: result.full_duration,
                load_duration: result.load_duration,
                start_time,
            })
            .await?;
    }

    task.update_status(TaskStatus::Finished, None).await?;
    info!(task_id = %task.id(), workloads = docs.len(), "task results imported");
    Ok(task)
}
