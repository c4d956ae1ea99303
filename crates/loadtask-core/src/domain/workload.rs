//! Workload record: one scenario configuration and the iterations it produced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{SubtaskId, TaskId, WorkloadId};
use super::iteration::{Iteration, IterationOutput};

/// Runner descriptor: a `type` plus runner-specific config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runner {
    #[serde(rename = "type")]
    pub runner_type: String,
    #[serde(flatten)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

impl Runner {
    pub fn new(runner_type: impl Into<String>) -> Self {
        Self {
            runner_type: runner_type.into(),
            config: serde_json::Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredBy {
    pub event_type: String,
    pub value: serde_json::Value,
}

/// One execution of a hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookRunResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<f64>,
    pub finished_at: f64,
    pub triggered_by: TriggeredBy,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<[String; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<IterationOutput>,
}

/// A hook's config and everything it did during the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookResults {
    pub config: serde_json::Value,
    #[serde(default)]
    pub results: Vec<HookRunResult>,
    #[serde(default)]
    pub summary: serde_json::Map<String, serde_json::Value>,
}

impl HookResults {
    /// A configured hook that has not run yet.
    pub fn pending(config: serde_json::Value) -> Self {
        Self {
            config,
            results: Vec::new(),
            summary: serde_json::Map::new(),
        }
    }
}

/// Outcome of one SLA criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaResult {
    pub criterion: String,
    #[serde(default)]
    pub detail: String,
    pub success: bool,
}

/// Attributes for creating a workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWorkload {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub position: u32,
    pub runner: Runner,
    #[serde(default)]
    pub context: serde_json::Value,
    /// Hook configs.
    #[serde(default)]
    pub hooks: Vec<serde_json::Value>,
    #[serde(default)]
    pub sla: serde_json::Value,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Finalization payload written once the workload has run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkloadResults {
    #[serde(default)]
    pub sla_results: Vec<SlaResult>,
    #[serde(default)]
    pub hooks: Vec<HookResults>,
    pub full_duration: f64,
    pub load_duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
}

impl WorkloadResults {
    pub fn pass_sla(&self) -> bool {
        self.sla_results.iter().all(|r| r.success)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadRecord {
    pub uuid: WorkloadId,
    pub task_uuid: TaskId,
    pub subtask_uuid: SubtaskId,
    pub name: String,
    pub description: String,
    pub position: u32,
    pub runner: Runner,
    pub runner_type: String,
    pub context: serde_json::Value,
    pub hooks: Vec<HookResults>,
    /// SLA config.
    pub sla: serde_json::Value,
    pub args: serde_json::Value,
    #[serde(default)]
    pub sla_results: Vec<SlaResult>,
    #[serde(default)]
    pub full_duration: f64,
    #[serde(default)]
    pub load_duration: f64,
    #[serde(default)]
    pub pass_sla: bool,
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Raw iterations; only populated by detailed reads.
    #[serde(default)]
    pub data: Vec<Iteration>,
}

/// Reproducible config of a workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadConfig {
    pub args: serde_json::Value,
    pub runner: Runner,
    pub context: serde_json::Value,
    pub sla: serde_json::Value,
    pub hooks: Vec<serde_json::Value>,
}
