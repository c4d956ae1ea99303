use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{SubtaskId, TaskId};
use super::status::SubtaskStatus;
use super::workload::WorkloadRecord;

/// Attributes for creating a subtask.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewSubtask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub context: serde_json::Value,
    #[serde(default)]
    pub sla: serde_json::Value,
    #[serde(default)]
    pub run_in_parallel: bool,
}

impl NewSubtask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubtaskUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SubtaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtaskRecord {
    pub uuid: SubtaskId,
    pub task_uuid: TaskId,
    pub title: String,
    pub description: String,
    pub status: SubtaskStatus,
    pub context: serde_json::Value,
    pub sla: serde_json::Value,
    pub run_in_parallel: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Ordered by position; only populated by detailed reads.
    #[serde(default)]
    pub workloads: Vec<WorkloadRecord>,
}
