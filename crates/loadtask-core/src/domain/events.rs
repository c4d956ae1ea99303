//! Events - ドメインイベント
//!
//! ラッパーが状態を変更するたびに `EventSink` へ送られます。

use serde::Serialize;

use super::ids::{SubtaskId, TaskId, WorkloadId};
use super::status::{SubtaskStatus, TaskStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    TaskCreated {
        task_id: TaskId,
        temporary: bool,
    },
    StatusChanged {
        task_id: TaskId,
        to: TaskStatus,
        /// The compare-and-set precondition, if any.
        allowed: Option<Vec<TaskStatus>>,
    },
    AbortRequested {
        task_id: TaskId,
        soft: bool,
        observed: TaskStatus,
    },
    TaskDeleted {
        task_id: TaskId,
    },
    SubtaskCreated {
        task_id: TaskId,
        subtask_id: SubtaskId,
    },
    SubtaskStatusChanged {
        subtask_id: SubtaskId,
        to: SubtaskStatus,
    },
    WorkloadCreated {
        subtask_id: SubtaskId,
        workload_id: WorkloadId,
        name: String,
    },
    WorkloadDataAppended {
        workload_id: WorkloadId,
        chunk_order: u32,
        iterations: usize,
    },
    WorkloadResultsSet {
        workload_id: WorkloadId,
        pass_sla: bool,
    },
    ResultsExtended {
        task_id: TaskId,
        workloads: usize,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::TaskCreated { .. } => "task_created",
            DomainEvent::StatusChanged { .. } => "status_changed",
            DomainEvent::AbortRequested { .. } => "abort_requested",
            DomainEvent::TaskDeleted { .. } => "task_deleted",
            DomainEvent::SubtaskCreated { .. } => "subtask_created",
            DomainEvent::SubtaskStatusChanged { .. } => "subtask_status_changed",
            DomainEvent::WorkloadCreated { .. } => "workload_created",
            DomainEvent::WorkloadDataAppended { .. } => "workload_data_appended",
            DomainEvent::WorkloadResultsSet { .. } => "workload_results_set",
            DomainEvent::ResultsExtended { .. } => "results_extended",
        }
    }
}
