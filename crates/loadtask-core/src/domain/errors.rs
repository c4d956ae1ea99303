//! Errors - エラー型と分類
//!
//! すべてのエラーは直接の呼び出し元に返します（自動リトライなし）。

use thiserror::Error;

use super::ids::{TaskId, WorkloadId};
use super::status::TaskStatus;

/// Schema violations collected from one validation run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{schema} schema violated: {}", .violations.join("; "))]
pub struct ValidationErrors {
    pub schema: &'static str,
    pub violations: Vec<String>,
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(
        "failed to abort task '{task_id}': abort is not implemented for init, validating stages (current status is '{status}')"
    )]
    UnsupportedAbortStage { task_id: TaskId, status: TaskStatus },

    #[error("failed to abort task '{task_id}', since it already finished (status '{status}')")]
    AlreadyFinished { task_id: TaskId, status: TaskStatus },

    #[error("task '{task_id}' status is '{actual}', expected one of {allowed:?}")]
    ConcurrentStatusConflict {
        task_id: TaskId,
        actual: TaskStatus,
        allowed: Vec<TaskStatus>,
    },

    #[error("task '{task_id}' has no path into status '{to}'")]
    InvalidTransition { task_id: TaskId, to: TaskStatus },

    #[error("malformed iteration #{index} of workload '{workload_id}': {reason}")]
    MalformedIterationData {
        workload_id: WorkloadId,
        index: usize,
        reason: String,
    },

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("record store failure: {0}")]
    Store(String),
}
