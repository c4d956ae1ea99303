//! RecordStore port - タスク・サブタスク・ワークロードの正本（source of truth）
//!
//! ラッパー（`app::Task` など）は永続化をすべてこの trait に委譲します。
//!
//! # 設計原則
//! - 条件付きステータス更新（compare-and-set）と条件付き削除はストア側で原子的に行う
//! - プロセス内ロックは持たない。並行する abort / 完了の競合はここで解決される
//! - 生のイテレーションは chunk 単位で追記され、詳細読み出し時に順序通り結合される

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
    DeploymentId, Iteration, NewSubtask, NewTask, NewWorkload, SubtaskId, SubtaskRecord,
    SubtaskUpdate, TaskError, TaskId, TaskRecord, TaskStatus, TaskUpdate, WorkloadId,
    WorkloadRecord, WorkloadResults,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub uuid: DeploymentId,
    pub name: String,
}

/// Listing filter; `None` / empty means "any".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub deployment: Option<DeploymentId>,
    /// Matches tasks carrying at least one of these tags.
    pub tags: Vec<String>,
}

impl TaskFilter {
    pub fn matches(&self, task: &TaskRecord) -> bool {
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if self.deployment.is_some() && self.deployment != task.deployment_uuid {
            return false;
        }
        self.tags.is_empty() || self.tags.iter().any(|t| task.tags.contains(t))
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// Compare-and-set precondition did not hold.
    #[error("task '{id}' is '{actual}', expected one of {allowed:?}")]
    StatusConflict {
        id: TaskId,
        actual: TaskStatus,
        allowed: Vec<TaskStatus>,
    },

    #[error("iteration #{index} of workload '{workload_id}' cannot be decoded: {reason}")]
    MalformedIterationData {
        workload_id: WorkloadId,
        index: usize,
        reason: String,
    },

    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found<T: crate::domain::ids::IdMarker>(id: crate::domain::ids::Id<T>) -> Self {
        StoreError::NotFound {
            kind: T::kind(),
            id: id.to_string(),
        }
    }
}

impl From<StoreError> for TaskError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => TaskError::NotFound { kind, id },
            StoreError::StatusConflict {
                id,
                actual,
                allowed,
            } => TaskError::ConcurrentStatusConflict {
                task_id: id,
                actual,
                allowed,
            },
            StoreError::MalformedIterationData {
                workload_id,
                index,
                reason,
            } => TaskError::MalformedIterationData {
                workload_id,
                index,
                reason,
            },
            StoreError::Backend(msg) => TaskError::Store(msg),
        }
    }
}

/// RecordStore はタスク階層の永続化を担う
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数の呼び出し元から共有される）
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn task_create(&self, attrs: NewTask) -> Result<TaskRecord, StoreError>;

    /// `detailed` includes subtasks, workloads and their iteration data.
    async fn task_get(&self, id: TaskId, detailed: bool) -> Result<TaskRecord, StoreError>;

    async fn task_get_status(&self, id: TaskId) -> Result<TaskStatus, StoreError>;

    async fn task_list(&self, filter: &TaskFilter) -> Result<Vec<TaskRecord>, StoreError>;

    async fn task_update(&self, id: TaskId, values: TaskUpdate) -> Result<TaskRecord, StoreError>;

    /// Atomically sets `status` iff the current status is in `allowed`.
    /// Returns the record as written, without subtasks.
    async fn task_update_status(
        &self,
        id: TaskId,
        status: TaskStatus,
        allowed: &[TaskStatus],
    ) -> Result<TaskRecord, StoreError>;

    /// Deletes the task and everything under it. With `status`, the current
    /// status must match or nothing is deleted.
    async fn task_delete(&self, id: TaskId, status: Option<TaskStatus>) -> Result<(), StoreError>;

    async fn deployment_get(&self, id: DeploymentId) -> Result<DeploymentRecord, StoreError>;

    async fn subtask_create(
        &self,
        task_id: TaskId,
        attrs: NewSubtask,
    ) -> Result<SubtaskRecord, StoreError>;

    async fn subtask_update(
        &self,
        id: SubtaskId,
        values: SubtaskUpdate,
    ) -> Result<SubtaskRecord, StoreError>;

    async fn workload_create(
        &self,
        task_id: TaskId,
        subtask_id: SubtaskId,
        attrs: NewWorkload,
    ) -> Result<WorkloadRecord, StoreError>;

    async fn workload_data_create(
        &self,
        task_id: TaskId,
        workload_id: WorkloadId,
        chunk_order: u32,
        data: Vec<Iteration>,
    ) -> Result<(), StoreError>;

    async fn workload_set_results(
        &self,
        task_id: TaskId,
        subtask_id: SubtaskId,
        workload_id: WorkloadId,
        results: WorkloadResults,
    ) -> Result<(), StoreError>;
}
