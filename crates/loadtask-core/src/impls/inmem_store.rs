//! InMemoryRecordStore - 開発用・テスト用の正本
//!
//! # 実装詳細
//! - すべての状態を 1 つの `tokio::sync::Mutex` で保護
//! - そのため compare-and-set と条件付き削除はロック内で原子的に完了する
//! - イテレーションは chunk ごとに JSON として保存し、詳細読み出し時にデコード
//!   （実 DB の JSON カラムと同じ境界でデータ不正を検出するため）

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::domain::{
    DeploymentId, HookResults, Iteration, NewSubtask, NewTask, NewWorkload, SubtaskId,
    SubtaskRecord, SubtaskStatus, SubtaskUpdate, TaskId, TaskRecord, TaskStatus, TaskUpdate,
    WorkloadId, WorkloadRecord, WorkloadResults,
};
use crate::ports::{
    Clock, DeploymentRecord, IdGenerator, RecordStore, StoreError, SystemClock, TaskFilter,
    UuidGenerator,
};

/// In-memory store state.
///
/// Records are kept flat; `task_get(detailed)` assembles the hierarchy.
#[derive(Default)]
struct StoreState {
    /// Insertion order doubles as listing order.
    tasks: IndexMap<TaskId, TaskRecord>,

    subtasks: IndexMap<SubtaskId, SubtaskRecord>,

    workloads: IndexMap<WorkloadId, WorkloadRecord>,

    /// Raw iteration chunks, keyed by chunk order.
    data: HashMap<WorkloadId, BTreeMap<u32, serde_json::Value>>,

    deployments: HashMap<DeploymentId, DeploymentRecord>,
}

impl StoreState {
    fn task(&self, id: TaskId) -> Result<&TaskRecord, StoreError> {
        self.tasks.get(&id).ok_or_else(|| StoreError::not_found(id))
    }

    fn task_mut(&mut self, id: TaskId) -> Result<&mut TaskRecord, StoreError> {
        self.tasks
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(id))
    }

    fn decode_data(&self, workload_id: WorkloadId) -> Result<Vec<Iteration>, StoreError> {
        let Some(chunks) = self.data.get(&workload_id) else {
            return Ok(Vec::new());
        };
        let mut iterations = Vec::new();
        for (chunk_order, chunk) in chunks {
            let Some(items) = chunk.as_array() else {
                return Err(StoreError::MalformedIterationData {
                    workload_id,
                    index: iterations.len(),
                    reason: format!("chunk {chunk_order} is not an array"),
                });
            };
            for item in items {
                let iteration = serde_json::from_value::<Iteration>(item.clone()).map_err(|e| {
                    StoreError::MalformedIterationData {
                        workload_id,
                        index: iterations.len(),
                        reason: e.to_string(),
                    }
                })?;
                iterations.push(iteration);
            }
        }
        Ok(iterations)
    }

    fn detailed(&self, id: TaskId) -> Result<TaskRecord, StoreError> {
        let mut task = self.task(id)?.clone();
        for subtask in self.subtasks.values().filter(|s| s.task_uuid == id) {
            let mut subtask = subtask.clone();
            let mut workloads: Vec<WorkloadRecord> = self
                .workloads
                .values()
                .filter(|w| w.subtask_uuid == subtask.uuid)
                .cloned()
                .collect();
            workloads.sort_by_key(|w| w.position);
            for workload in &mut workloads {
                workload.data = self.decode_data(workload.uuid)?;
            }
            subtask.workloads = workloads;
            task.subtasks.push(subtask);
        }
        Ok(task)
    }

    fn remove_task(&mut self, id: TaskId) {
        self.tasks.shift_remove(&id);
        self.subtasks.retain(|_, s| s.task_uuid != id);
        let removed: Vec<WorkloadId> = self
            .workloads
            .values()
            .filter(|w| w.task_uuid == id)
            .map(|w| w.uuid)
            .collect();
        for workload_id in removed {
            self.workloads.shift_remove(&workload_id);
            self.data.remove(&workload_id);
        }
    }
}

/// In-memory RecordStore implementation.
pub struct InMemoryRecordStore {
    state: Arc<Mutex<StoreState>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::with_parts(Arc::new(SystemClock), Arc::new(UuidGenerator))
    }

    pub fn with_parts(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            clock,
            ids,
        }
    }

    /// Registers a deployment so tasks can reference it.
    pub async fn insert_deployment(&self, name: impl Into<String>) -> DeploymentRecord {
        let record = DeploymentRecord {
            uuid: DeploymentId::random(),
            name: name.into(),
        };
        let mut state = self.state.lock().await;
        state.deployments.insert(record.uuid, record.clone());
        record
    }

    /// Stores a chunk as raw JSON, exactly as another writer may have left it.
    pub async fn insert_raw_chunk(
        &self,
        workload_id: WorkloadId,
        chunk_order: u32,
        chunk: serde_json::Value,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if !state.workloads.contains_key(&workload_id) {
            return Err(StoreError::not_found(workload_id));
        }
        state
            .data
            .entry(workload_id)
            .or_default()
            .insert(chunk_order, chunk);
        Ok(())
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    #[instrument(skip(self, attrs), fields(deployment = ?attrs.deployment_uuid))]
    async fn task_create(&self, attrs: NewTask) -> Result<TaskRecord, StoreError> {
        let mut state = self.state.lock().await;
        if let Some(deployment) = attrs.deployment_uuid {
            if !state.deployments.contains_key(&deployment) {
                return Err(StoreError::not_found(deployment));
            }
        }
        let now = self.clock.now();
        let mut record = TaskRecord::from_new(self.ids.generate_task_id(), attrs);
        record.created_at = Some(now);
        record.updated_at = Some(now);
        state.tasks.insert(record.uuid, record.clone());
        debug!(task_id = %record.uuid, "task created");
        Ok(record)
    }

    #[instrument(skip(self), fields(task_id = %id))]
    async fn task_get(&self, id: TaskId, detailed: bool) -> Result<TaskRecord, StoreError> {
        let state = self.state.lock().await;
        if detailed {
            state.detailed(id)
        } else {
            state.task(id).cloned()
        }
    }

    async fn task_get_status(&self, id: TaskId) -> Result<TaskStatus, StoreError> {
        let state = self.state.lock().await;
        Ok(state.task(id)?.status)
    }

    #[instrument(skip(self))]
    async fn task_list(&self, filter: &TaskFilter) -> Result<Vec<TaskRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .tasks
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    #[instrument(skip(self, values), fields(task_id = %id))]
    async fn task_update(&self, id: TaskId, values: TaskUpdate) -> Result<TaskRecord, StoreError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let task = state.task_mut(id)?;
        task.apply(values);
        task.updated_at = Some(now);
        Ok(task.clone())
    }

    #[instrument(skip(self), fields(task_id = %id, status = %status))]
    async fn task_update_status(
        &self,
        id: TaskId,
        status: TaskStatus,
        allowed: &[TaskStatus],
    ) -> Result<TaskRecord, StoreError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let task = state.task_mut(id)?;
        if !allowed.contains(&task.status) {
            debug!(actual = %task.status, "status precondition failed");
            return Err(StoreError::StatusConflict {
                id,
                actual: task.status,
                allowed: allowed.to_vec(),
            });
        }
        task.status = status;
        task.updated_at = Some(now);
        Ok(task.clone())
    }

    #[instrument(skip(self), fields(task_id = %id))]
    async fn task_delete(&self, id: TaskId, status: Option<TaskStatus>) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let actual = state.task(id)?.status;
        if let Some(expected) = status {
            if actual != expected {
                return Err(StoreError::StatusConflict {
                    id,
                    actual,
                    allowed: vec![expected],
                });
            }
        }
        state.remove_task(id);
        Ok(())
    }

    async fn deployment_get(&self, id: DeploymentId) -> Result<DeploymentRecord, StoreError> {
        let state = self.state.lock().await;
        state
            .deployments
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(id))
    }

    #[instrument(skip(self, attrs), fields(task_id = %task_id))]
    async fn subtask_create(
        &self,
        task_id: TaskId,
        attrs: NewSubtask,
    ) -> Result<SubtaskRecord, StoreError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        state.task(task_id)?;
        let record = SubtaskRecord {
            uuid: self.ids.generate_subtask_id(),
            task_uuid: task_id,
            title: attrs.title,
            description: attrs.description,
            status: SubtaskStatus::Init,
            context: attrs.context,
            sla: attrs.sla,
            run_in_parallel: attrs.run_in_parallel,
            created_at: Some(now),
            updated_at: Some(now),
            workloads: Vec::new(),
        };
        state.subtasks.insert(record.uuid, record.clone());
        Ok(record)
    }

    async fn subtask_update(
        &self,
        id: SubtaskId,
        values: SubtaskUpdate,
    ) -> Result<SubtaskRecord, StoreError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let subtask = state
            .subtasks
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(id))?;
        if let Some(status) = values.status {
            subtask.status = status;
        }
        if let Some(description) = values.description {
            subtask.description = description;
        }
        subtask.updated_at = Some(now);
        Ok(subtask.clone())
    }

    #[instrument(skip(self, attrs), fields(subtask_id = %subtask_id, name = %attrs.name))]
    async fn workload_create(
        &self,
        task_id: TaskId,
        subtask_id: SubtaskId,
        attrs: NewWorkload,
    ) -> Result<WorkloadRecord, StoreError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        state.task(task_id)?;
        match state.subtasks.get(&subtask_id) {
            Some(subtask) if subtask.task_uuid == task_id => {}
            _ => return Err(StoreError::not_found(subtask_id)),
        }
        let record = WorkloadRecord {
            uuid: self.ids.generate_workload_id(),
            task_uuid: task_id,
            subtask_uuid: subtask_id,
            runner_type: attrs.runner.runner_type.clone(),
            name: attrs.name,
            description: attrs.description,
            position: attrs.position,
            runner: attrs.runner,
            context: attrs.context,
            hooks: attrs.hooks.into_iter().map(HookResults::pending).collect(),
            sla: attrs.sla,
            args: attrs.args,
            sla_results: Vec::new(),
            full_duration: 0.0,
            load_duration: 0.0,
            pass_sla: true,
            start_time: None,
            created_at: Some(now),
            updated_at: Some(now),
            data: Vec::new(),
        };
        state.workloads.insert(record.uuid, record.clone());
        Ok(record)
    }

    #[instrument(skip(self, data), fields(workload_id = %workload_id, iterations = data.len()))]
    async fn workload_data_create(
        &self,
        task_id: TaskId,
        workload_id: WorkloadId,
        chunk_order: u32,
        data: Vec<Iteration>,
    ) -> Result<(), StoreError> {
        let chunk =
            serde_json::to_value(&data).map_err(|e| StoreError::Backend(e.to_string()))?;
        let mut state = self.state.lock().await;
        match state.workloads.get(&workload_id) {
            Some(workload) if workload.task_uuid == task_id => {}
            _ => return Err(StoreError::not_found(workload_id)),
        }
        let chunks = state.data.entry(workload_id).or_default();
        if chunks.contains_key(&chunk_order) {
            return Err(StoreError::Backend(format!(
                "chunk {chunk_order} of workload '{workload_id}' already written"
            )));
        }
        chunks.insert(chunk_order, chunk);
        Ok(())
    }

    #[instrument(skip(self, results), fields(workload_id = %workload_id))]
    async fn workload_set_results(
        &self,
        task_id: TaskId,
        subtask_id: SubtaskId,
        workload_id: WorkloadId,
        results: WorkloadResults,
    ) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let workload = state
            .workloads
            .get_mut(&workload_id)
            .filter(|w| w.task_uuid == task_id && w.subtask_uuid == subtask_id)
            .ok_or_else(|| StoreError::not_found(workload_id))?;
        workload.pass_sla = results.pass_sla();
        workload.sla_results = results.sla_results;
        if !results.hooks.is_empty() {
            workload.hooks = results.hooks;
        }
        workload.full_duration = results.full_duration;
        workload.load_duration = results.load_duration;
        workload.start_time = results.start_time;
        workload.updated_at = Some(now);
        Ok(())
    }
}
