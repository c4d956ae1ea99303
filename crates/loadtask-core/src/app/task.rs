//! Task - タスクのラッパーと状態機械の入口
//!
//! 永続化はすべて `RecordStore` に委譲します。ここではロックを取りません。
//! 並行する abort と完了の競合は、ストアの compare-and-set で解決されます。
//!
//! 一時タスク（temporary）は実行前の設定検証専用で、ストアには一切触れず
//! すべての更新をメモリ上で行います。

use std::fmt;

use serde_json::{Value, json};
use tracing::{info, warn};

use crate::config::{IterationsMode, ReportConfig};
use crate::domain::{
    CrashDetail, DomainEvent, NewSubtask, NewTask, TaskError, TaskId, TaskRecord, TaskStatus,
    TaskUpdate, ValidationResult,
};
use crate::ports::TaskFilter;

use super::aggregator::{ExtendedTask, ResultAggregator};
use super::context::TaskContext;
use super::subtask::Subtask;

pub struct Task {
    ctx: TaskContext,
    record: TaskRecord,
    temporary: bool,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("record", &self.record)
            .field("temporary", &self.temporary)
            .finish_non_exhaustive()
    }
}

impl Task {
    fn wrap(ctx: TaskContext, record: TaskRecord) -> Self {
        Self {
            ctx,
            record,
            temporary: false,
        }
    }

    pub async fn create(ctx: TaskContext, attrs: NewTask) -> Result<Self, TaskError> {
        let record = ctx.store.task_create(attrs).await?;
        ctx.events.emit(DomainEvent::TaskCreated {
            task_id: record.uuid,
            temporary: false,
        });
        Ok(Self::wrap(ctx, record))
    }

    /// In-memory task used to validate a config before anything is stored.
    pub fn create_temporary(ctx: TaskContext, attrs: NewTask) -> Self {
        let record = TaskRecord::from_new(ctx.ids.generate_task_id(), attrs);
        ctx.events.emit(DomainEvent::TaskCreated {
            task_id: record.uuid,
            temporary: true,
        });
        Self {
            ctx,
            record,
            temporary: true,
        }
    }

    pub async fn get(ctx: TaskContext, id: TaskId, detailed: bool) -> Result<Self, TaskError> {
        let record = ctx.store.task_get(id, detailed).await?;
        Ok(Self::wrap(ctx, record))
    }

    pub async fn get_status(ctx: &TaskContext, id: TaskId) -> Result<TaskStatus, TaskError> {
        Ok(ctx.store.task_get_status(id).await?)
    }

    pub async fn list(ctx: TaskContext, filter: &TaskFilter) -> Result<Vec<Self>, TaskError> {
        let records = ctx.store.task_list(filter).await?;
        Ok(records
            .into_iter()
            .map(|record| Self::wrap(ctx.clone(), record))
            .collect())
    }

    /// Deletes a task by id; with `status`, only if it still has that status.
    pub async fn delete_by_id(
        ctx: &TaskContext,
        id: TaskId,
        status: Option<TaskStatus>,
    ) -> Result<(), TaskError> {
        ctx.store.task_delete(id, status).await?;
        ctx.events.emit(DomainEvent::TaskDeleted { task_id: id });
        Ok(())
    }

    pub async fn delete(self, status: Option<TaskStatus>) -> Result<(), TaskError> {
        if !self.temporary {
            return Self::delete_by_id(&self.ctx, self.record.uuid, status).await;
        }
        if let Some(expected) = status.filter(|s| *s != self.record.status) {
            return Err(TaskError::ConcurrentStatusConflict {
                task_id: self.record.uuid,
                actual: self.record.status,
                allowed: vec![expected],
            });
        }
        self.ctx.events.emit(DomainEvent::TaskDeleted {
            task_id: self.record.uuid,
        });
        Ok(())
    }

    pub fn id(&self) -> TaskId {
        self.record.uuid
    }

    /// Status as of the last read or write through this wrapper.
    pub fn status(&self) -> TaskStatus {
        self.record.status
    }

    pub fn record(&self) -> &TaskRecord {
        &self.record
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    pub fn context(&self) -> &TaskContext {
        &self.ctx
    }

    /// Keeps already loaded subtasks; store updates return the bare task.
    fn refresh(&mut self, updated: TaskRecord) {
        let subtasks = std::mem::take(&mut self.record.subtasks);
        self.record = updated;
        self.record.subtasks = subtasks;
    }

    async fn update(&mut self, values: TaskUpdate) -> Result<(), TaskError> {
        if self.temporary {
            self.record.apply(values);
            return Ok(());
        }
        let updated = self.ctx.store.task_update(self.record.uuid, values).await?;
        self.refresh(updated);
        Ok(())
    }

    /// Sets the status.
    ///
    /// With a non-empty `allowed`, the write only happens if the current
    /// status is one of them, decided atomically by the store. Otherwise
    /// the status is overwritten. A persisted task then holds the record as
    /// the store wrote it, `updated_at` included.
    pub async fn update_status(
        &mut self,
        status: TaskStatus,
        allowed: Option<&[TaskStatus]>,
    ) -> Result<(), TaskError> {
        let allowed = allowed.filter(|a| !a.is_empty());
        match allowed {
            Some(allowed) if self.temporary => {
                if !allowed.contains(&self.record.status) {
                    return Err(TaskError::ConcurrentStatusConflict {
                        task_id: self.record.uuid,
                        actual: self.record.status,
                        allowed: allowed.to_vec(),
                    });
                }
                self.record.status = status;
            }
            Some(allowed) => {
                let updated = self
                    .ctx
                    .store
                    .task_update_status(self.record.uuid, status, allowed)
                    .await?;
                self.refresh(updated);
            }
            None => self.update(TaskUpdate::status(status)).await?,
        }
        self.ctx.events.emit(DomainEvent::StatusChanged {
            task_id: self.record.uuid,
            to: status,
            allowed: allowed.map(<[TaskStatus]>::to_vec),
        });
        Ok(())
    }

    pub async fn set_validation_failed(&mut self, log: Value) -> Result<(), TaskError> {
        self.set_failure(TaskStatus::ValidationFailed, ValidationResult::Log(log))
            .await
    }

    pub async fn set_failed(
        &mut self,
        etype: impl Into<String>,
        msg: impl Into<String>,
        trace: impl Into<String>,
    ) -> Result<(), TaskError> {
        let detail = CrashDetail {
            etype: etype.into(),
            msg: msg.into(),
            trace: trace.into(),
        };
        self.set_failure(TaskStatus::Crashed, ValidationResult::Crashed(detail))
            .await
    }

    async fn set_failure(
        &mut self,
        status: TaskStatus,
        result: ValidationResult,
    ) -> Result<(), TaskError> {
        self.update(TaskUpdate {
            status: Some(status),
            validation_result: Some(result),
            ..Default::default()
        })
        .await?;
        self.ctx.events.emit(DomainEvent::StatusChanged {
            task_id: self.record.uuid,
            to: status,
            allowed: None,
        });
        Ok(())
    }

    pub async fn add_subtask(&self, attrs: NewSubtask) -> Result<Subtask, TaskError> {
        let record = self.ctx.store.subtask_create(self.record.uuid, attrs).await?;
        self.ctx.events.emit(DomainEvent::SubtaskCreated {
            task_id: self.record.uuid,
            subtask_id: record.uuid,
        });
        Ok(Subtask::from_record(self.ctx.clone(), record))
    }

    /// Requests an abort; `soft` lets running iterations finish first.
    ///
    /// Only a running (or soft-aborting) task can be aborted. The final
    /// write is a compare-and-set, so a task that completes between the
    /// status read and the write yields `ConcurrentStatusConflict`.
    pub async fn abort(&mut self, soft: bool) -> Result<(), TaskError> {
        let task_id = self.record.uuid;
        let current = if self.temporary {
            self.record.status
        } else {
            Self::get_status(&self.ctx, task_id).await?
        };
        self.ctx.events.emit(DomainEvent::AbortRequested {
            task_id,
            soft,
            observed: current,
        });

        if current.is_abort_unsupported() {
            warn!(task_id = %task_id, status = %current, "abort is not supported at this stage");
            return Err(TaskError::UnsupportedAbortStage {
                task_id,
                status: current,
            });
        }
        if current.is_finished() {
            return Err(TaskError::AlreadyFinished {
                task_id,
                status: current,
            });
        }

        let target = if soft {
            TaskStatus::SoftAborting
        } else {
            TaskStatus::Aborting
        };
        self.update_status(target, Some(&TaskStatus::ABORTABLE))
            .await?;
        info!(task_id = %task_id, from = %current, to = %target, "task abort requested");
        Ok(())
    }

    /// Moves along a graph edge, guarded by every status that leads into `to`.
    pub async fn transition(&mut self, to: TaskStatus) -> Result<(), TaskError> {
        let allowed = to.predecessors();
        if allowed.is_empty() {
            return Err(TaskError::InvalidTransition {
                task_id: self.record.uuid,
                to,
            });
        }
        self.update_status(to, Some(&allowed)).await
    }

    /// Report view of the task: timestamps as strings plus the deployment name.
    pub async fn to_report(&self, config: &ReportConfig) -> Result<Value, TaskError> {
        let mut doc = json!(&self.record);
        stamp_times(
            &mut doc,
            config,
            self.record.created_at,
            self.record.updated_at,
        );
        if let Some(docs) = doc.get_mut("subtasks").and_then(Value::as_array_mut) {
            for (sub_doc, subtask) in docs.iter_mut().zip(&self.record.subtasks) {
                stamp_times(sub_doc, config, subtask.created_at, subtask.updated_at);
                if let Some(docs) = sub_doc.get_mut("workloads").and_then(Value::as_array_mut) {
                    for (w_doc, workload) in docs.iter_mut().zip(&subtask.workloads) {
                        stamp_times(w_doc, config, workload.created_at, workload.updated_at);
                    }
                }
            }
        }

        if let Some(deployment) = self.record.deployment_uuid.filter(|_| !self.temporary) {
            let deployment = self.ctx.store.deployment_get(deployment).await?;
            if let Some(obj) = doc.as_object_mut() {
                obj.insert("deployment_name".into(), Value::String(deployment.name));
            }
        }
        Ok(doc)
    }

    /// Runs the aggregator over every workload of a detailed task.
    ///
    /// Without an explicit `mode`, the aggregator's configured one is used.
    pub fn extend_results(
        self,
        aggregator: &ResultAggregator,
        mode: Option<IterationsMode>,
    ) -> ExtendedTask {
        let events = self.ctx.events.clone();
        let mode = mode.unwrap_or(aggregator.config().iterations);
        let extended = aggregator.extend_task(self.record, mode);
        events.emit(DomainEvent::ResultsExtended {
            task_id: extended.task.uuid,
            workloads: extended.workloads_count(),
        });
        extended
    }
}

fn stamp_times(
    doc: &mut Value,
    config: &ReportConfig,
    created_at: Option<chrono::DateTime<chrono::Utc>>,
    updated_at: Option<chrono::DateTime<chrono::Utc>>,
) {
    let Some(obj) = doc.as_object_mut() else {
        return;
    };
    for (key, at) in [("created_at", created_at), ("updated_at", updated_at)] {
        if let Some(at) = at {
            obj.insert(key.into(), Value::String(config.format_report_time(at)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    use crate::domain::{
        DeploymentId, Iteration, NewWorkload, Runner, SubtaskId, SubtaskRecord, SubtaskUpdate,
        WorkloadId, WorkloadRecord, WorkloadResults,
    };
    use crate::impls::{InMemoryRecordStore, MainStatsTableFactory, MemoryEventSink};
    use crate::ports::{
        Clock, DeploymentRecord, FixedClock, RecordStore, StoreError, UuidGenerator,
    };

    fn context() -> (TaskContext, Arc<MemoryEventSink>) {
        let events = Arc::new(MemoryEventSink::new());
        let ctx =
            TaskContext::new(Arc::new(InMemoryRecordStore::new())).with_events(events.clone());
        (ctx, events)
    }

    /// A persistent task forced into `status`.
    async fn task_in(status: TaskStatus) -> Task {
        let (ctx, _) = context();
        let mut task = Task::create(ctx, NewTask::default()).await.unwrap();
        task.update_status(status, None).await.unwrap();
        task
    }

    #[tokio::test]
    async fn create_persists_and_emits() {
        let (ctx, events) = context();
        let task = Task::create(
            ctx.clone(),
            NewTask {
                title: "nightly".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(!task.is_temporary());
        assert_eq!(task.status(), TaskStatus::Init);
        let stored = Task::get(ctx.clone(), task.id(), false).await.unwrap();
        assert_eq!(stored.record().title, "nightly");
        assert_eq!(
            Task::get_status(&ctx, task.id()).await.unwrap(),
            TaskStatus::Init
        );
        assert_eq!(events.names(), vec!["task_created"]);
    }

    #[tokio::test]
    async fn temporary_task_never_touches_store() {
        let (ctx, events) = context();
        let mut task = Task::create_temporary(ctx.clone(), NewTask::default());
        assert!(task.is_temporary());

        task.update_status(TaskStatus::Validating, Some(&[TaskStatus::Init]))
            .await
            .unwrap();
        task.set_validation_failed(json!({"etype": "ValueError"}))
            .await
            .unwrap();

        assert_eq!(task.status(), TaskStatus::ValidationFailed);
        assert!(matches!(
            task.record().validation_result,
            Some(ValidationResult::Log(_))
        ));
        assert!(Task::list(ctx.clone(), &TaskFilter::default())
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            Task::get_status(&ctx, task.id()).await,
            Err(TaskError::NotFound { kind: "task", .. })
        ));
        assert_eq!(events.events()[0], DomainEvent::TaskCreated {
            task_id: task.id(),
            temporary: true,
        });
        task.delete(None).await.unwrap();
    }

    #[tokio::test]
    async fn temporary_compare_and_set_is_checked_in_memory() {
        let (ctx, _) = context();
        let mut task = Task::create_temporary(ctx, NewTask::default());

        let err = task
            .update_status(TaskStatus::Finished, Some(&[TaskStatus::Running]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TaskError::ConcurrentStatusConflict { actual: TaskStatus::Init, .. }
        ));
        assert_eq!(task.status(), TaskStatus::Init);
    }

    #[tokio::test]
    async fn update_status_with_allowed_set_is_compare_and_set() {
        let mut task = task_in(TaskStatus::Validated).await;

        let err = task
            .update_status(TaskStatus::Finished, Some(&[TaskStatus::Running]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TaskError::ConcurrentStatusConflict { actual: TaskStatus::Validated, .. }
        ));

        task.update_status(TaskStatus::Running, Some(&[TaskStatus::Validated]))
            .await
            .unwrap();
        assert_eq!(
            Task::get_status(task.context(), task.id()).await.unwrap(),
            TaskStatus::Running
        );
    }

    #[tokio::test]
    async fn empty_allowed_set_means_unconditional() {
        let mut task = task_in(TaskStatus::Finished).await;
        task.update_status(TaskStatus::Running, Some(&[])).await.unwrap();
        assert_eq!(
            Task::get_status(task.context(), task.id()).await.unwrap(),
            TaskStatus::Running
        );
    }

    #[tokio::test]
    async fn set_failed_records_crash_detail() {
        let mut task = task_in(TaskStatus::Running).await;
        task.set_failed("KeyError", "boom", "Traceback").await.unwrap();

        let stored = Task::get(task.context().clone(), task.id(), false)
            .await
            .unwrap();
        assert_eq!(stored.status(), TaskStatus::Crashed);
        assert_eq!(
            stored.record().validation_result,
            Some(ValidationResult::Crashed(CrashDetail {
                etype: "KeyError".into(),
                msg: "boom".into(),
                trace: "Traceback".into(),
            }))
        );
    }

    #[tokio::test]
    async fn list_filters_by_status_and_tags() {
        let (ctx, _) = context();
        let mut running = Task::create(ctx.clone(), NewTask::default().with_tags(["smoke"]))
            .await
            .unwrap();
        running.update_status(TaskStatus::Running, None).await.unwrap();
        Task::create(ctx.clone(), NewTask::default().with_tags(["perf"]))
            .await
            .unwrap();

        let by_status = Task::list(
            ctx.clone(),
            &TaskFilter {
                status: Some(TaskStatus::Running),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(by_status.len(), 1);
        assert_eq!(by_status[0].id(), running.id());

        let by_tag = Task::list(
            ctx,
            &TaskFilter {
                tags: vec!["perf".into(), "missing".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(by_tag.len(), 1);
        assert_ne!(by_tag[0].id(), running.id());
    }

    #[tokio::test]
    async fn delete_with_expected_status() {
        let task = task_in(TaskStatus::Running).await;
        let ctx = task.context().clone();
        let id = task.id();

        let err = Task::delete_by_id(&ctx, id, Some(TaskStatus::Finished))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::ConcurrentStatusConflict { .. }));
        assert!(Task::get(ctx.clone(), id, false).await.is_ok());

        task.delete(Some(TaskStatus::Running)).await.unwrap();
        assert!(matches!(
            Task::get(ctx, id, false).await,
            Err(TaskError::NotFound { .. })
        ));
    }

    #[rstest]
    #[case::init_hard(TaskStatus::Init, false)]
    #[case::init_soft(TaskStatus::Init, true)]
    #[case::validating_hard(TaskStatus::Validating, false)]
    #[case::validating_soft(TaskStatus::Validating, true)]
    #[tokio::test]
    async fn abort_unsupported_in_early_stages(#[case] status: TaskStatus, #[case] soft: bool) {
        let mut task = task_in(status).await;
        let err = task.abort(soft).await.unwrap_err();
        assert!(matches!(
            err,
            TaskError::UnsupportedAbortStage { status: s, .. } if s == status
        ));
        assert_eq!(
            Task::get_status(task.context(), task.id()).await.unwrap(),
            status
        );
    }

    #[rstest]
    #[case::finished_hard(TaskStatus::Finished, false)]
    #[case::finished_soft(TaskStatus::Finished, true)]
    #[case::crashed_hard(TaskStatus::Crashed, false)]
    #[case::crashed_soft(TaskStatus::Crashed, true)]
    #[case::aborted_hard(TaskStatus::Aborted, false)]
    #[case::aborted_soft(TaskStatus::Aborted, true)]
    #[tokio::test]
    async fn abort_rejected_once_finished(#[case] status: TaskStatus, #[case] soft: bool) {
        let mut task = task_in(status).await;
        let err = task.abort(soft).await.unwrap_err();
        assert!(matches!(
            err,
            TaskError::AlreadyFinished { status: s, .. } if s == status
        ));
    }

    #[rstest]
    #[case::hard(false, TaskStatus::Aborting)]
    #[case::soft(true, TaskStatus::SoftAborting)]
    #[tokio::test]
    async fn abort_running_task(#[case] soft: bool, #[case] expected: TaskStatus) {
        let mut task = task_in(TaskStatus::Running).await;
        task.abort(soft).await.unwrap();
        assert_eq!(task.status(), expected);
        assert_eq!(
            Task::get_status(task.context(), task.id()).await.unwrap(),
            expected
        );
    }

    #[tokio::test]
    async fn soft_abort_twice_stays_soft_aborting() {
        let mut task = task_in(TaskStatus::Running).await;
        task.abort(true).await.unwrap();
        task.abort(true).await.unwrap();
        assert_eq!(
            Task::get_status(task.context(), task.id()).await.unwrap(),
            TaskStatus::SoftAborting
        );
    }

    #[tokio::test]
    async fn hard_abort_escalates_soft_abort() {
        let mut task = task_in(TaskStatus::Running).await;
        task.abort(true).await.unwrap();
        task.abort(false).await.unwrap();
        assert_eq!(task.status(), TaskStatus::Aborting);
    }

    #[rstest]
    #[case::validated(TaskStatus::Validated)]
    #[case::aborting(TaskStatus::Aborting)]
    #[case::validation_failed(TaskStatus::ValidationFailed)]
    #[tokio::test]
    async fn abort_outside_abortable_set_conflicts(#[case] status: TaskStatus) {
        let mut task = task_in(status).await;
        let err = task.abort(true).await.unwrap_err();
        assert!(matches!(
            err,
            TaskError::ConcurrentStatusConflict { actual, .. } if actual == status
        ));
    }

    #[tokio::test]
    async fn abort_emits_request_and_status_change() {
        let (ctx, events) = context();
        let mut task = Task::create(ctx, NewTask::default()).await.unwrap();
        task.update_status(TaskStatus::Running, None).await.unwrap();
        task.abort(false).await.unwrap();

        let names = events.names();
        assert_eq!(
            &names[names.len() - 2..],
            &["abort_requested", "status_changed"]
        );
        assert!(matches!(
            events.events().last(),
            Some(DomainEvent::StatusChanged { to: TaskStatus::Aborting, allowed: Some(a), .. })
                if a == &TaskStatus::ABORTABLE.to_vec()
        ));
    }

    #[tokio::test]
    async fn temporary_task_can_be_aborted() {
        let (ctx, _) = context();
        let mut task = Task::create_temporary(ctx, NewTask::default());
        task.update_status(TaskStatus::Running, None).await.unwrap();
        task.abort(true).await.unwrap();
        assert_eq!(task.status(), TaskStatus::SoftAborting);
    }

    /// Completes the task right after `abort` has read its status.
    struct CompletingStore {
        inner: InMemoryRecordStore,
        complete_with: TaskStatus,
    }

    #[async_trait]
    impl RecordStore for CompletingStore {
        async fn task_create(&self, attrs: NewTask) -> Result<TaskRecord, StoreError> {
            self.inner.task_create(attrs).await
        }

        async fn task_get(&self, id: TaskId, detailed: bool) -> Result<TaskRecord, StoreError> {
            self.inner.task_get(id, detailed).await
        }

        async fn task_get_status(&self, id: TaskId) -> Result<TaskStatus, StoreError> {
            let observed = self.inner.task_get_status(id).await?;
            self.inner
                .task_update(id, TaskUpdate::status(self.complete_with))
                .await?;
            Ok(observed)
        }

        async fn task_list(&self, filter: &TaskFilter) -> Result<Vec<TaskRecord>, StoreError> {
            self.inner.task_list(filter).await
        }

        async fn task_update(
            &self,
            id: TaskId,
            values: TaskUpdate,
        ) -> Result<TaskRecord, StoreError> {
            self.inner.task_update(id, values).await
        }

        async fn task_update_status(
            &self,
            id: TaskId,
            status: TaskStatus,
            allowed: &[TaskStatus],
        ) -> Result<TaskRecord, StoreError> {
            self.inner.task_update_status(id, status, allowed).await
        }

        async fn task_delete(
            &self,
            id: TaskId,
            status: Option<TaskStatus>,
        ) -> Result<(), StoreError> {
            self.inner.task_delete(id, status).await
        }

        async fn deployment_get(&self, id: DeploymentId) -> Result<DeploymentRecord, StoreError> {
            self.inner.deployment_get(id).await
        }

        async fn subtask_create(
            &self,
            task_id: TaskId,
            attrs: NewSubtask,
        ) -> Result<SubtaskRecord, StoreError> {
            self.inner.subtask_create(task_id, attrs).await
        }

        async fn subtask_update(
            &self,
            id: SubtaskId,
            values: SubtaskUpdate,
        ) -> Result<SubtaskRecord, StoreError> {
            self.inner.subtask_update(id, values).await
        }

        async fn workload_create(
            &self,
            task_id: TaskId,
            subtask_id: SubtaskId,
            attrs: NewWorkload,
        ) -> Result<WorkloadRecord, StoreError> {
            self.inner.workload_create(task_id, subtask_id, attrs).await
        }

        async fn workload_data_create(
            &self,
            task_id: TaskId,
            workload_id: WorkloadId,
            chunk_order: u32,
            data: Vec<Iteration>,
        ) -> Result<(), StoreError> {
            self.inner
                .workload_data_create(task_id, workload_id, chunk_order, data)
                .await
        }

        async fn workload_set_results(
            &self,
            task_id: TaskId,
            subtask_id: SubtaskId,
            workload_id: WorkloadId,
            results: WorkloadResults,
        ) -> Result<(), StoreError> {
            self.inner
                .workload_set_results(task_id, subtask_id, workload_id, results)
                .await
        }
    }

    #[rstest]
    #[case::finished(TaskStatus::Finished)]
    #[case::crashed(TaskStatus::Crashed)]
    #[tokio::test]
    async fn abort_losing_race_to_completion_conflicts(#[case] completed: TaskStatus) {
        let store = Arc::new(CompletingStore {
            inner: InMemoryRecordStore::new(),
            complete_with: completed,
        });
        let ctx = TaskContext::new(store.clone());
        let mut task = Task::create(ctx, NewTask::default()).await.unwrap();
        store
            .inner
            .task_update_status(task.id(), TaskStatus::Running, &[TaskStatus::Init])
            .await
            .unwrap();

        let err = task.abort(false).await.unwrap_err();
        assert!(matches!(
            err,
            TaskError::ConcurrentStatusConflict { actual, .. } if actual == completed
        ));
        assert_eq!(
            store.inner.task_get_status(task.id()).await.unwrap(),
            completed
        );
    }

    #[tokio::test]
    async fn transition_follows_graph_edges() {
        let mut task = task_in(TaskStatus::Init).await;
        task.transition(TaskStatus::Validating).await.unwrap();
        task.transition(TaskStatus::Validated).await.unwrap();

        let err = task.transition(TaskStatus::Finished).await.unwrap_err();
        assert!(matches!(
            err,
            TaskError::ConcurrentStatusConflict { actual: TaskStatus::Validated, .. }
        ));

        let err = task.transition(TaskStatus::Init).await.unwrap_err();
        assert!(matches!(
            err,
            TaskError::InvalidTransition { to: TaskStatus::Init, .. }
        ));
    }

    /// Advances one second per reading.
    struct TickingClock {
        start: chrono::DateTime<Utc>,
        ticks: AtomicI64,
    }

    impl Clock for TickingClock {
        fn now(&self) -> chrono::DateTime<Utc> {
            let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
            self.start + chrono::TimeDelta::seconds(tick)
        }
    }

    #[tokio::test]
    async fn conditional_update_refreshes_timestamps() {
        let start = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let clock = TickingClock {
            start,
            ticks: AtomicI64::new(0),
        };
        let store = InMemoryRecordStore::with_parts(Arc::new(clock), Arc::new(UuidGenerator));
        let ctx = TaskContext::new(Arc::new(store));
        let mut task = Task::create(ctx.clone(), NewTask::default()).await.unwrap();
        assert_eq!(task.record().updated_at, Some(start));

        task.update_status(TaskStatus::Validating, Some(&[TaskStatus::Init]))
            .await
            .unwrap();

        let stored = Task::get(ctx, task.id(), false).await.unwrap();
        assert_eq!(task.status(), TaskStatus::Validating);
        assert!(task.record().updated_at > Some(start));
        assert_eq!(task.record().updated_at, stored.record().updated_at);
        assert_eq!(task.record().created_at, Some(start));
    }

    #[tokio::test]
    async fn to_report_adds_deployment_name_and_times() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let store = Arc::new(InMemoryRecordStore::with_parts(
            Arc::new(FixedClock::new(at)),
            Arc::new(UuidGenerator),
        ));
        let deployment = store.insert_deployment("devstack").await;
        let ctx = TaskContext::new(store);
        let task = Task::create(ctx.clone(), NewTask::for_deployment(deployment.uuid))
            .await
            .unwrap();
        let subtask = task.add_subtask(NewSubtask::new("s")).await.unwrap();
        subtask
            .add_workload(NewWorkload {
                name: "Dummy.dummy".into(),
                description: String::new(),
                position: 0,
                runner: Runner::new("constant"),
                context: json!({}),
                hooks: vec![],
                sla: json!({}),
                args: json!({}),
            })
            .await
            .unwrap();

        let detailed = Task::get(ctx, task.id(), true).await.unwrap();
        let report = detailed.to_report(&ReportConfig::default()).await.unwrap();

        assert_eq!(report["deployment_name"], "devstack");
        assert_eq!(report["created_at"], "2024-03-09T07:05:01");
        assert_eq!(report["subtasks"][0]["updated_at"], "2024-03-09T07:05:01");
        assert_eq!(
            report["subtasks"][0]["workloads"][0]["created_at"],
            "2024-03-09T07:05:01"
        );
        assert_eq!(report["status"], "init");
    }

    #[tokio::test]
    async fn extend_results_over_stored_data() {
        let (ctx, events) = context();
        let task = Task::create(ctx.clone(), NewTask::default()).await.unwrap();
        let subtask = task.add_subtask(NewSubtask::new("s")).await.unwrap();
        let workload = subtask
            .add_workload(NewWorkload {
                name: "Dummy.dummy".into(),
                description: String::new(),
                position: 0,
                runner: Runner::new("constant"),
                context: json!({}),
                hooks: vec![],
                sla: json!({}),
                args: json!({}),
            })
            .await
            .unwrap();
        workload
            .add_workload_data(
                0,
                vec![
                    Iteration::new(1.0, 2.0)
                        .with_action("a", 0.0, 1.0)
                        .with_action("a", 1.0, 1.5),
                    Iteration::new(0.0, 3.0)
                        .with_action("a", 0.0, 0.5)
                        .with_error("E", "m", "tb"),
                ],
            )
            .await
            .unwrap();

        let detailed = Task::get(ctx, task.id(), true).await.unwrap();
        let extended = detailed.extend_results(
            &ResultAggregator::with_defaults(),
            Some(IterationsMode::Streaming),
        );

        let w = extended.workloads().next().unwrap();
        assert_eq!(w.info.iterations_failed, 1);
        assert_eq!(w.info.atomic["a"].count, 2);
        assert!(w.iterations.is_streaming());
        assert_eq!(events.names().last(), Some(&"results_extended"));
    }

    #[rstest]
    #[case::configured_serializable("iterations = \"serializable\"", None, false)]
    #[case::configured_streaming("iterations = \"streaming\"", None, true)]
    #[case::default_config("", None, true)]
    #[case::explicit_mode_wins(
        "iterations = \"serializable\"",
        Some(IterationsMode::Streaming),
        true
    )]
    #[tokio::test]
    async fn extend_results_mode_falls_back_to_config(
        #[case] toml: &str,
        #[case] mode: Option<IterationsMode>,
        #[case] streaming: bool,
    ) {
        let (ctx, _) = context();
        let task = Task::create(ctx.clone(), NewTask::default()).await.unwrap();
        let subtask = task.add_subtask(NewSubtask::new("s")).await.unwrap();
        let workload = subtask
            .add_workload(NewWorkload {
                name: "Dummy.dummy".into(),
                description: String::new(),
                position: 0,
                runner: Runner::new("constant"),
                context: json!({}),
                hooks: vec![],
                sla: json!({}),
                args: json!({}),
            })
            .await
            .unwrap();
        workload
            .add_workload_data(0, vec![Iteration::new(0.0, 1.0)])
            .await
            .unwrap();

        let config = ReportConfig::from_toml_str(toml).unwrap();
        let aggregator = ResultAggregator::new(config, Arc::new(MainStatsTableFactory));
        let detailed = Task::get(ctx, task.id(), true).await.unwrap();
        let extended = detailed.extend_results(&aggregator, mode);

        let iterations = &extended.workloads().next().unwrap().iterations;
        assert_eq!(iterations.is_streaming(), streaming);
        assert_eq!(iterations.len(), 1);
    }
}
