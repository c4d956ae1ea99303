//! Workload wrapper.

use crate::domain::{
    DomainEvent, Iteration, TaskError, WorkloadConfig, WorkloadId, WorkloadRecord,
    WorkloadResults,
};

use super::context::TaskContext;

pub struct Workload {
    ctx: TaskContext,
    record: WorkloadRecord,
}

impl Workload {
    pub(crate) fn from_record(ctx: TaskContext, record: WorkloadRecord) -> Self {
        Self { ctx, record }
    }

    pub fn id(&self) -> WorkloadId {
        self.record.uuid
    }

    pub fn record(&self) -> &WorkloadRecord {
        &self.record
    }

    /// Appends one chunk of raw iterations.
    ///
    /// A running benchmark writes chunks as they fill up; `chunk_order`
    /// decides where the chunk lands when the data is read back.
    pub async fn add_workload_data(
        &self,
        chunk_order: u32,
        data: Vec<Iteration>,
    ) -> Result<(), TaskError> {
        let iterations = data.len();
        self.ctx
            .store
            .workload_data_create(self.record.task_uuid, self.record.uuid, chunk_order, data)
            .await?;
        self.ctx.events.emit(DomainEvent::WorkloadDataAppended {
            workload_id: self.record.uuid,
            chunk_order,
            iterations,
        });
        Ok(())
    }

    /// Finalizes the workload once it has run.
    pub async fn set_results(&mut self, results: WorkloadResults) -> Result<(), TaskError> {
        let pass_sla = results.pass_sla();
        self.ctx
            .store
            .workload_set_results(
                self.record.task_uuid,
                self.record.subtask_uuid,
                self.record.uuid,
                results.clone(),
            )
            .await?;

        self.record.pass_sla = pass_sla;
        self.record.sla_results = results.sla_results;
        if !results.hooks.is_empty() {
            self.record.hooks = results.hooks;
        }
        self.record.full_duration = results.full_duration;
        self.record.load_duration = results.load_duration;
        self.record.start_time = results.start_time;

        self.ctx.events.emit(DomainEvent::WorkloadResultsSet {
            workload_id: self.record.uuid,
            pass_sla,
        });
        Ok(())
    }

    /// Projects a workload down to the config that reproduces it.
    pub fn format_workload_config(workload: &WorkloadRecord) -> WorkloadConfig {
        WorkloadConfig {
            args: workload.args.clone(),
            runner: workload.runner.clone(),
            context: workload.context.clone(),
            sla: workload.sla.clone(),
            hooks: workload.hooks.iter().map(|h| h.config.clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::app::Task;
    use crate::domain::{NewSubtask, NewTask, NewWorkload, Runner, SlaResult};
    use crate::impls::{InMemoryRecordStore, MemoryEventSink};

    fn new_workload() -> NewWorkload {
        NewWorkload {
            name: "Dummy.dummy".into(),
            description: "sleeps".into(),
            position: 0,
            runner: Runner::new("constant").with("times", json!(10)),
            context: json!({"users": {"tenants": 1}}),
            hooks: vec![json!({"name": "sys_call", "args": "true"})],
            sla: json!({"failure_rate": {"max": 0}}),
            args: json!({"sleep": 0.1}),
        }
    }

    async fn workload(events: Arc<MemoryEventSink>) -> (Task, Workload) {
        let ctx = TaskContext::new(Arc::new(InMemoryRecordStore::new())).with_events(events);
        let task = Task::create(ctx, NewTask::default()).await.unwrap();
        let subtask = task.add_subtask(NewSubtask::new("s")).await.unwrap();
        let workload = subtask.add_workload(new_workload()).await.unwrap();
        (task, workload)
    }

    #[test]
    fn format_workload_config_keeps_hook_configs_only() {
        let record = WorkloadRecord {
            uuid: WorkloadId::random(),
            task_uuid: crate::domain::TaskId::random(),
            subtask_uuid: crate::domain::SubtaskId::random(),
            name: "w".into(),
            description: String::new(),
            position: 0,
            runner_type: "constant".into(),
            runner: Runner::new("constant"),
            context: json!({}),
            hooks: vec![crate::domain::HookResults::pending(json!({"name": "h"}))],
            sla: json!({}),
            args: json!({"a": 1}),
            sla_results: vec![],
            full_duration: 0.0,
            load_duration: 0.0,
            pass_sla: true,
            start_time: None,
            created_at: None,
            updated_at: None,
            data: vec![],
        };

        let config = Workload::format_workload_config(&record);
        assert_eq!(config.hooks, vec![json!({"name": "h"})]);
        assert_eq!(config.args, json!({"a": 1}));
        assert_eq!(
            serde_json::to_value(&config).unwrap()["runner"],
            json!({"type": "constant"})
        );
    }

    #[tokio::test]
    async fn chunks_are_read_back_in_order() {
        let events = Arc::new(MemoryEventSink::new());
        let (task, workload) = workload(events.clone()).await;

        workload
            .add_workload_data(1, vec![Iteration::new(3.0, 1.0)])
            .await
            .unwrap();
        workload
            .add_workload_data(0, vec![Iteration::new(1.0, 1.0), Iteration::new(2.0, 1.0)])
            .await
            .unwrap();

        let stored = Task::get(task.context().clone(), task.id(), true)
            .await
            .unwrap();
        let data = &stored.record().subtasks[0].workloads[0].data;
        let stamps: Vec<f64> = data.iter().map(|i| i.timestamp).collect();
        assert_eq!(stamps, vec![1.0, 2.0, 3.0]);
        assert_eq!(
            events
                .names()
                .iter()
                .filter(|n| **n == "workload_data_appended")
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn set_results_updates_record_and_store() {
        let events = Arc::new(MemoryEventSink::new());
        let (task, mut workload) = workload(events.clone()).await;

        workload
            .set_results(WorkloadResults {
                sla_results: vec![SlaResult {
                    criterion: "failure_rate".into(),
                    detail: "Failure rate criteria 0.00% <= 0.00% - Passed".into(),
                    success: true,
                }],
                full_duration: 12.0,
                load_duration: 10.0,
                start_time: Some(1.0),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(workload.record().pass_sla);
        assert_eq!(workload.record().load_duration, 10.0);
        let stored = Task::get(task.context().clone(), task.id(), true)
            .await
            .unwrap();
        let w = &stored.record().subtasks[0].workloads[0];
        assert_eq!(w.full_duration, 12.0);
        assert_eq!(w.start_time, Some(1.0));
        assert_eq!(events.names().last(), Some(&"workload_results_set"));
    }
}
