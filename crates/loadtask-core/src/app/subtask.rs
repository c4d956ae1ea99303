//! Subtask wrapper.

use crate::domain::{
    DomainEvent, NewWorkload, SubtaskId, SubtaskRecord, SubtaskStatus, SubtaskUpdate, TaskError,
};

use super::context::TaskContext;
use super::workload::Workload;

pub struct Subtask {
    ctx: TaskContext,
    record: SubtaskRecord,
}

impl Subtask {
    pub(crate) fn from_record(ctx: TaskContext, record: SubtaskRecord) -> Self {
        Self { ctx, record }
    }

    pub fn id(&self) -> SubtaskId {
        self.record.uuid
    }

    pub fn record(&self) -> &SubtaskRecord {
        &self.record
    }

    pub async fn update_status(&mut self, status: SubtaskStatus) -> Result<(), TaskError> {
        let updated = self
            .ctx
            .store
            .subtask_update(
                self.record.uuid,
                SubtaskUpdate {
                    status: Some(status),
                    ..Default::default()
                },
            )
            .await?;
        self.record.status = updated.status;
        self.record.updated_at = updated.updated_at;
        self.ctx.events.emit(DomainEvent::SubtaskStatusChanged {
            subtask_id: self.record.uuid,
            to: status,
        });
        Ok(())
    }

    pub async fn add_workload(&self, attrs: NewWorkload) -> Result<Workload, TaskError> {
        let record = self
            .ctx
            .store
            .workload_create(self.record.task_uuid, self.record.uuid, attrs)
            .await?;
        self.ctx.events.emit(DomainEvent::WorkloadCreated {
            subtask_id: self.record.uuid,
            workload_id: record.uuid,
            name: record.name.clone(),
        });
        Ok(Workload::from_record(self.ctx.clone(), record))
    }
}
