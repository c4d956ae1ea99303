//! EventSink implementations.

use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};

use crate::domain::DomainEvent;
use crate::ports::EventSink;

/// Forwards events to `tracing`.
///
/// Lifecycle changes are logged at info, data appends at debug.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: DomainEvent) {
        match &event {
            DomainEvent::WorkloadDataAppended {
                workload_id,
                chunk_order,
                iterations,
            } => debug!(
                event = event.name(),
                workload_id = %workload_id,
                chunk_order,
                iterations,
                "workload data appended"
            ),
            DomainEvent::StatusChanged {
                task_id,
                to,
                allowed,
            } => info!(
                event = event.name(),
                task_id = %task_id,
                to = %to,
                allowed = ?allowed,
                "task status changed"
            ),
            DomainEvent::AbortRequested {
                task_id,
                soft,
                observed,
            } => info!(
                event = event.name(),
                task_id = %task_id,
                soft,
                observed = %observed,
                "abort requested"
            ),
            other => info!(event = other.name(), detail = ?other),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: DomainEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<DomainEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(DomainEvent::name).collect()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: DomainEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
