//! Task and subtask status, plus the task state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Task status.
///
/// State transitions:
/// - Init -> Validating
/// - Validating -> ValidationFailed | Aborting | SoftAborting | Crashed | Validated
/// - Validated -> Running
/// - Running -> Finished | Aborting | SoftAborting | Crashed
/// - Aborting -> Aborted
/// - SoftAborting -> Aborted
///
/// `abort` may additionally escalate SoftAborting -> Aborting (or re-enter
/// SoftAborting); that path goes through its own compare-and-set, not `next_statuses`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Init,
    Validating,
    ValidationFailed,
    Validated,
    Running,
    Finished,
    Aborting,
    SoftAborting,
    Aborted,
    Crashed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 10] = [
        TaskStatus::Init,
        TaskStatus::Validating,
        TaskStatus::ValidationFailed,
        TaskStatus::Validated,
        TaskStatus::Running,
        TaskStatus::Finished,
        TaskStatus::Aborting,
        TaskStatus::SoftAborting,
        TaskStatus::Aborted,
        TaskStatus::Crashed,
    ];

    /// Statuses from which an abort request may be applied.
    pub const ABORTABLE: [TaskStatus; 2] = [TaskStatus::Running, TaskStatus::SoftAborting];

    /// Directed edges of the state graph.
    pub fn next_statuses(self) -> &'static [TaskStatus] {
        use TaskStatus::*;
        match self {
            Init => &[Validating],
            Validating => &[ValidationFailed, Aborting, SoftAborting, Crashed, Validated],
            Validated => &[Running],
            Running => &[Finished, Aborting, SoftAborting, Crashed],
            Aborting | SoftAborting => &[Aborted],
            ValidationFailed | Finished | Aborted | Crashed => &[],
        }
    }

    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        self.next_statuses().contains(&next)
    }

    /// Every status with an edge into `self`.
    pub fn predecessors(self) -> Vec<TaskStatus> {
        Self::ALL
            .into_iter()
            .filter(|s| s.can_transition_to(self))
            .collect()
    }

    /// Abort is not implemented for these early stages.
    // TODO: allow abort from Init/Validating once the validator can observe
    // the aborting status.
    pub fn is_abort_unsupported(self) -> bool {
        matches!(self, TaskStatus::Init | TaskStatus::Validating)
    }

    /// Finished one way or another; abort is pointless.
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            TaskStatus::Finished | TaskStatus::Crashed | TaskStatus::Aborted
        )
    }

    /// No outgoing edges.
    pub fn is_terminal(self) -> bool {
        self.next_statuses().is_empty()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Init => "init",
            TaskStatus::Validating => "validating",
            TaskStatus::ValidationFailed => "validation_failed",
            TaskStatus::Validated => "validated",
            TaskStatus::Running => "running",
            TaskStatus::Finished => "finished",
            TaskStatus::Aborting => "aborting",
            TaskStatus::SoftAborting => "soft_aborting",
            TaskStatus::Aborted => "aborted",
            TaskStatus::Crashed => "crashed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subtask status (a subset of the task statuses).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtaskStatus {
    Init,
    Running,
    Finished,
    Aborting,
    SoftAborting,
    Aborted,
    Crashed,
}

impl From<SubtaskStatus> for TaskStatus {
    fn from(status: SubtaskStatus) -> Self {
        match status {
            SubtaskStatus::Init => TaskStatus::Init,
            SubtaskStatus::Running => TaskStatus::Running,
            SubtaskStatus::Finished => TaskStatus::Finished,
            SubtaskStatus::Aborting => TaskStatus::Aborting,
            SubtaskStatus::SoftAborting => TaskStatus::SoftAborting,
            SubtaskStatus::Aborted => TaskStatus::Aborted,
            SubtaskStatus::Crashed => TaskStatus::Crashed,
        }
    }
}

impl fmt::Display for SubtaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        TaskStatus::from(*self).fmt(f)
    }
}
