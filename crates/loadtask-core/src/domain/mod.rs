//! Domain model (IDs, statuses, records, iterations, derived info).
//!
//! ここにはストレージや集計の実装詳細を含めません。
//! すべての型は serde で JSON と相互変換できます。

pub mod errors;
pub mod events;
pub mod ids;
pub mod info;
pub mod iteration;
pub mod status;
pub mod subtask;
pub mod task;
pub mod workload;

pub use errors::{TaskError, ValidationErrors};
pub use events::DomainEvent;
pub use ids::{DeploymentId, SubtaskId, TaskId, WorkloadId};
pub use info::{AtomicStat, AtomicTable, StatTable, WorkloadInfo};
pub use iteration::{
    AtomicAction, AtomicActions, Iteration, IterationOutput, LegacyScenarioOutput, MergedAction,
    OutputChart,
};
pub use status::{SubtaskStatus, TaskStatus};
pub use subtask::{NewSubtask, SubtaskRecord, SubtaskUpdate};
pub use task::{CrashDetail, NewTask, TaskRecord, TaskUpdate, ValidationResult};
pub use workload::{
    HookResults, HookRunResult, NewWorkload, Runner, SlaResult, TriggeredBy, WorkloadConfig,
    WorkloadRecord, WorkloadResults,
};
