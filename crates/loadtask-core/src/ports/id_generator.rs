//! IdGenerator port - ID 生成の抽象化
//!
//! テスト容易性のために trait として抽象化しています。
//!
//! # 実装
//! - **UuidGenerator**: ランダム UUID (v4)

use crate::domain::ids::{SubtaskId, TaskId, WorkloadId};

/// IdGenerator はレコード ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数スレッドから使える）
pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> TaskId;

    fn generate_subtask_id(&self) -> SubtaskId;

    fn generate_workload_id(&self) -> WorkloadId;
}

/// Random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate_task_id(&self) -> TaskId {
        TaskId::random()
    }

    fn generate_subtask_id(&self) -> SubtaskId {
        SubtaskId::random()
    }

    fn generate_workload_id(&self) -> WorkloadId {
        WorkloadId::random()
    }
}
