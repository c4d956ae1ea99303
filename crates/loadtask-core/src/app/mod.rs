//! App - アプリケーション層
//!
//! ports を組み合わせて、エンティティのラッパーと集計を実装します。
//!
//! # 主要コンポーネント
//! - **Task / Subtask / Workload**: RecordStore へ委譲するラッパー
//! - **ResultAggregator**: レポート用の集計ビュー（書き込み経路には入らない）
//! - **import_task_results**: 旧形式の結果ファイルの取り込み

pub mod aggregator;
pub mod context;
pub mod import;
pub mod subtask;
pub mod task;
pub mod workload;

// 主要な型を再エクスポート
pub use self::aggregator::{
    ExtendedSubtask, ExtendedTask, ExtendedWorkload, IterationStream, Iterations,
    ResultAggregator,
};
pub use self::context::TaskContext;
pub use self::import::import_task_results;
pub use self::subtask::Subtask;
pub use self::task::Task;
pub use self::workload::Workload;
