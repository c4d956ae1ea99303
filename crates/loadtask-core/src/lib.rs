//! loadtask-core
//!
//! Lifecycle and result aggregation for benchmark tasks.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, status, task, subtask, workload, iteration, info, errors, events）
//! - **ports**: 抽象化レイヤー（RecordStore, StatsTable, Clock, IdGenerator, EventSink）
//! - **impls**: 実装（InMemoryRecordStore, MainStatsTable, EventSink 各種）
//! - **app**: ラッパーと集計（Task, Subtask, Workload, ResultAggregator）
//! - **schema**: 結果ペイロードの JSON Schema と検証
//! - **config**: レポート設定（TOML）

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod schema;

pub use app::{ResultAggregator, Task, TaskContext};
pub use config::{IterationsMode, ReportConfig};
pub use domain::{TaskError, TaskStatus};
