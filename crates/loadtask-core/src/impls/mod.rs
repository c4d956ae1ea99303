//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryRecordStore**: テスト用の正本（compare-and-set 対応）
//! - **MainStatsTable**: 既定の統計テーブル
//! - **TracingEventSink / NoopEventSink / MemoryEventSink**
//!
//! # 本番用実装
//! 本番用の RecordStore は別クレートに配置します。

pub mod event_sink;
pub mod inmem_store;
pub mod main_stats;

pub use self::event_sink::{MemoryEventSink, NoopEventSink, TracingEventSink};
pub use self::inmem_store::InMemoryRecordStore;
pub use self::main_stats::{MainStatsTable, MainStatsTableFactory};
