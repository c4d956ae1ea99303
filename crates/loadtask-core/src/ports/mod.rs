//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部の協調者（レコードストア、統計テーブル、ログ出力など）への
//! インターフェースを提供し、実装の詳細を隠蔽します。

pub mod clock;
pub mod event_sink;
pub mod id_generator;
pub mod record_store;
pub mod stats_table;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_sink::EventSink;
pub use self::id_generator::{IdGenerator, UuidGenerator};
pub use self::record_store::{DeploymentRecord, RecordStore, StoreError, TaskFilter};
pub use self::stats_table::{StatsTable, StatsTableFactory};
