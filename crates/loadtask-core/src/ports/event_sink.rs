//! EventSink port - イベント記録の抽象化
//!
//! グローバルな logger の代わりに、ラッパーへ注入されるログ出力口です。
//!
//! # 実装
//! - TracingEventSink: tracing へ転送（デフォルト）
//! - NoopEventSink: 何もしない
//! - MemoryEventSink: テスト・検証用に保持

use crate::domain::DomainEvent;

pub trait EventSink: Send + Sync {
    fn emit(&self, event: DomainEvent);
}
