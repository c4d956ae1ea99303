//! TaskContext - ラッパーが共有する協調者の束
//!
//! ストア・イベント出力・ID 生成をまとめて注入します（グローバル状態なし）。

use std::sync::Arc;

use crate::impls::TracingEventSink;
use crate::ports::{EventSink, IdGenerator, RecordStore, UuidGenerator};

#[derive(Clone)]
pub struct TaskContext {
    pub store: Arc<dyn RecordStore>,
    pub events: Arc<dyn EventSink>,
    /// Only used for temporary tasks; persistent ids come from the store.
    pub ids: Arc<dyn IdGenerator>,
}

impl TaskContext {
    /// Events go to `tracing`, temporary ids are random v4 UUIDs.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            events: Arc::new(TracingEventSink),
            ids: Arc::new(UuidGenerator),
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }
}
