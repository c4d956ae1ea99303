//! Domain identifiers (strongly-typed IDs).
//!
//! すべてのレコードは UUID 文字列で識別されます。
//! Phantom type パターンで `TaskId` と `WorkloadId` などを型レベルで区別しつつ、
//! 実装は `Id<T>` に一本化しています。
//!
//! Wire format is the bare UUID string, so records written by other tools
//! round-trip unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use uuid::Uuid;

/// IdMarker は各 ID 型のマーカー trait
///
/// `kind()` はエラーメッセージやログで使うレコード種別名です。
pub trait IdMarker: Send + Sync + 'static {
    fn kind() -> &'static str;
}

/// ジェネリック ID 型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    uuid: Uuid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self {
            uuid,
            _marker: PhantomData,
        }
    }

    /// Random (v4) identifier.
    pub fn random() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn kind(&self) -> &'static str {
        T::kind()
    }
}

impl<T: IdMarker> From<Uuid> for Id<T> {
    fn from(uuid: Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}

impl<T: IdMarker> FromStr for Id<T> {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self::from_uuid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.uuid.fmt(f)
    }
}

// ========================================
// マーカー型の定義
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn kind() -> &'static str {
        "task"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subtask {}

impl IdMarker for Subtask {
    fn kind() -> &'static str {
        "subtask"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Workload {}

impl IdMarker for Workload {
    fn kind() -> &'static str {
        "workload"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Deployment {}

impl IdMarker for Deployment {
    fn kind() -> &'static str {
        "deployment"
    }
}

/// Identifier of a Task (top-level benchmark run).
pub type TaskId = Id<Task>;

/// Identifier of a Subtask.
pub type SubtaskId = Id<Subtask>;

/// Identifier of a Workload (one scenario configuration).
pub type WorkloadId = Id<Workload>;

/// Identifier of the deployment a task runs against.
pub type DeploymentId = Id<Deployment>;
