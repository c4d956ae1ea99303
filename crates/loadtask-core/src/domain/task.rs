//! Task record and its create/update attributes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{DeploymentId, TaskId};
use super::status::TaskStatus;
use super::subtask::SubtaskRecord;

/// Error detail attached to a crashed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrashDetail {
    pub etype: String,
    pub msg: String,
    pub trace: String,
}

/// Why validation (or the run) failed.
///
/// Stored as the bare payload: a crash detail object or an arbitrary validation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValidationResult {
    Crashed(CrashDetail),
    Log(serde_json::Value),
}

/// Attributes for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_uuid: Option<DeploymentId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

impl NewTask {
    pub fn for_deployment(deployment_uuid: DeploymentId) -> Self {
        Self {
            deployment_uuid: Some(deployment_uuid),
            ..Default::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_result: Option<ValidationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl TaskUpdate {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub uuid: TaskId,
    pub status: TaskStatus,
    #[serde(default)]
    pub deployment_uuid: Option<DeploymentId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub validation_result: Option<ValidationResult>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Only populated by detailed reads.
    #[serde(default)]
    pub subtasks: Vec<SubtaskRecord>,
}

impl TaskRecord {
    /// Builds a record from creation attributes (no timestamps).
    pub fn from_new(uuid: TaskId, attrs: NewTask) -> Self {
        Self {
            uuid,
            status: attrs.status.unwrap_or(TaskStatus::Init),
            deployment_uuid: attrs.deployment_uuid,
            title: attrs.title,
            description: attrs.description,
            tags: attrs.tags,
            validation_result: None,
            created_at: None,
            updated_at: None,
            subtasks: Vec::new(),
        }
    }

    /// Applies every `Some` field of `values`.
    pub fn apply(&mut self, values: TaskUpdate) {
        if let Some(status) = values.status {
            self.status = status;
        }
        if let Some(result) = values.validation_result {
            self.validation_result = Some(result);
        }
        if let Some(title) = values.title {
            self.title = title;
        }
        if let Some(description) = values.description {
            self.description = description;
        }
        if let Some(tags) = values.tags {
            self.tags = tags;
        }
    }
}
