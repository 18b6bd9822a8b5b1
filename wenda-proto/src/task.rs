//! Task records exchanged with the remote task service.
//!
//! These are the server's view of a task: identities are plain server
//! strings and every field is concrete. The client wraps them in its own
//! model, which also knows about tasks still waiting for an id.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default maximum allowed task content length in characters.
pub const MAX_TASK_CONTENT_LENGTH: usize = 256;

/// Identity of the user owning a task list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wraps a user identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string form of this user ID.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Completion state of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Not yet done.
    #[default]
    ToDo,
    /// Completed.
    Done,
}

impl TaskStatus {
    /// The opposite status.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::ToDo => Self::Done,
            Self::Done => Self::ToDo,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToDo => write!(f, "todo"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// A task as stored and returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    /// Server-assigned identifier.
    #[serde(rename = "taskID")]
    pub task_id: String,
    /// Task text.
    pub content: String,
    /// Completion state.
    pub task_status: TaskStatus,
    /// Date whose weekday selects the task's bucket.
    pub task_date: NaiveDate,
    /// Sort key within the day bucket.
    pub ordinal: f64,
}

/// Body of a create request; the service assigns the identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTaskRecord {
    /// Task text.
    pub content: String,
    /// Completion state.
    pub task_status: TaskStatus,
    /// Date whose weekday selects the task's bucket.
    pub task_date: NaiveDate,
    /// Sort key within the day bucket.
    pub ordinal: f64,
}

impl NewTaskRecord {
    /// Attaches a server identifier, producing the stored form.
    #[must_use]
    pub fn with_id(self, task_id: impl Into<String>) -> TaskRecord {
        TaskRecord {
            task_id: task_id.into(),
            content: self.content,
            task_status: self.task_status,
            task_date: self.task_date,
            ordinal: self.ordinal,
        }
    }
}

/// Partial update of a stored task. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskChanges {
    /// New completion state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_status: Option<TaskStatus>,
    /// New date (moves the task to another day or week).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_date: Option<NaiveDate>,
    /// New position within the bucket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordinal: Option<f64>,
}

impl TaskChanges {
    /// Whether no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.task_status.is_none() && self.task_date.is_none() && self.ordinal.is_none()
    }

    /// Applies the present fields to `record`.
    pub fn apply_to(&self, record: &mut TaskRecord) {
        if let Some(status) = self.task_status {
            record.task_status = status;
        }
        if let Some(date) = self.task_date {
            record.task_date = date;
        }
        if let Some(ordinal) = self.ordinal {
            record.ordinal = ordinal;
        }
    }
}
