//! Client-side task model and the pure operations over it.
//!
//! Tasks live in a flat collection. Day buckets are never stored: they are
//! derived from each task's date by the [`partition`] functions, and every
//! mutation goes through a [`command`] function that returns a fresh
//! collection instead of editing in place.

pub mod command;
pub mod ordinal;
pub mod partition;

use std::fmt;

use chrono::NaiveDate;
use uuid::Uuid;
use wenda_proto::calendar::Week;
use wenda_proto::task::{TaskRecord, TaskStatus};
use wenda_proto::weekday::Weekday;

pub use command::{
    Command, CommandContext, CommandError, CommandOutcome, RemoteOp, TaskPatch, ValidationError,
};
pub use partition::{tasks_for_day, tasks_for_week, tasks_not_for_day};

/// Placeholder identity for a task the service has not confirmed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TempId(Uuid);

impl TempId {
    /// Creates a new time-ordered placeholder (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `TempId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for TempId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task identity: either awaiting confirmation or assigned by the service.
///
/// Reconciliation matches on the [`TempId`] carried by `Pending`, so two
/// creates confirmed in any order each land on their own task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskId {
    /// Created locally, create request still in flight.
    Pending(TempId),
    /// Identifier assigned by the service.
    Confirmed(String),
}

impl TaskId {
    /// Whether the service has not assigned an id yet.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// The server identifier, if confirmed.
    #[must_use]
    pub fn server_id(&self) -> Option<&str> {
        match self {
            Self::Pending(_) => None,
            Self::Confirmed(id) => Some(id),
        }
    }

    /// The placeholder, if still pending.
    #[must_use]
    pub const fn temp_id(&self) -> Option<TempId> {
        match self {
            Self::Pending(temp) => Some(*temp),
            Self::Confirmed(_) => None,
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending(temp) => write!(f, "pending:{temp}"),
            Self::Confirmed(id) => write!(f, "{id}"),
        }
    }
}

/// A task as held by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// Pending or confirmed identity.
    pub id: TaskId,
    /// Task text, never empty.
    pub content: String,
    /// Completion state.
    pub status: TaskStatus,
    /// Date whose weekday selects the bucket.
    pub date: NaiveDate,
    /// Sort key within the bucket.
    pub ordinal: f64,
}

impl Task {
    /// Bucket this task belongs to.
    #[must_use]
    pub fn weekday(&self) -> Weekday {
        Weekday::of(self.date)
    }

    /// Calendar week this task belongs to.
    #[must_use]
    pub fn week(&self) -> Week {
        Week::of(self.date)
    }
}

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        Self {
            id: TaskId::Confirmed(record.task_id),
            content: record.content,
            status: record.task_status,
            date: record.task_date,
            ordinal: record.ordinal,
        }
    }
}
