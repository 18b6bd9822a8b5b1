//! Task commands: pure functions from one collection snapshot to the next.
//!
//! Every command takes the current collection and a [`CommandContext`] and
//! either fails without producing anything, or returns the complete next
//! collection together with the [`RemoteOp`] that makes the service agree.
//! Nothing here reads ambient state; the caller decides when to apply the
//! result and when to send the remote operation.

use wenda_proto::task::{NewTaskRecord, TaskChanges, TaskStatus};
use wenda_proto::calendar::Week;
use wenda_proto::weekday::Weekday;

use super::ordinal::{self, Placement};
use super::partition;
use super::{Task, TaskId, TempId};

/// Input rejected before any mutation.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Content is empty after trimming whitespace.
    #[error("task content cannot be empty")]
    EmptyContent,
    /// Content exceeds the configured maximum.
    #[error("task content too long (max {max} characters)")]
    ContentTooLong {
        /// Maximum allowed characters.
        max: usize,
    },
}

/// Errors returned by the command functions.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    /// The command's input was invalid.
    #[error("invalid task: {0}")]
    Validation(#[from] ValidationError),
    /// The referenced task is not in the collection.
    #[error("task not found: {0}")]
    NotFound(TaskId),
}

/// A mutation requested by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Append a new task to `day` of the selected week.
    AddTask {
        /// Task text; surrounding whitespace is trimmed.
        content: String,
        /// Target bucket.
        day: Weekday,
    },
    /// Flip a task between to-do and done.
    ToggleStatus {
        /// Task to flip.
        id: TaskId,
    },
    /// Move a task to position `index` of `day` in the selected week.
    MoveTask {
        /// Task to move.
        id: TaskId,
        /// Target bucket.
        day: Weekday,
        /// Position among the target bucket's other tasks.
        index: usize,
    },
}

/// Everything a command needs besides the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandContext {
    /// Week currently on screen; new and moved tasks are dated inside it.
    pub week: Week,
    /// Maximum task content length in characters.
    pub max_content_len: usize,
}

/// Field changes for one task, addressed by its client identity.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskPatch {
    /// Task being changed.
    pub id: TaskId,
    /// Fields to send.
    pub changes: TaskChanges,
}

/// Remote side effect that mirrors a local mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOp {
    /// Create a task; the response carries the server id for `temp_id`.
    Create {
        /// Placeholder the new task is tracked under.
        temp_id: TempId,
        /// Fields to store.
        record: NewTaskRecord,
    },
    /// Update one or more tasks. The first patch is the task the command
    /// targeted; any further patches come from renumbering its bucket.
    Update(Vec<TaskPatch>),
}

impl RemoteOp {
    /// Identities of every task this operation touches.
    #[must_use]
    pub fn task_ids(&self) -> Vec<TaskId> {
        match self {
            Self::Create { temp_id, .. } => vec![TaskId::Pending(*temp_id)],
            Self::Update(patches) => patches.iter().map(|p| p.id.clone()).collect(),
        }
    }
}

/// Result of a successful command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    /// The complete next collection.
    pub tasks: Vec<Task>,
    /// Operation to send to the service.
    pub remote: RemoteOp,
}

/// Runs `command` against `tasks`.
///
/// # Errors
///
/// See [`add_task`], [`toggle_status`] and [`move_task`].
pub fn apply(
    tasks: &[Task],
    ctx: &CommandContext,
    command: &Command,
) -> Result<CommandOutcome, CommandError> {
    match command {
        Command::AddTask { content, day } => add_task(tasks, ctx, content, *day),
        Command::ToggleStatus { id } => toggle_status(tasks, id),
        Command::MoveTask { id, day, index } => move_task(tasks, ctx, id, *day, *index),
    }
}

/// Appends a pending to-do task at the end of `day` in the selected week.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyContent`] if `content` is blank, or
/// [`ValidationError::ContentTooLong`] if it exceeds the limit.
pub fn add_task(
    tasks: &[Task],
    ctx: &CommandContext,
    content: &str,
    day: Weekday,
) -> Result<CommandOutcome, CommandError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ValidationError::EmptyContent.into());
    }
    if content.chars().count() > ctx.max_content_len {
        return Err(ValidationError::ContentTooLong {
            max: ctx.max_content_len,
        }
        .into());
    }

    let existing: Vec<f64> = partition::bucket(tasks, ctx.week, day)
        .iter()
        .map(|t| t.ordinal)
        .collect();
    let temp_id = TempId::new();
    let task = Task {
        id: TaskId::Pending(temp_id),
        content: content.to_string(),
        status: TaskStatus::ToDo,
        date: ctx.week.date_of(day),
        ordinal: ordinal::after_last(&existing),
    };

    let record = NewTaskRecord {
        content: task.content.clone(),
        task_status: task.status,
        task_date: task.date,
        ordinal: task.ordinal,
    };
    let mut next = tasks.to_vec();
    next.push(task);

    Ok(CommandOutcome {
        tasks: next,
        remote: RemoteOp::Create { temp_id, record },
    })
}

/// Flips the status of task `id`. Date and ordinal are unchanged.
///
/// # Errors
///
/// Returns [`CommandError::NotFound`] if no task has that id.
pub fn toggle_status(tasks: &[Task], id: &TaskId) -> Result<CommandOutcome, CommandError> {
    let pos = position(tasks, id)?;
    let mut next = tasks.to_vec();
    let status = next[pos].status.toggled();
    next[pos].status = status;

    Ok(CommandOutcome {
        tasks: next,
        remote: RemoteOp::Update(vec![TaskPatch {
            id: id.clone(),
            changes: TaskChanges {
                task_status: Some(status),
                ..TaskChanges::default()
            },
        }]),
    })
}

/// Moves task `id` to position `index` of `day` in the selected week.
///
/// The task is dated on `day` of the selected week and given an ordinal
/// between its new neighbours. When no such ordinal exists, the target
/// bucket is renumbered and every task whose ordinal changed gets a patch.
/// Ordinals left behind in the source bucket are not compacted.
///
/// # Errors
///
/// Returns [`CommandError::NotFound`] if no task has that id.
pub fn move_task(
    tasks: &[Task],
    ctx: &CommandContext,
    id: &TaskId,
    day: Weekday,
    index: usize,
) -> Result<CommandOutcome, CommandError> {
    let pos = position(tasks, id)?;
    let date = ctx.week.date_of(day);

    let others: Vec<&Task> = partition::bucket(tasks, ctx.week, day)
        .into_iter()
        .filter(|t| t.id != *id)
        .collect();
    let neighbour_ordinals: Vec<f64> = others.iter().map(|t| t.ordinal).collect();
    let index = index.min(others.len());

    let mut next = tasks.to_vec();
    let mut patches = Vec::new();

    match ordinal::place(&neighbour_ordinals, index) {
        Placement::At(value) => {
            next[pos].date = date;
            next[pos].ordinal = value;
            patches.push(moved_patch(id, date, value));
        }
        Placement::Renumbered(values) => {
            tracing::debug!(task = %id, %day, "no gap left between neighbours, renumbering bucket");
            let mut order: Vec<TaskId> = others.iter().map(|t| t.id.clone()).collect();
            order.insert(index, id.clone());

            for (task_id, value) in order.iter().zip(values) {
                if task_id == id {
                    next[pos].date = date;
                    next[pos].ordinal = value;
                    patches.insert(0, moved_patch(id, date, value));
                    continue;
                }
                let Some(task) = next.iter_mut().find(|t| t.id == *task_id) else {
                    continue;
                };
                if task.ordinal.total_cmp(&value).is_ne() {
                    task.ordinal = value;
                    patches.push(TaskPatch {
                        id: task_id.clone(),
                        changes: TaskChanges {
                            ordinal: Some(value),
                            ..TaskChanges::default()
                        },
                    });
                }
            }
        }
    }

    Ok(CommandOutcome {
        tasks: next,
        remote: RemoteOp::Update(patches),
    })
}

fn moved_patch(id: &TaskId, date: chrono::NaiveDate, ordinal: f64) -> TaskPatch {
    TaskPatch {
        id: id.clone(),
        changes: TaskChanges {
            task_date: Some(date),
            ordinal: Some(ordinal),
            ..TaskChanges::default()
        },
    }
}

fn position(tasks: &[Task], id: &TaskId) -> Result<usize, CommandError> {
    tasks
        .iter()
        .position(|t| t.id == *id)
        .ok_or_else(|| CommandError::NotFound(id.clone()))
}
