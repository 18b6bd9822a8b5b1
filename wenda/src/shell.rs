//! Line-oriented agenda shell.
//!
//! Parses one command per line and runs it against an [`AgendaStore`].
//! Task positions are 1-based as shown by `show`. `move` is carried out as
//! a drag gesture (start, hover, drop) so it follows the same path as a
//! pointer-driven move.

use std::fmt;
use std::str::FromStr;

use wenda_proto::calendar::{CalendarError, Week};
use wenda_proto::task::TaskStatus;
use wenda_proto::weekday::{Weekday, WeekdayError};

use crate::agenda::{Command, Task};
use crate::drag::{DragEvent, DragResolution, DropSlot};
use crate::store::{AgendaStore, StoreError};

/// Usage summary printed by `help`.
pub const HELP: &str = "\
commands:
  show                              print the selected week
  add <day> <content>               add a task at the end of <day>
  done <day> <n>                    toggle task <n> of <day>
  move <day> <n> <day> <m>          move task <n> of <day> to position <m> of another day
  next | prev | today               change the selected week
  week <YYYY-Www>                   select a week
  refresh                           reload tasks from the service
  help                              show this text
  quit                              exit";

/// Errors from parsing or running a shell command.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// Unrecognized command word.
    #[error("unknown command: {0} (try `help`)")]
    Unknown(String),

    /// Wrong number or shape of arguments.
    #[error("usage: {0}")]
    Usage(&'static str),

    /// A day argument did not parse.
    #[error(transparent)]
    Weekday(#[from] WeekdayError),

    /// A week argument did not parse.
    #[error(transparent)]
    Week(#[from] CalendarError),

    /// A position argument is not a positive number.
    #[error("invalid position: {0}")]
    BadPosition(String),

    /// No task is shown at that position.
    #[error("no task {position} on {day}")]
    NoSuchTask {
        /// Day addressed.
        day: Weekday,
        /// 1-based position addressed.
        position: usize,
    },

    /// The store rejected the command.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A parsed shell command. Positions are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    /// Print the selected week.
    Show,
    /// Add a task.
    Add {
        /// Target day.
        day: Weekday,
        /// Task text.
        content: String,
    },
    /// Toggle a task's status.
    Done {
        /// Day shown.
        day: Weekday,
        /// Position shown.
        position: usize,
    },
    /// Move a task.
    Move {
        /// Source day.
        from_day: Weekday,
        /// Source position.
        from: usize,
        /// Target day.
        to_day: Weekday,
        /// Target position.
        to: usize,
    },
    /// Select the following week.
    Next,
    /// Select the preceding week.
    Prev,
    /// Select the current week.
    Today,
    /// Select a specific week.
    Week(Week),
    /// Refetch tasks.
    Refresh,
    /// Print usage.
    Help,
    /// Exit.
    Quit,
}

impl FromStr for ShellCommand {
    type Err = ShellError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(w, r)| (w, r.trim()));
        let args: Vec<&str> = rest.split_whitespace().collect();

        let command = match word.to_ascii_lowercase().as_str() {
            "show" | "ls" => Self::Show,
            "add" => {
                let (day, content) = rest
                    .split_once(char::is_whitespace)
                    .ok_or(ShellError::Usage("add <day> <content>"))?;
                Self::Add {
                    day: day.parse()?,
                    content: content.trim().to_string(),
                }
            }
            "done" | "toggle" => match args.as_slice() {
                [day, position] => Self::Done {
                    day: day.parse()?,
                    position: parse_position(position)?,
                },
                _ => return Err(ShellError::Usage("done <day> <n>")),
            },
            "move" | "mv" => match args.as_slice() {
                [from_day, from, to_day, to] => Self::Move {
                    from_day: from_day.parse()?,
                    from: parse_position(from)?,
                    to_day: to_day.parse()?,
                    to: parse_position(to)?,
                },
                _ => return Err(ShellError::Usage("move <day> <n> <day> <m>")),
            },
            "next" => Self::Next,
            "prev" => Self::Prev,
            "today" => Self::Today,
            "week" => match args.as_slice() {
                [week] => Self::Week(week.parse()?),
                _ => return Err(ShellError::Usage("week <YYYY-Www>")),
            },
            "refresh" => Self::Refresh,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(ShellError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

fn parse_position(raw: &str) -> Result<usize, ShellError> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ShellError::BadPosition(raw.to_string())),
    }
}

/// What the caller should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Print this text.
    Text(String),
    /// Nothing to print.
    Quiet,
    /// Stop the shell.
    Quit,
}

/// Runs shell commands against a store.
pub struct Shell {
    store: AgendaStore,
}

impl Shell {
    /// Wraps `store`.
    #[must_use]
    pub const fn new(store: AgendaStore) -> Self {
        Self { store }
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &AgendaStore {
        &self.store
    }

    /// Mutable access to the underlying store, for feeding sync outcomes.
    pub const fn store_mut(&mut self) -> &mut AgendaStore {
        &mut self.store
    }

    /// Parses and runs one input line. Blank lines do nothing.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError`] if the line does not parse or the store
    /// rejects the command.
    pub fn handle_line(&mut self, line: &str) -> Result<Reply, ShellError> {
        if line.trim().is_empty() {
            return Ok(Reply::Quiet);
        }
        let command: ShellCommand = line.parse()?;
        self.execute(command)
    }

    /// Runs a parsed command.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError`] if the store rejects the command or a
    /// position does not name a shown task.
    pub fn execute(&mut self, command: ShellCommand) -> Result<Reply, ShellError> {
        match command {
            ShellCommand::Show => return Ok(self.render()),
            ShellCommand::Add { day, content } => {
                self.store.apply_command(&Command::AddTask { content, day })?;
            }
            ShellCommand::Done { day, position } => {
                let task = self.task_at(day, position)?;
                self.store
                    .apply_command(&Command::ToggleStatus { id: task.id })?;
            }
            ShellCommand::Move {
                from_day,
                from,
                to_day,
                to,
            } => return self.drag_move(from_day, from, to_day, to),
            ShellCommand::Next => self.store.next_week(),
            ShellCommand::Prev => self.store.previous_week(),
            ShellCommand::Today => self.store.current_week(),
            ShellCommand::Week(week) => self.store.set_selected_week(week),
            ShellCommand::Refresh => {
                self.store.request_refresh()?;
                return Ok(Reply::Text("refreshing...".to_string()));
            }
            ShellCommand::Help => return Ok(Reply::Text(HELP.to_string())),
            ShellCommand::Quit => return Ok(Reply::Quit),
        }
        Ok(self.render())
    }

    /// Text rendering of the selected week.
    #[must_use]
    pub fn render(&self) -> Reply {
        Reply::Text(AgendaView::of(&self.store).to_string())
    }

    fn task_at(&self, day: Weekday, position: usize) -> Result<Task, ShellError> {
        position
            .checked_sub(1)
            .and_then(|index| self.store.visible_tasks(day).into_iter().nth(index))
            .ok_or(ShellError::NoSuchTask { day, position })
    }

    fn drag_move(
        &mut self,
        from_day: Weekday,
        from: usize,
        to_day: Weekday,
        to: usize,
    ) -> Result<Reply, ShellError> {
        let task = self.task_at(from_day, from)?;
        let source = DropSlot::new(from_day, from - 1);
        let target = DropSlot::new(to_day, to.saturating_sub(1));

        self.store.dispatch_drag(DragEvent::Start {
            id: task.id,
            source,
        })?;
        self.store.dispatch_drag(DragEvent::Hover {
            over: Some(target),
        })?;
        match self.store.dispatch_drag(DragEvent::Drop {
            target: Some(target),
        })? {
            DragResolution::Move { .. } => Ok(self.render()),
            DragResolution::Unmoved => Ok(Reply::Text("task already there".to_string())),
            other => {
                tracing::debug!(?other, "shell move did not complete");
                Ok(Reply::Text("move cancelled".to_string()))
            }
        }
    }
}

/// Snapshot of the selected week for display.
#[derive(Debug, Clone)]
pub struct AgendaView {
    week: Week,
    loading: bool,
    days: Vec<(Weekday, Vec<Task>)>,
}

impl AgendaView {
    /// Captures the selected week of `store`.
    #[must_use]
    pub fn of(store: &AgendaStore) -> Self {
        Self {
            week: store.selected_week(),
            loading: store.is_loading(),
            days: Weekday::ALL
                .iter()
                .map(|&day| (day, store.visible_tasks(day)))
                .collect(),
        }
    }
}

impl fmt::Display for AgendaView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} to {})",
            self.week,
            self.week.first_day().format("%b %-d"),
            self.week.date_of(Weekday::SATURDAY).format("%b %-d")
        )?;
        if self.loading {
            write!(f, " [loading]")?;
        }
        for (day, tasks) in &self.days {
            write!(
                f,
                "\n{} {}",
                day,
                self.week.date_of(*day).format("%m-%d")
            )?;
            if tasks.is_empty() {
                write!(f, "\n   -")?;
            }
            for (i, task) in tasks.iter().enumerate() {
                let mark = match task.status {
                    TaskStatus::ToDo => ' ',
                    TaskStatus::Done => 'x',
                };
                write!(f, "\n  {}. [{mark}] {}", i + 1, task.content)?;
                if task.id.is_pending() {
                    write!(f, " (saving)")?;
                }
            }
        }
        Ok(())
    }
}
