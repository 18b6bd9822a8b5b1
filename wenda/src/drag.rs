//! Drag session state machine.
//!
//! A drag starts `Idle`, becomes `Dragging` when a task is picked up, and
//! returns to `Idle` on drop or cancel. Hover events only record the slot
//! under the pointer. A completed drop onto a different slot resolves to a
//! [`DragResolution::Move`] that the caller turns into a move command; every
//! other ending leaves the tasks untouched.

use std::fmt;

use wenda_proto::weekday::Weekday;

use crate::agenda::{Task, TaskId};

/// A position in a day bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropSlot {
    /// Bucket.
    pub day: Weekday,
    /// Position among the bucket's other tasks.
    pub index: usize,
}

impl DropSlot {
    /// Creates a slot.
    #[must_use]
    pub const fn new(day: Weekday, index: usize) -> Self {
        Self { day, index }
    }
}

impl fmt::Display for DropSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.day, self.index)
    }
}

/// Gesture events fed into the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEvent {
    /// A task was picked up from `source`.
    Start {
        /// Task being dragged.
        id: TaskId,
        /// Where it was picked up.
        source: DropSlot,
    },
    /// The pointer moved over a slot, or off every slot.
    Hover {
        /// Slot under the pointer.
        over: Option<DropSlot>,
    },
    /// The task was released, over a slot or outside any.
    Drop {
        /// Slot the task was released on.
        target: Option<DropSlot>,
    },
    /// The gesture was aborted.
    Cancel,
}

/// Current phase of the drag session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragPhase {
    /// No drag in progress.
    #[default]
    Idle,
    /// A task is being dragged.
    Dragging {
        /// Task being dragged.
        id: TaskId,
        /// Where it was picked up.
        source: DropSlot,
        /// Last slot reported under the pointer.
        hover: Option<DropSlot>,
    },
}

/// Why a drag ended without moving anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Released outside any slot.
    NoTarget,
    /// Explicit cancel.
    Aborted,
    /// The dragged task disappeared before the drop.
    TaskGone,
}

/// What the caller should do after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragResolution {
    /// A drag began.
    Started,
    /// Hover slot recorded.
    Hovered,
    /// Move `id` to `target`.
    Move {
        /// Task to move.
        id: TaskId,
        /// Destination slot.
        target: DropSlot,
    },
    /// Dropped on its own slot; nothing to do.
    Unmoved,
    /// Drag ended without a move.
    Cancelled(CancelReason),
    /// The event does not apply in the current phase.
    Ignored,
}

/// Tracks a single drag session at a time.
#[derive(Debug, Default)]
pub struct DragCoordinator {
    phase: DragPhase,
}

impl DragCoordinator {
    /// Creates an idle coordinator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> &DragPhase {
        &self.phase
    }

    /// Whether a drag is in progress.
    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        matches!(self.phase, DragPhase::Dragging { .. })
    }

    /// Advances the state machine. `tasks` is the current collection, used
    /// to check that the dragged task still exists.
    pub fn handle(&mut self, event: DragEvent, tasks: &[Task]) -> DragResolution {
        match event {
            DragEvent::Start { id, source } => self.start(id, source, tasks),
            DragEvent::Hover { over } => match &mut self.phase {
                DragPhase::Dragging { hover, .. } => {
                    *hover = over;
                    DragResolution::Hovered
                }
                DragPhase::Idle => DragResolution::Ignored,
            },
            DragEvent::Drop { target } => match std::mem::take(&mut self.phase) {
                DragPhase::Dragging { id, source, .. } => {
                    Self::resolve_drop(id, source, target, tasks)
                }
                DragPhase::Idle => DragResolution::Ignored,
            },
            DragEvent::Cancel => match std::mem::take(&mut self.phase) {
                DragPhase::Dragging { id, .. } => {
                    tracing::debug!(task = %id, "drag cancelled");
                    DragResolution::Cancelled(CancelReason::Aborted)
                }
                DragPhase::Idle => DragResolution::Ignored,
            },
        }
    }

    fn start(&mut self, id: TaskId, source: DropSlot, tasks: &[Task]) -> DragResolution {
        if self.is_dragging() {
            tracing::debug!(task = %id, "drag already in progress, start ignored");
            return DragResolution::Ignored;
        }
        if !tasks.iter().any(|t| t.id == id) {
            tracing::debug!(task = %id, "drag start for unknown task ignored");
            return DragResolution::Ignored;
        }
        tracing::debug!(task = %id, %source, "drag started");
        self.phase = DragPhase::Dragging {
            id,
            source,
            hover: None,
        };
        DragResolution::Started
    }

    fn resolve_drop(
        id: TaskId,
        source: DropSlot,
        target: Option<DropSlot>,
        tasks: &[Task],
    ) -> DragResolution {
        let Some(target) = target else {
            return DragResolution::Cancelled(CancelReason::NoTarget);
        };
        if !tasks.iter().any(|t| t.id == id) {
            tracing::debug!(task = %id, "dragged task vanished before drop");
            return DragResolution::Cancelled(CancelReason::TaskGone);
        }
        if target == source {
            return DragResolution::Unmoved;
        }
        tracing::debug!(task = %id, %source, %target, "drag dropped");
        DragResolution::Move { id, target }
    }
}
