//! Bookkeeping for remote operations that have not been answered yet.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::agenda::{Task, TaskId, TempId};
use crate::sync::OpId;

/// What kind of request an operation sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpKind {
    /// Create of the pending task with this placeholder.
    Create(TempId),
    /// Update of confirmed tasks.
    Update,
}

/// Everything needed to reconcile or undo one operation.
#[derive(Debug, Clone)]
pub(crate) struct InFlightOp {
    pub kind: OpKind,
    /// Snapshot before the optimistic mutation.
    pub before: Arc<Vec<Task>>,
    /// Snapshot the mutation produced.
    pub after: Arc<Vec<Task>>,
    /// Each touched task and its state before the mutation; `None` if the
    /// mutation created it.
    pub touched: Vec<(TaskId, Option<Task>)>,
}

impl InFlightOp {
    fn touches(&self, id: &TaskId) -> bool {
        self.touched.iter().any(|(touched, _)| touched == id)
    }
}

/// Operations awaiting an outcome, keyed by [`OpId`].
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    next_id: u64,
    ops: BTreeMap<OpId, InFlightOp>,
}

impl InFlight {
    /// Reserves the next operation id.
    pub fn allocate(&mut self) -> OpId {
        self.next_id += 1;
        OpId::new(self.next_id)
    }

    pub fn insert(&mut self, id: OpId, op: InFlightOp) {
        self.ops.insert(id, op);
    }

    pub fn take(&mut self, id: OpId) -> Option<InFlightOp> {
        self.ops.remove(&id)
    }

    /// Whether any outstanding operation touches `id`.
    pub fn touches(&self, id: &TaskId) -> bool {
        self.ops.values().any(|op| op.touches(id))
    }

    /// Rewrites references to a pending task once its create is confirmed.
    pub fn confirm(&mut self, temp: TempId, server_id: &str) {
        let pending = TaskId::Pending(temp);
        for op in self.ops.values_mut() {
            for (id, prior) in &mut op.touched {
                if *id == pending {
                    *id = TaskId::Confirmed(server_id.to_string());
                    if let Some(task) = prior {
                        task.id = id.clone();
                    }
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}
