//! Reactive agenda store.
//!
//! [`AgendaStore`] owns the task collection and the view state around it
//! (selected week, loading flag, drag flag, last sync error). Each piece is
//! published on a [`tokio::sync::watch`] channel so any number of views can
//! observe it.
//!
//! Mutations are optimistic: a command replaces the snapshot immediately
//! and hands its remote operation to the sync worker. When the worker
//! reports back through [`AgendaStore::resolve`], the store either
//! reconciles the snapshot with the service's answer or rolls the mutation
//! back.
//!
//! The store is driven from a single event loop through `&mut self`, so one
//! command always finishes before the next begins.

mod inflight;

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use wenda_proto::calendar::Week;
use wenda_proto::task::{TaskChanges, TaskRecord};
use wenda_proto::weekday::Weekday;

use crate::agenda::{
    self, Command, CommandContext, CommandError, RemoteOp, Task, TaskId, TaskPatch, TempId,
};
use crate::drag::{DragCoordinator, DragEvent, DragResolution};
use crate::gateway::GatewayError;
use crate::sync::{OpId, ServerPatch, SyncOutcome, SyncRequest};

use inflight::{InFlight, InFlightOp, OpKind};

/// Errors surfaced by the store.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    /// The command was rejected; nothing changed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The service rejected or never received an operation; its optimistic
    /// effect has been rolled back.
    #[error("sync failed: {0}")]
    Sync(#[from] GatewayError),
}

/// Settings fixed for the lifetime of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Week selected at startup.
    pub week: Week,
    /// Maximum task content length in characters.
    pub max_content_len: usize,
}

/// Single source of truth for the agenda.
pub struct AgendaStore {
    tasks: watch::Sender<Arc<Vec<Task>>>,
    loading: watch::Sender<bool>,
    week: watch::Sender<Week>,
    dragging: watch::Sender<bool>,
    last_error: watch::Sender<Option<StoreError>>,
    drag: DragCoordinator,
    inflight: InFlight,
    sync: mpsc::Sender<SyncRequest>,
    max_content_len: usize,
}

impl AgendaStore {
    /// Creates an empty store that sends remote operations to `sync`.
    #[must_use]
    pub fn new(sync: mpsc::Sender<SyncRequest>, options: StoreOptions) -> Self {
        Self {
            tasks: watch::Sender::new(Arc::new(Vec::new())),
            loading: watch::Sender::new(false),
            week: watch::Sender::new(options.week),
            dragging: watch::Sender::new(false),
            last_error: watch::Sender::new(None),
            drag: DragCoordinator::new(),
            inflight: InFlight::default(),
            sync,
            max_content_len: options.max_content_len,
        }
    }

    // --- Reads ---

    /// Current collection snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<Task>> {
        Arc::clone(&self.tasks.borrow())
    }

    /// Tasks of the selected week on `day`, in display order.
    #[must_use]
    pub fn visible_tasks(&self, day: Weekday) -> Vec<Task> {
        let week = agenda::tasks_for_week(&self.snapshot(), self.selected_week());
        agenda::tasks_for_day(&week, day)
    }

    /// Week currently on screen.
    #[must_use]
    pub fn selected_week(&self) -> Week {
        *self.week.borrow()
    }

    /// Whether a fetch is in progress.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Whether a drag is in progress.
    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    /// Most recent sync failure, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<StoreError> {
        self.last_error.borrow().clone()
    }

    /// Number of remote operations awaiting an outcome.
    #[must_use]
    pub fn pending_operations(&self) -> usize {
        self.inflight.len()
    }

    // --- Subscriptions ---

    /// Observe collection snapshots.
    #[must_use]
    pub fn subscribe_tasks(&self) -> watch::Receiver<Arc<Vec<Task>>> {
        self.tasks.subscribe()
    }

    /// Observe the loading flag.
    #[must_use]
    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    /// Observe the selected week.
    #[must_use]
    pub fn subscribe_week(&self) -> watch::Receiver<Week> {
        self.week.subscribe()
    }

    /// Observe the drag flag.
    #[must_use]
    pub fn subscribe_dragging(&self) -> watch::Receiver<bool> {
        self.dragging.subscribe()
    }

    /// Observe sync failures.
    #[must_use]
    pub fn subscribe_errors(&self) -> watch::Receiver<Option<StoreError>> {
        self.last_error.subscribe()
    }

    // --- View state ---

    /// Selects `week`. Tasks are not refetched.
    pub fn set_selected_week(&mut self, week: Week) {
        self.week.send_if_modified(|current| {
            let changed = *current != week;
            *current = week;
            changed
        });
    }

    /// Selects the following week.
    pub fn next_week(&mut self) {
        self.set_selected_week(self.selected_week().next());
    }

    /// Selects the preceding week.
    pub fn previous_week(&mut self) {
        self.set_selected_week(self.selected_week().prev());
    }

    /// Selects the week containing today.
    pub fn current_week(&mut self) {
        self.set_selected_week(Week::current());
    }

    /// Sets the loading flag.
    pub fn set_loading(&mut self, loading: bool) {
        self.loading.send_if_modified(|current| {
            let changed = *current != loading;
            *current = loading;
            changed
        });
    }

    /// Asks the worker to refetch every task and raises the loading flag
    /// until the answer arrives.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sync`] if the worker cannot take the request.
    pub fn request_refresh(&mut self) -> Result<(), StoreError> {
        self.set_loading(true);
        if let Err(e) = self.sync.try_send(SyncRequest::Fetch) {
            tracing::warn!(error = %e, "sync worker refused fetch");
            self.set_loading(false);
            return Err(self.fail(GatewayError::Network(e.to_string())));
        }
        Ok(())
    }

    // --- Commands ---

    /// Runs `command`, publishes the resulting snapshot and schedules its
    /// remote operation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Command`] if the command is rejected, in which
    /// case nothing changes, or [`StoreError::Sync`] if the worker cannot
    /// take the request, in which case the mutation is rolled back.
    pub fn apply_command(&mut self, command: &Command) -> Result<(), StoreError> {
        let before = self.snapshot();
        let ctx = CommandContext {
            week: self.selected_week(),
            max_content_len: self.max_content_len,
        };
        let outcome = agenda::command::apply(&before, &ctx, command)?;

        let touched = outcome
            .remote
            .task_ids()
            .into_iter()
            .map(|id| {
                let prior = before.iter().find(|t| t.id == id).cloned();
                (id, prior)
            })
            .collect();
        let after = Arc::new(outcome.tasks);
        self.tasks.send_replace(Arc::clone(&after));

        let (op_id, kind, request) = match outcome.remote {
            RemoteOp::Create { temp_id, record } => {
                let op_id = self.inflight.allocate();
                (
                    op_id,
                    OpKind::Create(temp_id),
                    SyncRequest::Create {
                        op_id,
                        task: record,
                    },
                )
            }
            RemoteOp::Update(patches) => {
                let patches = server_patches(patches);
                if patches.is_empty() {
                    tracing::debug!("update targets pending tasks only, deferred to create");
                    return Ok(());
                }
                let op_id = self.inflight.allocate();
                (op_id, OpKind::Update, SyncRequest::Update { op_id, patches })
            }
        };

        let op = InFlightOp {
            kind,
            before,
            after,
            touched,
        };
        self.submit(op_id, op, request)
    }

    /// Feeds a gesture event to the drag coordinator. A completed drop runs
    /// the resulting move command.
    ///
    /// # Errors
    ///
    /// Returns the move command's error, see [`AgendaStore::apply_command`].
    pub fn dispatch_drag(&mut self, event: DragEvent) -> Result<DragResolution, StoreError> {
        let tasks = self.snapshot();
        let resolution = self.drag.handle(event, &tasks);
        let dragging = self.drag.is_dragging();
        self.dragging.send_if_modified(|current| {
            let changed = *current != dragging;
            *current = dragging;
            changed
        });

        if let DragResolution::Move { id, target } = &resolution {
            self.apply_command(&Command::MoveTask {
                id: id.clone(),
                day: target.day,
                index: target.index,
            })?;
        }
        Ok(resolution)
    }

    // --- Reconciliation ---

    /// Applies a worker outcome.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sync`] when the outcome is a failure. The
    /// operation's effect has already been rolled back and the error
    /// published on the error channel.
    pub fn resolve(&mut self, outcome: SyncOutcome) -> Result<(), StoreError> {
        match outcome {
            SyncOutcome::Fetched(result) => self.resolve_fetch(result),
            SyncOutcome::Created { op_id, result } => {
                let Some(op) = self.take_op(op_id) else {
                    return Ok(());
                };
                match (result, op.kind) {
                    (Ok(record), OpKind::Create(temp)) => {
                        self.confirm_create(temp, record);
                        Ok(())
                    }
                    (Ok(_), OpKind::Update) => {
                        tracing::warn!(%op_id, "create outcome for an update operation");
                        Ok(())
                    }
                    (Err(e), _) => Err(self.roll_back(op_id, &op, e)),
                }
            }
            SyncOutcome::Updated { op_id, result } => {
                let Some(op) = self.take_op(op_id) else {
                    return Ok(());
                };
                match result {
                    Ok(records) => {
                        self.adopt_updates(records);
                        Ok(())
                    }
                    Err(e) => Err(self.roll_back(op_id, &op, e)),
                }
            }
        }
    }

    fn take_op(&mut self, op_id: OpId) -> Option<InFlightOp> {
        let op = self.inflight.take(op_id);
        if op.is_none() {
            tracing::warn!(%op_id, "outcome for unknown operation ignored");
        }
        op
    }

    fn resolve_fetch(
        &mut self,
        result: Result<Vec<TaskRecord>, GatewayError>,
    ) -> Result<(), StoreError> {
        self.set_loading(false);
        let records = result.map_err(|e| self.fail(e))?;

        // Keep local versions of pending tasks and of tasks whose update is
        // still in flight.
        let current = self.snapshot();
        let mut next: Vec<Task> = records
            .into_iter()
            .map(|record| {
                let id = TaskId::Confirmed(record.task_id.clone());
                if self.inflight.touches(&id)
                    && let Some(local) = current.iter().find(|t| t.id == id)
                {
                    return local.clone();
                }
                Task::from(record)
            })
            .collect();
        next.extend(current.iter().filter(|t| t.id.is_pending()).cloned());

        tracing::debug!(count = next.len(), "task list refreshed");
        self.tasks.send_replace(Arc::new(next));
        Ok(())
    }

    /// Replaces the pending task with its confirmed form and sends any local
    /// edits made while the create was in flight.
    fn confirm_create(&mut self, temp: TempId, record: TaskRecord) {
        self.inflight.confirm(temp, &record.task_id);

        let current = self.snapshot();
        let server_id = TaskId::Confirmed(record.task_id.clone());
        let Some(pos) = current.iter().position(|t| t.id == TaskId::Pending(temp)) else {
            if !current.iter().any(|t| t.id == server_id) {
                tracing::debug!(task = %server_id, "pending task gone, inserting confirmed task");
                let mut next = current.to_vec();
                next.push(Task::from(record));
                self.tasks.send_replace(Arc::new(next));
            }
            return;
        };

        let local = &current[pos];
        let confirmed = Task {
            id: server_id.clone(),
            content: record.content.clone(),
            status: local.status,
            date: local.date,
            ordinal: local.ordinal,
        };
        let follow_up = diff(&record, &confirmed);

        // A fetch that ran after the service stored the task already lists
        // it under its server id. The pending entry folds into that copy.
        let mut next = current.to_vec();
        let pos = match current.iter().position(|t| t.id == server_id) {
            Some(fetched) => {
                tracing::debug!(task = %server_id, "confirmed task already fetched, merging");
                next[fetched] = confirmed;
                next.remove(pos);
                if fetched > pos { fetched - 1 } else { fetched }
            }
            None => {
                next[pos] = confirmed;
                pos
            }
        };
        let after = Arc::new(next);
        self.tasks.send_replace(Arc::clone(&after));
        tracing::debug!(%temp, task = %server_id, "create confirmed");

        if follow_up.is_empty() {
            return;
        }

        // The service still holds the values it echoed back. Undoing the
        // follow-up means returning to those.
        let server_task = Task::from(record);
        let mut before = after.to_vec();
        before[pos] = server_task.clone();

        let op_id = self.inflight.allocate();
        let request = SyncRequest::Update {
            op_id,
            patches: vec![ServerPatch {
                task_id: server_task.id.to_string(),
                changes: follow_up,
            }],
        };
        let op = InFlightOp {
            kind: OpKind::Update,
            before: Arc::new(before),
            after,
            touched: vec![(server_id, Some(server_task))],
        };
        if let Err(e) = self.submit(op_id, op, request) {
            tracing::warn!(error = %e, "follow-up update for confirmed task not sent");
        }
    }

    /// Adopts the service's canonical values for tasks no other outstanding
    /// operation touches.
    fn adopt_updates(&mut self, records: Vec<TaskRecord>) {
        let current = self.snapshot();
        let mut next = current.to_vec();
        let mut changed = false;

        for record in records {
            let id = TaskId::Confirmed(record.task_id.clone());
            if self.inflight.touches(&id) {
                continue;
            }
            let Some(task) = next.iter_mut().find(|t| t.id == id) else {
                continue;
            };
            let canonical = Task::from(record);
            if *task != canonical {
                *task = canonical;
                changed = true;
            }
        }

        if changed {
            self.tasks.send_replace(Arc::new(next));
        }
    }

    /// Registers `op` and hands `request` to the worker. If the worker
    /// refuses, `op` is rolled back on the spot.
    fn submit(
        &mut self,
        op_id: OpId,
        op: InFlightOp,
        request: SyncRequest,
    ) -> Result<(), StoreError> {
        match self.sync.try_send(request) {
            Ok(()) => {
                tracing::debug!(%op_id, "remote operation scheduled");
                self.inflight.insert(op_id, op);
                Ok(())
            }
            Err(e) => {
                let err = GatewayError::Network(format!("sync worker unavailable: {e}"));
                Err(self.roll_back(op_id, &op, err))
            }
        }
    }

    /// Undoes `op` and publishes `error`.
    fn roll_back(&self, op_id: OpId, op: &InFlightOp, error: GatewayError) -> StoreError {
        let current = self.snapshot();
        let restored = if Arc::ptr_eq(&current, &op.after) {
            Arc::clone(&op.before)
        } else {
            let mut next = current.to_vec();
            for (id, prior) in &op.touched {
                match prior {
                    Some(task) => {
                        if let Some(slot) = next.iter_mut().find(|t| t.id == *id) {
                            *slot = task.clone();
                        }
                    }
                    None => next.retain(|t| t.id != *id),
                }
            }
            Arc::new(next)
        };
        tracing::warn!(%op_id, error = %error, "remote operation failed, rolled back");
        self.tasks.send_replace(restored);
        self.fail(error)
    }

    fn fail(&self, error: GatewayError) -> StoreError {
        let err = StoreError::Sync(error);
        self.last_error.send_replace(Some(err.clone()));
        err
    }
}

/// Server-addressed patches; patches for pending tasks are dropped.
fn server_patches(patches: Vec<TaskPatch>) -> Vec<ServerPatch> {
    patches
        .into_iter()
        .filter_map(|patch| match patch.id {
            TaskId::Confirmed(task_id) => Some(ServerPatch {
                task_id,
                changes: patch.changes,
            }),
            TaskId::Pending(_) => None,
        })
        .collect()
}

/// Fields of `local` that differ from what the service stored.
fn diff(stored: &TaskRecord, local: &Task) -> TaskChanges {
    TaskChanges {
        task_status: (stored.task_status != local.status).then_some(local.status),
        task_date: (stored.task_date != local.date).then_some(local.date),
        ordinal: stored
            .ordinal
            .total_cmp(&local.ordinal)
            .is_ne()
            .then_some(local.ordinal),
    }
}
