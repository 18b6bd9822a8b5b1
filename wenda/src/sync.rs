//! Background sync worker.
//!
//! Bridges the store, which runs on one event loop and never awaits, with
//! the async [`TaskGateway`]. The store sends [`SyncRequest`]s; the worker
//! reports a [`SyncOutcome`] when the gateway answers.
//!
//! ```text
//! store (event loop)  ─── SyncRequest ──→  worker ─┬→ fetch/create: one task each
//!                     ←── SyncOutcome ───          └→ update lane: one at a time
//! ```
//!
//! Fetches and creates run concurrently, so their outcomes arrive in
//! completion order. Updates go through a single lane and are sent, answered
//! and reported in request order: the service sees successive edits to a
//! task in the order they were made. Each outcome carries the [`OpId`] of its
//! request so the store can match it.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use wenda_proto::task::{NewTaskRecord, TaskChanges, TaskRecord, UserId};

use crate::gateway::{GatewayError, TaskGateway};

/// Default capacity of the request and outcome channels.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Identifies one remote operation from request to outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpId(u64);

impl OpId {
    /// Wraps a raw operation number.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op-{}", self.0)
    }
}

/// Field changes for one confirmed task, addressed by server id.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerPatch {
    /// Server identifier.
    pub task_id: String,
    /// Fields to change.
    pub changes: TaskChanges,
}

/// Requests from the store to the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncRequest {
    /// Fetch the user's full task list.
    Fetch,
    /// Create a task.
    Create {
        /// Operation the outcome is reported under.
        op_id: OpId,
        /// Task to create.
        task: NewTaskRecord,
    },
    /// Update one or more tasks, in order.
    Update {
        /// Operation the outcome is reported under.
        op_id: OpId,
        /// Patches to send.
        patches: Vec<ServerPatch>,
    },
    /// Stop accepting requests. Calls already running still report.
    Shutdown,
}

/// Results from the worker to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Answer to [`SyncRequest::Fetch`].
    Fetched(Result<Vec<TaskRecord>, GatewayError>),
    /// Answer to [`SyncRequest::Create`].
    Created {
        /// Operation being answered.
        op_id: OpId,
        /// Stored task, with its server id.
        result: Result<TaskRecord, GatewayError>,
    },
    /// Answer to [`SyncRequest::Update`]. Fails as a whole if any patch
    /// fails.
    Updated {
        /// Operation being answered.
        op_id: OpId,
        /// Stored tasks, one per patch.
        result: Result<Vec<TaskRecord>, GatewayError>,
    },
}

/// Spawns the worker and returns its request sender and outcome receiver.
///
/// The worker runs until it receives [`SyncRequest::Shutdown`] or every
/// request sender is dropped.
pub fn spawn_sync<G>(
    gateway: Arc<G>,
    user: UserId,
    capacity: usize,
) -> (mpsc::Sender<SyncRequest>, mpsc::Receiver<SyncOutcome>)
where
    G: TaskGateway + 'static,
{
    let (req_tx, req_rx) = mpsc::channel::<SyncRequest>(capacity);
    let (out_tx, out_rx) = mpsc::channel::<SyncOutcome>(capacity);

    tokio::spawn(async move {
        request_loop(gateway, user, req_rx, out_tx).await;
    });

    (req_tx, out_rx)
}

/// Receives requests. Updates are queued on the update lane; everything
/// else gets its own gateway call.
async fn request_loop<G>(
    gateway: Arc<G>,
    user: UserId,
    mut req_rx: mpsc::Receiver<SyncRequest>,
    out_tx: mpsc::Sender<SyncOutcome>,
) where
    G: TaskGateway + 'static,
{
    let (lane_tx, lane_rx) = mpsc::unbounded_channel::<SyncRequest>();
    tokio::spawn(update_lane(
        Arc::clone(&gateway),
        user.clone(),
        lane_rx,
        out_tx.clone(),
    ));

    while let Some(request) = req_rx.recv().await {
        if matches!(request, SyncRequest::Shutdown) {
            tracing::info!("sync worker shutting down");
            break;
        }
        if matches!(request, SyncRequest::Update { .. }) {
            if lane_tx.send(request).is_err() {
                tracing::warn!("update lane closed, update dropped");
            }
            continue;
        }
        let gateway = Arc::clone(&gateway);
        let user = user.clone();
        let out_tx = out_tx.clone();
        tokio::spawn(async move {
            let Some(outcome) = run(gateway.as_ref(), &user, request).await else {
                return;
            };
            if out_tx.send(outcome).await.is_err() {
                tracing::debug!("outcome receiver dropped");
            }
        });
    }
}

/// Runs queued updates one at a time. Each outcome is reported before the
/// next update starts.
async fn update_lane<G: TaskGateway>(
    gateway: Arc<G>,
    user: UserId,
    mut lane_rx: mpsc::UnboundedReceiver<SyncRequest>,
    out_tx: mpsc::Sender<SyncOutcome>,
) {
    while let Some(request) = lane_rx.recv().await {
        let Some(outcome) = run(gateway.as_ref(), &user, request).await else {
            continue;
        };
        if out_tx.send(outcome).await.is_err() {
            tracing::debug!("outcome receiver dropped, update lane stopping");
            break;
        }
    }
}

async fn run<G: TaskGateway>(
    gateway: &G,
    user: &UserId,
    request: SyncRequest,
) -> Option<SyncOutcome> {
    let outcome = match request {
        SyncRequest::Fetch => {
            let result = gateway.fetch_tasks(user).await;
            if let Err(e) = &result {
                tracing::warn!(error = %e, "fetch failed");
            }
            SyncOutcome::Fetched(result)
        }
        SyncRequest::Create { op_id, task } => {
            let result = gateway.create_task(user, &task).await;
            if let Err(e) = &result {
                tracing::warn!(%op_id, error = %e, "create failed");
            }
            SyncOutcome::Created { op_id, result }
        }
        SyncRequest::Update { op_id, patches } => {
            let result = update_all(gateway, &patches).await;
            if let Err(e) = &result {
                tracing::warn!(%op_id, error = %e, "update failed");
            }
            SyncOutcome::Updated { op_id, result }
        }
        SyncRequest::Shutdown => return None,
    };
    Some(outcome)
}

async fn update_all<G: TaskGateway>(
    gateway: &G,
    patches: &[ServerPatch],
) -> Result<Vec<TaskRecord>, GatewayError> {
    let mut records = Vec::with_capacity(patches.len());
    for patch in patches {
        records.push(gateway.update_task(&patch.task_id, &patch.changes).await?);
    }
    Ok(records)
}
