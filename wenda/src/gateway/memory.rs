//! In-process task service.
//!
//! Stores tasks in a map behind a [`parking_lot::Mutex`]. Used when no
//! service URL is configured and as the gateway in tests, where
//! [`InMemoryGateway::fail_next`] injects errors into upcoming calls.

use std::collections::{BTreeMap, VecDeque};

use parking_lot::Mutex;
use wenda_proto::task::{NewTaskRecord, TaskChanges, TaskRecord, UserId};

use super::{GatewayError, TaskGateway};

#[derive(Default)]
struct State {
    next_id: u64,
    /// Server id -> (owner, task).
    tasks: BTreeMap<String, (UserId, TaskRecord)>,
    /// Errors returned by the next calls, oldest first.
    failures: VecDeque<GatewayError>,
}

/// Gateway backed by process memory. Server ids are `task-1`, `task-2`, ...
#[derive(Default)]
pub struct InMemoryGateway {
    state: Mutex<State>,
}

impl InMemoryGateway {
    /// Creates an empty service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service already holding `records` for `user`.
    #[must_use]
    pub fn with_tasks(user: &UserId, records: impl IntoIterator<Item = TaskRecord>) -> Self {
        let gateway = Self::new();
        {
            let mut state = gateway.state.lock();
            for record in records {
                state
                    .tasks
                    .insert(record.task_id.clone(), (user.clone(), record));
            }
        }
        gateway
    }

    /// Makes the next call fail with `error`. Queued errors are consumed in
    /// order, one per call.
    pub fn fail_next(&self, error: GatewayError) {
        self.state.lock().failures.push_back(error);
    }

    /// Tasks stored for `user`, ordered by server id.
    #[must_use]
    pub fn records(&self, user: &UserId) -> Vec<TaskRecord> {
        self.state
            .lock()
            .tasks
            .values()
            .filter(|(owner, _)| owner == user)
            .map(|(_, record)| record.clone())
            .collect()
    }

    /// Task `task_id`, if stored.
    #[must_use]
    pub fn record(&self, task_id: &str) -> Option<TaskRecord> {
        self.state
            .lock()
            .tasks
            .get(task_id)
            .map(|(_, record)| record.clone())
    }
}

impl TaskGateway for InMemoryGateway {
    async fn fetch_tasks(&self, user: &UserId) -> Result<Vec<TaskRecord>, GatewayError> {
        let failure = self.state.lock().failures.pop_front();
        if let Some(err) = failure {
            return Err(err);
        }
        Ok(self.records(user))
    }

    async fn create_task(
        &self,
        user: &UserId,
        task: &NewTaskRecord,
    ) -> Result<TaskRecord, GatewayError> {
        let mut state = self.state.lock();
        if let Some(err) = state.failures.pop_front() {
            return Err(err);
        }
        if task.content.trim().is_empty() {
            return Err(GatewayError::Validation("content is empty".to_string()));
        }
        state.next_id += 1;
        let record = task.clone().with_id(format!("task-{}", state.next_id));
        state
            .tasks
            .insert(record.task_id.clone(), (user.clone(), record.clone()));
        tracing::debug!(task_id = %record.task_id, "in-memory task created");
        Ok(record)
    }

    async fn update_task(
        &self,
        task_id: &str,
        changes: &TaskChanges,
    ) -> Result<TaskRecord, GatewayError> {
        let mut state = self.state.lock();
        if let Some(err) = state.failures.pop_front() {
            return Err(err);
        }
        let Some((_, record)) = state.tasks.get_mut(task_id) else {
            return Err(GatewayError::NotFound(task_id.to_string()));
        };
        changes.apply_to(record);
        Ok(record.clone())
    }
}
