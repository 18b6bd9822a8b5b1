//! Integration tests for optimistic task sync.
//!
//! Drives an `AgendaStore` against the sync worker and an in-memory
//! service, feeding outcomes back by hand so arrival order can be chosen.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use wenda::agenda::{Command, TaskId};
use wenda::gateway::memory::InMemoryGateway;
use wenda::gateway::{GatewayError, TaskGateway};
use wenda::store::{AgendaStore, StoreError, StoreOptions};
use wenda::sync::{SyncOutcome, spawn_sync};
use wenda_proto::calendar::Week;
use wenda_proto::task::{
    MAX_TASK_CONTENT_LENGTH, NewTaskRecord, TaskChanges, TaskRecord, TaskStatus, UserId,
};
use wenda_proto::weekday::Weekday;

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn week() -> Week {
    Week::new(2025, 10).unwrap()
}

fn user() -> UserId {
    UserId::new("alice")
}

fn record(id: &str, day: Weekday, ordinal: f64) -> TaskRecord {
    TaskRecord {
        task_id: id.to_string(),
        content: format!("task {id}"),
        task_status: TaskStatus::ToDo,
        task_date: week().date_of(day),
        ordinal,
    }
}

/// In-memory service with slow fetches and slow "mark done" updates.
struct Laggy {
    inner: InMemoryGateway,
    fetch_delay: Duration,
    done_delay: Duration,
}

impl Laggy {
    fn new(inner: InMemoryGateway) -> Self {
        Self {
            inner,
            fetch_delay: Duration::ZERO,
            done_delay: Duration::ZERO,
        }
    }
}

impl TaskGateway for Laggy {
    async fn fetch_tasks(&self, user: &UserId) -> Result<Vec<TaskRecord>, GatewayError> {
        tokio::time::sleep(self.fetch_delay).await;
        self.inner.fetch_tasks(user).await
    }

    async fn create_task(
        &self,
        user: &UserId,
        task: &NewTaskRecord,
    ) -> Result<TaskRecord, GatewayError> {
        self.inner.create_task(user, task).await
    }

    async fn update_task(
        &self,
        task_id: &str,
        changes: &TaskChanges,
    ) -> Result<TaskRecord, GatewayError> {
        if changes.task_status == Some(TaskStatus::Done) {
            tokio::time::sleep(self.done_delay).await;
        }
        self.inner.update_task(task_id, changes).await
    }
}

/// Store wired to a worker over `gateway`.
fn setup<G: TaskGateway + 'static>(
    gateway: &Arc<G>,
) -> (AgendaStore, mpsc::Receiver<SyncOutcome>) {
    let (tx, rx) = spawn_sync(Arc::clone(gateway), user(), 16);
    let store = AgendaStore::new(
        tx,
        StoreOptions {
            week: week(),
            max_content_len: MAX_TASK_CONTENT_LENGTH,
        },
    );
    (store, rx)
}

async fn next_outcome(rx: &mut mpsc::Receiver<SyncOutcome>) -> SyncOutcome {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for sync outcome")
        .expect("sync worker stopped")
}

/// Receives one outcome and applies it.
async fn settle(store: &mut AgendaStore, rx: &mut mpsc::Receiver<SyncOutcome>) -> Result<(), StoreError> {
    let outcome = next_outcome(rx).await;
    store.resolve(outcome)
}

/// Store already holding the service's tasks.
async fn loaded<G: TaskGateway + 'static>(
    gateway: &Arc<G>,
) -> (AgendaStore, mpsc::Receiver<SyncOutcome>) {
    let (mut store, mut rx) = setup(gateway);
    store.request_refresh().unwrap();
    settle(&mut store, &mut rx).await.unwrap();
    (store, rx)
}

fn add(content: &str, day: Weekday) -> Command {
    Command::AddTask {
        content: content.to_string(),
        day,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn refresh_loads_tasks_and_clears_loading() {
    let gateway = Arc::new(InMemoryGateway::with_tasks(
        &user(),
        vec![
            record("a", Weekday::MONDAY, 1.0),
            record("b", Weekday::MONDAY, 0.0),
        ],
    ));
    let (mut store, mut rx) = setup(&gateway);
    let mut loading = store.subscribe_loading();

    store.request_refresh().unwrap();
    assert!(*loading.borrow_and_update());

    settle(&mut store, &mut rx).await.unwrap();
    assert!(loading.has_changed().unwrap());
    assert!(!*loading.borrow_and_update());

    let monday: Vec<String> = store
        .visible_tasks(Weekday::MONDAY)
        .iter()
        .map(|t| t.id.to_string())
        .collect();
    assert_eq!(monday, vec!["b", "a"]);
}

#[tokio::test]
async fn failed_refresh_clears_loading_and_reports() {
    let gateway = Arc::new(InMemoryGateway::new());
    gateway.fail_next(GatewayError::Auth("token expired".to_string()));
    let (mut store, mut rx) = setup(&gateway);

    store.request_refresh().unwrap();
    let err = settle(&mut store, &mut rx).await.unwrap_err();
    assert!(matches!(err, StoreError::Sync(GatewayError::Auth(_))));
    assert!(!store.is_loading());
    assert_eq!(store.last_error(), Some(err));
}

#[tokio::test]
async fn add_is_confirmed_by_service() {
    let gateway = Arc::new(InMemoryGateway::new());
    let (mut store, mut rx) = setup(&gateway);

    store.apply_command(&add("Buy milk", Weekday::TUESDAY)).unwrap();
    let tuesday = store.visible_tasks(Weekday::TUESDAY);
    assert_eq!(tuesday.len(), 1);
    assert!(tuesday[0].id.is_pending());
    assert_eq!(tuesday[0].status, TaskStatus::ToDo);
    assert_eq!(tuesday[0].weekday(), Weekday::TUESDAY);

    settle(&mut store, &mut rx).await.unwrap();

    let tuesday = store.visible_tasks(Weekday::TUESDAY);
    assert_eq!(tuesday.len(), 1);
    assert_eq!(tuesday[0].id, TaskId::Confirmed("task-1".to_string()));
    assert_eq!(tuesday[0].content, "Buy milk");
    assert_eq!(gateway.records(&user()).len(), 1);
    assert_eq!(store.pending_operations(), 0);
}

#[tokio::test]
async fn out_of_order_confirmations_match_by_temp_id() {
    let gateway = Arc::new(InMemoryGateway::new());
    let (mut store, mut rx) = setup(&gateway);

    store.apply_command(&add("T1", Weekday::MONDAY)).unwrap();
    store.apply_command(&add("T2", Weekday::MONDAY)).unwrap();

    let mut outcomes = vec![next_outcome(&mut rx).await, next_outcome(&mut rx).await];
    // Resolve T2's confirmation first regardless of arrival order.
    outcomes.sort_by_key(|outcome| match outcome {
        SyncOutcome::Created { result: Ok(r), .. } if r.content == "T2" => 0,
        _ => 1,
    });
    let mut outcomes = outcomes.into_iter();

    store.resolve(outcomes.next().unwrap()).unwrap();
    let tasks = store.snapshot();
    let t1 = tasks.iter().find(|t| t.content == "T1").unwrap();
    let t2 = tasks.iter().find(|t| t.content == "T2").unwrap();
    assert!(t1.id.is_pending());
    assert!(!t2.id.is_pending());
    assert_eq!(tasks.len(), 2);

    store.resolve(outcomes.next().unwrap()).unwrap();
    let tasks = store.snapshot();
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().all(|t| !t.id.is_pending()));
    let ids: Vec<&str> = tasks.iter().filter_map(|t| t.id.server_id()).collect();
    assert_ne!(ids[0], ids[1]);

    // Display order is unchanged: T1 above T2.
    let monday: Vec<String> = store
        .visible_tasks(Weekday::MONDAY)
        .iter()
        .map(|t| t.content.clone())
        .collect();
    assert_eq!(monday, vec!["T1", "T2"]);
}

#[tokio::test]
async fn failed_toggle_restores_exact_task() {
    let gateway = Arc::new(InMemoryGateway::with_tasks(
        &user(),
        vec![record("a", Weekday::WEDNESDAY, 2.5)],
    ));
    let (mut store, mut rx) = loaded(&gateway).await;
    let before = store.snapshot();
    let mut errors = store.subscribe_errors();

    gateway.fail_next(GatewayError::Network("connection reset".to_string()));
    store
        .apply_command(&Command::ToggleStatus {
            id: TaskId::Confirmed("a".to_string()),
        })
        .unwrap();
    assert_eq!(store.snapshot()[0].status, TaskStatus::Done);

    let err = settle(&mut store, &mut rx).await.unwrap_err();
    assert!(matches!(err, StoreError::Sync(GatewayError::Network(_))));
    assert_eq!(store.snapshot(), before);
    assert!(errors.has_changed().unwrap());
    assert_eq!(*errors.borrow_and_update(), Some(err));
}

#[tokio::test]
async fn failed_move_restores_status_day_and_ordinal() {
    let gateway = Arc::new(InMemoryGateway::with_tasks(
        &user(),
        vec![
            record("a", Weekday::MONDAY, 0.0),
            record("b", Weekday::FRIDAY, 0.0),
        ],
    ));
    let (mut store, mut rx) = loaded(&gateway).await;
    let original = store
        .snapshot()
        .iter()
        .find(|t| t.id == TaskId::Confirmed("a".to_string()))
        .cloned()
        .unwrap();

    gateway.fail_next(GatewayError::NotFound("a".to_string()));
    store
        .apply_command(&Command::MoveTask {
            id: original.id.clone(),
            day: Weekday::FRIDAY,
            index: 1,
        })
        .unwrap();
    let failure = next_outcome(&mut rx).await;

    // An unrelated local change lands before the failure is applied.
    store.apply_command(&add("unrelated", Weekday::SUNDAY)).unwrap();

    let err = store.resolve(failure).unwrap_err();
    assert!(matches!(err, StoreError::Sync(GatewayError::NotFound(_))));
    settle(&mut store, &mut rx).await.unwrap();

    let restored = store
        .snapshot()
        .iter()
        .find(|t| t.id == original.id)
        .cloned()
        .unwrap();
    assert_eq!(restored, original);
    assert_eq!(store.visible_tasks(Weekday::SUNDAY).len(), 1);
}

#[tokio::test]
async fn renumbered_move_reaches_the_service() {
    let gateway = Arc::new(InMemoryGateway::with_tasks(
        &user(),
        vec![
            record("a", Weekday::THURSDAY, 1.0),
            record("b", Weekday::THURSDAY, 1.0),
            record("x", Weekday::MONDAY, 0.0),
        ],
    ));
    let (mut store, mut rx) = loaded(&gateway).await;

    store
        .apply_command(&Command::MoveTask {
            id: TaskId::Confirmed("x".to_string()),
            day: Weekday::THURSDAY,
            index: 1,
        })
        .unwrap();
    settle(&mut store, &mut rx).await.unwrap();

    for task in store.visible_tasks(Weekday::THURSDAY) {
        let stored = gateway.record(task.id.server_id().unwrap()).unwrap();
        assert_eq!(stored.task_date, task.date);
        assert!((stored.ordinal - task.ordinal).abs() < f64::EPSILON);
    }
    let order: Vec<String> = store
        .visible_tasks(Weekday::THURSDAY)
        .iter()
        .map(|t| t.id.to_string())
        .collect();
    assert_eq!(order, vec!["a", "x", "b"]);
}

#[tokio::test]
async fn toggle_while_pending_is_sent_after_confirmation() {
    let gateway = Arc::new(InMemoryGateway::new());
    let (mut store, mut rx) = setup(&gateway);

    store.apply_command(&add("Call mum", Weekday::SATURDAY)).unwrap();
    let pending = store.snapshot()[0].id.clone();
    store
        .apply_command(&Command::ToggleStatus { id: pending })
        .unwrap();

    // Create confirmation, then the follow-up update.
    settle(&mut store, &mut rx).await.unwrap();
    settle(&mut store, &mut rx).await.unwrap();

    let stored = gateway.records(&user());
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].task_status, TaskStatus::Done);
    assert_eq!(store.snapshot()[0].status, TaskStatus::Done);
    assert_eq!(store.pending_operations(), 0);
}

#[tokio::test]
async fn failed_create_removes_pending_task() {
    let gateway = Arc::new(InMemoryGateway::new());
    gateway.fail_next(GatewayError::Validation("content rejected".to_string()));
    let (mut store, mut rx) = setup(&gateway);

    store.apply_command(&add("nope", Weekday::MONDAY)).unwrap();
    assert_eq!(store.snapshot().len(), 1);

    let err = settle(&mut store, &mut rx).await.unwrap_err();
    assert!(matches!(err, StoreError::Sync(GatewayError::Validation(_))));
    assert!(store.snapshot().is_empty());
}

#[tokio::test]
async fn quick_toggles_keep_the_last_intent() {
    let mut gateway = Laggy::new(InMemoryGateway::with_tasks(
        &user(),
        vec![record("a", Weekday::MONDAY, 0.0)],
    ));
    gateway.done_delay = Duration::from_millis(100);
    let gateway = Arc::new(gateway);
    let (mut store, mut rx) = loaded(&gateway).await;
    let id = TaskId::Confirmed("a".to_string());

    // ToDo -> Done is slow at the service; Done -> ToDo is not.
    store
        .apply_command(&Command::ToggleStatus { id: id.clone() })
        .unwrap();
    store
        .apply_command(&Command::ToggleStatus { id: id.clone() })
        .unwrap();
    settle(&mut store, &mut rx).await.unwrap();
    settle(&mut store, &mut rx).await.unwrap();

    assert_eq!(store.snapshot()[0].status, TaskStatus::ToDo);
    assert_eq!(
        gateway.inner.record("a").unwrap().task_status,
        TaskStatus::ToDo
    );
    assert_eq!(store.pending_operations(), 0);
}

#[tokio::test]
async fn refresh_overlapping_create_and_toggle_keeps_local_state() {
    let mut gateway = Laggy::new(InMemoryGateway::with_tasks(
        &user(),
        vec![record("a", Weekday::MONDAY, 0.0)],
    ));
    gateway.fetch_delay = Duration::from_millis(50);
    let gateway = Arc::new(gateway);
    let (mut store, mut rx) = loaded(&gateway).await;

    store
        .apply_command(&Command::ToggleStatus {
            id: TaskId::Confirmed("a".to_string()),
        })
        .unwrap();
    store.apply_command(&add("Buy milk", Weekday::TUESDAY)).unwrap();
    store.request_refresh().unwrap();

    // Apply the fetch first, then the create, then the toggle.
    let mut outcomes = Vec::new();
    for _ in 0..3 {
        outcomes.push(next_outcome(&mut rx).await);
    }
    outcomes.sort_by_key(|outcome| match outcome {
        SyncOutcome::Fetched(_) => 0,
        SyncOutcome::Created { .. } => 1,
        SyncOutcome::Updated { .. } => 2,
    });
    let mut outcomes = outcomes.into_iter();

    let fetch = outcomes.next().unwrap();
    let SyncOutcome::Fetched(Ok(records)) = &fetch else {
        panic!("expected a successful fetch");
    };
    // The service stored the new task before answering the fetch.
    assert!(records.iter().any(|r| r.content == "Buy milk"));
    store.resolve(fetch).unwrap();
    assert!(!store.is_loading());
    let a = store
        .snapshot()
        .iter()
        .find(|t| t.id == TaskId::Confirmed("a".to_string()))
        .cloned()
        .unwrap();
    assert_eq!(a.status, TaskStatus::Done);

    store.resolve(outcomes.next().unwrap()).unwrap();
    let tasks = store.snapshot();
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().all(|t| !t.id.is_pending()));
    let tuesday = store.visible_tasks(Weekday::TUESDAY);
    assert_eq!(tuesday.len(), 1);
    assert_eq!(tuesday[0].content, "Buy milk");

    store.resolve(outcomes.next().unwrap()).unwrap();
    let tasks = store.snapshot();
    assert_eq!(tasks.len(), 2);
    let a = tasks
        .iter()
        .find(|t| t.id == TaskId::Confirmed("a".to_string()))
        .unwrap();
    assert_eq!(a.status, TaskStatus::Done);
    assert_eq!(store.pending_operations(), 0);
}
