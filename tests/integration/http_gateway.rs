//! Integration tests for the HTTP gateway against an in-process fake
//! task service built with axum.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch};
use axum::{Json, Router};
use parking_lot::Mutex;
use url::Url;
use wenda::agenda::{Command, TaskId};
use wenda::gateway::http::HttpGateway;
use wenda::gateway::{GatewayError, TaskGateway};
use wenda::store::{AgendaStore, StoreOptions};
use wenda::sync::spawn_sync;
use wenda_proto::calendar::Week;
use wenda_proto::task::{
    MAX_TASK_CONTENT_LENGTH, NewTaskRecord, TaskChanges, TaskRecord, TaskStatus, UserId,
};
use wenda_proto::weekday::Weekday;

// ---------------------------------------------------------------------------
// Fake service
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Service {
    next_id: u64,
    tasks: BTreeMap<String, TaskRecord>,
}

type Shared = Arc<Mutex<Service>>;

async fn list_tasks(State(state): State<Shared>, Path(user): Path<String>) -> Response {
    match user.as_str() {
        "locked" => (StatusCode::UNAUTHORIZED, "token expired").into_response(),
        "garbage" => (StatusCode::OK, "this is not json").into_response(),
        _ => {
            let tasks: Vec<TaskRecord> = state.lock().tasks.values().cloned().collect();
            Json(tasks).into_response()
        }
    }
}

async fn create_task(
    State(state): State<Shared>,
    Path(_user): Path<String>,
    Json(task): Json<NewTaskRecord>,
) -> Response {
    if task.content.trim().is_empty() {
        return (StatusCode::UNPROCESSABLE_ENTITY, "content is empty").into_response();
    }
    let mut service = state.lock();
    service.next_id += 1;
    let record = task.with_id(format!("srv-{}", service.next_id));
    service
        .tasks
        .insert(record.task_id.clone(), record.clone());
    (StatusCode::CREATED, Json(record)).into_response()
}

async fn update_task(
    State(state): State<Shared>,
    Path(task_id): Path<String>,
    Json(changes): Json<TaskChanges>,
) -> Response {
    if task_id == "boom" {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let mut service = state.lock();
    let Some(record) = service.tasks.get_mut(&task_id) else {
        return (StatusCode::NOT_FOUND, "no such task").into_response();
    };
    changes.apply_to(record);
    Json(record.clone()).into_response()
}

/// Starts the fake service on an OS-assigned port and returns its base URL.
async fn start_service() -> (Url, Shared) {
    let state: Shared = Arc::default();
    let app = Router::new()
        .route("/api/users/{user}/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/{task_id}", patch(update_task))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let base = Url::parse(&format!("http://{addr}/api/")).unwrap();
    (base, state)
}

fn gateway(base: Url) -> HttpGateway {
    HttpGateway::new(base, Duration::from_secs(5)).unwrap()
}

fn week() -> Week {
    Week::new(2025, 10).unwrap()
}

fn new_task(content: &str) -> NewTaskRecord {
    NewTaskRecord {
        content: content.to_string(),
        task_status: TaskStatus::ToDo,
        task_date: week().date_of(Weekday::TUESDAY),
        ordinal: 0.0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_fetch_and_update_round_trip() {
    let (base, _state) = start_service().await;
    let gw = gateway(base);
    let user = UserId::new("alice");

    let created = gw.create_task(&user, &new_task("Buy milk")).await.unwrap();
    assert_eq!(created.task_id, "srv-1");
    assert_eq!(created.content, "Buy milk");

    let fetched = gw.fetch_tasks(&user).await.unwrap();
    assert_eq!(fetched, vec![created.clone()]);

    let changes = TaskChanges {
        task_status: Some(TaskStatus::Done),
        ordinal: Some(3.5),
        ..TaskChanges::default()
    };
    let updated = gw.update_task(&created.task_id, &changes).await.unwrap();
    assert_eq!(updated.task_status, TaskStatus::Done);
    assert!((updated.ordinal - 3.5).abs() < f64::EPSILON);
    assert_eq!(updated.task_date, created.task_date);
}

#[tokio::test]
async fn unprocessable_maps_to_validation() {
    let (base, _state) = start_service().await;
    let err = gateway(base)
        .create_task(&UserId::new("alice"), &new_task("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Validation(ref detail) if detail.contains("content is empty")));
}

#[tokio::test]
async fn unauthorized_maps_to_auth() {
    let (base, _state) = start_service().await;
    let err = gateway(base)
        .fetch_tasks(&UserId::new("locked"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Auth(_)));
}

#[tokio::test]
async fn missing_task_maps_to_not_found() {
    let (base, _state) = start_service().await;
    let err = gateway(base)
        .update_task("nope", &TaskChanges::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::NotFound(_)));
}

#[tokio::test]
async fn server_error_maps_to_network() {
    let (base, _state) = start_service().await;
    let err = gateway(base)
        .update_task("boom", &TaskChanges::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Network(_)));
}

#[tokio::test]
async fn undecodable_body_maps_to_protocol() {
    let (base, _state) = start_service().await;
    let err = gateway(base)
        .fetch_tasks(&UserId::new("garbage"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Protocol(_)));
}

#[tokio::test]
async fn unreachable_service_maps_to_network() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base = Url::parse(&format!("http://{addr}/")).unwrap();
    let err = gateway(base)
        .fetch_tasks(&UserId::new("alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Network(_)));
}

#[tokio::test]
async fn store_syncs_through_http() {
    let (base, state) = start_service().await;
    let user = UserId::new("alice");
    let (tx, mut rx) = spawn_sync(Arc::new(gateway(base)), user, 16);
    let mut store = AgendaStore::new(
        tx,
        StoreOptions {
            week: week(),
            max_content_len: MAX_TASK_CONTENT_LENGTH,
        },
    );

    store
        .apply_command(&Command::AddTask {
            content: "Water plants".to_string(),
            day: Weekday::SATURDAY,
        })
        .unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    store.resolve(outcome).unwrap();

    let saturday = store.visible_tasks(Weekday::SATURDAY);
    assert_eq!(saturday.len(), 1);
    assert_eq!(saturday[0].id, TaskId::Confirmed("srv-1".to_string()));

    let stored = state.lock().tasks.get("srv-1").cloned().unwrap();
    assert_eq!(stored.task_date, week().date_of(Weekday::SATURDAY));
    assert_eq!(stored.content, "Water plants");
}
