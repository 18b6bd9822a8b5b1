//! Remote task service abstraction.
//!
//! Defines the [`TaskGateway`] trait the sync worker talks to. Concrete
//! implementations:
//! - [`memory::InMemoryGateway`]: process-local service used offline and in tests
//! - [`http::HttpGateway`]: JSON-over-HTTP binding to the hosted service

pub mod http;
pub mod memory;

use std::future::Future;

use wenda_proto::task::{NewTaskRecord, TaskChanges, TaskRecord, UserId};

/// Errors reported by a gateway call.
///
/// Each variant carries a human-readable detail so the error can be cloned
/// into the store's error channel.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The service rejected the request body.
    #[error("rejected by service: {0}")]
    Validation(String),

    /// The addressed task does not exist on the service.
    #[error("not found: {0}")]
    NotFound(String),

    /// The service could not be reached or failed to answer.
    #[error("network error: {0}")]
    Network(String),

    /// Credentials were missing or not accepted.
    #[error("not authorized: {0}")]
    Auth(String),

    /// The service answered with something that is not a valid response.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Async access to the remote task service.
///
/// Every call is independent; the worker may run several at once and
/// match results by its own operation ids.
pub trait TaskGateway: Send + Sync {
    /// Fetch every task owned by `user`.
    fn fetch_tasks(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Vec<TaskRecord>, GatewayError>> + Send;

    /// Create a task for `user` and return it with its assigned id.
    fn create_task(
        &self,
        user: &UserId,
        task: &NewTaskRecord,
    ) -> impl Future<Output = Result<TaskRecord, GatewayError>> + Send;

    /// Apply `changes` to task `task_id` and return the stored task.
    fn update_task(
        &self,
        task_id: &str,
        changes: &TaskChanges,
    ) -> impl Future<Output = Result<TaskRecord, GatewayError>> + Send;
}
