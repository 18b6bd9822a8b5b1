//! HTTP binding to the hosted task service.
//!
//! Routes, relative to the configured base URL:
//! - `GET  users/{user}/tasks`  list a user's tasks
//! - `POST users/{user}/tasks`  create a task
//! - `PATCH tasks/{taskID}`     update a task
//!
//! Bodies are JSON in the wire shape of [`wenda_proto::task`].

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;
use wenda_proto::task::{NewTaskRecord, TaskChanges, TaskRecord, UserId};

use super::{GatewayError, TaskGateway};

/// Gateway that talks to the task service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base: Url,
}

impl HttpGateway {
    /// Creates a gateway for the service at `base`. Every request is bounded
    /// by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Protocol`] if `base` cannot carry a path, or
    /// [`GatewayError::Network`] if the HTTP client cannot be built.
    pub fn new(base: Url, timeout: Duration) -> Result<Self, GatewayError> {
        if base.cannot_be_a_base() {
            return Err(GatewayError::Protocol(format!(
                "service URL cannot carry a path: {base}"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        Ok(Self { client, base })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub const fn base(&self) -> &Url {
        &self.base
    }

    /// Appends percent-encoded `segments` to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| GatewayError::Protocol(format!("bad service URL: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl TaskGateway for HttpGateway {
    async fn fetch_tasks(&self, user: &UserId) -> Result<Vec<TaskRecord>, GatewayError> {
        let url = self.endpoint(&["users", user.as_str(), "tasks"])?;
        tracing::debug!(%url, "fetching tasks");
        let response = self.client.get(url).send().await.map_err(network)?;
        decode(response).await
    }

    async fn create_task(
        &self,
        user: &UserId,
        task: &NewTaskRecord,
    ) -> Result<TaskRecord, GatewayError> {
        let url = self.endpoint(&["users", user.as_str(), "tasks"])?;
        tracing::debug!(%url, "creating task");
        let response = self
            .client
            .post(url)
            .json(task)
            .send()
            .await
            .map_err(network)?;
        decode(response).await
    }

    async fn update_task(
        &self,
        task_id: &str,
        changes: &TaskChanges,
    ) -> Result<TaskRecord, GatewayError> {
        let url = self.endpoint(&["tasks", task_id])?;
        tracing::debug!(%url, "updating task");
        let response = self
            .client
            .patch(url)
            .json(changes)
            .send()
            .await
            .map_err(network)?;
        decode(response).await
    }
}

#[allow(clippy::needless_pass_by_value)]
fn network(err: reqwest::Error) -> GatewayError {
    GatewayError::Network(err.to_string())
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(%status, "task service returned non-success status");
        return Err(status_error(status, body.trim()));
    }
    let bytes = response.bytes().await.map_err(network)?;
    serde_json::from_slice(&bytes).map_err(|e| GatewayError::Protocol(e.to_string()))
}

/// Maps a non-success status to the gateway error the store understands.
fn status_error(status: StatusCode, body: &str) -> GatewayError {
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {body}")
    };
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            GatewayError::Validation(detail)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Auth(detail),
        StatusCode::NOT_FOUND => GatewayError::NotFound(detail),
        _ => GatewayError::Network(detail),
    }
}
