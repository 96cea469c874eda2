//! reqwest-backed implementation of [`TaskApi`].

use std::time::Duration;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::{TaskApi, XLSX_MIME};
use crate::error::ApiError;
use crate::types::{AuthResponse, Credentials, RecordId, Task, TaskDraft, UploadFile};

/// HTTP client for the task service, rooted at the API base URL
/// (e.g. `http://localhost:5000/api`).
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: Url,
}

impl HttpApi {
    /// Creates a client. `timeout` applies to each whole request.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the client cannot be built.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| ApiError::InvalidRequest(format!("invalid base URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidRequest(format!(
                "invalid base URL {base_url}"
            )));
        }

        let mut builder =
            Client::builder().user_agent(concat!("taskdesk/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Joins path segments onto the base URL, escaping each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidRequest(format!("invalid base URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(request: RequestBuilder, authenticated: bool) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|e| classify_reqwest_error(&e))?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "response");

        if status.is_success() {
            return Ok(response);
        }
        // On the auth endpoints a 401 means bad credentials, not an expired session.
        if authenticated && status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::http_status(status.as_u16(), &body))
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let body = response.bytes().await.map_err(|e| classify_reqwest_error(&e))?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn authenticate(
        &self,
        path: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ApiError> {
        let url = self.endpoint(&["auth", path])?;
        debug!(%url, "auth request");
        let request = self.client.post(url).json(&Credentials { email, password });
        let response = Self::send(request, false).await?;
        Self::json(response).await
    }

    async fn download(&self, token: &str, path: &str) -> Result<Bytes, ApiError> {
        let url = self.endpoint(&["tasks", path])?;
        debug!(%url, "download request");
        let request = self.client.get(url).bearer_auth(token);
        let response = Self::send(request, true).await?;
        response.bytes().await.map_err(|e| classify_reqwest_error(&e))
    }
}

impl TaskApi for HttpApi {
    async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        self.authenticate("login", email, password).await
    }

    async fn register(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        self.authenticate("register", email, password).await
    }

    async fn list_tasks(&self, token: &str) -> Result<Vec<Task>, ApiError> {
        let url = self.endpoint(&["tasks"])?;
        debug!(%url, "list tasks");
        let response = Self::send(self.client.get(url).bearer_auth(token), true).await?;
        Self::json(response).await
    }

    async fn create_task(&self, token: &str, draft: &TaskDraft) -> Result<Task, ApiError> {
        let url = self.endpoint(&["tasks"])?;
        debug!(%url, "create task");
        let request = self.client.post(url).bearer_auth(token).json(draft);
        let response = Self::send(request, true).await?;
        Self::json(response).await
    }

    async fn update_task(
        &self,
        token: &str,
        id: &RecordId,
        draft: &TaskDraft,
    ) -> Result<Task, ApiError> {
        let id = id.to_string();
        let url = self.endpoint(&["tasks", &id])?;
        debug!(%url, "update task");
        let request = self.client.put(url).bearer_auth(token).json(draft);
        let response = Self::send(request, true).await?;
        Self::json(response).await
    }

    async fn delete_task(&self, token: &str, id: &RecordId) -> Result<(), ApiError> {
        let id = id.to_string();
        let url = self.endpoint(&["tasks", &id])?;
        debug!(%url, "delete task");
        Self::send(self.client.delete(url).bearer_auth(token), true).await?;
        Ok(())
    }

    async fn export_tasks(&self, token: &str) -> Result<Bytes, ApiError> {
        self.download(token, "export").await
    }

    async fn download_template(&self, token: &str) -> Result<Bytes, ApiError> {
        self.download(token, "template").await
    }

    async fn import_tasks(&self, token: &str, file: UploadFile) -> Result<(), ApiError> {
        let url = self.endpoint(&["tasks", "import"])?;
        debug!(%url, file = %file.file_name, size = file.bytes.len(), "import tasks");

        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name)
            .mime_str(XLSX_MIME)
            .map_err(|e| ApiError::InvalidRequest(format!("invalid upload mime type: {e}")))?;
        let form = Form::new().part("file", part);

        let request = self.client.post(url).bearer_auth(token).multipart(form);
        Self::send(request, true).await?;
        Ok(())
    }
}

fn classify_reqwest_error(e: &reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        ApiError::Network(format!("Connection failed: {e}"))
    } else if e.is_decode() {
        ApiError::Decode(e.to_string())
    } else if e.is_request() || e.is_builder() {
        ApiError::InvalidRequest(format!("Request error: {e}"))
    } else {
        ApiError::Network(format!("Network error: {e}"))
    }
}
