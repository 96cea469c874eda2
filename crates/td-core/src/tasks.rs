//! Task collection store.
//!
//! Holds the client's copy of the task list. Every mutation goes to the
//! server first; the local copy only ever changes from a server response.
//! Each operation takes a [`CancellationToken`]; once it fires, the response
//! is discarded and the collection and error are left as they were.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::TaskApi;
use crate::download::{DownloadSink, EXPORT_FILE_NAME, TEMPLATE_FILE_NAME};
use crate::error::{ApiError, StoreError};
use crate::session::SessionAccess;
use crate::types::{RecordId, Task, TaskDraft, UploadFile};

pub const NOT_AUTHENTICATED: &str = "Not authenticated. Please log in.";
pub const SESSION_EXPIRED: &str = "Session expired. Please log in again.";
pub const FETCH_FAILED: &str = "Failed to fetch tasks";
pub const CREATE_FAILED: &str = "Failed to create task";
pub const UPDATE_FAILED: &str = "Failed to update task";
pub const DELETE_FAILED: &str = "Failed to delete task";
pub const EXPORT_FAILED: &str = "Failed to export tasks";
pub const TEMPLATE_FAILED: &str = "Failed to download template";
pub const IMPORT_FAILED: &str = "Failed to import tasks";

/// Observable store snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskState {
    /// Tasks in list-endpoint order, amended by later mutations.
    pub tasks: Vec<Task>,
    /// True while a fetch is in flight.
    pub loading: bool,
    /// Message from the most recent failure. Overwritten, never accumulated.
    pub error: Option<String>,
}

pub struct TaskStore<A> {
    api: Arc<A>,
    session: Arc<dyn SessionAccess>,
    downloads: Box<dyn DownloadSink>,
    state: watch::Sender<TaskState>,
    mounted: AtomicBool,
    expire_on_unauthorized: bool,
}

#[derive(Debug, Clone, Copy)]
enum Download {
    Export,
    Template,
}

impl Download {
    fn file_name(self) -> &'static str {
        match self {
            Download::Export => EXPORT_FILE_NAME,
            Download::Template => TEMPLATE_FILE_NAME,
        }
    }

    fn failure(self) -> &'static str {
        match self {
            Download::Export => EXPORT_FAILED,
            Download::Template => TEMPLATE_FAILED,
        }
    }
}

/// Races `fut` against `cancel`. `None` means the response must be dropped.
async fn unless_cancelled<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Option<T> {
    let out = tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        out = fut => Some(out),
    };
    out.filter(|_| !cancel.is_cancelled())
}

impl<A: TaskApi> TaskStore<A> {
    pub fn new(
        api: Arc<A>,
        session: Arc<dyn SessionAccess>,
        downloads: Box<dyn DownloadSink>,
    ) -> Self {
        let (state, _) = watch::channel(TaskState::default());
        Self {
            api,
            session,
            downloads,
            state,
            mounted: AtomicBool::new(false),
            expire_on_unauthorized: true,
        }
    }

    /// Whether a 401 from the server also drops the session (default: true).
    #[must_use]
    pub fn expire_session_on_unauthorized(mut self, enabled: bool) -> Self {
        self.expire_on_unauthorized = enabled;
        self
    }

    pub fn snapshot(&self) -> TaskState {
        self.state.borrow().clone()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.borrow().tasks.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TaskState> {
        self.state.subscribe()
    }

    fn set_error(&self, message: &str) {
        self.state
            .send_modify(|state| state.error = Some(message.to_string()));
    }

    /// Records a failure and returns it as a store error.
    fn fail(&self, op: &str, message: &str, err: ApiError) -> StoreError {
        warn!(op, error = %err, "task request failed");
        if matches!(err, ApiError::Unauthorized) && self.expire_on_unauthorized {
            self.session.expire();
        }
        self.set_error(message);
        StoreError::from(err)
    }

    /// Token for a write operation, or the generic failure if signed out.
    fn require_token(&self, message: &str) -> Result<String, StoreError> {
        self.session.token().ok_or_else(|| {
            self.set_error(message);
            StoreError::Unauthenticated
        })
    }

    /// Runs the initial fetch. Only the first call over the store's lifetime does anything.
    pub async fn mount(&self, cancel: &CancellationToken) {
        if self.mounted.swap(true, Ordering::SeqCst) {
            return;
        }
        self.fetch_tasks(cancel).await;
    }

    /// Replaces the collection with the server's list.
    ///
    /// Failures land in the `error` field and are never returned.
    pub async fn fetch_tasks(&self, cancel: &CancellationToken) {
        let Some(token) = self.session.token() else {
            self.set_error(NOT_AUTHENTICATED);
            return;
        };
        if cancel.is_cancelled() {
            return;
        }

        self.state.send_modify(|state| state.loading = true);
        let result = unless_cancelled(cancel, self.api.list_tasks(&token)).await;

        match result {
            None => {
                debug!("fetch cancelled");
                self.state.send_modify(|state| state.loading = false);
            }
            Some(Ok(tasks)) => {
                debug!(count = tasks.len(), "fetched tasks");
                self.state.send_modify(|state| {
                    state.tasks = tasks;
                    state.error = None;
                    state.loading = false;
                });
            }
            Some(Err(err)) => {
                let message = match &err {
                    ApiError::Unauthorized => SESSION_EXPIRED.to_string(),
                    other => other
                        .server_message()
                        .map_or_else(|| FETCH_FAILED.to_string(), str::to_string),
                };
                self.fail("fetch", &message, err);
                self.state.send_modify(|state| state.loading = false);
            }
        }
    }

    /// Creates a task and appends the server's copy.
    ///
    /// # Errors
    /// Returns the failure after recording "Failed to create task".
    pub async fn create_task(
        &self,
        draft: &TaskDraft,
        cancel: &CancellationToken,
    ) -> Result<Task, StoreError> {
        let token = self.require_token(CREATE_FAILED)?;
        let result = unless_cancelled(cancel, self.api.create_task(&token, draft))
            .await
            .ok_or(StoreError::Cancelled)?;

        match result {
            Ok(task) => {
                debug!(id = %task.id, "created task");
                self.state.send_modify(|state| {
                    state.tasks.push(task.clone());
                    state.error = None;
                });
                Ok(task)
            }
            Err(err) => Err(self.fail("create", CREATE_FAILED, err)),
        }
    }

    /// Updates a task and replaces the matching local entry.
    ///
    /// An id with no local match leaves the collection as it is.
    ///
    /// # Errors
    /// Returns the failure after recording "Failed to update task".
    pub async fn update_task(
        &self,
        id: &RecordId,
        draft: &TaskDraft,
        cancel: &CancellationToken,
    ) -> Result<Task, StoreError> {
        let token = self.require_token(UPDATE_FAILED)?;
        let result = unless_cancelled(cancel, self.api.update_task(&token, id, draft))
            .await
            .ok_or(StoreError::Cancelled)?;

        match result {
            Ok(task) => {
                debug!(%id, "updated task");
                self.state.send_modify(|state| {
                    if let Some(slot) = state.tasks.iter_mut().find(|t| &t.id == id) {
                        *slot = task.clone();
                    }
                    state.error = None;
                });
                Ok(task)
            }
            Err(err) => Err(self.fail("update", UPDATE_FAILED, err)),
        }
    }

    /// Deletes a task and removes the matching local entry.
    ///
    /// # Errors
    /// Returns the failure after recording "Failed to delete task".
    pub async fn delete_task(
        &self,
        id: &RecordId,
        cancel: &CancellationToken,
    ) -> Result<(), StoreError> {
        let token = self.require_token(DELETE_FAILED)?;
        let result = unless_cancelled(cancel, self.api.delete_task(&token, id))
            .await
            .ok_or(StoreError::Cancelled)?;

        match result {
            Ok(()) => {
                debug!(%id, "deleted task");
                self.state.send_modify(|state| {
                    state.tasks.retain(|t| &t.id != id);
                    state.error = None;
                });
                Ok(())
            }
            Err(err) => Err(self.fail("delete", DELETE_FAILED, err)),
        }
    }

    /// Downloads the spreadsheet export as `tasks.xlsx`.
    ///
    /// Returns the saved path, or `None` after recording the failure.
    pub async fn export_tasks(&self, cancel: &CancellationToken) -> Option<PathBuf> {
        self.download(Download::Export, cancel).await
    }

    /// Downloads the import template as `task_template.xlsx`.
    pub async fn download_template(&self, cancel: &CancellationToken) -> Option<PathBuf> {
        self.download(Download::Template, cancel).await
    }

    async fn download(&self, kind: Download, cancel: &CancellationToken) -> Option<PathBuf> {
        let token = self.require_token(kind.failure()).ok()?;
        let request = async {
            match kind {
                Download::Export => self.api.export_tasks(&token).await,
                Download::Template => self.api.download_template(&token).await,
            }
        };
        let bytes = match unless_cancelled(cancel, request).await? {
            Ok(bytes) => bytes,
            Err(err) => {
                self.fail("download", kind.failure(), err);
                return None;
            }
        };

        match self.downloads.save(kind.file_name(), &bytes) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(file = kind.file_name(), error = %e, "failed to save download");
                self.set_error(kind.failure());
                None
            }
        }
    }

    /// Uploads a spreadsheet and refreshes the collection on success.
    ///
    /// The refresh reports its own failures through the `error` field, and
    /// that message is kept: a successful upload does not clear it afterwards.
    /// The upload still returns `Ok`.
    ///
    /// # Errors
    /// Returns the upload failure after recording "Failed to import tasks".
    pub async fn import_tasks(
        &self,
        file: UploadFile,
        cancel: &CancellationToken,
    ) -> Result<(), StoreError> {
        let token = self.require_token(IMPORT_FAILED)?;
        let result = unless_cancelled(cancel, self.api.import_tasks(&token, file))
            .await
            .ok_or(StoreError::Cancelled)?;

        match result {
            Ok(()) => {
                debug!("import accepted, refreshing");
                self.fetch_tasks(cancel).await;
                Ok(())
            }
            Err(err) => Err(self.fail("import", IMPORT_FAILED, err)),
        }
    }
}
