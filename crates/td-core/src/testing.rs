//! In-memory [`TaskApi`] used by the store tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use tokio::sync::Notify;

use crate::api::TaskApi;
use crate::error::ApiError;
use crate::types::{AuthResponse, RecordId, Task, TaskDraft, UploadFile, UserIdentity};

/// Simulated server. Tasks live in `server_tasks`; any operation can be
/// made to fail once via [`FakeApi::fail`], or to block until released via
/// [`FakeApi::hold`] or, one call at a time, [`FakeApi::hold_each`].
#[derive(Default)]
pub struct FakeApi {
    server_tasks: Mutex<Vec<Task>>,
    next_id: AtomicI64,
    failures: Mutex<HashMap<&'static str, ApiError>>,
    gates: Mutex<HashMap<&'static str, Arc<Notify>>>,
    held: Mutex<HashSet<&'static str>>,
    parked: Mutex<HashMap<&'static str, Vec<Arc<Notify>>>>,
    calls: Mutex<Vec<(&'static str, Option<String>)>>,
    uploads: Mutex<Vec<String>>,
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Self::default()
        }
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let api = Self::new();
        *lock(&api.server_tasks) = tasks;
        api
    }

    /// The next call to `op` fails with `err`.
    pub fn fail(&self, op: &'static str, err: ApiError) {
        lock(&self.failures).insert(op, err);
    }

    /// Calls to `op` block until the returned handle is notified.
    pub fn hold(&self, op: &'static str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        lock(&self.gates).insert(op, Arc::clone(&gate));
        gate
    }

    /// Every call to `op` blocks on its own gate until [`FakeApi::release`].
    pub fn hold_each(&self, op: &'static str) {
        lock(&self.held).insert(op);
    }

    /// Calls to `op` that reached their gate so far.
    pub fn parked(&self, op: &'static str) -> usize {
        lock(&self.parked).get(op).map_or(0, Vec::len)
    }

    /// Lets the `nth` parked call to `op` (in arrival order) proceed.
    pub fn release(&self, op: &'static str, nth: usize) {
        if let Some(gate) = lock(&self.parked).get(op).and_then(|gates| gates.get(nth)) {
            gate.notify_one();
        }
    }

    pub fn set_next_id(&self, id: i64) {
        self.next_id.store(id, Ordering::SeqCst);
    }

    pub fn set_server_tasks(&self, tasks: Vec<Task>) {
        *lock(&self.server_tasks) = tasks;
    }

    /// Names of the operations called so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        lock(&self.calls).iter().map(|(op, _)| *op).collect()
    }

    /// Tokens sent with each call, in order.
    pub fn tokens(&self) -> Vec<Option<String>> {
        lock(&self.calls).iter().map(|(_, t)| t.clone()).collect()
    }

    pub fn uploads(&self) -> Vec<String> {
        lock(&self.uploads).clone()
    }

    async fn enter(&self, op: &'static str, token: Option<&str>) -> Result<(), ApiError> {
        lock(&self.calls).push((op, token.map(str::to_string)));
        let gate = lock(&self.gates).get(op).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let held = lock(&self.held).contains(op);
        if held {
            let gate = Arc::new(Notify::new());
            lock(&self.parked)
                .entry(op)
                .or_default()
                .push(Arc::clone(&gate));
            gate.notified().await;
        }
        match lock(&self.failures).remove(op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn auth(email: &str) -> AuthResponse {
        AuthResponse {
            user: UserIdentity {
                id: RecordId::Int(1),
                email: email.to_string(),
            },
            token: "tok1".to_string(),
        }
    }

    fn materialize(id: RecordId, draft: &TaskDraft) -> Task {
        Task {
            id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            effort: draft.effort,
            due_date: draft.due_date,
            status: draft.status,
        }
    }
}

pub fn task(id: i64, title: &str) -> Task {
    FakeApi::materialize(RecordId::Int(id), &TaskDraft::titled(title))
}

impl TaskApi for FakeApi {
    async fn login(&self, email: &str, _password: &str) -> Result<AuthResponse, ApiError> {
        self.enter("login", None).await?;
        Ok(Self::auth(email))
    }

    async fn register(&self, email: &str, _password: &str) -> Result<AuthResponse, ApiError> {
        self.enter("register", None).await?;
        Ok(Self::auth(email))
    }

    async fn list_tasks(&self, token: &str) -> Result<Vec<Task>, ApiError> {
        self.enter("list_tasks", Some(token)).await?;
        Ok(lock(&self.server_tasks).clone())
    }

    async fn create_task(&self, token: &str, draft: &TaskDraft) -> Result<Task, ApiError> {
        self.enter("create_task", Some(token)).await?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let task = Self::materialize(RecordId::Int(id), draft);
        lock(&self.server_tasks).push(task.clone());
        Ok(task)
    }

    async fn update_task(
        &self,
        token: &str,
        id: &RecordId,
        draft: &TaskDraft,
    ) -> Result<Task, ApiError> {
        self.enter("update_task", Some(token)).await?;
        let task = Self::materialize(id.clone(), draft);
        if let Some(slot) = lock(&self.server_tasks).iter_mut().find(|t| &t.id == id) {
            *slot = task.clone();
        }
        Ok(task)
    }

    async fn delete_task(&self, token: &str, id: &RecordId) -> Result<(), ApiError> {
        self.enter("delete_task", Some(token)).await?;
        lock(&self.server_tasks).retain(|t| &t.id != id);
        Ok(())
    }

    async fn export_tasks(&self, token: &str) -> Result<Bytes, ApiError> {
        self.enter("export_tasks", Some(token)).await?;
        Ok(Bytes::from_static(b"export-bytes"))
    }

    async fn download_template(&self, token: &str) -> Result<Bytes, ApiError> {
        self.enter("download_template", Some(token)).await?;
        Ok(Bytes::from_static(b"template-bytes"))
    }

    async fn import_tasks(&self, token: &str, file: UploadFile) -> Result<(), ApiError> {
        self.enter("import_tasks", Some(token)).await?;
        lock(&self.uploads).push(file.file_name);
        Ok(())
    }
}
