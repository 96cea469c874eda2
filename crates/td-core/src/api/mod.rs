//! Outbound seam to the remote task service.
//!
//! Both stores talk to the server only through [`TaskApi`]. The production
//! implementation is [`HttpApi`]; tests substitute in-memory fakes.

mod http;

use std::future::Future;

use bytes::Bytes;

pub use self::http::HttpApi;
use crate::error::ApiError;
use crate::types::{AuthResponse, RecordId, Task, TaskDraft, UploadFile};

/// MIME type of the spreadsheet files exchanged with the server.
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub trait TaskApi: Send + Sync + 'static {
    /// `POST /auth/login`
    fn login(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthResponse, ApiError>> + Send;

    /// `POST /auth/register`
    fn register(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthResponse, ApiError>> + Send;

    /// `GET /tasks`
    fn list_tasks(&self, token: &str) -> impl Future<Output = Result<Vec<Task>, ApiError>> + Send;

    /// `POST /tasks`
    fn create_task(
        &self,
        token: &str,
        draft: &TaskDraft,
    ) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// `PUT /tasks/{id}`
    fn update_task(
        &self,
        token: &str,
        id: &RecordId,
        draft: &TaskDraft,
    ) -> impl Future<Output = Result<Task, ApiError>> + Send;

    /// `DELETE /tasks/{id}`
    fn delete_task(
        &self,
        token: &str,
        id: &RecordId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// `GET /tasks/export`
    fn export_tasks(&self, token: &str) -> impl Future<Output = Result<Bytes, ApiError>> + Send;

    /// `GET /tasks/template`
    fn download_template(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Bytes, ApiError>> + Send;

    /// `POST /tasks/import`, multipart with the file under field `file`.
    fn import_tasks(
        &self,
        token: &str,
        file: UploadFile,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}
