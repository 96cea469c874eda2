//! UI effect types.
//!
//! Effects are commands returned by the reducer that the runtime executes.
//! They represent store calls and task spawning only (no direct UI mutations).
//!
//! Every request effect carries the `TaskId` and `CancellationToken` the
//! reducer recorded for it, so the reducer alone decides when to cancel.

use std::path::PathBuf;

use td_core::types::{RecordId, TaskDraft};
use tokio_util::sync::CancellationToken;

use crate::common::{TaskId, TaskKind};

#[derive(Debug)]
pub enum UiEffect {
    /// Quit the application.
    Quit,

    Login {
        task: TaskId,
        cancel: CancellationToken,
        email: String,
        password: String,
    },
    Register {
        task: TaskId,
        cancel: CancellationToken,
        email: String,
        password: String,
    },
    Logout,

    /// Initial fetch; the store ignores it after the first time.
    MountTasks {
        task: TaskId,
        cancel: CancellationToken,
    },
    FetchTasks {
        task: TaskId,
        cancel: CancellationToken,
    },
    CreateTask {
        task: TaskId,
        cancel: CancellationToken,
        draft: TaskDraft,
    },
    UpdateTask {
        task: TaskId,
        cancel: CancellationToken,
        id: RecordId,
        draft: TaskDraft,
    },
    DeleteTask {
        task: TaskId,
        cancel: CancellationToken,
        id: RecordId,
    },
    ImportTasks {
        task: TaskId,
        cancel: CancellationToken,
        path: PathBuf,
    },
    ExportTasks {
        task: TaskId,
        cancel: CancellationToken,
    },
    DownloadTemplate {
        task: TaskId,
        cancel: CancellationToken,
    },

    /// Abandon the in-flight requests of the given kind.
    CancelTask {
        kind: TaskKind,
        tokens: Vec<CancellationToken>,
    },
}
