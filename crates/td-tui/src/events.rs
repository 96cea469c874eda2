//! Events consumed by the reducer.

use std::path::PathBuf;

use crossterm::event::Event;
use td_core::StoreError;
use td_core::tasks::TaskState as StoreSnapshot;
use td_core::types::Session;

use crate::common::{TaskCompleted, TaskKind};

#[derive(Debug)]
pub enum UiEvent {
    /// Animation and redraw cadence.
    Tick,
    Terminal(Event),
    /// The session store published a new snapshot.
    SessionChanged(Session),
    /// The task store published a new snapshot.
    TasksChanged(StoreSnapshot),
    TaskCompleted {
        kind: TaskKind,
        completed: TaskCompleted<TaskOutcome>,
    },
}

/// What a spawned store request reported back.
#[derive(Debug)]
pub enum TaskOutcome {
    /// Login or registration succeeded; carries the new session.
    SignedIn(Session),
    /// Login or registration failed with a displayable reason.
    AuthFailed(String),
    /// A fetch or write operation finished.
    Finished(Result<(), StoreError>),
    /// A download finished; `None` means it failed and the store recorded why.
    Saved(Option<PathBuf>),
    /// The request never reached a store (for example an unreadable file).
    Failed(String),
    /// The request was abandoned through its cancellation token.
    Cancelled,
}
