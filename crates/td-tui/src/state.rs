//! Application state.
//!
//! ```text
//! AppState
//! ├── route: Route               (current screen, always guard-approved)
//! ├── session: Session           (last session store snapshot)
//! ├── store: StoreSnapshot       (last task store snapshot)
//! ├── task_seq / inflight        (request ids and cancellation tokens)
//! └── login, register, list, form (per-screen UI state)
//! ```
//!
//! Store snapshots are copies; the stores stay the source of truth and the
//! runtime forwards every change as an event.

use td_core::router::Route;
use td_core::tasks::TaskState as StoreSnapshot;
use td_core::types::Session;

use crate::common::{TaskSeq, Tasks};
use crate::features::auth::{AuthForm, AuthMode};
use crate::features::task_form::TaskForm;
use crate::features::task_list::TaskList;

/// Footer feedback that does not belong to either store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Info(text) | Notice::Error(text) => text,
        }
    }
}

pub struct AppState {
    pub route: Route,
    pub session: Session,
    pub store: StoreSnapshot,
    pub task_seq: TaskSeq,
    pub inflight: Tasks,
    pub login: AuthForm,
    pub register: AuthForm,
    pub list: TaskList,
    pub form: TaskForm,
    /// One-line feedback in the footer.
    pub notice: Option<Notice>,
    /// Whether the task list has been entered at least once.
    pub mounted: bool,
    pub should_quit: bool,
    pub spinner_frame: usize,
}

impl AppState {
    /// State before the first navigation. The route is settled by
    /// `update::start`.
    pub fn new(session: Session, store: StoreSnapshot) -> Self {
        Self {
            route: Route::Login,
            session,
            store,
            task_seq: TaskSeq::default(),
            inflight: Tasks::default(),
            login: AuthForm::new(AuthMode::Login),
            register: AuthForm::new(AuthMode::Register),
            list: TaskList::default(),
            form: TaskForm::default(),
            notice: None,
            mounted: false,
            should_quit: false,
            spinner_frame: 0,
        }
    }
}
