use tokio_util::sync::CancellationToken;

use td_core::router::Route;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

#[derive(Debug, Default)]
pub struct TaskSeq {
    next: u64,
}

impl TaskSeq {
    pub fn next_id(&mut self) -> TaskId {
        let id = TaskId(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }
}

/// Kinds of store requests the UI can have in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Auth,
    Fetch,
    Create,
    Update,
    Delete,
    Import,
    Export,
    Template,
}

impl TaskKind {
    /// The screen whose requests these are. Leaving it cancels them.
    pub fn owner(self) -> &'static [Route] {
        match self {
            TaskKind::Auth => &[Route::Login, Route::Register],
            TaskKind::Create => &[Route::NewTask],
            TaskKind::Fetch
            | TaskKind::Update
            | TaskKind::Delete
            | TaskKind::Import
            | TaskKind::Export
            | TaskKind::Template => &[Route::Tasks],
        }
    }

    /// A newer request of this kind makes older ones pointless.
    ///
    /// Only reads qualify. Mutations run side by side and each applies its
    /// own result.
    pub fn supersedes(self) -> bool {
        matches!(self, TaskKind::Fetch)
    }

    pub fn all() -> [TaskKind; 8] {
        [
            TaskKind::Auth,
            TaskKind::Fetch,
            TaskKind::Create,
            TaskKind::Update,
            TaskKind::Delete,
            TaskKind::Import,
            TaskKind::Export,
            TaskKind::Template,
        ]
    }
}

#[derive(Debug)]
pub struct TaskCompleted<E> {
    pub id: TaskId,
    pub result: E,
}

/// In-flight requests of one kind (stored in AppState, mutated only by reducer).
#[derive(Debug, Default, Clone)]
pub struct TaskState {
    running: Vec<(TaskId, CancellationToken)>,
}

impl TaskState {
    pub fn is_running(&self) -> bool {
        !self.running.is_empty()
    }

    /// The most recently started request still in flight.
    pub fn latest(&self) -> Option<TaskId> {
        self.running.last().map(|(id, _)| *id)
    }

    /// Records a new request and returns the token it must honor.
    ///
    /// With `supersede`, requests already in flight are cancelled so their
    /// responses are never applied.
    pub fn start(&mut self, id: TaskId, supersede: bool) -> CancellationToken {
        if supersede {
            for (_, previous) in self.running.drain(..) {
                previous.cancel();
            }
        }
        let cancel = CancellationToken::new();
        self.running.push((id, cancel.clone()));
        cancel
    }

    /// Forgets `id`. False if it was superseded or abandoned.
    pub fn finish_if_active(&mut self, id: TaskId) -> bool {
        let Some(pos) = self.running.iter().position(|(running, _)| *running == id) else {
            return false;
        };
        self.running.remove(pos);
        true
    }

    /// Clears the slot and hands back the tokens so the caller can cancel them.
    pub fn take_cancel(&mut self) -> Vec<CancellationToken> {
        self.running.drain(..).map(|(_, cancel)| cancel).collect()
    }
}

#[derive(Debug, Default, Clone)]
pub struct Tasks {
    pub auth: TaskState,
    pub fetch: TaskState,
    pub create: TaskState,
    pub update: TaskState,
    pub delete: TaskState,
    pub import: TaskState,
    pub export: TaskState,
    pub template: TaskState,
}

impl Tasks {
    pub fn state(&self, kind: TaskKind) -> &TaskState {
        match kind {
            TaskKind::Auth => &self.auth,
            TaskKind::Fetch => &self.fetch,
            TaskKind::Create => &self.create,
            TaskKind::Update => &self.update,
            TaskKind::Delete => &self.delete,
            TaskKind::Import => &self.import,
            TaskKind::Export => &self.export,
            TaskKind::Template => &self.template,
        }
    }

    pub fn state_mut(&mut self, kind: TaskKind) -> &mut TaskState {
        match kind {
            TaskKind::Auth => &mut self.auth,
            TaskKind::Fetch => &mut self.fetch,
            TaskKind::Create => &mut self.create,
            TaskKind::Update => &mut self.update,
            TaskKind::Delete => &mut self.delete,
            TaskKind::Import => &mut self.import,
            TaskKind::Export => &mut self.export,
            TaskKind::Template => &mut self.template,
        }
    }

    pub fn is_any_running(&self) -> bool {
        TaskKind::all()
            .into_iter()
            .any(|kind| self.state(kind).is_running())
    }
}
