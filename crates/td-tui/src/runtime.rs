//! TUI runtime: owns the terminal, runs the event loop, executes effects.
//!
//! This is the boundary where side effects happen. The reducer stays pure
//! and returns effects; the runtime spawns store calls as tokio tasks and
//! feeds their results back through the inbox channel.
//!
//! Store snapshots arrive through `watch` receivers. Each frame drains the
//! inbox first and then reads the receivers, queueing snapshot events ahead
//! of the inbox events so a completion is never reduced against a stale
//! store copy.

use std::future::Future;
use std::io::Stdout;
use std::mem;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use td_core::StoreError;
use td_core::api::TaskApi;
use td_core::error::SessionError;
use td_core::router::Route;
use td_core::session::SessionStore;
use td_core::tasks::{TaskState as StoreSnapshot, TaskStore};
use td_core::types::{Session, UploadFile};
use tokio::sync::{mpsc, watch};
use tokio::task;
use tokio_util::sync::CancellationToken;

use crate::common::{TaskCompleted, TaskId, TaskKind};
use crate::effects::UiEffect;
use crate::events::{TaskOutcome, UiEvent};
use crate::features::auth::AuthMode;
use crate::state::AppState;
use crate::{render, terminal, update};

/// Poll interval while a request is in flight (spinner cadence).
pub const FRAME_DURATION: Duration = Duration::from_millis(80);

/// Poll interval when idle.
pub const IDLE_POLL_DURATION: Duration = Duration::from_millis(250);

/// Full-screen TUI runtime.
///
/// The terminal is restored on drop and on panic.
pub struct TuiRuntime<A: TaskApi> {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    pub state: AppState,
    session: Arc<SessionStore<A>>,
    tasks: Arc<TaskStore<A>>,
    session_rx: watch::Receiver<Session>,
    tasks_rx: watch::Receiver<StoreSnapshot>,
    inbox_tx: mpsc::UnboundedSender<UiEvent>,
    inbox_rx: mpsc::UnboundedReceiver<UiEvent>,
    last_tick: Instant,
    /// Effects of the initial navigation, run when the loop starts.
    pending: Vec<UiEffect>,
}

impl<A: TaskApi> TuiRuntime<A> {
    /// Enters TUI mode and settles the starting route through the guard.
    ///
    /// # Errors
    /// Returns an error if the terminal cannot be set up.
    pub fn new(
        session: Arc<SessionStore<A>>,
        tasks: Arc<TaskStore<A>>,
        start: Route,
    ) -> Result<Self> {
        // Panic hook goes in before the alternate screen.
        terminal::install_panic_hook();
        let terminal = terminal::setup_terminal().context("Failed to setup terminal")?;

        let session_rx = session.subscribe();
        let tasks_rx = tasks.subscribe();
        let mut state = AppState::new(session.snapshot(), tasks.snapshot());
        let pending = update::start(&mut state, start);

        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();

        Ok(Self {
            terminal,
            state,
            session,
            tasks,
            session_rx,
            tasks_rx,
            inbox_tx,
            inbox_rx,
            last_tick: Instant::now(),
            pending,
        })
    }

    /// Runs the main event loop until the user quits.
    ///
    /// # Errors
    /// Returns an error if drawing or reading terminal input fails.
    pub fn run(&mut self) -> Result<()> {
        let initial = mem::take(&mut self.pending);
        self.execute_effects(initial);

        let mut dirty = true;
        while !self.state.should_quit {
            let events = self.collect_events()?;
            if !events.is_empty() {
                dirty = true;
            }

            for event in events {
                let effects = update::update(&mut self.state, event);
                self.execute_effects(effects);
                if self.state.should_quit {
                    break;
                }
            }

            if dirty && !self.state.should_quit {
                self.terminal.draw(|frame| render::render(&self.state, frame))?;
                dirty = false;
            }
        }

        Ok(())
    }

    // ========================================================================
    // Event Collection
    // ========================================================================

    fn collect_events(&mut self) -> Result<Vec<UiEvent>> {
        let mut inbox = Vec::new();
        while let Ok(ev) = self.inbox_rx.try_recv() {
            inbox.push(ev);
        }

        let mut events = Vec::new();
        if self.session_rx.has_changed().unwrap_or(false) {
            let session = self.session_rx.borrow_and_update().clone();
            events.push(UiEvent::SessionChanged(session));
        }
        if self.tasks_rx.has_changed().unwrap_or(false) {
            let snapshot = self.tasks_rx.borrow_and_update().clone();
            events.push(UiEvent::TasksChanged(snapshot));
        }
        events.extend(inbox);

        let tick_interval = if self.state.inflight.is_any_running() {
            FRAME_DURATION
        } else {
            IDLE_POLL_DURATION
        };
        let poll_duration = if events.is_empty() {
            tick_interval.saturating_sub(self.last_tick.elapsed())
        } else {
            Duration::ZERO
        };

        if event::poll(poll_duration)? {
            events.push(UiEvent::Terminal(event::read()?));
            while event::poll(Duration::ZERO)? {
                events.push(UiEvent::Terminal(event::read()?));
            }
        }

        if self.last_tick.elapsed() >= tick_interval {
            events.push(UiEvent::Tick);
            self.last_tick = Instant::now();
        }

        Ok(events)
    }

    // ========================================================================
    // Effect Dispatch
    // ========================================================================

    fn execute_effects(&mut self, effects: Vec<UiEffect>) {
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    /// Spawns a store call and reports its outcome to the inbox.
    fn spawn_task<Fut>(&self, kind: TaskKind, id: TaskId, fut: Fut)
    where
        Fut: Future<Output = TaskOutcome> + Send + 'static,
    {
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let result = fut.await;
            let completed = TaskCompleted { id, result };
            let _ = tx.send(UiEvent::TaskCompleted { kind, completed });
        });
    }

    fn execute_effect(&mut self, effect: UiEffect) {
        match effect {
            UiEffect::Quit => {
                self.state.should_quit = true;
            }
            UiEffect::Logout => {
                self.session.logout();
            }
            UiEffect::CancelTask { kind, tokens } => {
                tracing::debug!(?kind, count = tokens.len(), "cancelling requests");
                for cancel in tokens {
                    cancel.cancel();
                }
            }

            UiEffect::Login {
                task,
                cancel,
                email,
                password,
            } => {
                let session = Arc::clone(&self.session);
                self.spawn_task(TaskKind::Auth, task, async move {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => TaskOutcome::Cancelled,
                        result = session.login(&email, &password) => match result {
                            Ok(_) => TaskOutcome::SignedIn(session.snapshot()),
                            Err(err) => {
                                TaskOutcome::AuthFailed(auth_failure(AuthMode::Login, &err))
                            }
                        },
                    }
                });
            }
            UiEffect::Register {
                task,
                cancel,
                email,
                password,
            } => {
                let session = Arc::clone(&self.session);
                self.spawn_task(TaskKind::Auth, task, async move {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => TaskOutcome::Cancelled,
                        result = session.register(&email, &password) => match result {
                            Ok(_) => TaskOutcome::SignedIn(session.snapshot()),
                            Err(err) => {
                                TaskOutcome::AuthFailed(auth_failure(AuthMode::Register, &err))
                            }
                        },
                    }
                });
            }

            UiEffect::MountTasks { task, cancel } => {
                let tasks = Arc::clone(&self.tasks);
                self.spawn_task(TaskKind::Fetch, task, async move {
                    tasks.mount(&cancel).await;
                    finished(&cancel, Ok(()))
                });
            }
            UiEffect::FetchTasks { task, cancel } => {
                let tasks = Arc::clone(&self.tasks);
                self.spawn_task(TaskKind::Fetch, task, async move {
                    tasks.fetch_tasks(&cancel).await;
                    finished(&cancel, Ok(()))
                });
            }
            UiEffect::CreateTask {
                task,
                cancel,
                draft,
            } => {
                let tasks = Arc::clone(&self.tasks);
                self.spawn_task(TaskKind::Create, task, async move {
                    let result = tasks.create_task(&draft, &cancel).await;
                    finished(&cancel, result.map(drop))
                });
            }
            UiEffect::UpdateTask {
                task,
                cancel,
                id,
                draft,
            } => {
                let tasks = Arc::clone(&self.tasks);
                self.spawn_task(TaskKind::Update, task, async move {
                    let result = tasks.update_task(&id, &draft, &cancel).await;
                    finished(&cancel, result.map(drop))
                });
            }
            UiEffect::DeleteTask { task, cancel, id } => {
                let tasks = Arc::clone(&self.tasks);
                self.spawn_task(TaskKind::Delete, task, async move {
                    let result = tasks.delete_task(&id, &cancel).await;
                    finished(&cancel, result)
                });
            }
            UiEffect::ImportTasks { task, cancel, path } => {
                let tasks = Arc::clone(&self.tasks);
                self.spawn_task(TaskKind::Import, task, async move {
                    let read = task::spawn_blocking({
                        let path = path.clone();
                        move || UploadFile::from_path(&path)
                    })
                    .await;
                    let file = match read {
                        Ok(Ok(file)) => file,
                        Ok(Err(e)) => {
                            tracing::warn!(
                                path = %path.display(),
                                error = %e,
                                "cannot read import file"
                            );
                            return TaskOutcome::Failed(format!(
                                "Cannot read {}: {e}",
                                path.display()
                            ));
                        }
                        Err(e) => return TaskOutcome::Failed(format!("Import aborted: {e}")),
                    };
                    let result = tasks.import_tasks(file, &cancel).await;
                    finished(&cancel, result)
                });
            }
            UiEffect::ExportTasks { task, cancel } => {
                let tasks = Arc::clone(&self.tasks);
                self.spawn_task(TaskKind::Export, task, async move {
                    let saved = tasks.export_tasks(&cancel).await;
                    saved_outcome(&cancel, saved)
                });
            }
            UiEffect::DownloadTemplate { task, cancel } => {
                let tasks = Arc::clone(&self.tasks);
                self.spawn_task(TaskKind::Template, task, async move {
                    let saved = tasks.download_template(&cancel).await;
                    saved_outcome(&cancel, saved)
                });
            }
        }
    }
}

impl<A: TaskApi> Drop for TuiRuntime<A> {
    fn drop(&mut self) {
        let _ = terminal::restore_terminal();
    }
}

fn finished(cancel: &CancellationToken, result: Result<(), StoreError>) -> TaskOutcome {
    if cancel.is_cancelled() {
        TaskOutcome::Cancelled
    } else {
        TaskOutcome::Finished(result)
    }
}

fn saved_outcome(cancel: &CancellationToken, saved: Option<PathBuf>) -> TaskOutcome {
    if cancel.is_cancelled() {
        TaskOutcome::Cancelled
    } else {
        TaskOutcome::Saved(saved)
    }
}

/// Message shown under the auth form. Prefers the server's own wording.
fn auth_failure(mode: AuthMode, err: &SessionError) -> String {
    let action = match mode {
        AuthMode::Login => "Login",
        AuthMode::Register => "Registration",
    };
    match err {
        SessionError::Api(api) => match api.server_message() {
            Some(message) => message.to_string(),
            None => format!("{action} failed: {api}"),
        },
        SessionError::Storage(e) => {
            format!("{action} succeeded but the session could not be saved: {e}")
        }
    }
}
