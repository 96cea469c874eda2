//! TUI reducer.
//!
//! All state mutations happen here. The runtime calls `update(app, event)`
//! and executes the returned effects. Navigation always goes through the
//! route guard with the latest session snapshot.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use td_core::StoreError;
use td_core::router::{Navigation, Route, RouteGuard};
use td_core::types::Session;
use tokio_util::sync::CancellationToken;

use crate::common::{TaskCompleted, TaskId, TaskKind};
use crate::effects::UiEffect;
use crate::events::{TaskOutcome, UiEvent};
use crate::features::auth::{AuthAction, AuthForm, AuthMode};
use crate::features::task_form::{FormAction, TaskForm};
use crate::features::task_list::ListAction;
use crate::state::{AppState, Notice};

/// Settles the initial route. Returns the effects of entering it.
pub fn start(app: &mut AppState, route: Route) -> Vec<UiEffect> {
    navigate(app, route)
}

/// The main reducer function.
pub fn update(app: &mut AppState, event: UiEvent) -> Vec<UiEffect> {
    match event {
        UiEvent::Tick => {
            app.spinner_frame = app.spinner_frame.wrapping_add(1);
            vec![]
        }
        UiEvent::Terminal(event) => handle_terminal_event(app, event),
        UiEvent::SessionChanged(session) => {
            app.session = session;
            if app.route.is_protected() && !app.session.is_authenticated() {
                navigate(app, app.route)
            } else {
                vec![]
            }
        }
        UiEvent::TasksChanged(snapshot) => {
            app.store = snapshot;
            app.list.clamp(app.store.tasks.len());
            vec![]
        }
        UiEvent::TaskCompleted { kind, completed } => handle_task_completed(app, kind, completed),
    }
}

// ============================================================================
// Navigation
// ============================================================================

fn navigate(app: &mut AppState, requested: Route) -> Vec<UiEffect> {
    let nav = RouteGuard::check(requested, &app.session);
    let dest = nav.destination();
    let mut effects = Vec::new();

    if let Navigation::Redirected { from, to: Route::Login } = nav
        && from.is_protected()
    {
        app.notice = Some(Notice::Info("Log in to continue.".to_string()));
    }

    if dest == app.route {
        return effects;
    }

    for kind in TaskKind::all() {
        let owners = kind.owner();
        if owners.contains(&app.route) && !owners.contains(&dest) {
            let tokens = app.inflight.state_mut(kind).take_cancel();
            if !tokens.is_empty() {
                effects.push(UiEffect::CancelTask { kind, tokens });
            }
        }
    }

    match app.route {
        Route::Login => app.login.reset_secret(),
        Route::Register => app.register.reset_secret(),
        _ => {}
    }

    tracing::debug!(from = %app.route, to = %dest, "navigate");
    app.route = dest;

    match dest {
        Route::Tasks => {
            let (task, cancel) = start_task(app, TaskKind::Fetch);
            if app.mounted {
                effects.push(UiEffect::FetchTasks { task, cancel });
            } else {
                app.mounted = true;
                effects.push(UiEffect::MountTasks { task, cancel });
            }
        }
        Route::NewTask => app.form = TaskForm::default(),
        Route::Login => app.login.error = None,
        Route::Register => app.register.error = None,
        Route::Root => {}
    }

    effects
}

fn start_task(app: &mut AppState, kind: TaskKind) -> (TaskId, CancellationToken) {
    let id = app.task_seq.next_id();
    let cancel = app.inflight.state_mut(kind).start(id, kind.supersedes());
    (id, cancel)
}

// ============================================================================
// Terminal input
// ============================================================================

fn handle_terminal_event(app: &mut AppState, event: Event) -> Vec<UiEffect> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key),
        Event::Paste(text) => {
            match app.route {
                Route::Login => app.login.paste(&text),
                Route::Register => app.register.paste(&text),
                Route::NewTask => app.form.paste(&text),
                Route::Tasks | Route::Root => app.list.paste(&text),
            }
            vec![]
        }
        _ => vec![],
    }
}

fn handle_key(app: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return vec![UiEffect::Quit];
    }

    match app.route {
        Route::Login | Route::Register => {
            let action = auth_form_mut(app).handle_key(key);
            handle_auth_action(app, action)
        }
        Route::NewTask => {
            let action = app.form.handle_key(key);
            handle_form_action(app, action)
        }
        Route::Tasks | Route::Root => {
            let action = app.list.handle_key(key, &app.store.tasks);
            handle_list_action(app, action)
        }
    }
}

fn auth_form_mut(app: &mut AppState) -> &mut AuthForm {
    match app.route {
        Route::Register => &mut app.register,
        _ => &mut app.login,
    }
}

fn handle_auth_action(app: &mut AppState, action: AuthAction) -> Vec<UiEffect> {
    match action {
        AuthAction::None => vec![],
        AuthAction::Quit => vec![UiEffect::Quit],
        AuthAction::SwitchMode => {
            let other = match app.route {
                Route::Register => Route::Login,
                _ => Route::Register,
            };
            navigate(app, other)
        }
        AuthAction::Submit { email, password } => {
            let (task, cancel) = start_task(app, TaskKind::Auth);
            let form = auth_form_mut(app);
            form.on_submitted();
            let effect = match form.mode {
                AuthMode::Login => UiEffect::Login {
                    task,
                    cancel,
                    email,
                    password,
                },
                AuthMode::Register => UiEffect::Register {
                    task,
                    cancel,
                    email,
                    password,
                },
            };
            vec![effect]
        }
    }
}

fn handle_form_action(app: &mut AppState, action: FormAction) -> Vec<UiEffect> {
    match action {
        FormAction::None => vec![],
        FormAction::Cancel => navigate(app, Route::Tasks),
        FormAction::Submit(draft) => {
            let (task, cancel) = start_task(app, TaskKind::Create);
            app.form.on_submitted();
            vec![UiEffect::CreateTask {
                task,
                cancel,
                draft,
            }]
        }
    }
}

fn handle_list_action(app: &mut AppState, action: ListAction) -> Vec<UiEffect> {
    let effect = match action {
        ListAction::None => return vec![],
        ListAction::Quit => return vec![UiEffect::Quit],
        ListAction::NewTask => return navigate(app, Route::NewTask),
        ListAction::Logout => {
            // The store publishes the same change; applying it here keeps the
            // redirect from depending on event order.
            app.session = Session::default();
            let mut effects = vec![UiEffect::Logout];
            effects.extend(navigate(app, Route::Login));
            app.notice = Some(Notice::Info("Logged out.".to_string()));
            return effects;
        }
        ListAction::Refresh => {
            let (task, cancel) = start_task(app, TaskKind::Fetch);
            UiEffect::FetchTasks { task, cancel }
        }
        ListAction::Delete(id) => {
            let (task, cancel) = start_task(app, TaskKind::Delete);
            UiEffect::DeleteTask { task, cancel, id }
        }
        ListAction::CycleStatus(id, draft) => {
            let (task, cancel) = start_task(app, TaskKind::Update);
            UiEffect::UpdateTask {
                task,
                cancel,
                id,
                draft,
            }
        }
        ListAction::Import(path) => {
            let (task, cancel) = start_task(app, TaskKind::Import);
            UiEffect::ImportTasks { task, cancel, path }
        }
        ListAction::Export => {
            let (task, cancel) = start_task(app, TaskKind::Export);
            UiEffect::ExportTasks { task, cancel }
        }
        ListAction::Template => {
            let (task, cancel) = start_task(app, TaskKind::Template);
            UiEffect::DownloadTemplate { task, cancel }
        }
    };
    app.notice = None;
    vec![effect]
}

// ============================================================================
// Request results
// ============================================================================

fn handle_task_completed(
    app: &mut AppState,
    kind: TaskKind,
    completed: TaskCompleted<TaskOutcome>,
) -> Vec<UiEffect> {
    // Superseded or abandoned requests report nothing.
    if !app.inflight.state_mut(kind).finish_if_active(completed.id) {
        return vec![];
    }

    match (kind, completed.result) {
        (_, TaskOutcome::Cancelled) => vec![],
        (_, TaskOutcome::Failed(message)) => {
            app.notice = Some(Notice::Error(message));
            vec![]
        }
        (TaskKind::Auth, TaskOutcome::SignedIn(session)) => {
            app.session = session;
            auth_form_mut(app).reset_secret();
            navigate(app, Route::Tasks)
        }
        (TaskKind::Auth, TaskOutcome::AuthFailed(message)) => {
            auth_form_mut(app).on_failed(message);
            vec![]
        }
        (TaskKind::Create, TaskOutcome::Finished(result)) => match result {
            Ok(()) => {
                let effects = navigate(app, Route::Tasks);
                app.notice = Some(Notice::Info("Task added.".to_string()));
                effects
            }
            Err(StoreError::Cancelled) => vec![],
            Err(_) => {
                app.form.on_failed();
                vec![]
            }
        },
        (kind, TaskOutcome::Finished(Ok(()))) => {
            let message = match kind {
                TaskKind::Update => "Task updated.",
                TaskKind::Delete => "Task deleted.",
                TaskKind::Import => "Import finished.",
                _ => return vec![],
            };
            app.notice = Some(Notice::Info(message.to_string()));
            vec![]
        }
        (_, TaskOutcome::Saved(Some(path))) => {
            app.notice = Some(Notice::Info(format!("Saved {}", path.display())));
            vec![]
        }
        // Failures are already in the store's error field.
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use td_core::ApiError;
    use td_core::tasks::TaskState as StoreSnapshot;
    use td_core::types::{RecordId, Task, TaskStatus, UserIdentity};

    use super::*;
    use crate::features::task_form::CREATE_FAILED_MESSAGE;

    fn signed_in() -> Session {
        Session {
            user: Some(UserIdentity {
                id: RecordId::Int(1),
                email: "a@b.com".to_string(),
            }),
            token: Some("tok1".to_string()),
        }
    }

    fn app_with(session: Session) -> AppState {
        AppState::new(session, StoreSnapshot::default())
    }

    fn two_tasks() -> StoreSnapshot {
        let task = |id: i64, title: &str| Task {
            id: RecordId::Int(id),
            title: title.to_string(),
            description: String::new(),
            effort: None,
            due_date: None,
            status: TaskStatus::Pending,
        };
        StoreSnapshot {
            tasks: vec![task(1, "one"), task(2, "two")],
            ..StoreSnapshot::default()
        }
    }

    fn delete_effect(effects: Vec<UiEffect>, expected: i64) -> (TaskId, CancellationToken) {
        match effects.as_slice() {
            [UiEffect::DeleteTask { task, cancel, id }] => {
                assert_eq!(id, &RecordId::Int(expected));
                (*task, cancel.clone())
            }
            _ => panic!("expected delete effect, got {effects:?}"),
        }
    }

    fn key(code: KeyCode) -> UiEvent {
        UiEvent::Terminal(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    fn type_text(app: &mut AppState, text: &str) {
        for ch in text.chars() {
            update(app, key(KeyCode::Char(ch)));
        }
    }

    fn completed(kind: TaskKind, id: TaskId, result: TaskOutcome) -> UiEvent {
        UiEvent::TaskCompleted {
            kind,
            completed: TaskCompleted { id, result },
        }
    }

    fn active(app: &AppState, kind: TaskKind) -> TaskId {
        app.inflight.state(kind).latest().unwrap()
    }

    #[test]
    fn test_start_without_token_lands_on_login() {
        let mut app = app_with(Session::default());
        let effects = start(&mut app, Route::Root);
        assert_eq!(app.route, Route::Login);
        assert!(effects.is_empty());
    }

    #[test]
    fn test_first_entry_mounts_then_later_entries_fetch() {
        let mut app = app_with(signed_in());
        let effects = start(&mut app, Route::Root);
        assert_eq!(app.route, Route::Tasks);
        assert!(matches!(effects.as_slice(), [UiEffect::MountTasks { .. }]));

        update(&mut app, key(KeyCode::Char('n')));
        assert_eq!(app.route, Route::NewTask);
        let effects = update(&mut app, key(KeyCode::Esc));
        assert_eq!(app.route, Route::Tasks);
        assert!(matches!(effects.as_slice(), [UiEffect::FetchTasks { .. }]));
    }

    #[test]
    fn test_login_success_navigates_to_tasks_and_fetches() {
        let mut app = app_with(Session::default());
        start(&mut app, Route::Tasks);
        type_text(&mut app, "a@b.com");
        update(&mut app, key(KeyCode::Enter));
        type_text(&mut app, "x");

        let effects = update(&mut app, key(KeyCode::Enter));
        let [UiEffect::Login { email, password, .. }] = effects.as_slice() else {
            panic!("expected login effect, got {effects:?}");
        };
        assert_eq!((email.as_str(), password.as_str()), ("a@b.com", "x"));
        assert!(app.login.submitting);

        let id = active(&app, TaskKind::Auth);
        let effects = update(
            &mut app,
            completed(TaskKind::Auth, id, TaskOutcome::SignedIn(signed_in())),
        );

        assert_eq!(app.route, Route::Tasks);
        assert!(matches!(effects.as_slice(), [UiEffect::MountTasks { .. }]));
        assert_eq!(app.login.password.value(), "");
    }

    #[test]
    fn test_login_failure_shows_message_and_stays() {
        let mut app = app_with(Session::default());
        start(&mut app, Route::Login);
        type_text(&mut app, "a@b.com");
        update(&mut app, key(KeyCode::Enter));
        type_text(&mut app, "bad");
        update(&mut app, key(KeyCode::Enter));

        let id = active(&app, TaskKind::Auth);
        update(
            &mut app,
            completed(
                TaskKind::Auth,
                id,
                TaskOutcome::AuthFailed("Invalid credentials".to_string()),
            ),
        );

        assert_eq!(app.route, Route::Login);
        assert_eq!(app.login.error.as_deref(), Some("Invalid credentials"));
        assert!(!app.login.submitting);
    }

    #[test]
    fn test_losing_the_token_on_a_protected_route_redirects() {
        let mut app = app_with(signed_in());
        start(&mut app, Route::Tasks);
        update(&mut app, key(KeyCode::Char('e')));

        let effects = update(&mut app, UiEvent::SessionChanged(Session::default()));

        assert_eq!(app.route, Route::Login);
        assert!(
            effects
                .iter()
                .any(|e| matches!(e, UiEffect::CancelTask { kind: TaskKind::Export, .. }))
        );
        assert!(!app.inflight.is_any_running());
    }

    #[test]
    fn test_leaving_the_form_cancels_create_and_drops_its_result() {
        let mut app = app_with(signed_in());
        start(&mut app, Route::NewTask);
        type_text(&mut app, "T");
        let effects = update(
            &mut app,
            UiEvent::Terminal(Event::Key(KeyEvent::new(
                KeyCode::Char('s'),
                KeyModifiers::CONTROL,
            ))),
        );
        let [UiEffect::CreateTask { cancel, .. }] = effects.as_slice() else {
            panic!("expected create effect, got {effects:?}");
        };
        let create_cancel = cancel.clone();
        let id = active(&app, TaskKind::Create);

        let effects = update(&mut app, key(KeyCode::Esc));
        let cancelled = effects.iter().find_map(|e| match e {
            UiEffect::CancelTask {
                kind: TaskKind::Create,
                tokens,
            } => tokens.first().cloned(),
            _ => None,
        });
        cancelled.unwrap().cancel();
        assert!(create_cancel.is_cancelled());

        let effects = update(
            &mut app,
            completed(TaskKind::Create, id, TaskOutcome::Finished(Ok(()))),
        );
        assert!(effects.is_empty());
        assert_eq!(app.notice, None);
    }

    #[test]
    fn test_create_failure_shows_static_message() {
        let mut app = app_with(signed_in());
        start(&mut app, Route::NewTask);
        type_text(&mut app, "T");
        update(
            &mut app,
            UiEvent::Terminal(Event::Key(KeyEvent::new(
                KeyCode::Char('s'),
                KeyModifiers::CONTROL,
            ))),
        );
        assert!(app.form.submitting);

        let id = active(&app, TaskKind::Create);
        update(
            &mut app,
            completed(
                TaskKind::Create,
                id,
                TaskOutcome::Finished(Err(StoreError::RequestFailed(ApiError::Timeout(
                    "deadline".to_string(),
                )))),
            ),
        );

        assert_eq!(app.route, Route::NewTask);
        assert_eq!(app.form.error.as_deref(), Some(CREATE_FAILED_MESSAGE));
        assert!(!app.form.submitting);
    }

    #[test]
    fn test_create_success_returns_to_list() {
        let mut app = app_with(signed_in());
        start(&mut app, Route::Tasks);
        update(&mut app, key(KeyCode::Char('n')));
        type_text(&mut app, "T");
        update(
            &mut app,
            UiEvent::Terminal(Event::Key(KeyEvent::new(
                KeyCode::Char('s'),
                KeyModifiers::CONTROL,
            ))),
        );

        let id = active(&app, TaskKind::Create);
        let effects = update(
            &mut app,
            completed(TaskKind::Create, id, TaskOutcome::Finished(Ok(()))),
        );

        assert_eq!(app.route, Route::Tasks);
        assert!(matches!(effects.as_slice(), [UiEffect::FetchTasks { .. }]));
        assert_eq!(app.notice, Some(Notice::Info("Task added.".to_string())));
    }

    #[test]
    fn test_logout_redirects_immediately() {
        let mut app = app_with(signed_in());
        start(&mut app, Route::Tasks);

        let effects = update(&mut app, key(KeyCode::Char('o')));

        assert!(matches!(effects.first(), Some(UiEffect::Logout)));
        assert_eq!(app.route, Route::Login);
        assert!(!app.session.is_authenticated());
    }

    #[test]
    fn test_superseded_refresh_result_is_ignored() {
        let mut app = app_with(signed_in());
        start(&mut app, Route::Tasks);
        let first = active(&app, TaskKind::Fetch);
        update(&mut app, key(KeyCode::Char('r')));

        assert!(!app.inflight.state_mut(TaskKind::Fetch).finish_if_active(first));
        assert!(app.inflight.state(TaskKind::Fetch).is_running());
    }

    #[test]
    fn test_overlapping_deletes_both_apply() {
        let mut app = AppState::new(signed_in(), two_tasks());
        start(&mut app, Route::Tasks);

        let (first, first_cancel) = delete_effect(update(&mut app, key(KeyCode::Char('d'))), 1);
        update(&mut app, key(KeyCode::Char('j')));
        let (second, second_cancel) = delete_effect(update(&mut app, key(KeyCode::Char('d'))), 2);

        assert!(!first_cancel.is_cancelled());
        assert!(!second_cancel.is_cancelled());

        update(
            &mut app,
            completed(TaskKind::Delete, first, TaskOutcome::Finished(Ok(()))),
        );
        assert_eq!(app.notice, Some(Notice::Info("Task deleted.".to_string())));
        assert!(app.inflight.state(TaskKind::Delete).is_running());

        app.notice = None;
        update(
            &mut app,
            completed(TaskKind::Delete, second, TaskOutcome::Finished(Ok(()))),
        );
        assert_eq!(app.notice, Some(Notice::Info("Task deleted.".to_string())));
        assert!(!app.inflight.state(TaskKind::Delete).is_running());
    }

    #[test]
    fn test_leaving_the_list_cancels_every_pending_mutation() {
        let mut app = AppState::new(signed_in(), two_tasks());
        start(&mut app, Route::Tasks);
        update(&mut app, key(KeyCode::Char('s')));
        update(&mut app, key(KeyCode::Char('j')));
        update(&mut app, key(KeyCode::Char('s')));

        let effects = update(&mut app, key(KeyCode::Char('n')));

        let cancelled = effects.iter().find_map(|e| match e {
            UiEffect::CancelTask {
                kind: TaskKind::Update,
                tokens,
            } => Some(tokens.len()),
            _ => None,
        });
        assert_eq!(cancelled, Some(2));
        assert!(!app.inflight.state(TaskKind::Update).is_running());
    }

    #[test]
    fn test_saved_download_reports_path() {
        let mut app = app_with(signed_in());
        start(&mut app, Route::Tasks);
        update(&mut app, key(KeyCode::Char('t')));

        let id = active(&app, TaskKind::Template);
        update(
            &mut app,
            completed(
                TaskKind::Template,
                id,
                TaskOutcome::Saved(Some(PathBuf::from("task_template.xlsx"))),
            ),
        );

        assert_eq!(
            app.notice,
            Some(Notice::Info("Saved task_template.xlsx".to_string()))
        );
    }
}
