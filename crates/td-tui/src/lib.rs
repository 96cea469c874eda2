//! Full-screen terminal UI for taskdesk.
//!
//! Elm-style: `update` reduces events into `AppState` and returns effects,
//! `render` draws the state, and `runtime` executes effects against the
//! injected stores.

pub mod common;
pub mod effects;
pub mod events;
pub mod features;
pub mod render;
pub mod runtime;
pub mod state;
pub mod terminal;
pub mod update;

use std::io::{IsTerminal, stderr};
use std::sync::Arc;

use anyhow::Result;
pub use features::{auth, task_form, task_list};
pub use runtime::TuiRuntime;
use td_core::AppContext;
use td_core::router::Route;

/// Runs the TUI against the context's stores, starting at `start`.
///
/// The route is checked by the guard like any other navigation, so a
/// protected start route without a session lands on the login form.
///
/// # Errors
/// Returns an error if stderr is not a terminal or the terminal fails.
pub async fn run_app(ctx: &AppContext, start: Route) -> Result<()> {
    if !stderr().is_terminal() {
        anyhow::bail!(
            "The interactive UI requires a terminal.\n\
             Use `td tasks list` for non-interactive access."
        );
    }

    tracing::info!(api_url = %ctx.api_url, route = %start, "starting tui");
    let mut runtime = TuiRuntime::new(
        Arc::clone(&ctx.session),
        Arc::clone(&ctx.tasks),
        start,
    )?;
    runtime.run()
}
