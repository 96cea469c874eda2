//! Runtime execution modes.
//!
//! - commands: one request per invocation, output on stdout
//! - `tui`: full-screen interactive terminal UI (optional feature)

#[cfg(feature = "tui")]
pub use td_tui::run_app;

#[cfg(not(feature = "tui"))]
pub async fn run_app(
    _ctx: &td_core::AppContext,
    _start: td_core::router::Route,
) -> anyhow::Result<()> {
    anyhow::bail!("TUI support is disabled in this build (feature \"tui\").");
}
