//! Tracing subscriber setup.
//!
//! CLI commands log to stderr so stdout stays clean for command output. The
//! TUI owns the terminal, so it logs to a file under `$TD_HOME/logs`.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the configured log level.
pub const LOG_ENV: &str = "TD_LOG";

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        EnvFilter::try_new(default_level).unwrap_or_else(|_| EnvFilter::new("info"))
    })
}

/// Installs a stderr subscriber. Calling it twice is harmless.
pub fn init_stderr(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(env_filter(default_level))
        .try_init();
}

/// Installs a non-blocking file subscriber writing `td.log` into `dir`.
///
/// The returned guard flushes pending lines on drop; keep it alive for the
/// lifetime of the UI.
///
/// # Errors
/// Returns an error if the log directory cannot be created.
pub fn init_file(dir: &Path, default_level: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, "td.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let _ = tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_env_filter(env_filter(default_level))
        .try_init();

    Ok(guard)
}
