//! Wiring for the production stores.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::HttpApi;
use crate::config::{Config, paths};
use crate::download::DirectorySink;
use crate::session::{FileTokenStore, SessionAccess, SessionStore};
use crate::tasks::TaskStore;

/// The stores a front end needs, built once and passed around explicitly.
pub struct AppContext {
    pub config: Config,
    pub api_url: String,
    pub session: Arc<SessionStore<HttpApi>>,
    pub tasks: Arc<TaskStore<HttpApi>>,
}

impl AppContext {
    /// Builds the HTTP client and both stores from configuration.
    ///
    /// The session token lives in `$TD_HOME/session.json`.
    ///
    /// # Errors
    /// Returns an error if the API URL is invalid or the client cannot be built.
    pub fn from_config(config: Config) -> Result<Self> {
        let api_url = config.effective_api_url()?;
        let api = Arc::new(
            HttpApi::new(&api_url, config.request_timeout())
                .context("Failed to create API client")?,
        );

        let session = Arc::new(SessionStore::new(
            Arc::clone(&api),
            Box::new(FileTokenStore::new(paths::session_path())),
        ));
        let tasks = Arc::new(
            TaskStore::new(
                Arc::clone(&api),
                Arc::clone(&session) as Arc<dyn SessionAccess>,
                Box::new(DirectorySink::new(config.download_dir())),
            )
            .expire_session_on_unauthorized(config.clear_session_on_unauthorized),
        );

        Ok(Self {
            config,
            api_url,
            session,
            tasks,
        })
    }

    /// Loads `$TD_HOME/config.toml` and builds the context from it.
    ///
    /// # Errors
    /// Returns an error if the config cannot be loaded or the client cannot be built.
    pub fn load() -> Result<Self> {
        Self::from_config(Config::load()?)
    }
}
