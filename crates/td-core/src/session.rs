//! Session store: the current user identity and token.
//!
//! The token is persisted through a [`TokenStore`] so it survives restarts.
//! The user identity is kept in memory only, so after a restart the session
//! carries a token but no user until the next login.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::api::TaskApi;
use crate::error::SessionError;
use crate::types::{AuthResponse, Session, UserIdentity};

/// Read access to the current token, shared by the task store and the route guard.
pub trait SessionAccess: Send + Sync {
    /// Current bearer token, if any.
    fn token(&self) -> Option<String>;

    fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Drops the session after the server rejected its token.
    ///
    /// Snapshots have nothing to drop, so the default does nothing.
    fn expire(&self) {}
}

impl SessionAccess for Session {
    fn token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// Persistence for the session token.
pub trait TokenStore: Send + Sync {
    /// # Errors
    /// Returns an error if a stored token exists but cannot be read.
    fn load(&self) -> io::Result<Option<String>>;

    /// # Errors
    /// Returns an error if the token cannot be written.
    fn save(&self, token: &str) -> io::Result<()>;

    /// # Errors
    /// Returns an error if the stored token cannot be removed.
    fn clear(&self) -> io::Result<()>;
}

#[derive(Serialize, Deserialize)]
struct StoredSession {
    token: String,
}

/// Stores the token as JSON in a file with restricted permissions (0600).
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> io::Result<Option<String>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let stored: StoredSession = serde_json::from_str(&contents)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let token = stored.token.trim().to_string();
        Ok((!token.is_empty()).then_some(token))
    }

    fn save(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(&StoredSession {
            token: token.to_string(),
        })
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        // Written to a fresh sibling and renamed over the target, so the token
        // file is never half-written and always ends up 0600.
        let tmp = self.path.with_extension("json.tmp");
        match fs::remove_file(&tmp) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e),
            _ => {}
        }

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&tmp)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &self.path)
    }

    fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Keeps the token in memory. Used by tests and one-shot tooling.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> io::Result<Option<String>> {
        Ok(self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, token: &str) -> io::Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Owns the session and keeps its persisted token in sync.
pub struct SessionStore<A> {
    api: Arc<A>,
    tokens: Box<dyn TokenStore>,
    state: watch::Sender<Session>,
}

impl<A: TaskApi> SessionStore<A> {
    /// Creates the store, restoring a previously persisted token.
    ///
    /// An unreadable token file is logged and treated as "no session".
    pub fn new(api: Arc<A>, tokens: Box<dyn TokenStore>) -> Self {
        let token = tokens.load().unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable session token");
            None
        });
        let (state, _) = watch::channel(Session { user: None, token });
        Self { api, tokens, state }
    }

    /// Authenticates against `/auth/login`.
    ///
    /// On failure the session is left exactly as it was.
    ///
    /// # Errors
    /// Returns the API failure, or a storage error if the token cannot be persisted.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserIdentity, SessionError> {
        let response = self.api.login(email, password).await?;
        self.establish(response)
    }

    /// Creates an account through `/auth/register` and signs in with it.
    ///
    /// # Errors
    /// Returns the API failure, or a storage error if the token cannot be persisted.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserIdentity, SessionError> {
        let response = self.api.register(email, password).await?;
        self.establish(response)
    }

    fn establish(&self, response: AuthResponse) -> Result<UserIdentity, SessionError> {
        let AuthResponse { user, token } = response;
        self.tokens.save(&token).map_err(SessionError::Storage)?;

        info!(user = %user.email, "signed in");
        let identity = user.clone();
        self.state.send_modify(|session| {
            session.user = Some(user);
            session.token = Some(token);
        });
        Ok(identity)
    }

    /// Clears the session locally. The server is not contacted.
    pub fn logout(&self) {
        if self.clear() {
            info!("signed out");
        }
    }

    /// Returns true if there was a session to clear.
    fn clear(&self) -> bool {
        if let Err(e) = self.tokens.clear() {
            warn!(error = %e, "failed to remove persisted session token");
        }
        self.state.send_if_modified(|session| {
            let had_session = session.token.is_some() || session.user.is_some();
            session.user = None;
            session.token = None;
            had_session
        })
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn user(&self) -> Option<UserIdentity> {
        self.state.borrow().user.clone()
    }

    /// Observes session changes.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }
}

impl<A: TaskApi> SessionAccess for SessionStore<A> {
    fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    fn expire(&self) {
        if self.clear() {
            warn!("session expired, token rejected by server");
        }
    }
}
