//! Core library for taskdesk.
//!
//! Holds the session and task stores, the HTTP request layer, the route
//! guard, configuration and logging. The TUI and CLI crates build on top of
//! this and never talk to the remote API directly.

pub mod api;
pub mod config;
pub mod context;
pub mod download;
pub mod error;
pub mod logging;
pub mod router;
pub mod session;
pub mod tasks;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::context::AppContext;
pub use crate::error::{ApiError, RouteError, SessionError, StoreError};
pub use crate::session::{SessionAccess, SessionStore};
pub use crate::tasks::{TaskState, TaskStore};
