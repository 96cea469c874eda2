use serde_json::Value;
use thiserror::Error;

/// Failure of a single call against the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The server answered 401.
    #[error("unauthorized")]
    Unauthorized,
    /// Any other non-success status. `message` is the server's own error text when it sent one.
    #[error("HTTP {status}{}", suffix(.message.as_deref()))]
    Status {
        status: u16,
        message: Option<String>,
    },
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

fn suffix(message: Option<&str>) -> String {
    message.map(|m| format!(": {m}")).unwrap_or_default()
}

impl ApiError {
    /// Builds a status error, pulling a readable message out of a JSON body.
    ///
    /// Accepts `{"error": "..."}`, `{"error": {"message": "..."}}` and
    /// `{"message": "..."}`. Other bodies are dropped.
    pub fn http_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body).ok().and_then(|json| {
            let text = match json.get("error") {
                Some(Value::String(msg)) => Some(msg.clone()),
                Some(obj) => obj.get("message").and_then(Value::as_str).map(str::to_string),
                None => None,
            };
            text.or_else(|| json.get("message").and_then(Value::as_str).map(str::to_string))
        });
        ApiError::Status {
            status,
            message: message.filter(|m| !m.trim().is_empty()),
        }
    }

    /// Server-provided error text, if the failure carried any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

/// Failure of a task store operation, as returned to callers of write operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No token was present locally; the network was not called.
    #[error("not authenticated")]
    Unauthenticated,
    /// The server rejected the token.
    #[error("session expired")]
    Unauthorized,
    #[error("request failed: {0}")]
    RequestFailed(#[source] ApiError),
    /// The request's cancellation token fired before its response was applied.
    #[error("request cancelled")]
    Cancelled,
}

impl From<ApiError> for StoreError {
    fn from(value: ApiError) -> Self {
        match value {
            ApiError::Unauthorized => StoreError::Unauthorized,
            other => StoreError::RequestFailed(other),
        }
    }
}

/// Failure of login or registration.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("failed to persist session token: {0}")]
    Storage(#[source] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("no such route: {0}")]
    UnknownPath(String),
}
