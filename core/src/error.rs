use crate::types::RunState;
use std::time::Duration;
use thiserror::Error;

/// Failure talking to the assistant service, classified for retry logic.
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Network, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::RateLimit, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Server, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::InvalidRequest, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Decode, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Unknown, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// Connection failures and timeouts
    Network,
    /// 429
    RateLimit,
    /// 5xx
    Server,
    /// 401, 403
    Auth,
    /// 400, 404
    InvalidRequest,
    /// Response body did not match the expected shape
    Decode,
    Unknown,
}

impl BackendErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::RateLimit | Self::Server)
    }
}

/// Failure driving one query through a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("assistant service error: {0}")]
    Backend(#[from] BackendError),

    #[error("run did not complete after {polls} polls ({elapsed:?})")]
    Timeout { polls: u32, elapsed: Duration },

    #[error("run ended with status {state}: {reason}")]
    RunEnded { state: RunState, reason: String },

    #[error("thread has no messages")]
    EmptyThread,

    #[error("message {message_id} has no text content")]
    NoTextContent { message_id: String },
}

/// Failure opening an assistant or thread.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to create assistant '{name}': {source}")]
    Assistant {
        name: String,
        #[source]
        source: BackendError,
    },

    #[error("failed to create thread: {0}")]
    Thread(#[source] BackendError),

    #[error("conversation limit of {limit} reached")]
    PoolFull { limit: usize },
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("tool '{0}' is registered more than once")]
    DuplicateTool(String),

    #[error("failed to read tool registry at '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid tool registry at '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
